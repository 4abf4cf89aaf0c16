use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{TweetStore, UserStore};
use crate::error::AppError;
use crate::models::{TweetRecord, User, UserRecord};

/// In-process store. Used when no database is configured, and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<String, UserRecord>>,
    tweets: RwLock<Vec<TweetRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, AppError> {
    lock.read()
        .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, AppError> {
    lock.write()
        .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, record: UserRecord) -> Result<bool, AppError> {
        let mut users = write(&self.users)?;
        if users.contains_key(&record.profile.username) {
            return Ok(false);
        }
        users.insert(record.profile.username.clone(), record);
        Ok(true)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(read(&self.users)?.get(username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(read(&self.users)?
            .values()
            .map(|r| r.profile.clone())
            .collect())
    }

    async fn search_users(&self, fragment: &str) -> Result<Vec<User>, AppError> {
        let needle = fragment.to_lowercase();
        Ok(read(&self.users)?
            .values()
            .filter(|r| r.profile.username.to_lowercase().contains(&needle))
            .map(|r| r.profile.clone())
            .collect())
    }

    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        match write(&self.users)?.get_mut(username) {
            Some(record) => {
                record.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl TweetStore for MemoryStore {
    async fn insert_tweet(&self, record: TweetRecord) -> Result<bool, AppError> {
        let mut tweets = write(&self.tweets)?;
        if let Some(parent) = &record.parent_id {
            if !tweets.iter().any(|t| &t.id == parent) {
                return Ok(false);
            }
        }
        tweets.push(record);
        Ok(true)
    }

    async fn find_tweet(&self, id: &str) -> Result<Option<TweetRecord>, AppError> {
        Ok(read(&self.tweets)?.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tweets(&self) -> Result<Vec<TweetRecord>, AppError> {
        Ok(read(&self.tweets)?.clone())
    }

    async fn update_tweet(
        &self,
        id: &str,
        message: &str,
        tag: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tweets = write(&self.tweets)?;
        match tweets.iter_mut().find(|t| t.id == id) {
            Some(tweet) => {
                tweet.message = message.to_string();
                tweet.tag = tag.map(str::to_string);
                tweet.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_tweet(&self, id: &str) -> Result<bool, AppError> {
        let mut tweets = write(&self.tweets)?;
        if !tweets.iter().any(|t| t.id == id) {
            return Ok(false);
        }

        // Collect the subtree rooted at `id`
        let mut doomed: HashSet<String> = HashSet::from([id.to_string()]);
        loop {
            let before = doomed.len();
            for t in tweets.iter() {
                if let Some(parent) = &t.parent_id {
                    if doomed.contains(parent) {
                        doomed.insert(t.id.clone());
                    }
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        tweets.retain(|t| !doomed.contains(&t.id));
        Ok(true)
    }

    async fn add_like(&self, id: &str, username: &str) -> Result<bool, AppError> {
        let mut tweets = write(&self.tweets)?;
        match tweets.iter_mut().find(|t| t.id == id) {
            Some(tweet) => {
                if !tweet.liked_by.iter().any(|u| u == username) {
                    tweet.liked_by.push(username.to_string());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str) -> UserRecord {
        UserRecord {
            profile: User {
                username: username.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: format!("{}@example.com", username),
                contact_number: None,
            },
            password_hash: "hash".to_string(),
        }
    }

    fn tweet(id: &str, parent: Option<&str>) -> TweetRecord {
        let now = Utc::now();
        TweetRecord {
            id: id.to_string(),
            username: "alice".to_string(),
            message: "hi".to_string(),
            tag: None,
            liked_by: vec![],
            parent_id: parent.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_user_rejects_duplicates() {
        let store = MemoryStore::new();
        assert!(tokio_test::block_on(store.insert_user(user("alice"))).unwrap());
        assert!(!tokio_test::block_on(store.insert_user(user("alice"))).unwrap());
        assert_eq!(tokio_test::block_on(store.list_users()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_ordered() {
        let store = MemoryStore::new();
        for name in ["zed_fan", "Alice", "malice", "bob"] {
            store.insert_user(user(name)).await.unwrap();
        }
        let found: Vec<String> = store
            .search_users("ALI")
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(found, vec!["Alice".to_string(), "malice".to_string()]);
    }

    #[tokio::test]
    async fn test_update_password_unknown_user() {
        let store = MemoryStore::new();
        assert!(!store.update_password("ghost", "h").await.unwrap());
        store.insert_user(user("alice")).await.unwrap();
        assert!(store.update_password("alice", "h2").await.unwrap());
        let found = store.find_user("alice").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "h2");
    }

    #[tokio::test]
    async fn test_delete_removes_reply_subtree() {
        let store = MemoryStore::new();
        store.insert_tweet(tweet("root", None)).await.unwrap();
        store.insert_tweet(tweet("r1", Some("root"))).await.unwrap();
        store.insert_tweet(tweet("r2", Some("r1"))).await.unwrap();
        store.insert_tweet(tweet("other", None)).await.unwrap();

        assert!(store.delete_tweet("root").await.unwrap());
        let left: Vec<String> = store
            .list_tweets()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(left, vec!["other".to_string()]);
        assert!(!store.delete_tweet("root").await.unwrap());
    }

    #[tokio::test]
    async fn test_like_is_idempotent_per_user() {
        let store = MemoryStore::new();
        store.insert_tweet(tweet("t1", None)).await.unwrap();
        assert!(store.add_like("t1", "bob").await.unwrap());
        assert!(store.add_like("t1", "bob").await.unwrap());
        assert!(store.add_like("t1", "carol").await.unwrap());
        assert!(!store.add_like("missing", "bob").await.unwrap());

        let t = store.find_tweet("t1").await.unwrap().unwrap();
        assert_eq!(t.liked_by, vec!["bob".to_string(), "carol".to_string()]);
    }

    #[tokio::test]
    async fn test_reply_to_missing_parent_is_not_stored() {
        let store = MemoryStore::new();
        store.insert_tweet(tweet("root", None)).await.unwrap();
        store.delete_tweet("root").await.unwrap();

        assert!(!store.insert_tweet(tweet("orphan", Some("root"))).await.unwrap());
        assert!(store.list_tweets().await.unwrap().is_empty());
    }
}
