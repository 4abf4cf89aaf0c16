use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use super::TweetService;
use crate::error::AppError;
use crate::events::{EventProducer, TweetEvent, TweetEventKind};
use crate::models::{assemble_threads, Tweet, TweetInput, TweetRecord};
use crate::store::{TweetStore, UserStore};
use crate::validation::normalize_tweet;

/// Tweet service backed by a [`TweetStore`], publishing to an [`EventProducer`].
pub struct StoreTweetService {
    tweets: Arc<dyn TweetStore>,
    users: Arc<dyn UserStore>,
    events: EventProducer,
}

impl StoreTweetService {
    pub fn new(
        tweets: Arc<dyn TweetStore>,
        users: Arc<dyn UserStore>,
        events: EventProducer,
    ) -> Self {
        StoreTweetService {
            tweets,
            users,
            events,
        }
    }

    async fn require_user(&self, username: &str) -> Result<(), AppError> {
        match self.users.find_user(username).await? {
            Some(_) => Ok(()),
            None => Err(AppError::UserNotFound(username.to_string())),
        }
    }

    async fn require_tweet(&self, tweet_id: &str) -> Result<TweetRecord, AppError> {
        self.tweets
            .find_tweet(tweet_id)
            .await?
            .ok_or_else(|| AppError::TweetNotFound(tweet_id.to_string()))
    }

    fn require_author(tweet: &TweetRecord, username: &str) -> Result<(), AppError> {
        if tweet.username == username {
            Ok(())
        } else {
            warn!(
                "{} tried to modify tweet {} owned by {}",
                username, tweet.id, tweet.username
            );
            Err(AppError::Forbidden(format!(
                "tweet {} does not belong to {}",
                tweet.id, username
            )))
        }
    }

    /// Top-level rows matching `keep`, newest first, with reply trees attached.
    async fn threads<F>(&self, keep: F) -> Result<Vec<Tweet>, AppError>
    where
        F: Fn(&TweetRecord) -> bool + Send,
    {
        let all = self.tweets.list_tweets().await?;
        let mut roots: Vec<TweetRecord> = all
            .iter()
            .filter(|t| t.parent_id.is_none() && keep(t))
            .cloned()
            .collect();
        roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assemble_threads(roots, &all))
    }

    /// Single tweet with its reply tree.
    async fn thread_of(&self, record: TweetRecord) -> Result<Tweet, AppError> {
        let all = self.tweets.list_tweets().await?;
        Ok(assemble_threads(vec![record], &all).remove(0))
    }

    async fn insert(
        &self,
        username: &str,
        input: TweetInput,
        parent_id: Option<String>,
    ) -> Result<TweetRecord, AppError> {
        let input = normalize_tweet(input)?;
        self.require_user(username).await?;

        let now = Utc::now();
        let record = TweetRecord {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            message: input.message,
            tag: input.tag,
            liked_by: Vec::new(),
            parent_id,
            created_at: now,
            updated_at: now,
        };
        if !self.tweets.insert_tweet(record.clone()).await? {
            let parent = record.parent_id.unwrap_or_default();
            return Err(AppError::TweetNotFound(parent));
        }
        Ok(record)
    }
}

#[async_trait]
impl TweetService for StoreTweetService {
    async fn all_tweets(&self) -> Result<Vec<Tweet>, AppError> {
        self.threads(|_| true).await
    }

    async fn tweets_by_user(&self, username: &str) -> Result<Vec<Tweet>, AppError> {
        self.threads(|t| t.username == username).await
    }

    async fn post_tweet(&self, username: &str, input: TweetInput) -> Result<Tweet, AppError> {
        let record = self.insert(username, input, None).await?;
        info!("{} posted tweet {}", username, record.id);
        self.events
            .publish(TweetEvent::new(TweetEventKind::Posted, &record.id, username));
        Ok(record.into_tweet(Vec::new()))
    }

    async fn update_tweet(
        &self,
        username: &str,
        tweet_id: &str,
        input: TweetInput,
    ) -> Result<Tweet, AppError> {
        let input = normalize_tweet(input)?;
        let existing = self.require_tweet(tweet_id).await?;
        Self::require_author(&existing, username)?;

        let now = Utc::now();
        if !self
            .tweets
            .update_tweet(tweet_id, &input.message, input.tag.as_deref(), now)
            .await?
        {
            // Deleted between the lookup and the update
            return Err(AppError::TweetNotFound(tweet_id.to_string()));
        }

        let updated = TweetRecord {
            message: input.message,
            tag: input.tag,
            updated_at: now,
            ..existing
        };
        info!("{} updated tweet {}", username, tweet_id);
        self.events
            .publish(TweetEvent::new(TweetEventKind::Updated, tweet_id, username));
        self.thread_of(updated).await
    }

    async fn delete_tweet(&self, username: &str, tweet_id: &str) -> Result<(), AppError> {
        let existing = self.require_tweet(tweet_id).await?;
        Self::require_author(&existing, username)?;

        if !self.tweets.delete_tweet(tweet_id).await? {
            return Err(AppError::TweetNotFound(tweet_id.to_string()));
        }

        info!("{} deleted tweet {}", username, tweet_id);
        self.events
            .publish(TweetEvent::new(TweetEventKind::Deleted, tweet_id, username));
        Ok(())
    }

    async fn like_tweet(&self, username: &str, tweet_id: &str) -> Result<(), AppError> {
        self.require_user(username).await?;
        if !self.tweets.add_like(tweet_id, username).await? {
            return Err(AppError::TweetNotFound(tweet_id.to_string()));
        }

        info!("{} liked tweet {}", username, tweet_id);
        self.events
            .publish(TweetEvent::new(TweetEventKind::Liked, tweet_id, username));
        Ok(())
    }

    async fn reply_tweet(
        &self,
        username: &str,
        tweet_id: &str,
        input: TweetInput,
    ) -> Result<Tweet, AppError> {
        let parent = self.require_tweet(tweet_id).await?;
        let record = self.insert(username, input, Some(parent.id)).await?;

        info!("{} replied to tweet {} with {}", username, tweet_id, record.id);
        self.events
            .publish(TweetEvent::new(TweetEventKind::Replied, &record.id, username));
        Ok(record.into_tweet(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserRecord};
    use crate::store::MemoryStore;
    use tokio::sync::mpsc;

    async fn setup() -> (StoreTweetService, mpsc::Receiver<TweetEvent>) {
        let store = Arc::new(MemoryStore::new());
        for name in ["alice", "bob"] {
            store
                .insert_user(UserRecord {
                    profile: User {
                        username: name.into(),
                        first_name: String::new(),
                        last_name: String::new(),
                        email: String::new(),
                        contact_number: None,
                    },
                    password_hash: "unused".into(),
                })
                .await
                .unwrap();
        }
        let (events, rx) = EventProducer::channel(64);
        (StoreTweetService::new(store.clone(), store, events), rx)
    }

    fn input(message: &str) -> TweetInput {
        TweetInput {
            message: message.into(),
            tag: None,
        }
    }

    #[tokio::test]
    async fn test_post_then_list_by_user_contains_once() {
        let (tweets, mut rx) = setup().await;
        let posted = tweets.post_tweet("alice", input("hello")).await.unwrap();
        tweets.post_tweet("bob", input("hey")).await.unwrap();

        let mine = tweets.tweets_by_user("alice").await.unwrap();
        assert_eq!(mine.iter().filter(|t| t.id == posted.id).count(), 1);
        assert_eq!(mine.len(), 1);
        assert_eq!(tweets.all_tweets().await.unwrap().len(), 2);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, TweetEventKind::Posted);
        assert_eq!(event.tweet_id, posted.id);
    }

    #[tokio::test]
    async fn test_all_tweets_newest_first() {
        let (tweets, _rx) = setup().await;
        let first = tweets.post_tweet("alice", input("one")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = tweets.post_tweet("alice", input("two")).await.unwrap();

        let all = tweets.all_tweets().await.unwrap();
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[tokio::test]
    async fn test_post_for_unknown_user_fails() {
        let (tweets, _rx) = setup().await;
        assert!(matches!(
            tweets.post_tweet("ghost", input("boo")).await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_only_by_author() {
        let (tweets, _rx) = setup().await;
        let posted = tweets.post_tweet("alice", input("draft")).await.unwrap();

        let updated = tweets
            .update_tweet("alice", &posted.id, input("final"))
            .await
            .unwrap();
        assert_eq!(updated.message, "final");
        assert_eq!(updated.created_at, posted.created_at);

        assert!(matches!(
            tweets.update_tweet("bob", &posted.id, input("hijack")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            tweets.update_tweet("alice", "missing", input("x")).await,
            Err(AppError::TweetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_tweet_and_replies() {
        let (tweets, _rx) = setup().await;
        let posted = tweets.post_tweet("alice", input("bye")).await.unwrap();
        tweets
            .reply_tweet("bob", &posted.id, input("reply"))
            .await
            .unwrap();

        assert!(matches!(
            tweets.delete_tweet("bob", &posted.id).await,
            Err(AppError::Forbidden(_))
        ));
        tweets.delete_tweet("alice", &posted.id).await.unwrap();
        assert!(tweets.all_tweets().await.unwrap().is_empty());
        assert!(matches!(
            tweets.delete_tweet("alice", &posted.id).await,
            Err(AppError::TweetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_like_counts_once_per_user() {
        let (tweets, _rx) = setup().await;
        let posted = tweets.post_tweet("alice", input("like me")).await.unwrap();

        tweets.like_tweet("bob", &posted.id).await.unwrap();
        tweets.like_tweet("bob", &posted.id).await.unwrap();
        tweets.like_tweet("alice", &posted.id).await.unwrap();

        let all = tweets.all_tweets().await.unwrap();
        assert_eq!(all[0].likes, 2);
        assert!(matches!(
            tweets.like_tweet("bob", "missing").await,
            Err(AppError::TweetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reply_is_nested_under_parent() {
        let (tweets, _rx) = setup().await;
        let posted = tweets.post_tweet("alice", input("question")).await.unwrap();
        let reply = tweets
            .reply_tweet("bob", &posted.id, input("answer"))
            .await
            .unwrap();
        assert_eq!(reply.parent_id.as_deref(), Some(posted.id.as_str()));

        let all = tweets.all_tweets().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].replies[0].id, reply.id);

        // Replies do not show up as top-level tweets of their author
        assert!(tweets.tweets_by_user("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply_errors_are_typed() {
        let (tweets, _rx) = setup().await;
        assert!(matches!(
            tweets.reply_tweet("bob", "missing", input("x")).await,
            Err(AppError::TweetNotFound(_))
        ));

        let posted = tweets.post_tweet("alice", input("q")).await.unwrap();
        assert!(matches!(
            tweets.reply_tweet("bob", &posted.id, input("  ")).await,
            Err(AppError::Validation(_))
        ));
    }
}
