//! Request and response types shared by the handlers, services and stores.
//!
//! JSON field names are camelCase to match the web client. Passwords are
//! accepted on input and never serialized back out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a tweet message, in characters.
pub const MAX_MESSAGE_LEN: usize = 144;

/// Maximum length of a tweet tag, in characters.
pub const MAX_TAG_LEN: usize = 50;

/// A registered user as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
}

/// A stored user record, including the password hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub profile: User,
    pub password_hash: String,
}

/// Registration body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub contact_number: Option<String>,
}

impl NewUser {
    /// Splits the registration body into the public profile and the raw password.
    pub fn into_parts(self) -> (User, String) {
        let profile = User {
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            contact_number: self.contact_number,
        };
        (profile, self.password)
    }
}

/// Login body.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Password reset body. `password` is accepted as an alias of `newPassword`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub username: String,
    #[serde(alias = "password")]
    pub new_password: String,
}

/// Successful login result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
    pub expires_in: u64,
}

/// Body accepted by the post, update and reply endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TweetInput {
    pub message: String,
    #[serde(default)]
    pub tag: Option<String>,
}

/// A tweet with its nested replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: String,
    pub username: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub likes: u64,
    #[serde(default)]
    pub liked_by: Vec<String>,
    #[serde(default)]
    pub replies: Vec<Tweet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single stored tweet row; replies are linked through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetRecord {
    pub id: String,
    pub username: String,
    pub message: String,
    pub tag: Option<String>,
    pub liked_by: Vec<String>,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TweetRecord {
    /// Converts the row into an API tweet with the given replies attached.
    pub fn into_tweet(self, replies: Vec<Tweet>) -> Tweet {
        Tweet {
            likes: self.liked_by.len() as u64,
            id: self.id,
            username: self.username,
            message: self.message,
            tag: self.tag,
            liked_by: self.liked_by,
            replies,
            parent_id: self.parent_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Assembles reply trees from a flat list of rows.
///
/// Each root gets its reply subtree attached, looked up in `all`. Top-level
/// order follows `roots`; replies are oldest first.
pub fn assemble_threads(roots: Vec<TweetRecord>, all: &[TweetRecord]) -> Vec<Tweet> {
    roots
        .into_iter()
        .map(|root| {
            let replies = replies_of(&root.id, all);
            root.into_tweet(replies)
        })
        .collect()
}

fn replies_of(parent_id: &str, all: &[TweetRecord]) -> Vec<Tweet> {
    let mut children: Vec<&TweetRecord> = all
        .iter()
        .filter(|t| t.parent_id.as_deref() == Some(parent_id))
        .collect();
    children.sort_by_key(|t| t.created_at);
    children
        .into_iter()
        .map(|child| {
            let replies = replies_of(&child.id, all);
            child.clone().into_tweet(replies)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: &str, parent: Option<&str>, offset_secs: i64) -> TweetRecord {
        let at = Utc::now() + Duration::seconds(offset_secs);
        TweetRecord {
            id: id.to_string(),
            username: "alice".to_string(),
            message: format!("message {}", id),
            tag: None,
            liked_by: vec![],
            parent_id: parent.map(str::to_string),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_assemble_threads_nests_replies_oldest_first() {
        let root = record("root", None, 0);
        let late = record("late", Some("root"), 20);
        let early = record("early", Some("root"), 10);
        let nested = record("nested", Some("early"), 30);
        let all = vec![root.clone(), late, early, nested];

        let threads = assemble_threads(vec![root], &all);
        assert_eq!(threads.len(), 1);
        let replies = &threads[0].replies;
        assert_eq!(replies[0].id, "early");
        assert_eq!(replies[1].id, "late");
        assert_eq!(replies[0].replies[0].id, "nested");
        assert!(replies[1].replies.is_empty());
    }

    #[test]
    fn test_like_count_follows_liked_by() {
        let mut row = record("t1", None, 0);
        row.liked_by = vec!["bob".to_string(), "carol".to_string()];
        let tweet = row.into_tweet(vec![]);
        assert_eq!(tweet.likes, 2);
    }

    #[test]
    fn test_user_never_serializes_password() {
        let body = r#"{"username":"alice","password":"secret","firstName":"Alice"}"#;
        let new_user: NewUser = serde_json::from_str(body).unwrap();
        let (profile, password) = new_user.into_parts();
        assert_eq!(password, "secret");

        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("\"firstName\":\"Alice\""));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_password_reset_accepts_both_field_names() {
        let a: PasswordReset =
            serde_json::from_str(r#"{"username":"u","newPassword":"p1"}"#).unwrap();
        let b: PasswordReset = serde_json::from_str(r#"{"username":"u","password":"p2"}"#).unwrap();
        assert_eq!(a.new_password, "p1");
        assert_eq!(b.new_password, "p2");
    }
}
