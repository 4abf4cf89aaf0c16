//! Persistence seams for users and tweets.
//!
//! The services only talk to these traits. [`MemoryStore`] backs tests and
//! database-less runs; [`PgStore`] persists to PostgreSQL.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{TweetRecord, User, UserRecord};

pub use memory::MemoryStore;
pub use postgres::{get_db_pool, PgStore};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Returns `false` if the username is already taken.
    async fn insert_user(&self, record: UserRecord) -> Result<bool, AppError>;

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AppError>;

    /// All users ordered by username.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Users whose username contains `fragment`, case-insensitively, ordered by username.
    async fn search_users(&self, fragment: &str) -> Result<Vec<User>, AppError>;

    /// Replaces the password hash. Returns `false` if the user does not exist.
    async fn update_password(&self, username: &str, password_hash: &str)
        -> Result<bool, AppError>;
}

#[async_trait]
pub trait TweetStore: Send + Sync {
    /// Stores a new row. Returns `false`, storing nothing, if `parent_id`
    /// names a tweet that does not exist.
    async fn insert_tweet(&self, record: TweetRecord) -> Result<bool, AppError>;

    async fn find_tweet(&self, id: &str) -> Result<Option<TweetRecord>, AppError>;

    /// Every stored row, replies included, in no particular order.
    async fn list_tweets(&self) -> Result<Vec<TweetRecord>, AppError>;

    /// Rewrites message and tag. Returns `false` if the tweet does not exist.
    async fn update_tweet(
        &self,
        id: &str,
        message: &str,
        tag: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Deletes a tweet and its reply subtree. Returns `false` if it did not exist.
    async fn delete_tweet(&self, id: &str) -> Result<bool, AppError>;

    /// Records a like by `username`. Liking twice is a no-op.
    /// Returns `false` if the tweet does not exist.
    async fn add_like(&self, id: &str, username: &str) -> Result<bool, AppError>;
}
