//! Collaborators the HTTP handlers depend on.
//!
//! Handlers hold these as `Arc<dyn UserService>` / `Arc<dyn TweetService>`,
//! so tests can swap in doubles. The store-backed implementations live in the
//! submodules.

mod tweet;
mod user;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Credentials, NewUser, PasswordReset, Tweet, TweetInput, User};

pub use tweet::StoreTweetService;
pub use user::StoreUserService;

/// Free-form status map returned by the password endpoints.
pub type StatusMap = HashMap<String, String>;

#[async_trait]
pub trait UserService: Send + Sync {
    /// Registers a new user. Fails with `UserAlreadyExists` if the name is taken.
    async fn register(&self, new_user: NewUser) -> Result<User, AppError>;

    /// Checks credentials. Fails with `InvalidCredentials` on any mismatch.
    async fn login(&self, credentials: Credentials) -> Result<User, AppError>;

    async fn forgot_password(&self, username: &str) -> Result<StatusMap, AppError>;

    async fn reset_password(&self, reset: PasswordReset) -> Result<StatusMap, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    /// Users whose name contains `username`. Fails with `UserNotFound` if none match.
    async fn search_users(&self, username: &str) -> Result<Vec<User>, AppError>;
}

#[async_trait]
pub trait TweetService: Send + Sync {
    /// Top-level tweets, newest first, with nested replies.
    async fn all_tweets(&self) -> Result<Vec<Tweet>, AppError>;

    /// Top-level tweets authored by `username`, newest first.
    async fn tweets_by_user(&self, username: &str) -> Result<Vec<Tweet>, AppError>;

    async fn post_tweet(&self, username: &str, input: TweetInput) -> Result<Tweet, AppError>;

    /// Rewrites a tweet. Only its author may do so.
    async fn update_tweet(
        &self,
        username: &str,
        tweet_id: &str,
        input: TweetInput,
    ) -> Result<Tweet, AppError>;

    /// Deletes a tweet and its replies. Only its author may do so.
    async fn delete_tweet(&self, username: &str, tweet_id: &str) -> Result<(), AppError>;

    async fn like_tweet(&self, username: &str, tweet_id: &str) -> Result<(), AppError>;

    /// Posts a reply under `tweet_id` and returns the reply.
    async fn reply_tweet(
        &self,
        username: &str,
        tweet_id: &str,
        input: TweetInput,
    ) -> Result<Tweet, AppError>;
}
