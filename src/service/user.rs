use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use log::{debug, info, warn};

use super::{StatusMap, UserService};
use crate::error::AppError;
use crate::models::{Credentials, NewUser, PasswordReset, User, UserRecord};
use crate::password::{hash_password, verify_password};
use crate::store::UserStore;
use crate::validation::{
    sanitize_for_logging, validate_email, validate_password, validate_username,
};

/// User service backed by a [`UserStore`].
pub struct StoreUserService {
    store: Arc<dyn UserStore>,
    hash_cost: u32,
    /// Hash checked when the username is unknown, built on first use.
    miss_hash: OnceLock<Option<String>>,
}

impl StoreUserService {
    pub fn new(store: Arc<dyn UserStore>, hash_cost: u32) -> Self {
        StoreUserService {
            store,
            hash_cost,
            miss_hash: OnceLock::new(),
        }
    }

    fn hash(&self, password: &str) -> Result<String, AppError> {
        hash_password(password, self.hash_cost).map_err(AppError::Internal)
    }

    fn miss_hash(&self) -> Option<&str> {
        self.miss_hash
            .get_or_init(|| hash_password("unknown-user", self.hash_cost).ok())
            .as_deref()
    }
}

fn status_map(username: &str, status: &str) -> StatusMap {
    StatusMap::from([
        ("username".to_string(), username.to_string()),
        ("status".to_string(), status.to_string()),
    ])
}

#[async_trait]
impl UserService for StoreUserService {
    async fn register(&self, new_user: NewUser) -> Result<User, AppError> {
        validate_username(&new_user.username)?;
        validate_password(&new_user.password)?;
        validate_email(&new_user.email)?;

        let (profile, password) = new_user.into_parts();
        let record = UserRecord {
            password_hash: self.hash(&password)?,
            profile,
        };
        let user = record.profile.clone();

        if !self.store.insert_user(record).await? {
            info!("Registration rejected, username {} is taken", user.username);
            return Err(AppError::UserAlreadyExists);
        }

        info!("User {} registered", user.username);
        Ok(user)
    }

    async fn login(&self, credentials: Credentials) -> Result<User, AppError> {
        let record = match self.store.find_user(&credentials.username).await? {
            Some(record) => record,
            None => {
                // Same bcrypt work on a miss as on a wrong password
                if let Some(hash) = self.miss_hash() {
                    let _ = verify_password(&credentials.password, hash);
                }
                debug!(
                    "Login for unknown user {}",
                    sanitize_for_logging(&credentials.username, 40)
                );
                return Err(AppError::InvalidCredentials);
            }
        };

        let matches = verify_password(&credentials.password, &record.password_hash)
            .map_err(AppError::Internal)?;
        if !matches {
            warn!("Failed login for {}", record.profile.username);
            return Err(AppError::InvalidCredentials);
        }

        info!("User {} logged in", record.profile.username);
        Ok(record.profile)
    }

    async fn forgot_password(&self, username: &str) -> Result<StatusMap, AppError> {
        if self.store.find_user(username).await?.is_none() {
            return Err(AppError::UserNotFound(username.to_string()));
        }
        info!("Password reset allowed for {}", username);
        Ok(status_map(username, "reset-allowed"))
    }

    async fn reset_password(&self, reset: PasswordReset) -> Result<StatusMap, AppError> {
        validate_password(&reset.new_password)?;
        let password_hash = self.hash(&reset.new_password)?;

        if !self
            .store
            .update_password(&reset.username, &password_hash)
            .await?
        {
            return Err(AppError::UserNotFound(reset.username));
        }

        info!("Password updated for {}", reset.username);
        Ok(status_map(&reset.username, "password-updated"))
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.store.list_users().await
    }

    async fn search_users(&self, username: &str) -> Result<Vec<User>, AppError> {
        let found = self.store.search_users(username).await?;
        if found.is_empty() {
            return Err(AppError::UserNotFound(username.to_string()));
        }
        debug!(
            "Search for {} matched {} users",
            sanitize_for_logging(username, 40),
            found.len()
        );
        Ok(found)
    }
}
