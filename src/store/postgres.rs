//! PostgreSQL-backed store.
//!
//! Users, tweets and likes live in three tables. Replies are tweets with a
//! `parent_id`; the foreign key cascades so deleting a tweet removes its
//! reply subtree and likes in one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::{postgres::PgRow, PgPool, Row};

use super::{TweetStore, UserStore};
use crate::error::AppError;
use crate::models::{TweetRecord, User, UserRecord};

/// Establishes a connection pool to the PostgreSQL database at `database_url`.
///
/// # Returns
///
/// - `Ok(PgPool)`: A connection pool to the database
/// - `Err(sqlx::Error)`: If the connection fails
pub async fn get_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    info!("Connecting to PostgreSQL database");
    debug!(
        "Database URL (masked): {}...",
        database_url.chars().take(20).collect::<String>()
    );

    let pool = PgPool::connect(database_url).await?;
    info!("Successfully connected to PostgreSQL database");

    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

const TWEET_COLUMNS: &str = r#"
    t.id, t.username, t.message, t.tag, t.parent_id, t.created_at, t.updated_at,
    COALESCE(
        array_agg(l.username ORDER BY l.liked_at) FILTER (WHERE l.username IS NOT NULL),
        '{}'
    ) AS liked_by
"#;

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Creates the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        info!("Ensuring database schema exists");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                contact_number TEXT,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tweets (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL REFERENCES users (username),
                message TEXT NOT NULL,
                tag TEXT,
                parent_id TEXT REFERENCES tweets (id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tweet_likes (
                tweet_id TEXT NOT NULL REFERENCES tweets (id) ON DELETE CASCADE,
                username TEXT NOT NULL,
                liked_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (tweet_id, username)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database schema ready");
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        contact_number: row.get("contact_number"),
    }
}

fn tweet_from_row(row: &PgRow) -> TweetRecord {
    TweetRecord {
        id: row.get("id"),
        username: row.get("username"),
        message: row.get("message"),
        tag: row.get("tag"),
        liked_by: row.get("liked_by"),
        parent_id: row.get("parent_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(fragment: &str) -> String {
    fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, record: UserRecord) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, first_name, last_name, email, contact_number, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(&record.profile.username)
        .bind(&record.profile.first_name)
        .bind(&record.profile.last_name)
        .bind(&record.profile.email)
        .bind(&record.profile.contact_number)
        .bind(&record.password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT username, first_name, last_name, email, contact_number, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserRecord {
            profile: user_from_row(&row),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT username, first_name, last_name, email, contact_number
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn search_users(&self, fragment: &str) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT username, first_name, last_name, email, contact_number
            FROM users
            WHERE username ILIKE '%' || $1 || '%' ESCAPE '\'
            ORDER BY username
            "#,
        )
        .bind(escape_like(fragment))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE username = $1")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl TweetStore for PgStore {
    async fn insert_tweet(&self, record: TweetRecord) -> Result<bool, AppError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO tweets (id, username, message, tag, parent_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.username)
        .bind(&record.message)
        .bind(&record.tag)
        .bind(&record.parent_id)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {
                debug!("Inserted tweet {}", record.id);
                Ok(true)
            }
            // Parent deleted before the reply landed
            Err(sqlx::Error::Database(e))
                if e.is_foreign_key_violation() && record.parent_id.is_some() =>
            {
                debug!("Parent of tweet {} no longer exists", record.id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_tweet(&self, id: &str) -> Result<Option<TweetRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM tweets t LEFT JOIN tweet_likes l ON l.tweet_id = t.id \
             WHERE t.id = $1 GROUP BY t.id",
            TWEET_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(tweet_from_row))
    }

    async fn list_tweets(&self) -> Result<Vec<TweetRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM tweets t LEFT JOIN tweet_likes l ON l.tweet_id = t.id GROUP BY t.id",
            TWEET_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(tweet_from_row).collect())
    }

    async fn update_tweet(
        &self,
        id: &str,
        message: &str,
        tag: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE tweets SET message = $2, tag = $3, updated_at = $4 WHERE id = $1")
                .bind(id)
                .bind(message)
                .bind(tag)
                .bind(updated_at)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_tweet(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tweets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn add_like(&self, id: &str, username: &str) -> Result<bool, AppError> {
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM tweets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO tweet_likes (tweet_id, username)
            VALUES ($1, $2)
            ON CONFLICT (tweet_id, username) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a_b%c"), "a\\_b\\%c");
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
