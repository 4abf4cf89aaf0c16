//! Configuration module for the tweet service.
//!
//! All settings come from environment variables, read once at startup.

use log::{debug, info, warn};
use std::env;
use std::ops::RangeInclusive;

use crate::crypto::SessionKey;
use crate::password::{DEFAULT_COST, MAX_COST, MIN_COST};
use crate::session::{MAX_TTL_HOURS, MIN_TTL_HOURS};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SESSION_TTL_HOURS: u64 = 24;
const DEFAULT_EVENT_BUFFER: usize = 256;

/// Runtime configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP server binds to
    pub port: u16,
    /// PostgreSQL connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Key sealing session tokens
    pub session_key: SessionKey,
    /// Session token lifetime in hours
    pub session_ttl_hours: u64,
    /// Capacity of the tweet event channel
    pub event_buffer: usize,
    /// bcrypt work factor for password hashes
    pub bcrypt_cost: u32,
    /// Whether the session cookie is marked `Secure`
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Creates a new `AppConfig` from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PORT`: Server port (defaults to 3000)
    /// - `DATABASE_URL`: PostgreSQL connection string (optional)
    /// - `SESSION_KEY`: 64 hex chars; a random key is generated when unset,
    ///   which invalidates all sessions on restart
    /// - `SESSION_TTL_HOURS`: Session lifetime, 1 to 8760 (defaults to 24)
    /// - `EVENT_BUFFER`: Tweet event channel capacity (defaults to 256)
    /// - `BCRYPT_COST`: Password hash work factor, 4 to 31 (defaults to bcrypt's default)
    /// - `SESSION_COOKIE_SECURE`: `false` drops the cookie's `Secure` flag for
    ///   plain-HTTP local runs (defaults to `true`)
    ///
    /// # Returns
    ///
    /// - `Ok(AppConfig)`: If every variable that is set is valid
    /// - `Err(...)`: If `SESSION_KEY` is set but malformed
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        info!("Loading configuration from environment variables");

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => {
                info!("Found DATABASE_URL, using PostgreSQL store");
                Some(url)
            }
            _ => {
                info!("No DATABASE_URL set, using in-memory store");
                None
            }
        };

        let session_key = match env::var("SESSION_KEY") {
            Ok(key_hex) => {
                debug!("Found SESSION_KEY with length: {}", key_hex.len());
                SessionKey::from_hex(&key_hex)?
            }
            Err(_) => {
                warn!("SESSION_KEY is not set - generating a random key, sessions will not survive a restart");
                SessionKey::generate()?
            }
        };

        let config = AppConfig {
            port: get_server_port(),
            database_url,
            session_key,
            session_ttl_hours: parse_in_range(
                "SESSION_TTL_HOURS",
                DEFAULT_SESSION_TTL_HOURS,
                MIN_TTL_HOURS..=MAX_TTL_HOURS,
            ),
            event_buffer: parse_or("EVENT_BUFFER", DEFAULT_EVENT_BUFFER),
            bcrypt_cost: parse_in_range("BCRYPT_COST", DEFAULT_COST, MIN_COST..=MAX_COST),
            cookie_secure: parse_or("SESSION_COOKIE_SECURE", true),
        };

        info!(
            "Configuration loaded: port {}, session ttl {}h",
            config.port, config.session_ttl_hours
        );
        Ok(config)
    }
}

/// Reads `name` and parses it, falling back to `default` when unset or invalid.
fn parse_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("{} has invalid value '{}', using {}", name, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

/// Like [`parse_or`], but values outside `range` also fall back to `default`.
fn parse_in_range<T>(name: &str, default: T, range: RangeInclusive<T>) -> T
where
    T: std::str::FromStr + std::fmt::Display + PartialOrd + Copy,
{
    within(name, parse_or(name, default), default, range)
}

fn within<T>(name: &str, value: T, default: T, range: RangeInclusive<T>) -> T
where
    T: std::fmt::Display + PartialOrd,
{
    if range.contains(&value) {
        value
    } else {
        warn!(
            "{} value {} is outside {}..={}, using {}",
            name,
            value,
            range.start(),
            range.end(),
            default
        );
        default
    }
}

/// Gets the server port from the `PORT` environment variable.
///
/// Falls back to 3000 when the variable is unset or not a valid port number.
///
/// # Example
///
/// ```rust
/// use tweetapp::get_server_port;
///
/// std::env::remove_var("PORT");
/// assert_eq!(get_server_port(), 3000);
/// ```
pub fn get_server_port() -> u16 {
    parse_or("PORT", DEFAULT_PORT)
}
