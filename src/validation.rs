//! Input checks applied by the services before anything is stored.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::AppError;
use crate::models::{TweetInput, MAX_MESSAGE_LEN, MAX_TAG_LEN};

const MIN_PASSWORD_LEN: usize = 6;
// Usernames that would collide with fixed route segments
const RESERVED_USERNAMES: [&str; 7] = ["all", "users", "user", "register", "login", "logout", "reset"];
// bcrypt only looks at the first 72 bytes
const MAX_PASSWORD_BYTES: usize = 72;

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").expect("valid username regex"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        return Err(AppError::Validation(format!(
            "username {} is reserved",
            username
        )));
    }
    if username_pattern().is_match(username) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "username must be 3-32 characters of letters, digits, '_', '.' or '-'".into(),
        ))
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation(format!(
            "password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

/// An empty email is allowed; anything else must look like an address.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email.is_empty() || email_pattern().is_match(email) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid email address: {}", email)))
    }
}

/// Trims the message, drops an empty tag, and enforces length limits.
pub fn normalize_tweet(input: TweetInput) -> Result<TweetInput, AppError> {
    let message = input.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::Validation("tweet message cannot be empty".into()));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "tweet message exceeds {} characters",
            MAX_MESSAGE_LEN
        )));
    }

    let tag = input
        .tag
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if let Some(t) = &tag {
        if t.chars().count() > MAX_TAG_LEN {
            return Err(AppError::Validation(format!(
                "tweet tag exceeds {} characters",
                MAX_TAG_LEN
            )));
        }
    }

    Ok(TweetInput { message, tag })
}

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// Newlines and tabs become spaces and other control characters become `?`,
/// so user input cannot forge extra log lines.
pub fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    let total = sanitized.chars().count();
    if total > max_len {
        let head: String = sanitized.chars().take(max_len).collect();
        format!("{}... [truncated, {} total chars]", head, total)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b-c_d").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("ünï").is_err());
        assert!(validate_username("all").is_err());
        assert!(validate_username("Users").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(73)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("").is_ok());
        assert!(validate_email("a@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_normalize_tweet() {
        let ok = normalize_tweet(TweetInput {
            message: "  hello  ".into(),
            tag: Some("   ".into()),
        })
        .unwrap();
        assert_eq!(ok.message, "hello");
        assert_eq!(ok.tag, None);

        assert!(normalize_tweet(TweetInput {
            message: "   ".into(),
            tag: None,
        })
        .is_err());

        // Limit counts characters, not bytes
        assert!(normalize_tweet(TweetInput {
            message: "é".repeat(MAX_MESSAGE_LEN),
            tag: None,
        })
        .is_ok());
        assert!(normalize_tweet(TweetInput {
            message: "x".repeat(MAX_MESSAGE_LEN + 1),
            tag: None,
        })
        .is_err());
        assert!(normalize_tweet(TweetInput {
            message: "hi".into(),
            tag: Some("t".repeat(MAX_TAG_LEN + 1)),
        })
        .is_err());
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(sanitize_for_logging("a\nb\tc", 100), "a b c");
        assert_eq!(sanitize_for_logging("a\u{7}b", 100), "a?b");
        assert_eq!(
            sanitize_for_logging("ééééé", 2),
            "éé... [truncated, 5 total chars]"
        );
    }
}
