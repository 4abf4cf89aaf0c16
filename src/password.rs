//! Password hashing with bcrypt.

use bcrypt::{hash, verify};

pub use bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// Highest work factor bcrypt accepts.
pub const MAX_COST: u32 = 31;

pub fn hash_password(password: &str, cost: u32) -> Result<String, String> {
    hash(password, cost).map_err(|e| format!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    verify(password, hash).map_err(|e| format!("Failed to verify password: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "test-password-123";
        let hash = hash_password(password, MIN_COST).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let first = hash_password("password1", MIN_COST).unwrap();
        let second = hash_password("password1", MIN_COST).unwrap();

        // Salted
        assert_ne!(first, second);
        assert!(verify_password("password1", &first).unwrap());
        assert!(verify_password("password1", &second).unwrap());
    }

    #[test]
    fn test_cost_bounds_match_bcrypt() {
        assert!(hash_password("password1", MIN_COST).is_ok());
        assert!(hash_password("password1", MIN_COST - 1).is_err());
        assert!(hash_password("password1", MAX_COST + 1).is_err());
        assert!((MIN_COST..=MAX_COST).contains(&DEFAULT_COST));
    }

    #[test]
    fn test_verify_against_garbage_hash_errors() {
        assert!(verify_password("password1", "not-a-bcrypt-hash").is_err());
    }
}
