//! Cryptographic utilities for session tokens.
//!
//! This module seals and opens small payloads using AES-256-GCM authenticated
//! encryption. Sealed output is URL-safe base64 so it can travel in a header
//! or a cookie unchanged.

use aes_gcm::{
    aead::{generic_array::typenum::U12, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use log::debug;

/// The length of the nonce in bytes (96 bits for AES-GCM)
const NONCE_LENGTH: usize = 12;

/// The length of the key in bytes (256 bits)
pub const KEY_LENGTH: usize = 32;

/// A 256-bit key used to seal session tokens.
#[derive(Clone)]
pub struct SessionKey([u8; KEY_LENGTH]);

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

impl SessionKey {
    /// Parses a key from a 64-character hex string.
    ///
    /// # Returns
    ///
    /// - `Ok(SessionKey)`: The parsed key
    /// - `Err`: If the value is not valid hex or not exactly 32 bytes
    pub fn from_hex(key_hex: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let key_bytes = hex::decode(key_hex.trim()).map_err(|e| {
            format!(
                "SESSION_KEY is not valid hex: {}. Generate a key with: openssl rand -hex 32",
                e
            )
        })?;

        if key_bytes.len() != KEY_LENGTH {
            return Err(format!(
                "SESSION_KEY must be exactly 32 bytes (64 hex chars), got {} bytes",
                key_bytes.len()
            )
            .into());
        }

        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&key_bytes);
        Ok(SessionKey(key))
    }

    /// Generates a fresh random key from the operating system RNG.
    pub fn generate() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut key = [0u8; KEY_LENGTH];
        getrandom::getrandom(&mut key).map_err(|e| format!("Failed to generate key: {}", e))?;
        Ok(SessionKey(key))
    }

    /// Hex form of the key, as accepted by [`SessionKey::from_hex`].
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn cipher(&self) -> Result<Aes256Gcm, Box<dyn std::error::Error + Send + Sync>> {
        Aes256Gcm::new_from_slice(&self.0).map_err(|e| format!("Invalid key: {}", e).into())
    }

    /// Encrypts `plaintext` under this key.
    ///
    /// A random nonce is generated per call and prepended to the ciphertext.
    /// The output format before encoding is: nonce (12 bytes) || ciphertext || auth_tag
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| format!("Failed to generate random nonce: {}", e))?;
        let nonce: Nonce<U12> = nonce_bytes.into();

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| format!("Encryption failed: {}", e))?;

        let mut result = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        debug!("Payload sealed ({} bytes)", result.len());
        Ok(URL_SAFE_NO_PAD.encode(result))
    }

    /// Decrypts a value produced by [`SessionKey::seal`].
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<u8>)`: The original plaintext
    /// - `Err`: If decoding fails, the key is wrong, or the data was tampered with
    pub fn open(&self, sealed: &str) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let cipher = self.cipher()?;

        let sealed_bytes = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|e| format!("Invalid token encoding: {}", e))?;

        if sealed_bytes.len() < NONCE_LENGTH {
            return Err("Sealed token is too short".into());
        }

        let (nonce_bytes, ciphertext) = sealed_bytes.split_at(NONCE_LENGTH);
        let nonce_array: [u8; NONCE_LENGTH] =
            nonce_bytes.try_into().map_err(|_| "Invalid nonce length")?;
        let nonce: Nonce<U12> = nonce_array.into();

        let plaintext = cipher
            .decrypt(&nonce, ciphertext)
            .map_err(|_| "Decryption failed - wrong key or corrupted data")?;

        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_seal_open_roundtrip() {
        let key = SessionKey::from_hex(TEST_KEY).unwrap();

        let sealed = key.seal(b"alice").unwrap();
        assert_ne!(sealed, "alice");
        assert_eq!(key.open(&sealed).unwrap(), b"alice");
    }

    #[test]
    fn test_different_seals_produce_different_output() {
        let key = SessionKey::from_hex(TEST_KEY).unwrap();

        // Due to random nonce, same plaintext should produce different ciphertext
        let first = key.seal(b"payload").unwrap();
        let second = key.seal(b"payload").unwrap();
        assert_ne!(first, second);
        assert_eq!(key.open(&first).unwrap(), key.open(&second).unwrap());
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let key = SessionKey::from_hex(TEST_KEY).unwrap();
        let other = SessionKey::generate().unwrap();

        let sealed = key.seal(b"alice").unwrap();
        assert!(other.open(&sealed).is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let key = SessionKey::from_hex(TEST_KEY).unwrap();
        let mut sealed = key.seal(b"alice").unwrap();
        let last = sealed.pop().unwrap();
        sealed.push(if last == 'A' { 'B' } else { 'A' });
        assert!(key.open(&sealed).is_err());
        assert!(key.open("short").is_err());
    }

    #[test]
    fn test_from_hex_rejects_bad_keys() {
        assert!(SessionKey::from_hex("not-hex").is_err());
        assert!(SessionKey::from_hex("abcd").is_err());
        let key = SessionKey::from_hex(TEST_KEY).unwrap();
        assert_eq!(key.to_hex(), TEST_KEY);
    }
}
