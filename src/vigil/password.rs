//! Password hashing.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::warn;

pub trait PasswordEncoder: Send + Sync {
    /// Hash a raw password into a self-describing encoded string.
    ///
    /// # Errors
    /// Returns an error if hashing fails.
    fn encode(&self, raw: &str) -> Result<String>;

    /// Check a raw password against a previously encoded one.
    fn matches(&self, raw: &str, encoded: &str) -> bool;
}

/// Argon2id with default parameters, stored as PHC strings.
#[derive(Clone, Debug, Default)]
pub struct Argon2PasswordEncoder;

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, raw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| anyhow!("failed to hash password: {e}"))?
            .to_string();
        Ok(hash)
    }

    fn matches(&self, raw: &str, encoded: &str) -> bool {
        let parsed = match PasswordHash::new(encoded) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Encoded password does not look like a PHC string: {e}");
                return false;
            }
        };
        Argon2::default()
            .verify_password(raw.as_bytes(), &parsed)
            .is_ok()
    }
}
