//! Credential hashing
//!
//! One-way salted Argon2 hashes. Plaintext never leaves these functions.

use std::sync::OnceLock;

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};

/// Hash a plaintext credential into its PHC string form
pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(hash)
}

/// Verify a plaintext credential against a stored hash
///
/// A mismatch is `Ok(false)`; only an unparseable stored hash is an error.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Spend the cost of one verification for a user that does not exist
///
/// Always false. Keeps unknown usernames as slow as wrong passwords.
pub fn verify_unknown_user(plaintext: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    if let Some(hash) = DUMMY_HASH.get_or_init(|| hash_password("unknown-user-placeholder").ok()) {
        let _ = verify_password(plaintext, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies_original_only() {
        let hash = hash_password("S3cret!pass").unwrap();
        assert_ne!(hash, "S3cret!pass");
        assert!(verify_password("S3cret!pass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("same").unwrap();
        let second = hash_password("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_unknown_user_never_verifies() {
        assert!(!verify_unknown_user("unknown-user-placeholder"));
        assert!(!verify_unknown_user("anything"));
    }

    #[test]
    fn test_malformed_stored_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
