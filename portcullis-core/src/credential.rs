//! Password hashing
//!
//! [`CredentialStore`] is the seam between the account use cases and the
//! password-hash primitive. It owns no storage and no transaction logic.

use crate::Error;

pub trait CredentialStore: Send + Sync + 'static {
    /// Hash a password for storage.
    ///
    /// Fails only when the underlying primitive fails, never because of the
    /// shape of `password`.
    fn hash(&self, password: &str) -> Result<String, Error>;

    /// Check `candidate` against a stored hash.
    ///
    /// A malformed `stored_hash` is treated as a mismatch.
    fn verify(&self, stored_hash: &str, candidate: &str) -> bool;
}

/// Argon2id hashing in the PHC string format, via `password-auth`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2CredentialStore;

impl Argon2CredentialStore {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialStore for Argon2CredentialStore {
    fn hash(&self, password: &str) -> Result<String, Error> {
        Ok(password_auth::generate_hash(password))
    }

    fn verify(&self, stored_hash: &str, candidate: &str) -> bool {
        password_auth::verify_password(candidate, stored_hash).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let store = Argon2CredentialStore::new();
        let hash = store.hash("pw1").unwrap();

        assert_ne!(hash, "pw1");
        assert!(hash.starts_with("$argon2"));
        assert!(store.verify(&hash, "pw1"));
        assert!(!store.verify(&hash, "pw2"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let store = Argon2CredentialStore::new();
        let first = store.hash("same password").unwrap();
        let second = store.hash("same password").unwrap();

        assert_ne!(first, second);
        assert!(store.verify(&first, "same password"));
        assert!(store.verify(&second, "same password"));
    }

    #[test]
    fn test_malformed_hash_is_a_mismatch() {
        let store = Argon2CredentialStore::new();
        assert!(!store.verify("not-a-phc-string", "pw1"));
        assert!(!store.verify("", "pw1"));
    }

    #[test]
    fn test_empty_password_still_hashes() {
        let store = Argon2CredentialStore::new();
        let hash = store.hash("").unwrap();
        assert!(store.verify(&hash, ""));
    }
}
