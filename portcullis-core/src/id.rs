//! Prefixed identifiers
//!
//! Identifiers look like `acct_Vx3q2-7wKd...`: a short type prefix, an underscore
//! and 96 bits of URL-safe base64 randomness. The prefix makes a leaked id
//! self-describing in logs; the value is otherwise opaque.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};

use crate::{Error, crypto::fill_random};

/// Minimum random bytes behind an identifier (96 bits).
const ID_BYTES: usize = 12;

/// Generate a prefixed ID with 96 bits of entropy.
pub fn generate_prefixed_id(prefix: &str) -> Result<String, Error> {
    let mut bytes = [0u8; ID_BYTES];
    fill_random(&mut bytes)?;
    Ok(format!("{prefix}_{}", BASE64_URL_SAFE_NO_PAD.encode(bytes)))
}

/// Validate that a prefixed ID has the expected prefix and enough entropy.
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= ID_BYTES,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id("acct").unwrap();
        assert!(id.starts_with("acct_"));
        assert_ne!(id, generate_prefixed_id("acct").unwrap());
    }

    #[test]
    fn test_validate_prefixed_id() {
        let id = generate_prefixed_id("acct").unwrap();
        assert!(validate_prefixed_id(&id, "acct"));
        assert!(!validate_prefixed_id(&id, "sess"));

        assert!(!validate_prefixed_id("acct", "acct"));
        assert!(!validate_prefixed_id("acct_", "acct"));
        assert!(!validate_prefixed_id("acct_invalid!", "acct"));
        assert!(!validate_prefixed_id("acct_dGVzdA", "acct"));
    }

    #[test]
    fn test_id_is_url_safe() {
        let id = generate_prefixed_id("sess").unwrap();
        assert!(
            id.chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        );
    }
}
