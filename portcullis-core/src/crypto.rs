//! Randomness and token hashing primitives
//!
//! Refresh tokens are bearer secrets, so only their SHA-256 digest is ever
//! persisted, and lookups match on the digest, so the plaintext token never
//! reaches storage.
//!
//! One-time codes are meant to be typed by a person, so they are short and
//! drawn from the Crockford base32 alphabet instead of raw base64.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::{Error, error::CryptoError};

/// Crockford base32: no I, L, O or U, so codes survive being read aloud.
const CODE_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Fill `bytes` from the operating system CSPRNG.
pub fn fill_random(bytes: &mut [u8]) -> Result<(), Error> {
    OsRng
        .try_fill_bytes(bytes)
        .map_err(|e| CryptoError::Randomness(e.to_string()).into())
}

/// Generate a 256-bit random token encoded as URL-safe base64 (43 characters).
pub fn generate_secure_token() -> Result<String, Error> {
    let mut bytes = [0u8; 32];
    fill_random(&mut bytes)?;
    Ok(BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

/// Generate a one-time code of `length` symbols.
///
/// Each symbol carries 5 bits of entropy; the alphabet has exactly 32
/// entries so masking a random byte samples it uniformly.
pub fn generate_code(length: usize) -> Result<String, Error> {
    let mut bytes = vec![0u8; length];
    fill_random(&mut bytes)?;
    Ok(bytes
        .into_iter()
        .map(|b| CODE_ALPHABET[(b & 0x1f) as usize] as char)
        .collect())
}

/// Hash a token for storage using SHA256, hex encoded.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
