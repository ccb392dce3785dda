//! Sessions and refresh tokens
//!
//! A session is created at login or registration and is the parent of at most
//! one usable refresh token at any instant.
//!
//! | Field        | Type             | Description                                    |
//! | ------------ | ---------------- | ---------------------------------------------- |
//! | `id`         | `SessionId`      | The unique identifier for the session.         |
//! | `account_id` | `AccountId`      | The account the session belongs to.            |
//! | `device`     | `String`         | Opaque description of the client device.       |
//! | `ip_address` | `Option<String>` | The IP address of the client, when known.      |
//! | `created_at` | `DateTime`       | The timestamp when the session was created.    |
//! | `expires_at` | `DateTime`       | The timestamp when the session will expire.    |
//!
//! Refresh tokens are opaque 256-bit secrets. The plaintext is returned to the
//! caller once inside a [`TokenPair`]; only its SHA-256 digest is stored in a
//! [`RefreshToken`] record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::AccountId,
    id::{generate_prefixed_id, validate_prefixed_id},
};

const SESSION_ID_PREFIX: &str = "sess";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: &str) -> Self {
        SessionId(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(SessionId(generate_prefixed_id(SESSION_ID_PREFIX)?))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, SESSION_ID_PREFIX)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The client a session or refresh token was issued to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub ip_address: Option<String>,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip_address: None,
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }
}

impl From<&str> for Device {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub account_id: AccountId,
    pub device: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is expired from its `expires_at` instant onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Persisted form of a refresh token. Holds the digest, never the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token_hash: String,
    pub account_id: AccountId,
    pub session_id: SessionId,
    pub device: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An access token and the refresh token that can renew it.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[redacted]")
            .field("access_token_expires_at", &self.access_token_expires_at)
            .field("refresh_token", &"[redacted]")
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .finish()
    }
}
