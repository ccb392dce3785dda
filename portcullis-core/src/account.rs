//! Accounts
//!
//! The account is the root entity: sessions, refresh tokens and one-time
//! codes all hang off an [`AccountId`].
//!
//! | Field                | Type                  | Description                                  |
//! | -------------------- | --------------------- | -------------------------------------------- |
//! | `id`                 | `AccountId`           | Opaque unique identifier.                    |
//! | `email`              | `String`              | Unique login email.                          |
//! | `username`           | `String`              | Display name.                                |
//! | `bio`                | `Option<String>`      | Free-form profile text.                      |
//! | `password_hash`      | `String`              | Output of the credential store.              |
//! | `is_verified`        | `bool`                | Whether the email has been verified.         |
//! | `status`             | `AccountStatus`       | Active, suspended or deleted.                |
//! | `two_factor_enabled` | `bool`                | Recorded only; no second factor is enforced. |
//! | `created_at`         | `DateTime`            | Creation timestamp.                          |
//! | `updated_at`         | `DateTime`            | Last mutation timestamp.                     |
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::ValidationError,
    id::{generate_prefixed_id, validate_prefixed_id},
};

const ACCOUNT_ID_PREFIX: &str = "acct";

/// A unique, stable identifier for an account.
///
/// Treat the value as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Self {
        AccountId(id.to_string())
    }

    pub fn new_random() -> Result<Self, Error> {
        Ok(AccountId(generate_prefixed_id(ACCOUNT_ID_PREFIX)?))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, ACCOUNT_ID_PREFIX)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Deleted,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Deleted => "deleted",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "suspended" => Ok(AccountStatus::Suspended),
            "deleted" => Ok(AccountStatus::Deleted),
            other => Err(ValidationError::InvalidField(format!(
                "Unknown account status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub username: String,
    pub bio: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub status: AccountStatus,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn builder() -> AccountBuilder {
        AccountBuilder::default()
    }
}

#[derive(Default)]
pub struct AccountBuilder {
    id: Option<AccountId>,
    email: Option<String>,
    username: Option<String>,
    bio: Option<String>,
    password_hash: Option<String>,
    is_verified: bool,
    status: AccountStatus,
    two_factor_enabled: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl AccountBuilder {
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn bio(mut self, bio: Option<String>) -> Self {
        self.bio = bio;
        self
    }

    pub fn password_hash(mut self, password_hash: impl Into<String>) -> Self {
        self.password_hash = Some(password_hash.into());
        self
    }

    pub fn is_verified(mut self, is_verified: bool) -> Self {
        self.is_verified = is_verified;
        self
    }

    pub fn status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn two_factor_enabled(mut self, two_factor_enabled: bool) -> Self {
        self.two_factor_enabled = two_factor_enabled;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn build(self) -> Result<Account, Error> {
        let now = Utc::now();
        let id = match self.id {
            Some(id) => id,
            None => AccountId::new_random()?,
        };
        Ok(Account {
            id,
            email: self
                .email
                .ok_or(ValidationError::MissingField("Email is required".to_string()))?,
            username: self.username.ok_or(ValidationError::MissingField(
                "Username is required".to_string(),
            ))?,
            bio: self.bio,
            password_hash: self.password_hash.ok_or(ValidationError::MissingField(
                "Password hash is required".to_string(),
            ))?,
            is_verified: self.is_verified,
            status: self.status,
            two_factor_enabled: self.two_factor_enabled,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}
