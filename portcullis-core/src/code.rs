//! One-time codes
//!
//! Email verification and password reset codes share one shape: a short code
//! bound to an account with an expiry and a `used` flag. Codes are single use;
//! consuming one deletes every outstanding code of the same kind for that
//! account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, account::AccountId, error::CodeError};

/// Common view over the one-time code records.
pub trait OneTimeCode {
    fn account_id(&self) -> &AccountId;
    fn code(&self) -> &str;
    fn expires_at(&self) -> DateTime<Utc>;
    fn is_used(&self) -> bool;
}

macro_rules! one_time_code_record {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            pub account_id: AccountId,
            pub code: String,
            pub created_at: DateTime<Utc>,
            pub expires_at: DateTime<Utc>,
            pub used: bool,
        }

        impl $name {
            pub fn new(
                account_id: AccountId,
                code: impl Into<String>,
                created_at: DateTime<Utc>,
                expires_at: DateTime<Utc>,
            ) -> Self {
                Self {
                    account_id,
                    code: code.into(),
                    created_at,
                    expires_at,
                    used: false,
                }
            }
        }

        impl OneTimeCode for $name {
            fn account_id(&self) -> &AccountId {
                &self.account_id
            }

            fn code(&self) -> &str {
                &self.code
            }

            fn expires_at(&self) -> DateTime<Utc> {
                self.expires_at
            }

            fn is_used(&self) -> bool {
                self.used
            }
        }
    };
}

one_time_code_record!(
    /// A code proving control of the account's email address.
    EmailVerification
);

one_time_code_record!(
    /// A code authorizing a password change.
    ResetCode
);

/// Check that a looked-up code may still be redeemed at `now`.
///
/// A used code fails before an expired one so a replay is reported as such
/// even after the code would have expired anyway.
pub fn ensure_usable<C: OneTimeCode>(record: &C, now: DateTime<Utc>) -> Result<(), Error> {
    if record.is_used() {
        return Err(CodeError::AlreadyUsed.into());
    }
    if now >= record.expires_at() {
        return Err(CodeError::Expired.into());
    }
    Ok(())
}
