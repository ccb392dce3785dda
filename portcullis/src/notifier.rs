//! Delivery of one-time codes
//!
//! Portcullis never sends mail itself. After a use case that issues a code
//! commits, the facade hands the code to a [`CodeNotifier`]. Delivery failures
//! are logged and never undo the committed use case.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portcullis_core::Account;

/// Errors a notifier may report
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Receives codes that must reach the account holder
#[async_trait]
pub trait CodeNotifier: Send + Sync + 'static {
    async fn send_verification_code(
        &self,
        account: &Account,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifierError>;

    async fn send_password_reset_code(
        &self,
        account: &Account,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifierError>;
}

/// Notifier that only records that a code was issued.
///
/// The code itself is never logged. Useful in development and as a default
/// while a real transport is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl CodeNotifier for TracingNotifier {
    async fn send_verification_code(
        &self,
        account: &Account,
        _code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifierError> {
        tracing::info!(
            account_id = %account.id,
            email = %account.email,
            %expires_at,
            "Verification code ready for delivery"
        );
        Ok(())
    }

    async fn send_password_reset_code(
        &self,
        account: &Account,
        _code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifierError> {
        tracing::info!(
            account_id = %account.id,
            email = %account.email,
            %expires_at,
            "Password reset code ready for delivery"
        );
        Ok(())
    }
}
