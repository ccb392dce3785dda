use async_trait::async_trait;

use crate::{
    Error,
    account::AccountId,
    code::{EmailVerification, ResetCode},
};

#[async_trait]
pub trait VerificationSaver<Tx: Send>: Send + Sync + 'static {
    async fn store_email_verification(
        &self,
        tx: &mut Tx,
        verification: &EmailVerification,
    ) -> Result<(), Error>;

    async fn store_reset_code(&self, tx: &mut Tx, reset_code: &ResetCode) -> Result<(), Error>;
}

/// Exact-match lookups on (account, code)
#[async_trait]
pub trait VerificationProvider<Tx: Send>: Send + Sync + 'static {
    async fn email_verification(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<Option<EmailVerification>, Error>;

    async fn reset_code(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<Option<ResetCode>, Error>;
}

/// Deletes every code of one kind for an account
///
/// The returned count is the number of rows removed. Zero means another
/// transaction already consumed them.
#[async_trait]
pub trait VerificationDeleter<Tx: Send>: Send + Sync + 'static {
    async fn delete_email_verifications(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
    ) -> Result<u64, Error>;

    async fn delete_reset_codes(&self, tx: &mut Tx, account_id: &AccountId) -> Result<u64, Error>;
}
