//! Issuing, looking up and consuming one-time codes
//!
//! The manager does not judge validity. Callers run
//! [`ensure_usable`](crate::code::ensure_usable) on a looked-up record before
//! consuming it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::AccountId,
    code::{EmailVerification, ResetCode},
    crypto::generate_code,
    error::CodeError,
    repositories::{Repositories, VerificationDeleter, VerificationProvider, VerificationSaver},
};

pub struct OneTimeCodeManager<Tx: Send + 'static> {
    saver: Arc<dyn VerificationSaver<Tx>>,
    provider: Arc<dyn VerificationProvider<Tx>>,
    deleter: Arc<dyn VerificationDeleter<Tx>>,
    code_length: usize,
}

impl<Tx: Send + 'static> OneTimeCodeManager<Tx> {
    pub fn new(repositories: &Repositories<Tx>, code_length: usize) -> Self {
        Self {
            saver: repositories.verification_saver.clone(),
            provider: repositories.verification_provider.clone(),
            deleter: repositories.verification_deleter.clone(),
            code_length,
        }
    }

    /// A fresh code of the configured length.
    pub fn generate_code(&self) -> Result<String, Error> {
        generate_code(self.code_length)
    }

    /// Persist a new verification code. Outstanding codes are left in place.
    pub async fn issue_email_verification(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EmailVerification, Error> {
        let verification =
            EmailVerification::new(account_id.clone(), code, Utc::now(), expires_at);
        self.saver
            .store_email_verification(tx, &verification)
            .await?;
        Ok(verification)
    }

    /// Persist a new reset code. Outstanding codes are left in place.
    pub async fn issue_reset_code(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ResetCode, Error> {
        let reset_code = ResetCode::new(account_id.clone(), code, Utc::now(), expires_at);
        self.saver.store_reset_code(tx, &reset_code).await?;
        Ok(reset_code)
    }

    pub async fn lookup_email_verification(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<EmailVerification, Error> {
        self.provider
            .email_verification(tx, account_id, code)
            .await?
            .ok_or(Error::Code(CodeError::NotFound))
    }

    pub async fn lookup_reset_code(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<ResetCode, Error> {
        self.provider
            .reset_code(tx, account_id, code)
            .await?
            .ok_or(Error::Code(CodeError::NotFound))
    }

    /// Delete every verification code of the account.
    ///
    /// Fails [`CodeError::AlreadyUsed`] when nothing was left to delete, which
    /// is how a concurrent consumer that committed first shows up.
    pub async fn consume_email_verification(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
    ) -> Result<(), Error> {
        let deleted = self.deleter.delete_email_verifications(tx, account_id).await?;
        if deleted == 0 {
            return Err(CodeError::AlreadyUsed.into());
        }
        tracing::debug!(account_id = %account_id, deleted, "Consumed email verification codes");
        Ok(())
    }

    /// Delete every reset code of the account. See
    /// [`consume_email_verification`](Self::consume_email_verification).
    pub async fn consume_reset_code(&self, tx: &mut Tx, account_id: &AccountId) -> Result<(), Error> {
        let deleted = self.deleter.delete_reset_codes(tx, account_id).await?;
        if deleted == 0 {
            return Err(CodeError::AlreadyUsed.into());
        }
        tracing::debug!(account_id = %account_id, deleted, "Consumed reset codes");
        Ok(())
    }
}
