//! # Portcullis
//!
//! Portcullis manages the lifecycle of accounts and their sessions: registration,
//! login, email verification, password reset and refresh-token rotation. Every
//! use case runs in a single storage transaction, so it either commits all of
//! its writes or none of them.
//!
//! ## Storage Support
//!
//! - SQLite (`sqlite` feature, enabled by default)
//!
//! Other backends implement [`RepositoryProvider`] and plug in through
//! [`PortcullisBuilder::with_repositories`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use portcullis::{Device, PortcullisBuilder, RegisterRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let portcullis = PortcullisBuilder::new()
//!         .with_sqlite("sqlite::memory:")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let device = Device::new("laptop");
//!     let registration = portcullis
//!         .register(RegisterRequest::new("a@example.com", "hunter2", "alice"), &device)
//!         .await?;
//!     portcullis
//!         .verify_email(&registration.account.id, &registration.verification_code)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

mod builder;
pub mod notifier;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use portcullis_core::services::AccountService;

pub use builder::{NoStorage, PortcullisBuilder, PortcullisBuilderError, WithStorage};
pub use notifier::{CodeNotifier, NotifierError, TracingNotifier};

/// Re-export core types from portcullis_core
pub use portcullis_core::{
    AccessClaims, Account, AccountId, AccountStatus, Argon2CredentialStore, AuthConfig,
    CleanupReport, CredentialStore, Device, EmailVerification, Error, ErrorKind, JwtConfig,
    JwtSigner, LoginOutcome, RegisterRequest, Registration, Repositories, RepositoryProvider,
    ResetCode, Session, SessionId, TokenPair, TokenSigner, TransactionProvider,
};

#[cfg(feature = "sqlite")]
pub use portcullis_storage_sqlite::{SqliteRepositoryProvider, SqliteTx};

/// Entry point for applications
///
/// Wraps the use cases of [`AccountService`] and delivers issued codes through
/// the configured [`CodeNotifier`] once their transaction has committed.
pub struct Portcullis<R: RepositoryProvider> {
    provider: Arc<R>,
    service: AccountService<R>,
    notifier: Option<Arc<dyn CodeNotifier>>,
}

impl<R: RepositoryProvider> Portcullis<R> {
    /// Use [`PortcullisBuilder`] unless you need to assemble the service yourself.
    pub fn new(
        provider: Arc<R>,
        service: AccountService<R>,
        notifier: Option<Arc<dyn CodeNotifier>>,
    ) -> Self {
        Self {
            provider,
            service,
            notifier,
        }
    }

    pub fn service(&self) -> &AccountService<R> {
        &self.service
    }

    pub fn config(&self) -> &AuthConfig {
        self.service.config()
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        self.provider.migrate().await
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        self.provider.health_check().await
    }

    /// Register an account. The verification code is handed to the notifier
    /// after the registration commits.
    pub async fn register(
        &self,
        request: RegisterRequest,
        device: &Device,
    ) -> Result<Registration, Error> {
        let registration = self.service.register(request, device).await?;

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier
                .send_verification_code(
                    &registration.account,
                    &registration.verification_code,
                    registration.code_expires_at,
                )
                .await
            {
                tracing::warn!(account_id = %registration.account.id, error = %e, "Failed to deliver verification code");
            }
        }

        Ok(registration)
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: &Device,
    ) -> Result<LoginOutcome, Error> {
        self.service.login(email, password, device).await
    }

    pub async fn verify_email(&self, account_id: &AccountId, code: &str) -> Result<(), Error> {
        self.service.verify_email(account_id, code).await
    }

    /// Issue a new verification code and hand it to the notifier.
    pub async fn send_verification_email(
        &self,
        account_id: &AccountId,
    ) -> Result<EmailVerification, Error> {
        let verification = self.service.send_verification_email(account_id).await?;

        if let Some(notifier) = &self.notifier {
            match self.service.get_account(account_id).await {
                Ok(account) => {
                    if let Err(e) = notifier
                        .send_verification_code(
                            &account,
                            &verification.code,
                            verification.expires_at,
                        )
                        .await
                    {
                        tracing::warn!(account_id = %account_id, error = %e, "Failed to deliver verification code");
                    }
                }
                Err(e) => {
                    tracing::warn!(account_id = %account_id, error = %e, "Account vanished before code delivery");
                }
            }
        }

        Ok(verification)
    }

    pub async fn get_verification_code(
        &self,
        account_id: &AccountId,
        code: &str,
    ) -> Result<EmailVerification, Error> {
        self.service.get_verification_code(account_id, code).await
    }

    pub async fn get_reset_password_code(
        &self,
        account_id: &AccountId,
        code: &str,
    ) -> Result<ResetCode, Error> {
        self.service.get_reset_password_code(account_id, code).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Account, Error> {
        self.service.get_account_by_email(email).await
    }

    pub async fn get_account(&self, account_id: &AccountId) -> Result<Account, Error> {
        self.service.get_account(account_id).await
    }

    /// Store a caller-generated reset code, then hand it to the notifier.
    pub async fn request_password_reset(
        &self,
        account_id: &AccountId,
        code: &str,
        expires_at: DateTime<Utc>,
        device: &Device,
    ) -> Result<(), Error> {
        self.service
            .request_password_reset(account_id, code, expires_at, device)
            .await?;

        if let Some(notifier) = &self.notifier {
            match self.service.get_account(account_id).await {
                Ok(account) => {
                    if let Err(e) = notifier
                        .send_password_reset_code(&account, code, expires_at)
                        .await
                    {
                        tracing::warn!(account_id = %account_id, error = %e, "Failed to deliver reset code");
                    }
                }
                Err(e) => {
                    tracing::warn!(account_id = %account_id, error = %e, "Account vanished before code delivery");
                }
            }
        }

        Ok(())
    }

    /// Store `updated_account`'s password hash, redeeming a reset code.
    pub async fn reset_password(
        &self,
        updated_account: &Account,
        code: &str,
        device: &Device,
    ) -> Result<(), Error> {
        self.service
            .reset_password(updated_account, code, device)
            .await
    }

    /// Hash `new_password` and redeem `code` for it in one call.
    pub async fn complete_password_reset(
        &self,
        account_id: &AccountId,
        code: &str,
        new_password: &str,
        device: &Device,
    ) -> Result<(), Error> {
        let mut account = self.service.get_account(account_id).await?;
        account.password_hash = self.service.hash_password(new_password)?;
        self.service.reset_password(&account, code, device).await
    }

    pub async fn refresh_token(&self, token: &str, device: &Device) -> Result<TokenPair, Error> {
        self.service.refresh_token(token, device).await
    }

    pub async fn logout(&self, session_id: &SessionId) -> Result<(), Error> {
        self.service.logout(session_id).await
    }

    pub async fn authenticate(&self, access_token: &str) -> Result<Session, Error> {
        self.service.authenticate(access_token).await
    }

    pub async fn set_account_status(
        &self,
        account_id: &AccountId,
        status: AccountStatus,
    ) -> Result<(), Error> {
        self.service.set_account_status(account_id, status).await
    }

    pub fn hash_password(&self, password: &str) -> Result<String, Error> {
        self.service.hash_password(password)
    }

    pub async fn cleanup_expired(&self) -> Result<CleanupReport, Error> {
        self.service.cleanup_expired().await
    }
}
