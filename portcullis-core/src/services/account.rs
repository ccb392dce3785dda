//! Account lifecycle use cases
//!
//! Each public method of [`AccountService`] is one use case. It opens a unit of
//! work, runs every step against it, and commits only if all steps succeed.
//! Nothing a failed use case wrote survives it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    Error,
    account::{Account, AccountId, AccountStatus},
    code::{EmailVerification, ResetCode, ensure_usable},
    config::AuthConfig,
    credential::CredentialStore,
    error::{AuthError, StorageError},
    repositories::{CleanupReport, Repositories, RepositoryProvider, TransactionProvider},
    services::{
        one_time_code::OneTimeCodeManager, session::SessionManager,
        transaction::TransactionCoordinator,
    },
    session::{Device, Session, SessionId, TokenPair},
    signer::TokenSigner,
    validation::{validate_bio, validate_code, validate_email, validate_password, validate_username},
};

/// Input to [`AccountService::register`]
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub bio: Option<String>,
}

impl RegisterRequest {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            username: username.into(),
            bio: None,
        }
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }
}

/// Result of a successful registration
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub tokens: TokenPair,
    pub account: Account,
    pub session: Session,
    /// Code to deliver to the account's email address
    #[serde(skip_serializing)]
    pub verification_code: String,
    pub code_expires_at: DateTime<Utc>,
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub account: Account,
    pub session: Session,
}

pub struct AccountService<P: TransactionProvider> {
    coordinator: TransactionCoordinator<P>,
    repositories: Repositories<P::Tx>,
    codes: OneTimeCodeManager<P::Tx>,
    sessions: SessionManager<P::Tx>,
    credentials: Arc<dyn CredentialStore>,
    config: AuthConfig,
}

impl<P: RepositoryProvider> AccountService<P> {
    /// Build a service over the provider's own repositories.
    pub fn from_provider(
        provider: Arc<P>,
        credentials: Arc<dyn CredentialStore>,
        signer: Arc<dyn TokenSigner>,
        config: AuthConfig,
    ) -> Self {
        let repositories = provider.repositories();
        Self::new(provider, repositories, credentials, signer, config)
    }
}

impl<P: TransactionProvider> AccountService<P> {
    pub fn new(
        provider: Arc<P>,
        repositories: Repositories<P::Tx>,
        credentials: Arc<dyn CredentialStore>,
        signer: Arc<dyn TokenSigner>,
        config: AuthConfig,
    ) -> Self {
        Self {
            coordinator: TransactionCoordinator::new(provider),
            codes: OneTimeCodeManager::new(&repositories, config.code_length),
            sessions: SessionManager::new(&repositories, signer, config.clone()),
            repositories,
            credentials,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create an unverified account, its first session and a verification code.
    #[tracing::instrument(skip_all, fields(device = %device.name))]
    pub async fn register(
        &self,
        request: RegisterRequest,
        device: &Device,
    ) -> Result<Registration, Error> {
        validate_email(&request.email)?;
        validate_password(&request.password)?;
        validate_username(&request.username)?;
        validate_bio(request.bio.as_deref())?;

        let password_hash = self.credentials.hash(&request.password)?;

        let mut tx = self.coordinator.begin().await?;
        let result = self.register_in(&mut tx, request, password_hash, device).await;
        let registration = self.coordinator.complete(tx, result).await?;

        tracing::info!(account_id = %registration.account.id, "Registered account");
        Ok(registration)
    }

    async fn register_in(
        &self,
        tx: &mut P::Tx,
        request: RegisterRequest,
        password_hash: String,
        device: &Device,
    ) -> Result<Registration, Error> {
        if self
            .repositories
            .account_provider
            .account_by_email(tx, &request.email)
            .await?
            .is_some()
        {
            return Err(AuthError::AccountAlreadyExists.into());
        }

        let account = Account::builder()
            .email(request.email)
            .username(request.username)
            .bio(request.bio)
            .password_hash(password_hash)
            .build()?;
        self.repositories
            .account_saver
            .save_account(tx, &account)
            .await
            .map_err(|e| match e {
                Error::Storage(StorageError::Constraint(_)) => {
                    Error::Auth(AuthError::AccountAlreadyExists)
                }
                other => other,
            })?;

        let code = self.codes.generate_code()?;
        let code_expires_at = Utc::now() + self.config.verification_code_ttl;
        self.codes
            .issue_email_verification(tx, &account.id, &code, code_expires_at)
            .await?;

        let session = self.sessions.create_session(tx, &account.id, device).await?;
        let tokens = self.sessions.mint_token_pair(tx, &session).await?;

        Ok(Registration {
            tokens,
            account,
            session,
            verification_code: code,
            code_expires_at,
        })
    }

    /// Open a new session for an existing account.
    #[tracing::instrument(skip_all, fields(device = %device.name))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: &Device,
    ) -> Result<LoginOutcome, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.login_in(&mut tx, email, password, device).await;
        let outcome = self.coordinator.complete(tx, result).await?;

        tracing::info!(
            account_id = %outcome.account.id,
            session_id = %outcome.session.id,
            "Account logged in"
        );
        Ok(outcome)
    }

    async fn login_in(
        &self,
        tx: &mut P::Tx,
        email: &str,
        password: &str,
        device: &Device,
    ) -> Result<LoginOutcome, Error> {
        let account = self
            .repositories
            .account_provider
            .account_by_email(tx, email)
            .await?
            .ok_or(Error::Auth(AuthError::AccountNotFound))?;

        if !self.credentials.verify(&account.password_hash, password) {
            tracing::warn!(account_id = %account.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        if !account.status.is_active() {
            tracing::warn!(account_id = %account.id, status = %account.status, "Login rejected: account not active");
            return Err(AuthError::AccountDisabled(account.status).into());
        }

        let session = self.sessions.create_session(tx, &account.id, device).await?;
        let tokens = self.sessions.mint_token_pair(tx, &session).await?;

        Ok(LoginOutcome {
            tokens,
            account,
            session,
        })
    }

    /// Redeem an email verification code.
    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    pub async fn verify_email(&self, account_id: &AccountId, code: &str) -> Result<(), Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.verify_email_in(&mut tx, account_id, code).await;
        self.coordinator.complete(tx, result).await?;

        tracing::info!(account_id = %account_id, "Email verified");
        Ok(())
    }

    async fn verify_email_in(
        &self,
        tx: &mut P::Tx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<(), Error> {
        let verification = self
            .codes
            .lookup_email_verification(tx, account_id, code)
            .await?;
        ensure_usable(&verification, Utc::now())?;

        self.repositories
            .account_updater
            .set_verified(tx, account_id, Utc::now())
            .await?;
        self.codes.consume_email_verification(tx, account_id).await
    }

    /// Issue a fresh verification code for an existing account.
    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    pub async fn send_verification_email(
        &self,
        account_id: &AccountId,
    ) -> Result<EmailVerification, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.send_verification_email_in(&mut tx, account_id).await;
        self.coordinator.complete(tx, result).await
    }

    async fn send_verification_email_in(
        &self,
        tx: &mut P::Tx,
        account_id: &AccountId,
    ) -> Result<EmailVerification, Error> {
        self.require_account(tx, account_id).await?;

        let code = self.codes.generate_code()?;
        let expires_at = Utc::now() + self.config.verification_code_ttl;
        self.codes
            .issue_email_verification(tx, account_id, &code, expires_at)
            .await
    }

    /// Fetch a verification code without consuming or judging it.
    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    pub async fn get_verification_code(
        &self,
        account_id: &AccountId,
        code: &str,
    ) -> Result<EmailVerification, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self
            .codes
            .lookup_email_verification(&mut tx, account_id, code)
            .await;
        self.coordinator.complete(tx, result).await
    }

    /// Fetch a reset code without consuming or judging it.
    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    pub async fn get_reset_password_code(
        &self,
        account_id: &AccountId,
        code: &str,
    ) -> Result<ResetCode, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.codes.lookup_reset_code(&mut tx, account_id, code).await;
        self.coordinator.complete(tx, result).await
    }

    #[tracing::instrument(skip_all)]
    pub async fn get_account_by_email(&self, email: &str) -> Result<Account, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self
            .repositories
            .account_provider
            .account_by_email(&mut tx, email)
            .await
            .and_then(|account| account.ok_or(Error::Auth(AuthError::AccountNotFound)));
        self.coordinator.complete(tx, result).await
    }

    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    pub async fn get_account(&self, account_id: &AccountId) -> Result<Account, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.require_account(&mut tx, account_id).await;
        self.coordinator.complete(tx, result).await
    }

    /// Persist a caller-supplied reset code.
    ///
    /// Delivering the code is the caller's job.
    #[tracing::instrument(skip_all, fields(account_id = %account_id, device = %device.name))]
    pub async fn request_password_reset(
        &self,
        account_id: &AccountId,
        code: &str,
        expires_at: DateTime<Utc>,
        device: &Device,
    ) -> Result<(), Error> {
        validate_code(code)?;

        let mut tx = self.coordinator.begin().await?;
        let result = self
            .request_password_reset_in(&mut tx, account_id, code, expires_at)
            .await;
        self.coordinator.complete(tx, result).await?;

        tracing::info!(account_id = %account_id, "Password reset requested");
        Ok(())
    }

    async fn request_password_reset_in(
        &self,
        tx: &mut P::Tx,
        account_id: &AccountId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.require_account(tx, account_id).await?;
        self.codes
            .issue_reset_code(tx, account_id, code, expires_at)
            .await?;
        Ok(())
    }

    /// Replace the account's password hash, redeeming `code`.
    ///
    /// `updated_account` carries the new hash (see [`hash_password`](Self::hash_password)).
    /// The code is checked in the same unit of work as the update.
    #[tracing::instrument(skip_all, fields(account_id = %updated_account.id, device = %device.name))]
    pub async fn reset_password(
        &self,
        updated_account: &Account,
        code: &str,
        device: &Device,
    ) -> Result<(), Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.reset_password_in(&mut tx, updated_account, code).await;
        self.coordinator.complete(tx, result).await?;

        tracing::info!(account_id = %updated_account.id, "Password reset");
        Ok(())
    }

    async fn reset_password_in(
        &self,
        tx: &mut P::Tx,
        updated_account: &Account,
        code: &str,
    ) -> Result<(), Error> {
        let reset_code = self
            .codes
            .lookup_reset_code(tx, &updated_account.id, code)
            .await?;
        ensure_usable(&reset_code, Utc::now())?;

        self.repositories
            .account_updater
            .update_password(
                tx,
                &updated_account.id,
                &updated_account.password_hash,
                Utc::now(),
            )
            .await?;
        self.codes.consume_reset_code(tx, &updated_account.id).await
    }

    /// Exchange a refresh token for a new token pair.
    #[tracing::instrument(skip_all, fields(device = %device.name))]
    pub async fn refresh_token(&self, token: &str, device: &Device) -> Result<TokenPair, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.sessions.rotate_refresh_token(&mut tx, token, device).await;
        self.coordinator.complete(tx, result).await
    }

    /// Revoke a session and its refresh token.
    #[tracing::instrument(skip_all, fields(session_id = %session_id))]
    pub async fn logout(&self, session_id: &SessionId) -> Result<(), Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.sessions.revoke_session(&mut tx, session_id).await;
        self.coordinator.complete(tx, result).await?;

        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Resolve an access token to its live session.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, access_token: &str) -> Result<Session, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self
            .sessions
            .validate_access_token(&mut tx, access_token)
            .await;
        self.coordinator.complete(tx, result).await
    }

    /// Change the account's status. Leaving `Active` revokes every session.
    #[tracing::instrument(skip_all, fields(account_id = %account_id, status = %status))]
    pub async fn set_account_status(
        &self,
        account_id: &AccountId,
        status: AccountStatus,
    ) -> Result<(), Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self.set_account_status_in(&mut tx, account_id, status).await;
        self.coordinator.complete(tx, result).await
    }

    async fn set_account_status_in(
        &self,
        tx: &mut P::Tx,
        account_id: &AccountId,
        status: AccountStatus,
    ) -> Result<(), Error> {
        self.repositories
            .account_updater
            .update_status(tx, account_id, status, Utc::now())
            .await?;

        if !status.is_active() {
            let revoked = self.sessions.revoke_all_sessions(tx, account_id).await?;
            tracing::info!(account_id = %account_id, revoked, "Revoked sessions of inactive account");
        }
        Ok(())
    }

    /// Hash a new password for use with [`reset_password`](Self::reset_password).
    pub fn hash_password(&self, password: &str) -> Result<String, Error> {
        validate_password(password)?;
        self.credentials.hash(password)
    }

    /// Delete expired sessions, refresh tokens and codes.
    #[tracing::instrument(skip_all)]
    pub async fn cleanup_expired(&self) -> Result<CleanupReport, Error> {
        let mut tx = self.coordinator.begin().await?;
        let result = self
            .repositories
            .expired_record_deleter
            .delete_expired(&mut tx, Utc::now())
            .await;
        let report = self.coordinator.complete(tx, result).await?;

        tracing::info!(
            sessions = report.sessions,
            refresh_tokens = report.refresh_tokens,
            email_verifications = report.email_verifications,
            reset_codes = report.reset_codes,
            "Cleaned up expired records"
        );
        Ok(report)
    }

    async fn require_account(&self, tx: &mut P::Tx, account_id: &AccountId) -> Result<Account, Error> {
        self.repositories
            .account_provider
            .account_by_id(tx, account_id)
            .await?
            .ok_or(Error::Auth(AuthError::AccountNotFound))
    }
}
