//! Sessions, token pairs and refresh-token rotation

use std::sync::Arc;

use chrono::Utc;

use crate::{
    Error,
    account::AccountId,
    config::AuthConfig,
    crypto::{generate_secure_token, hash_token},
    error::TokenError,
    repositories::{Repositories, SessionDeleter, SessionProvider, SessionSaver},
    session::{Device, RefreshToken, Session, SessionId, TokenPair},
    signer::{AccessClaims, TokenSigner},
};

pub struct SessionManager<Tx: Send + 'static> {
    saver: Arc<dyn SessionSaver<Tx>>,
    provider: Arc<dyn SessionProvider<Tx>>,
    deleter: Arc<dyn SessionDeleter<Tx>>,
    signer: Arc<dyn TokenSigner>,
    config: AuthConfig,
}

impl<Tx: Send + 'static> SessionManager<Tx> {
    pub fn new(
        repositories: &Repositories<Tx>,
        signer: Arc<dyn TokenSigner>,
        config: AuthConfig,
    ) -> Self {
        Self {
            saver: repositories.session_saver.clone(),
            provider: repositories.session_provider.clone(),
            deleter: repositories.session_deleter.clone(),
            signer,
            config,
        }
    }

    pub async fn create_session(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        device: &Device,
    ) -> Result<Session, Error> {
        let now = Utc::now();
        let session = Session {
            id: SessionId::new_random()?,
            account_id: account_id.clone(),
            device: device.name.clone(),
            ip_address: device.ip_address.clone(),
            created_at: now,
            expires_at: now + self.config.session_ttl,
        };
        self.saver.create_session(tx, &session).await?;
        tracing::debug!(account_id = %account_id, session_id = %session.id, "Created session");
        Ok(session)
    }

    /// Sign an access token and persist a new refresh token for `session`.
    ///
    /// The token is bound to the session's device. Never reads existing
    /// tokens.
    pub async fn mint_token_pair(
        &self,
        tx: &mut Tx,
        session: &Session,
    ) -> Result<TokenPair, Error> {
        let now = Utc::now();
        let access_token_expires_at = now + self.config.access_token_ttl;
        let claims =
            AccessClaims::new(&session.account_id, &session.id, now, access_token_expires_at);
        let access_token = self.signer.sign(&claims)?;

        let refresh_token = generate_secure_token()?;
        let record = RefreshToken {
            token_hash: hash_token(&refresh_token),
            account_id: session.account_id.clone(),
            session_id: session.id.clone(),
            device: Some(session.device.clone()),
            created_at: now,
            expires_at: now + self.config.refresh_token_ttl,
        };
        self.saver.store_refresh_token(tx, &record).await?;

        Ok(TokenPair {
            access_token,
            access_token_expires_at,
            refresh_token,
            refresh_token_expires_at: record.expires_at,
        })
    }

    /// Exchange a refresh token for a new pair bound to the same session.
    ///
    /// The old record is deleted after the new one is written. If that delete
    /// matches nothing, a concurrent rotation already consumed the token and
    /// this one fails [`TokenError::Invalid`].
    pub async fn rotate_refresh_token(
        &self,
        tx: &mut Tx,
        token: &str,
        device: &Device,
    ) -> Result<TokenPair, Error> {
        let token_hash = hash_token(token);
        let record = self
            .provider
            .refresh_token(tx, &token_hash)
            .await?
            .ok_or(Error::Token(TokenError::Invalid))?;

        let now = Utc::now();
        if record.is_expired_at(now) {
            return Err(TokenError::Expired.into());
        }

        let session = self
            .provider
            .session_by_id(tx, &record.session_id)
            .await?
            .ok_or(Error::Token(TokenError::Invalid))?;
        if session.is_expired_at(now) {
            return Err(TokenError::SessionExpired.into());
        }

        let pair = self.mint_token_pair(tx, &session).await?;

        if !self.deleter.delete_refresh_token(tx, &token_hash).await? {
            tracing::warn!(session_id = %session.id, "Refresh token consumed concurrently");
            return Err(TokenError::Invalid.into());
        }

        tracing::debug!(
            session_id = %session.id,
            requested_by = %device.name,
            "Rotated refresh token"
        );
        Ok(pair)
    }

    /// Delete a session and every refresh token it owns.
    pub async fn revoke_session(&self, tx: &mut Tx, session_id: &SessionId) -> Result<(), Error> {
        self.deleter
            .delete_refresh_tokens_for_session(tx, session_id)
            .await?;
        if !self.deleter.delete_session(tx, session_id).await? {
            return Err(TokenError::SessionNotFound.into());
        }
        Ok(())
    }

    /// Delete every session of an account; returns how many were removed.
    pub async fn revoke_all_sessions(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
    ) -> Result<u64, Error> {
        self.deleter.delete_sessions_for_account(tx, account_id).await
    }

    /// Resolve an access token to its live session.
    ///
    /// A token whose session has been revoked is invalid even before `exp`.
    pub async fn validate_access_token(&self, tx: &mut Tx, token: &str) -> Result<Session, Error> {
        let claims = self.signer.verify(token)?;

        let session = self
            .provider
            .session_by_id(tx, &claims.session_id())
            .await?
            .ok_or(Error::Token(TokenError::Invalid))?;

        if session.account_id != claims.account_id() {
            return Err(TokenError::Invalid.into());
        }
        if session.is_expired() {
            return Err(TokenError::SessionExpired.into());
        }
        Ok(session)
    }
}
