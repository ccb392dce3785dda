use async_trait::async_trait;

use crate::{
    Error,
    account::AccountId,
    session::{RefreshToken, Session, SessionId},
};

#[async_trait]
pub trait SessionSaver<Tx: Send>: Send + Sync + 'static {
    async fn create_session(&self, tx: &mut Tx, session: &Session) -> Result<(), Error>;

    async fn store_refresh_token(&self, tx: &mut Tx, token: &RefreshToken) -> Result<(), Error>;
}

#[async_trait]
pub trait SessionProvider<Tx: Send>: Send + Sync + 'static {
    async fn session_by_id(
        &self,
        tx: &mut Tx,
        session_id: &SessionId,
    ) -> Result<Option<Session>, Error>;

    /// Find a refresh token by the SHA-256 hex digest of its plaintext.
    async fn refresh_token(
        &self,
        tx: &mut Tx,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, Error>;
}

#[async_trait]
pub trait SessionDeleter<Tx: Send>: Send + Sync + 'static {
    /// Delete one refresh token. Returns `false` if no row matched.
    async fn delete_refresh_token(&self, tx: &mut Tx, token_hash: &str) -> Result<bool, Error>;

    async fn delete_refresh_tokens_for_session(
        &self,
        tx: &mut Tx,
        session_id: &SessionId,
    ) -> Result<u64, Error>;

    /// Delete a session. Returns `false` if no row matched.
    async fn delete_session(&self, tx: &mut Tx, session_id: &SessionId) -> Result<bool, Error>;

    /// Delete every session of an account together with their refresh tokens.
    async fn delete_sessions_for_account(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
    ) -> Result<u64, Error>;
}
