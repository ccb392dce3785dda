use async_trait::async_trait;
use portcullis_core::{
    AccountId, Error, RefreshToken, Session, SessionId,
    error::utilities::DatabaseResultExt,
    repositories::{SessionDeleter, SessionProvider, SessionSaver},
};

use crate::{SqliteTx, from_timestamp, map_write_err};

pub struct SqliteSessionRepository;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteSession {
    id: String,
    account_id: String,
    device: String,
    ip_address: Option<String>,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<SqliteSession> for Session {
    type Error = Error;

    fn try_from(row: SqliteSession) -> Result<Self, Self::Error> {
        Ok(Session {
            id: SessionId::new(&row.id),
            account_id: AccountId::new(&row.account_id),
            device: row.device,
            ip_address: row.ip_address,
            created_at: from_timestamp(row.created_at)?,
            expires_at: from_timestamp(row.expires_at)?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteRefreshToken {
    token_hash: String,
    account_id: String,
    session_id: String,
    device: Option<String>,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<SqliteRefreshToken> for RefreshToken {
    type Error = Error;

    fn try_from(row: SqliteRefreshToken) -> Result<Self, Self::Error> {
        Ok(RefreshToken {
            token_hash: row.token_hash,
            account_id: AccountId::new(&row.account_id),
            session_id: SessionId::new(&row.session_id),
            device: row.device,
            created_at: from_timestamp(row.created_at)?,
            expires_at: from_timestamp(row.expires_at)?,
        })
    }
}

#[async_trait]
impl SessionSaver<SqliteTx> for SqliteSessionRepository {
    async fn create_session(&self, tx: &mut SqliteTx, session: &Session) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, account_id, device, ip_address, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(session.id.as_str())
        .bind(session.account_id.as_str())
        .bind(&session.device)
        .bind(&session.ip_address)
        .bind(session.created_at.timestamp())
        .bind(session.expires_at.timestamp())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_err(e, "Failed to create session"))?;

        Ok(())
    }

    async fn store_refresh_token(
        &self,
        tx: &mut SqliteTx,
        token: &RefreshToken,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, account_id, session_id, device, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&token.token_hash)
        .bind(token.account_id.as_str())
        .bind(token.session_id.as_str())
        .bind(&token.device)
        .bind(token.created_at.timestamp())
        .bind(token.expires_at.timestamp())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_err(e, "Failed to store refresh token"))?;

        Ok(())
    }
}

#[async_trait]
impl SessionProvider<SqliteTx> for SqliteSessionRepository {
    async fn session_by_id(
        &self,
        tx: &mut SqliteTx,
        session_id: &SessionId,
    ) -> Result<Option<Session>, Error> {
        let row = sqlx::query_as::<_, SqliteSession>(
            r#"
            SELECT id, account_id, device, ip_address, created_at, expires_at
            FROM sessions
            WHERE id = ?1
            "#,
        )
        .bind(session_id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_db_err("Failed to fetch session")?;

        row.map(Session::try_from).transpose()
    }

    async fn refresh_token(
        &self,
        tx: &mut SqliteTx,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, Error> {
        let row = sqlx::query_as::<_, SqliteRefreshToken>(
            r#"
            SELECT token_hash, account_id, session_id, device, created_at, expires_at
            FROM refresh_tokens
            WHERE token_hash = ?1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut **tx)
        .await
        .map_db_err("Failed to fetch refresh token")?;

        row.map(RefreshToken::try_from).transpose()
    }
}

#[async_trait]
impl SessionDeleter<SqliteTx> for SqliteSessionRepository {
    async fn delete_refresh_token(&self, tx: &mut SqliteTx, token_hash: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?1")
            .bind(token_hash)
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete refresh token")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_refresh_tokens_for_session(
        &self,
        tx: &mut SqliteTx,
        session_id: &SessionId,
    ) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE session_id = ?1")
            .bind(session_id.as_str())
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete refresh tokens")?;

        Ok(result.rows_affected())
    }

    async fn delete_session(&self, tx: &mut SqliteTx, session_id: &SessionId) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id.as_str())
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete session")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_sessions_for_account(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
    ) -> Result<u64, Error> {
        sqlx::query("DELETE FROM refresh_tokens WHERE account_id = ?1")
            .bind(account_id.as_str())
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete refresh tokens")?;

        let result = sqlx::query("DELETE FROM sessions WHERE account_id = ?1")
            .bind(account_id.as_str())
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete sessions")?;

        Ok(result.rows_affected())
    }
}
