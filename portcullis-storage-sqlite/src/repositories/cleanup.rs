use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portcullis_core::{
    Error,
    error::utilities::DatabaseResultExt,
    repositories::{CleanupReport, ExpiredRecordDeleter},
};

use crate::SqliteTx;

pub struct SqliteCleanupRepository;

#[async_trait]
impl ExpiredRecordDeleter<SqliteTx> for SqliteCleanupRepository {
    async fn delete_expired(
        &self,
        tx: &mut SqliteTx,
        now: DateTime<Utc>,
    ) -> Result<CleanupReport, Error> {
        let now = now.timestamp();

        let refresh_tokens = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at <= ?1
               OR session_id IN (SELECT id FROM sessions WHERE expires_at <= ?1)
            "#,
        )
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_db_err("Failed to delete expired refresh tokens")?
        .rows_affected();

        let sessions = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete expired sessions")?
            .rows_affected();

        let email_verifications = sqlx::query("DELETE FROM email_verifications WHERE expires_at <= ?1")
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete expired email verifications")?
            .rows_affected();

        let reset_codes = sqlx::query("DELETE FROM reset_codes WHERE expires_at <= ?1")
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete expired reset codes")?
            .rows_affected();

        Ok(CleanupReport {
            sessions,
            refresh_tokens,
            email_verifications,
            reset_codes,
        })
    }
}
