use async_trait::async_trait;
use portcullis_core::{
    AccountId, EmailVerification, Error, ResetCode,
    error::utilities::DatabaseResultExt,
    repositories::{VerificationDeleter, VerificationProvider, VerificationSaver},
};

use crate::{SqliteTx, from_timestamp, map_write_err};

pub struct SqliteVerificationRepository;

/// A row of either code table; both share the same columns.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteCode {
    account_id: String,
    code: String,
    created_at: i64,
    expires_at: i64,
    used: bool,
}

impl TryFrom<SqliteCode> for EmailVerification {
    type Error = Error;

    fn try_from(row: SqliteCode) -> Result<Self, Self::Error> {
        Ok(EmailVerification {
            account_id: AccountId::new(&row.account_id),
            code: row.code,
            created_at: from_timestamp(row.created_at)?,
            expires_at: from_timestamp(row.expires_at)?,
            used: row.used,
        })
    }
}

impl TryFrom<SqliteCode> for ResetCode {
    type Error = Error;

    fn try_from(row: SqliteCode) -> Result<Self, Self::Error> {
        Ok(ResetCode {
            account_id: AccountId::new(&row.account_id),
            code: row.code,
            created_at: from_timestamp(row.created_at)?,
            expires_at: from_timestamp(row.expires_at)?,
            used: row.used,
        })
    }
}

#[async_trait]
impl VerificationSaver<SqliteTx> for SqliteVerificationRepository {
    async fn store_email_verification(
        &self,
        tx: &mut SqliteTx,
        verification: &EmailVerification,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO email_verifications (account_id, code, created_at, expires_at, used)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(verification.account_id.as_str())
        .bind(&verification.code)
        .bind(verification.created_at.timestamp())
        .bind(verification.expires_at.timestamp())
        .bind(verification.used)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_err(e, "Failed to store email verification"))?;

        Ok(())
    }

    async fn store_reset_code(&self, tx: &mut SqliteTx, reset_code: &ResetCode) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO reset_codes (account_id, code, created_at, expires_at, used)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(reset_code.account_id.as_str())
        .bind(&reset_code.code)
        .bind(reset_code.created_at.timestamp())
        .bind(reset_code.expires_at.timestamp())
        .bind(reset_code.used)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_err(e, "Failed to store reset code"))?;

        Ok(())
    }
}

#[async_trait]
impl VerificationProvider<SqliteTx> for SqliteVerificationRepository {
    async fn email_verification(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<Option<EmailVerification>, Error> {
        let row = sqlx::query_as::<_, SqliteCode>(
            r#"
            SELECT account_id, code, created_at, expires_at, used
            FROM email_verifications
            WHERE account_id = ?1 AND code = ?2
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(account_id.as_str())
        .bind(code)
        .fetch_optional(&mut **tx)
        .await
        .map_db_err("Failed to fetch email verification")?;

        row.map(EmailVerification::try_from).transpose()
    }

    async fn reset_code(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
        code: &str,
    ) -> Result<Option<ResetCode>, Error> {
        let row = sqlx::query_as::<_, SqliteCode>(
            r#"
            SELECT account_id, code, created_at, expires_at, used
            FROM reset_codes
            WHERE account_id = ?1 AND code = ?2
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(account_id.as_str())
        .bind(code)
        .fetch_optional(&mut **tx)
        .await
        .map_db_err("Failed to fetch reset code")?;

        row.map(ResetCode::try_from).transpose()
    }
}

#[async_trait]
impl VerificationDeleter<SqliteTx> for SqliteVerificationRepository {
    async fn delete_email_verifications(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
    ) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM email_verifications WHERE account_id = ?1")
            .bind(account_id.as_str())
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete email verifications")?;

        Ok(result.rows_affected())
    }

    async fn delete_reset_codes(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
    ) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM reset_codes WHERE account_id = ?1")
            .bind(account_id.as_str())
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to delete reset codes")?;

        Ok(result.rows_affected())
    }
}
