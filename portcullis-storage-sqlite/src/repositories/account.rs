use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portcullis_core::{
    Account, AccountId, AccountStatus, Error,
    error::{AuthError, StorageError, utilities::DatabaseResultExt},
    repositories::{AccountProvider, AccountSaver, AccountUpdater},
};
use sqlx::sqlite::SqliteQueryResult;

use crate::{SqliteTx, from_timestamp, map_write_err};

pub struct SqliteAccountRepository;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteAccount {
    id: String,
    email: String,
    username: String,
    bio: Option<String>,
    password_hash: String,
    is_verified: bool,
    status: String,
    two_factor_enabled: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SqliteAccount> for Account {
    type Error = Error;

    fn try_from(row: SqliteAccount) -> Result<Self, Self::Error> {
        let status = row.status.parse::<AccountStatus>().map_err(|e| {
            tracing::error!(account_id = %row.id, error = %e, "Stored account has an unknown status");
            Error::Storage(StorageError::Database(
                "Stored account has an unknown status".to_string(),
            ))
        })?;

        Ok(Account {
            id: AccountId::new(&row.id),
            email: row.email,
            username: row.username,
            bio: row.bio,
            password_hash: row.password_hash,
            is_verified: row.is_verified,
            status,
            two_factor_enabled: row.two_factor_enabled,
            created_at: from_timestamp(row.created_at)?,
            updated_at: from_timestamp(row.updated_at)?,
        })
    }
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, email, username, bio, password_hash, is_verified, status,
           two_factor_enabled, created_at, updated_at
    FROM accounts
"#;

fn require_row(result: SqliteQueryResult) -> Result<(), Error> {
    if result.rows_affected() == 0 {
        return Err(AuthError::AccountNotFound.into());
    }
    Ok(())
}

#[async_trait]
impl AccountSaver<SqliteTx> for SqliteAccountRepository {
    async fn save_account(&self, tx: &mut SqliteTx, account: &Account) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, username, bio, password_hash, is_verified,
                                  status, two_factor_enabled, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.bio)
        .bind(&account.password_hash)
        .bind(account.is_verified)
        .bind(account.status.as_str())
        .bind(account.two_factor_enabled)
        .bind(account.created_at.timestamp())
        .bind(account.updated_at.timestamp())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_err(e, "Failed to save account"))?;

        Ok(())
    }
}

#[async_trait]
impl AccountUpdater<SqliteTx> for SqliteAccountRepository {
    async fn update_password(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let result =
            sqlx::query("UPDATE accounts SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(password_hash)
                .bind(updated_at.timestamp())
                .bind(account_id.as_str())
                .execute(&mut **tx)
                .await
                .map_db_err("Failed to update password")?;

        require_row(result)
    }

    async fn set_verified(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let result =
            sqlx::query("UPDATE accounts SET is_verified = 1, updated_at = ?1 WHERE id = ?2")
                .bind(updated_at.timestamp())
                .bind(account_id.as_str())
                .execute(&mut **tx)
                .await
                .map_db_err("Failed to mark account verified")?;

        require_row(result)
    }

    async fn update_status(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
        status: AccountStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let result = sqlx::query("UPDATE accounts SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(status.as_str())
            .bind(updated_at.timestamp())
            .bind(account_id.as_str())
            .execute(&mut **tx)
            .await
            .map_db_err("Failed to update account status")?;

        require_row(result)
    }
}

#[async_trait]
impl AccountProvider<SqliteTx> for SqliteAccountRepository {
    async fn account_by_email(
        &self,
        tx: &mut SqliteTx,
        email: &str,
    ) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!("{SELECT_ACCOUNT} WHERE email = ?1"))
            .bind(email)
            .fetch_optional(&mut **tx)
            .await
            .map_db_err("Failed to fetch account by email")?;

        row.map(Account::try_from).transpose()
    }

    async fn account_by_id(
        &self,
        tx: &mut SqliteTx,
        account_id: &AccountId,
    ) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(&format!("{SELECT_ACCOUNT} WHERE id = ?1"))
            .bind(account_id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_db_err("Failed to fetch account")?;

        row.map(Account::try_from).transpose()
    }
}
