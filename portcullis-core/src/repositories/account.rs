use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::{Account, AccountId, AccountStatus},
};

/// Inserts new accounts
#[async_trait]
pub trait AccountSaver<Tx: Send>: Send + Sync + 'static {
    /// Insert a new account.
    ///
    /// A duplicate email must fail with a [`StorageError::Constraint`](crate::error::StorageError::Constraint).
    async fn save_account(&self, tx: &mut Tx, account: &Account) -> Result<(), Error>;
}

/// Mutates existing accounts
///
/// Every method fails with [`AuthError::AccountNotFound`](crate::error::AuthError::AccountNotFound)
/// when no account has the given id.
#[async_trait]
pub trait AccountUpdater<Tx: Send>: Send + Sync + 'static {
    async fn update_password(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    async fn set_verified(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    async fn update_status(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
        status: AccountStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), Error>;
}

/// Reads accounts
#[async_trait]
pub trait AccountProvider<Tx: Send>: Send + Sync + 'static {
    async fn account_by_email(&self, tx: &mut Tx, email: &str) -> Result<Option<Account>, Error>;

    async fn account_by_id(
        &self,
        tx: &mut Tx,
        account_id: &AccountId,
    ) -> Result<Option<Account>, Error>;
}
