//! Atomic boundary around a use case
//!
//! A use case calls [`TransactionCoordinator::begin`], runs its steps against
//! the open unit of work, and hands the outcome to
//! [`TransactionCoordinator::complete`]:
//!
//! ```rust,ignore
//! let mut tx = self.coordinator.begin().await?;
//! let result = self.do_steps(&mut tx).await;
//! self.coordinator.complete(tx, result).await
//! ```
//!
//! If the future is dropped between the two calls the unit of work is dropped
//! with it, which rolls it back.

use std::sync::Arc;

use crate::{Error, error::StorageError, repositories::TransactionProvider};

pub struct TransactionCoordinator<P: TransactionProvider> {
    provider: Arc<P>,
}

impl<P: TransactionProvider> Clone for TransactionCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
        }
    }
}

impl<P: TransactionProvider> TransactionCoordinator<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn begin(&self) -> Result<P::Tx, Error> {
        self.provider.begin().await
    }

    /// Commit on `Ok`, roll back on `Err`.
    ///
    /// A commit failure is reported as [`StorageError::Transaction`]. A
    /// rollback failure is logged and the original error is returned.
    pub async fn complete<T>(&self, tx: P::Tx, result: Result<T, Error>) -> Result<T, Error> {
        match result {
            Ok(value) => {
                if let Err(e) = self.provider.commit(tx).await {
                    tracing::error!(error = %e, "Failed to commit transaction");
                    return Err(match e {
                        Error::Storage(StorageError::Transaction(msg)) => {
                            StorageError::Transaction(msg).into()
                        }
                        _ => StorageError::Transaction("Failed to commit transaction".to_string())
                            .into(),
                    });
                }
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = self.provider.rollback(tx).await {
                    tracing::error!(
                        error = %rollback_error,
                        original_error = %error,
                        "Failed to roll back transaction"
                    );
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::Account,
        error::AuthError,
        repositories::RepositoryProvider,
        testing::MemoryStore,
    };

    fn account(email: &str) -> Account {
        Account::builder()
            .email(email)
            .username("alice")
            .password_hash("hash")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_complete_commits_on_ok() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = TransactionCoordinator::new(store.clone());
        let repos = store.repositories();

        let mut tx = coordinator.begin().await.unwrap();
        let a = account("a@x.com");
        let result = repos.account_saver.save_account(&mut tx, &a).await;
        coordinator.complete(tx, result).await.unwrap();

        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn test_complete_rolls_back_on_err() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = TransactionCoordinator::new(store.clone());
        let repos = store.repositories();

        let mut tx = coordinator.begin().await.unwrap();
        let a = account("a@x.com");
        repos.account_saver.save_account(&mut tx, &a).await.unwrap();
        let result: Result<(), Error> = Err(AuthError::InvalidCredentials.into());
        let error = coordinator.complete(tx, result).await.unwrap_err();

        assert!(matches!(error, Error::Auth(AuthError::InvalidCredentials)));
        assert_eq!(store.account_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = TransactionCoordinator::new(store.clone());
        let repos = store.repositories();

        {
            let mut tx = coordinator.begin().await.unwrap();
            let a = account("a@x.com");
            repos.account_saver.save_account(&mut tx, &a).await.unwrap();
        }

        assert_eq!(store.account_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_is_internal() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next_commit();
        let coordinator = TransactionCoordinator::new(store.clone());

        let tx = coordinator.begin().await.unwrap();
        let error = coordinator.complete(tx, Ok(())).await.unwrap_err();

        assert!(matches!(error, Error::Storage(StorageError::Transaction(_))));
        assert_eq!(error.public_message(), "internal error");
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_original_error() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next_rollback();
        let coordinator = TransactionCoordinator::new(store.clone());

        let tx = coordinator.begin().await.unwrap();
        let result: Result<(), Error> = Err(AuthError::AccountNotFound.into());
        let error = coordinator.complete(tx, result).await.unwrap_err();

        assert!(matches!(error, Error::Auth(AuthError::AccountNotFound)));
    }
}
