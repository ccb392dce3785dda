//! Capability traits for the storage layer
//!
//! Storage is split into narrow capabilities per entity (save, update, read,
//! delete). Every method takes the open unit of work as `tx: &mut Tx`, so a
//! use case can thread one transaction through several capabilities and
//! commit or roll back all of their writes together.
//!
//! # Trait Hierarchy
//!
//! - [`TransactionProvider`] opens, commits and rolls back units of work of
//!   its associated type `Tx`
//! - The capability traits (`AccountSaver`, `SessionDeleter`, ...) are
//!   generic over that `Tx`
//! - [`Repositories`] bundles one implementation of each capability behind
//!   `Arc<dyn ...>` so any single one can be swapped out
//! - [`RepositoryProvider`] is what a storage backend implements: transactions,
//!   its default [`Repositories`], and lifecycle methods for migrations and
//!   health checks
//!
//! Dropping a `Tx` without committing it must roll it back.

pub mod account;
pub mod cleanup;
pub mod session;
pub mod verification;

pub use account::{AccountProvider, AccountSaver, AccountUpdater};
pub use cleanup::{CleanupReport, ExpiredRecordDeleter};
pub use session::{SessionDeleter, SessionProvider, SessionSaver};
pub use verification::{VerificationDeleter, VerificationProvider, VerificationSaver};

use std::sync::Arc;

use async_trait::async_trait;

use crate::Error;

/// Opens and closes units of work
#[async_trait]
pub trait TransactionProvider: Send + Sync + 'static {
    /// The open unit of work handed to capability methods
    type Tx: Send + 'static;

    async fn begin(&self) -> Result<Self::Tx, Error>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), Error>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), Error>;
}

/// Provider trait that storage backends implement
///
/// # Example
///
/// ```rust,ignore
/// use portcullis_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// #[async_trait]
/// impl TransactionProvider for MyStorage {
///     type Tx = MyTransaction;
///     // begin, commit, rollback
/// }
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     fn repositories(&self) -> Repositories<MyTransaction> { /* ... */ }
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: TransactionProvider {
    /// The backend's implementation of every capability
    fn repositories(&self) -> Repositories<Self::Tx>;

    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}

/// One implementation of each storage capability
pub struct Repositories<Tx: Send + 'static> {
    pub account_saver: Arc<dyn AccountSaver<Tx>>,
    pub account_updater: Arc<dyn AccountUpdater<Tx>>,
    pub account_provider: Arc<dyn AccountProvider<Tx>>,
    pub verification_saver: Arc<dyn VerificationSaver<Tx>>,
    pub verification_provider: Arc<dyn VerificationProvider<Tx>>,
    pub verification_deleter: Arc<dyn VerificationDeleter<Tx>>,
    pub session_saver: Arc<dyn SessionSaver<Tx>>,
    pub session_provider: Arc<dyn SessionProvider<Tx>>,
    pub session_deleter: Arc<dyn SessionDeleter<Tx>>,
    pub expired_record_deleter: Arc<dyn ExpiredRecordDeleter<Tx>>,
}

impl<Tx: Send + 'static> Repositories<Tx> {
    /// Use a single object for every capability.
    pub fn from_shared<R>(store: Arc<R>) -> Self
    where
        R: AccountSaver<Tx>
            + AccountUpdater<Tx>
            + AccountProvider<Tx>
            + VerificationSaver<Tx>
            + VerificationProvider<Tx>
            + VerificationDeleter<Tx>
            + SessionSaver<Tx>
            + SessionProvider<Tx>
            + SessionDeleter<Tx>
            + ExpiredRecordDeleter<Tx>,
    {
        Self {
            account_saver: store.clone(),
            account_updater: store.clone(),
            account_provider: store.clone(),
            verification_saver: store.clone(),
            verification_provider: store.clone(),
            verification_deleter: store.clone(),
            session_saver: store.clone(),
            session_provider: store.clone(),
            session_deleter: store.clone(),
            expired_record_deleter: store,
        }
    }

    pub fn with_account_saver(mut self, saver: Arc<dyn AccountSaver<Tx>>) -> Self {
        self.account_saver = saver;
        self
    }

    pub fn with_account_updater(mut self, updater: Arc<dyn AccountUpdater<Tx>>) -> Self {
        self.account_updater = updater;
        self
    }

    pub fn with_account_provider(mut self, provider: Arc<dyn AccountProvider<Tx>>) -> Self {
        self.account_provider = provider;
        self
    }

    pub fn with_verification_saver(mut self, saver: Arc<dyn VerificationSaver<Tx>>) -> Self {
        self.verification_saver = saver;
        self
    }

    pub fn with_verification_provider(
        mut self,
        provider: Arc<dyn VerificationProvider<Tx>>,
    ) -> Self {
        self.verification_provider = provider;
        self
    }

    pub fn with_verification_deleter(mut self, deleter: Arc<dyn VerificationDeleter<Tx>>) -> Self {
        self.verification_deleter = deleter;
        self
    }

    pub fn with_session_saver(mut self, saver: Arc<dyn SessionSaver<Tx>>) -> Self {
        self.session_saver = saver;
        self
    }

    pub fn with_session_provider(mut self, provider: Arc<dyn SessionProvider<Tx>>) -> Self {
        self.session_provider = provider;
        self
    }

    pub fn with_session_deleter(mut self, deleter: Arc<dyn SessionDeleter<Tx>>) -> Self {
        self.session_deleter = deleter;
        self
    }

    pub fn with_expired_record_deleter(
        mut self,
        deleter: Arc<dyn ExpiredRecordDeleter<Tx>>,
    ) -> Self {
        self.expired_record_deleter = deleter;
        self
    }
}

impl<Tx: Send + 'static> Clone for Repositories<Tx> {
    fn clone(&self) -> Self {
        Self {
            account_saver: self.account_saver.clone(),
            account_updater: self.account_updater.clone(),
            account_provider: self.account_provider.clone(),
            verification_saver: self.verification_saver.clone(),
            verification_provider: self.verification_provider.clone(),
            verification_deleter: self.verification_deleter.clone(),
            session_saver: self.session_saver.clone(),
            session_provider: self.session_provider.clone(),
            session_deleter: self.session_deleter.clone(),
            expired_record_deleter: self.expired_record_deleter.clone(),
        }
    }
}
