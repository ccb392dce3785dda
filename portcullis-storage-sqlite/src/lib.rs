//! SQLite storage backend for portcullis
//!
//! Every capability runs against an open [`SqliteTx`], so a use case's writes
//! commit or roll back together. Dropping a [`SqliteTx`] without committing it
//! rolls it back.
//!
//! # Example
//!
//! ```rust,no_run
//! use portcullis_core::RepositoryProvider;
//! use portcullis_storage_sqlite::SqliteRepositoryProvider;
//!
//! # async fn run() -> Result<(), portcullis_core::Error> {
//! let provider = SqliteRepositoryProvider::connect("sqlite://portcullis.db?mode=rwc").await?;
//! provider.migrate().await?;
//! # Ok(())
//! # }
//! ```

mod migrations;
pub mod repositories;

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portcullis_core::{
    Error,
    error::{StorageError, utilities::DatabaseResultExt},
    repositories::{Repositories, RepositoryProvider, TransactionProvider},
};
use portcullis_migration::{Migration, MigrationManager, pending, validate_order};
use sqlx::{
    Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub use migrations::SqliteMigrationManager;
pub use repositories::{
    SqliteAccountRepository, SqliteCleanupRepository, SqliteSessionRepository,
    SqliteVerificationRepository,
};

/// The unit of work for the SQLite backend
pub type SqliteTx = sqlx::Transaction<'static, Sqlite>;

/// Repository provider implementation for SQLite
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    accounts: Arc<SqliteAccountRepository>,
    verifications: Arc<SqliteVerificationRepository>,
    sessions: Arc<SqliteSessionRepository>,
    cleanup: Arc<SqliteCleanupRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            accounts: Arc::new(SqliteAccountRepository),
            verifications: Arc::new(SqliteVerificationRepository),
            sessions: Arc::new(SqliteSessionRepository),
            cleanup: Arc::new(SqliteCleanupRepository),
        }
    }

    /// Open a pool for `url`, creating the database file if needed.
    ///
    /// In-memory databases get a single connection, since each SQLite
    /// connection to `:memory:` is a separate database.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| {
                tracing::error!(error = %e, "Invalid SQLite connection string");
                StorageError::Connection("Invalid SQLite connection string".to_string())
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to SQLite");
                StorageError::Connection("Failed to connect to SQLite".to_string())
            })?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TransactionProvider for SqliteRepositoryProvider {
    type Tx = SqliteTx;

    /// Take the write lock up front so concurrent use cases queue on the
    /// busy timeout instead of failing when a reader upgrades to a writer.
    async fn begin(&self) -> Result<SqliteTx, Error> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_tx_err("Failed to begin transaction")
    }

    async fn commit(&self, tx: SqliteTx) -> Result<(), Error> {
        tx.commit().await.map_tx_err("Failed to commit transaction")
    }

    async fn rollback(&self, tx: SqliteTx) -> Result<(), Error> {
        tx.rollback()
            .await
            .map_tx_err("Failed to roll back transaction")
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    fn repositories(&self) -> Repositories<SqliteTx> {
        Repositories {
            account_saver: self.accounts.clone(),
            account_updater: self.accounts.clone(),
            account_provider: self.accounts.clone(),
            verification_saver: self.verifications.clone(),
            verification_provider: self.verifications.clone(),
            verification_deleter: self.verifications.clone(),
            session_saver: self.sessions.clone(),
            session_provider: self.sessions.clone(),
            session_deleter: self.sessions.clone(),
            expired_record_deleter: self.cleanup.clone(),
        }
    }

    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        let migrations: Vec<Box<dyn Migration<Sqlite>>> = migrations::all();
        validate_order(&migrations).map_err(|e| {
            tracing::error!(error = %e, "Invalid migration list");
            Error::Storage(StorageError::Migration("Invalid migration list".to_string()))
        })?;

        let applied = manager.get_applied_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to read applied migrations");
            Error::Storage(StorageError::Migration(
                "Failed to read applied migrations".to_string(),
            ))
        })?;
        let pending = pending(&migrations, &applied);
        if pending.is_empty() {
            tracing::debug!("Schema is up to date");
            return Ok(());
        }
        tracing::info!(count = pending.len(), "Applying pending migrations");

        manager.up(&migrations).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_db_err("Health check failed")?;
        Ok(())
    }
}

/// Convert a stored unix timestamp back into a `DateTime`.
pub(crate) fn from_timestamp(secs: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        tracing::error!(timestamp = secs, "Stored timestamp out of range");
        Error::Storage(StorageError::Database(
            "Stored timestamp out of range".to_string(),
        ))
    })
}

/// Map a write error, keeping unique-constraint violations distinguishable.
pub(crate) fn map_write_err(e: sqlx::Error, context: &str) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            tracing::debug!(error = %e, "{context}");
            return Error::Storage(StorageError::Constraint(context.to_string()));
        }
    }
    tracing::error!(error = %e, "{context}");
    Error::Storage(StorageError::Database(context.to_string()))
}
