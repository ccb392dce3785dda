//! Versioned schema migrations
//!
//! A storage backend defines its schema as an ordered list of [`Migration`]s
//! and applies them through a [`MigrationManager`], which records each applied
//! version in a tracking table so a migration runs at most once.

use async_trait::async_trait;
use sqlx::Database;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Migrations out of order: version {current} follows {previous}")]
    OutOfOrder { previous: i64, current: i64 },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Execute the migration
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Rollback the migration
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Unique version number for ordering migrations
    fn version(&self) -> i64;

    /// Human readable name of the migration
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix timestamp; stored as an integer like every other timestamp
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        "_portcullis_migrations"
    }

    /// Initialize migration tracking table
    async fn initialize(&self) -> Result<()>;

    /// Apply pending migrations, each in its own transaction
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Rollback applied migrations, newest first
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Get list of applied migrations
    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    /// Check if specific migration was applied
    async fn is_applied(&self, version: i64) -> Result<bool>;
}

/// Check that versions are strictly increasing.
pub fn validate_order<DB: Database>(migrations: &[Box<dyn Migration<DB>>]) -> Result<()> {
    let versions: Vec<i64> = migrations.iter().map(|m| m.version()).collect();
    check_versions(&versions)
}

fn check_versions(versions: &[i64]) -> Result<()> {
    for pair in versions.windows(2) {
        if pair[1] <= pair[0] {
            tracing::error!(previous = pair[0], current = pair[1], "Migrations out of order");
            return Err(MigrationError::OutOfOrder {
                previous: pair[0],
                current: pair[1],
            });
        }
    }
    Ok(())
}

/// Migrations whose version is not in `applied`, in declaration order.
pub fn pending<'m, DB: Database>(
    migrations: &'m [Box<dyn Migration<DB>>],
    applied: &[MigrationRecord],
) -> Vec<&'m dyn Migration<DB>> {
    migrations
        .iter()
        .filter(|m| !applied.iter().any(|r| r.version == m.version()))
        .map(|m| m.as_ref())
        .collect()
}
