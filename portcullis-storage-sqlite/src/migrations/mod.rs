use async_trait::async_trait;
use chrono::Utc;
use portcullis_migration::{Migration, MigrationError, MigrationManager, MigrationRecord};
use sqlx::{Database, Sqlite, SqlitePool};

pub struct SqliteMigrationManager {
    pool: SqlitePool,
}

impl SqliteMigrationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MigrationManager<Sqlite> for SqliteMigrationManager {
    async fn initialize(&self) -> Result<(), MigrationError> {
        sqlx::query(
            format!(
                r#"
            CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL DEFAULT (unixepoch())
            );"#,
                self.get_migration_table_name()
            )
            .as_str(),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn up(&self, migrations: &[Box<dyn Migration<Sqlite>>]) -> Result<(), MigrationError> {
        for migration in migrations {
            if self.is_applied(migration.version()).await? {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Applying migration"
            );

            migration
                .up(&mut *tx as &mut <Sqlite as Database>::Connection)
                .await?;

            sqlx::query(
                format!(
                    "INSERT INTO {} (version, name, applied_at) VALUES (?, ?, ?)",
                    self.get_migration_table_name()
                )
                .as_str(),
            )
            .bind(migration.version())
            .bind(migration.name())
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }
        Ok(())
    }

    async fn down(&self, migrations: &[Box<dyn Migration<Sqlite>>]) -> Result<(), MigrationError> {
        for migration in migrations.iter().rev() {
            if !self.is_applied(migration.version()).await? {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Rolling back migration"
            );

            migration
                .down(&mut *tx as &mut <Sqlite as Database>::Connection)
                .await?;

            sqlx::query(
                format!(
                    "DELETE FROM {} WHERE version = ?",
                    self.get_migration_table_name()
                )
                .as_str(),
            )
            .bind(migration.version())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }
        Ok(())
    }

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        let records = sqlx::query_as::<_, MigrationRecord>(
            format!(
                "SELECT version, name, applied_at FROM {} ORDER BY version",
                self.get_migration_table_name()
            )
            .as_str(),
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn is_applied(&self, version: i64) -> Result<bool, MigrationError> {
        let result: bool = sqlx::query_scalar(
            format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE version = ?)",
                self.get_migration_table_name()
            )
            .as_str(),
        )
        .bind(version)
        .fetch_one(&self.pool)
        .await?;
        Ok(result)
    }
}

/// The full schema, oldest first.
pub(crate) fn all() -> Vec<Box<dyn Migration<Sqlite>>> {
    vec![
        Box::new(CreateAccountsTable),
        Box::new(CreateSessionsTable),
        Box::new(CreateRefreshTokensTable),
        Box::new(CreateEmailVerificationsTable),
        Box::new(CreateResetCodesTable),
        Box::new(CreateIndexes),
    ]
}

/// A migration made of plain SQL statements.
macro_rules! sql_migration {
    ($name:ident, $version:expr, up: [$($up:expr),+ $(,)?], down: [$($down:expr),+ $(,)?]) => {
        pub struct $name;

        #[async_trait]
        impl Migration<Sqlite> for $name {
            fn version(&self) -> i64 {
                $version
            }

            fn name(&self) -> &str {
                stringify!($name)
            }

            async fn up<'a>(
                &'a self,
                conn: &'a mut <Sqlite as Database>::Connection,
            ) -> Result<(), MigrationError> {
                $(sqlx::query($up).execute(&mut *conn).await?;)+
                Ok(())
            }

            async fn down<'a>(
                &'a self,
                conn: &'a mut <Sqlite as Database>::Connection,
            ) -> Result<(), MigrationError> {
                $(sqlx::query($down).execute(&mut *conn).await?;)+
                Ok(())
            }
        }
    };
}

sql_migration!(
    CreateAccountsTable,
    1,
    up: [r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL,
            bio TEXT,
            password_hash TEXT NOT NULL,
            is_verified INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            two_factor_enabled INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL DEFAULT (unixepoch()),
            updated_at INTEGER NOT NULL DEFAULT (unixepoch())
        );"#],
    down: ["DROP TABLE IF EXISTS accounts"]
);

sql_migration!(
    CreateSessionsTable,
    2,
    up: [r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            device TEXT NOT NULL,
            ip_address TEXT,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        );"#],
    down: ["DROP TABLE IF EXISTS sessions"]
);

sql_migration!(
    CreateRefreshTokensTable,
    3,
    up: [r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            token_hash TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            device TEXT,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        );"#],
    down: ["DROP TABLE IF EXISTS refresh_tokens"]
);

sql_migration!(
    CreateEmailVerificationsTable,
    4,
    up: [r#"
        CREATE TABLE IF NOT EXISTS email_verifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            used INTEGER NOT NULL DEFAULT 0
        );"#],
    down: ["DROP TABLE IF EXISTS email_verifications"]
);

sql_migration!(
    CreateResetCodesTable,
    5,
    up: [r#"
        CREATE TABLE IF NOT EXISTS reset_codes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            used INTEGER NOT NULL DEFAULT 0
        );"#],
    down: ["DROP TABLE IF EXISTS reset_codes"]
);

sql_migration!(
    CreateIndexes,
    6,
    up: [
        "CREATE INDEX IF NOT EXISTS idx_sessions_account_id ON sessions(account_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
        "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_session_id ON refresh_tokens(session_id)",
        "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_account_id ON refresh_tokens(account_id)",
        "CREATE INDEX IF NOT EXISTS idx_email_verifications_account_code ON email_verifications(account_id, code)",
        "CREATE INDEX IF NOT EXISTS idx_reset_codes_account_code ON reset_codes(account_id, code)",
    ],
    down: [
        "DROP INDEX IF EXISTS idx_sessions_account_id",
        "DROP INDEX IF EXISTS idx_sessions_expires_at",
        "DROP INDEX IF EXISTS idx_refresh_tokens_session_id",
        "DROP INDEX IF EXISTS idx_refresh_tokens_account_id",
        "DROP INDEX IF EXISTS idx_email_verifications_account_code",
        "DROP INDEX IF EXISTS idx_reset_codes_account_code",
    ]
);
