#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portcullis::{
    Account, AccountId, CodeNotifier, EmailVerification, Error, JwtConfig, NotifierError,
    Portcullis, PortcullisBuilder, ResetCode, SqliteRepositoryProvider, SqliteTx, WithStorage,
};
use portcullis_core::{
    error::StorageError,
    repositories::{SessionSaver, VerificationDeleter, VerificationSaver},
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

// Test secret for HS256
pub const TEST_HS256_SECRET: &[u8] = b"this_is_a_test_secret_key_for_hs256_jwt_tokens_not_for_prod";

pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A single-connection in-memory pool; every transaction runs serially.
pub async fn pool() -> SqlitePool {
    setup_tracing();
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create pool")
}

/// A file-backed database shared by several pooled connections, so
/// concurrent use cases really contend for the write lock.
pub struct SharedDatabase {
    pub portcullis: Arc<Portcullis<SqliteRepositoryProvider>>,
    _dir: tempfile::TempDir,
}

pub async fn shared_database() -> SharedDatabase {
    setup_tracing();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("auth.db").display());
    let provider = SqliteRepositoryProvider::connect(&url)
        .await
        .expect("Failed to connect to SQLite");

    let portcullis = PortcullisBuilder::new()
        .with_repositories(Arc::new(provider))
        .with_jwt(JwtConfig::new_hs256(TEST_HS256_SECRET.to_vec()))
        .apply_migrations(true)
        .build()
        .await
        .expect("Failed to build portcullis");

    SharedDatabase {
        portcullis: Arc::new(portcullis),
        _dir: dir,
    }
}

pub fn builder(pool: &SqlitePool) -> PortcullisBuilder<WithStorage<SqliteRepositoryProvider>> {
    PortcullisBuilder::new()
        .with_sqlite_pool(pool.clone())
        .with_jwt(JwtConfig::new_hs256(TEST_HS256_SECRET.to_vec()))
        .apply_migrations(true)
}

pub async fn portcullis(pool: &SqlitePool) -> Portcullis<SqliteRepositoryProvider> {
    builder(pool)
        .build()
        .await
        .expect("Failed to build portcullis")
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Row counts of every table, in schema order.
pub async fn counts(pool: &SqlitePool) -> [i64; 5] {
    [
        count(pool, "accounts").await,
        count(pool, "sessions").await,
        count(pool, "refresh_tokens").await,
        count(pool, "email_verifications").await,
        count(pool, "reset_codes").await,
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Verification { account_id: AccountId, code: String },
    PasswordReset { account_id: AccountId, code: String },
}

/// Notifier that keeps every code it is handed.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeNotifier for RecordingNotifier {
    async fn send_verification_code(
        &self,
        account: &Account,
        code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(Sent::Verification {
            account_id: account.id.clone(),
            code: code.to_string(),
        });
        Ok(())
    }

    async fn send_password_reset_code(
        &self,
        account: &Account,
        code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(Sent::PasswordReset {
            account_id: account.id.clone(),
            code: code.to_string(),
        });
        Ok(())
    }
}

/// Notifier whose transport is always down.
pub struct BrokenNotifier;

#[async_trait]
impl CodeNotifier for BrokenNotifier {
    async fn send_verification_code(
        &self,
        _account: &Account,
        _code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), NotifierError> {
        Err(NotifierError::Delivery("smtp unreachable".to_string()))
    }

    async fn send_password_reset_code(
        &self,
        _account: &Account,
        _code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), NotifierError> {
        Err(NotifierError::Delivery("smtp unreachable".to_string()))
    }
}

fn injected() -> Error {
    Error::Storage(StorageError::Database("injected failure".to_string()))
}

/// Storage capability that fails every write.
pub struct Failing;

#[async_trait]
impl VerificationSaver<SqliteTx> for Failing {
    async fn store_email_verification(
        &self,
        _tx: &mut SqliteTx,
        _verification: &EmailVerification,
    ) -> Result<(), Error> {
        Err(injected())
    }

    async fn store_reset_code(
        &self,
        _tx: &mut SqliteTx,
        _reset_code: &ResetCode,
    ) -> Result<(), Error> {
        Err(injected())
    }
}

#[async_trait]
impl VerificationDeleter<SqliteTx> for Failing {
    async fn delete_email_verifications(
        &self,
        _tx: &mut SqliteTx,
        _account_id: &AccountId,
    ) -> Result<u64, Error> {
        Err(injected())
    }

    async fn delete_reset_codes(
        &self,
        _tx: &mut SqliteTx,
        _account_id: &AccountId,
    ) -> Result<u64, Error> {
        Err(injected())
    }
}

#[async_trait]
impl SessionSaver<SqliteTx> for Failing {
    async fn create_session(
        &self,
        _tx: &mut SqliteTx,
        _session: &portcullis::Session,
    ) -> Result<(), Error> {
        Err(injected())
    }

    async fn store_refresh_token(
        &self,
        _tx: &mut SqliteTx,
        _token: &portcullis_core::RefreshToken,
    ) -> Result<(), Error> {
        Err(injected())
    }
}
