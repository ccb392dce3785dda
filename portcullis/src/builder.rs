//! Builder pattern for constructing Portcullis instances
//!
//! Storage is configured first; the type state makes [`PortcullisBuilder::build`]
//! available only once it is.
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::Duration;
//! use portcullis::{AuthConfig, JwtConfig, PortcullisBuilder, TracingNotifier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let portcullis = PortcullisBuilder::new()
//!     .with_sqlite("sqlite://portcullis.db?mode=rwc")
//!     .await?
//!     .with_auth_config(AuthConfig::default().with_session_ttl(Duration::days(30)))
//!     .with_jwt(JwtConfig::new_hs256(b"a secret of at least 32 bytes....".to_vec()))
//!     .with_notifier(TracingNotifier)
//!     .apply_migrations(true)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use portcullis_core::{
    Argon2CredentialStore, AuthConfig, CredentialStore, JwtConfig, JwtSigner, Repositories,
    RepositoryProvider, services::AccountService,
};

use crate::{CodeNotifier, Portcullis};

/// Errors that can occur when building a Portcullis instance.
#[derive(Debug, thiserror::Error)]
pub enum PortcullisBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// No storage configured yet
pub struct NoStorage;

/// Storage configured; ready to build
pub struct WithStorage<R: RepositoryProvider> {
    provider: Arc<R>,
    repositories: Option<Repositories<R::Tx>>,
}

/// A type-safe builder for [`Portcullis`].
///
/// # Defaults
///
/// - Auth config: [`AuthConfig::default`]
/// - JWT: HS256 with a random per-process key
/// - Credential store: [`Argon2CredentialStore`]
/// - Notifier: none
/// - Apply migrations: false
pub struct PortcullisBuilder<Storage> {
    storage: Storage,
    auth_config: AuthConfig,
    jwt_config: Option<JwtConfig>,
    credentials: Option<Arc<dyn CredentialStore>>,
    notifier: Option<Arc<dyn CodeNotifier>>,
    apply_migrations: bool,
}

impl Default for PortcullisBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl PortcullisBuilder<NoStorage> {
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            auth_config: AuthConfig::default(),
            jwt_config: None,
            credentials: None,
            notifier: None,
            apply_migrations: false,
        }
    }

    /// Use any storage backend.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        provider: Arc<R>,
    ) -> PortcullisBuilder<WithStorage<R>> {
        PortcullisBuilder {
            storage: WithStorage {
                provider,
                repositories: None,
            },
            auth_config: self.auth_config,
            jwt_config: self.jwt_config,
            credentials: self.credentials,
            notifier: self.notifier,
            apply_migrations: self.apply_migrations,
        }
    }
}

#[cfg(feature = "sqlite")]
impl PortcullisBuilder<NoStorage> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<
        PortcullisBuilder<WithStorage<portcullis_storage_sqlite::SqliteRepositoryProvider>>,
        PortcullisBuilderError,
    > {
        let provider = portcullis_storage_sqlite::SqliteRepositoryProvider::connect(url)
            .await
            .map_err(|e| PortcullisBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(provider)))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> PortcullisBuilder<WithStorage<portcullis_storage_sqlite::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(
            portcullis_storage_sqlite::SqliteRepositoryProvider::new(pool),
        ))
    }
}

impl<Storage> PortcullisBuilder<Storage> {
    pub fn with_auth_config(mut self, config: AuthConfig) -> Self {
        self.auth_config = config;
        self
    }

    pub fn with_jwt(mut self, config: JwtConfig) -> Self {
        self.jwt_config = Some(config);
        self
    }

    pub fn with_credential_store(mut self, credentials: impl CredentialStore + 'static) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    pub fn with_notifier(mut self, notifier: impl CodeNotifier) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Run pending migrations during [`build`](PortcullisBuilder::build).
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }
}

impl<R: RepositoryProvider> PortcullisBuilder<WithStorage<R>> {
    /// Replace individual capabilities of the backend's repositories.
    pub fn map_repositories(
        mut self,
        f: impl FnOnce(Repositories<R::Tx>) -> Repositories<R::Tx>,
    ) -> Self {
        let repositories = self
            .storage
            .repositories
            .take()
            .unwrap_or_else(|| self.storage.provider.repositories());
        self.storage.repositories = Some(f(repositories));
        self
    }

    pub async fn build(self) -> Result<Portcullis<R>, PortcullisBuilderError> {
        self.auth_config
            .validate()
            .map_err(|e| PortcullisBuilderError::InvalidConfiguration(e.to_string()))?;

        let jwt_config = match self.jwt_config {
            Some(config) => config,
            None => {
                tracing::warn!("No JWT configuration provided, signing with a random HS256 key");
                JwtConfig::new_random_hs256()
                    .map_err(|e| PortcullisBuilderError::InvalidConfiguration(e.to_string()))?
            }
        };
        let signer = JwtSigner::new(jwt_config)
            .map_err(|e| PortcullisBuilderError::InvalidConfiguration(e.to_string()))?;

        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(Argon2CredentialStore::new()));

        if self.apply_migrations {
            self.storage
                .provider
                .migrate()
                .await
                .map_err(|e| PortcullisBuilderError::Migration(e.to_string()))?;
        }

        let provider = self.storage.provider;
        let repositories = self
            .storage
            .repositories
            .unwrap_or_else(|| provider.repositories());
        let service = AccountService::new(
            provider.clone(),
            repositories,
            credentials,
            Arc::new(signer),
            self.auth_config,
        );

        Ok(Portcullis::new(provider, service, self.notifier))
    }
}
