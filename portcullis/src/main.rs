use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use portcullis::{
    AuthConfig, Error, JwtConfig, PortcullisBuilder, RepositoryProvider, SqliteRepositoryProvider,
};
use portcullis_core::error::{StorageError, ValidationError};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Command line interface for Portcullis
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string, required by every command that opens storage
    #[arg(long)]
    db_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Check that the database is reachable
    Health,
    /// Delete expired sessions, refresh tokens and codes
    Cleanup,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {}", e.public_message());
            ExitCode::FAILURE
        }
    }
}

impl Cli {
    fn db_url(&self) -> Result<&str, Error> {
        self.db_url
            .as_deref()
            .ok_or_else(|| ValidationError::MissingField("--db-url".to_string()).into())
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Commands::Migrate => {
            println!("Running migrations...");
            let provider = SqliteRepositoryProvider::connect(cli.db_url()?).await?;
            provider.migrate().await?;
            println!("Migrations applied");
        }
        Commands::Health => {
            let provider = SqliteRepositoryProvider::connect(cli.db_url()?).await?;
            provider.health_check().await?;
            println!("ok");
        }
        Commands::Cleanup => {
            let provider = SqliteRepositoryProvider::connect(cli.db_url()?).await?;
            let portcullis = PortcullisBuilder::new()
                .with_repositories(Arc::new(provider))
                .with_auth_config(AuthConfig::from_env()?)
                // Cleanup never signs tokens.
                .with_jwt(JwtConfig::new_random_hs256()?)
                .build()
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to build portcullis");
                    Error::Storage(StorageError::Connection(e.to_string()))
                })?;
            let report = portcullis.cleanup_expired().await?;
            let json = serde_json::to_string_pretty(&report).map_err(|e| {
                tracing::error!(error = %e, "Failed to encode cleanup report");
                Error::Storage(StorageError::Database(
                    "Failed to encode cleanup report".to_string(),
                ))
            })?;
            println!("{json}");
        }
        Commands::Version => {
            println!("Portcullis v{}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
