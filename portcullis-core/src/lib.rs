//! Core functionality for the portcullis project
//!
//! This crate holds the domain types, the storage capability traits and the
//! services implementing the authentication use cases. Storage backends
//! depend on it to implement [`repositories::RepositoryProvider`]; applications
//! normally use the `portcullis` facade instead.
//!
//! See [`Account`] for the account record, [`Session`] for sessions and
//! [`AccountService`] for the use cases.
pub mod account;
pub mod code;
pub mod config;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod id;
pub mod repositories;
pub mod services;
pub mod session;
pub mod signer;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use account::{Account, AccountId, AccountStatus};
pub use code::{EmailVerification, OneTimeCode, ResetCode};
pub use config::AuthConfig;
pub use credential::{Argon2CredentialStore, CredentialStore};
pub use error::{Error, ErrorKind};
pub use repositories::{CleanupReport, Repositories, RepositoryProvider, TransactionProvider};
pub use services::{AccountService, LoginOutcome, RegisterRequest, Registration};
pub use session::{Device, RefreshToken, Session, SessionId, TokenPair};
pub use signer::{AccessClaims, JwtConfig, JwtSigner, TokenSigner};
