pub mod utilities;

use thiserror::Error;

use crate::account::AccountStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("One-time code error: {0}")]
    Code(#[from] CodeError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Account already exists")]
    AccountAlreadyExists,

    #[error("Account is {0}")]
    AccountDisabled(AccountStatus),
}

#[derive(Debug, Error)]
pub enum CodeError {
    #[error("Code not found")]
    NotFound,

    #[error("Code already used")]
    AlreadyUsed,

    #[error("Code expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    #[error("Session expired")]
    SessionExpired,

    #[error("Session not found")]
    SessionNotFound,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Random number generation failed: {0}")]
    Randomness(String),
}

/// Transport-facing classification of an [`Error`].
///
/// Each error maps to exactly one kind; transports map kinds to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthenticated,
    AlreadyUsed,
    Expired,
    Conflict,
    InvalidArgument,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::AlreadyUsed => "already_used",
            ErrorKind::Expired => "expired",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(AuthError::AccountNotFound) => ErrorKind::NotFound,
            Error::Auth(AuthError::InvalidCredentials) => ErrorKind::Unauthenticated,
            Error::Auth(AuthError::AccountDisabled(_)) => ErrorKind::Unauthenticated,
            Error::Auth(AuthError::AccountAlreadyExists) => ErrorKind::Conflict,
            Error::Code(CodeError::NotFound) => ErrorKind::NotFound,
            Error::Code(CodeError::AlreadyUsed) => ErrorKind::AlreadyUsed,
            Error::Code(CodeError::Expired) => ErrorKind::Expired,
            Error::Token(TokenError::Invalid) => ErrorKind::Unauthenticated,
            Error::Token(TokenError::SessionNotFound) => ErrorKind::NotFound,
            Error::Token(TokenError::Expired | TokenError::SessionExpired) => ErrorKind::Expired,
            Error::Storage(StorageError::NotFound) => ErrorKind::NotFound,
            Error::Storage(StorageError::Constraint(_)) => ErrorKind::Conflict,
            Error::Storage(_) => ErrorKind::Internal,
            Error::Validation(_) => ErrorKind::InvalidArgument,
            Error::Crypto(_) => ErrorKind::Internal,
        }
    }

    /// A message safe to hand to callers outside the engine.
    ///
    /// Internal failures collapse to a fixed string so storage and crypto
    /// details never leave the process; they are logged where they occur.
    pub fn public_message(&self) -> String {
        match self {
            Error::Auth(AuthError::AccountAlreadyExists) => "account already exists".to_string(),
            _ => match self.kind() {
                ErrorKind::Internal => "internal error".to_string(),
                ErrorKind::Conflict => "conflict".to_string(),
                _ => self.to_string(),
            },
        }
    }

    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Error::Token(TokenError::Invalid))
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
