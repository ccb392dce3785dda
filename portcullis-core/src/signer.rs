//! Access token signing
//!
//! Access tokens are short-lived JWTs binding an account to a session. They
//! are never persisted; a token stays meaningful only while its session row
//! exists, which is what makes logout effective before `exp`.

use std::path::Path;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::AccountId,
    error::{CryptoError, TokenError, ValidationError},
    session::SessionId,
};

/// JWT claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject - account ID
    pub sub: String,
    /// Session ID the token was minted for
    pub sid: String,
    /// Issued at in seconds (as UTC timestamp)
    pub iat: i64,
    /// Expiration time in seconds (as UTC timestamp)
    pub exp: i64,
    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl AccessClaims {
    pub fn new(
        account_id: &AccountId,
        session_id: &SessionId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: account_id.to_string(),
            sid: session_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: None,
        }
    }

    pub fn account_id(&self) -> AccountId {
        AccountId::new(&self.sub)
    }

    pub fn session_id(&self) -> SessionId {
        SessionId::new(&self.sid)
    }
}

/// Opaque signer for access tokens.
pub trait TokenSigner: Send + Sync + 'static {
    fn sign(&self, claims: &AccessClaims) -> Result<String, Error>;

    /// Verify a token and return its claims.
    ///
    /// An expired signature fails [`TokenError::Expired`]; anything else that
    /// does not verify fails [`TokenError::Invalid`].
    fn verify(&self, token: &str) -> Result<AccessClaims, Error>;
}

/// JWT algorithm type
#[derive(Debug, Clone)]
pub enum JwtAlgorithm {
    /// RS256 - RSA with SHA-256
    RS256 {
        /// Private key for signing JWTs (PEM format)
        private_key: Vec<u8>,
        /// Public key for verifying JWTs (PEM format)
        public_key: Vec<u8>,
    },
    /// HS256 - HMAC with SHA-256
    HS256 {
        /// Secret key for both signing and verifying
        secret_key: Vec<u8>,
    },
}

/// Configuration for JWT access tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub algorithm: JwtAlgorithm,
    /// Issuer claim; when set it is also required on verification
    pub issuer: Option<String>,
}

impl JwtConfig {
    pub fn new_rs256(private_key: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self {
            algorithm: JwtAlgorithm::RS256 {
                private_key,
                public_key,
            },
            issuer: None,
        }
    }

    pub fn new_hs256(secret_key: Vec<u8>) -> Self {
        Self {
            algorithm: JwtAlgorithm::HS256 { secret_key },
            issuer: None,
        }
    }

    /// Create a new JWT configuration from RSA key files (PEM format)
    pub fn from_rs256_pem_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
    ) -> Result<Self, Error> {
        use std::fs::read;

        let private_key = read(private_key_path).map_err(|e| {
            ValidationError::InvalidField(format!("Failed to read private key file: {e}"))
        })?;

        let public_key = read(public_key_path).map_err(|e| {
            ValidationError::InvalidField(format!("Failed to read public key file: {e}"))
        })?;

        Ok(Self::new_rs256(private_key, public_key))
    }

    /// A configuration with a fresh random HS256 secret.
    ///
    /// Tokens signed with it do not survive a restart.
    pub fn new_random_hs256() -> Result<Self, Error> {
        let mut secret_key = vec![0u8; 32];
        crate::crypto::fill_random(&mut secret_key)?;
        Ok(Self::new_hs256(secret_key))
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn jwt_algorithm(&self) -> Algorithm {
        match &self.algorithm {
            JwtAlgorithm::RS256 { .. } => Algorithm::RS256,
            JwtAlgorithm::HS256 { .. } => Algorithm::HS256,
        }
    }

    pub fn get_encoding_key(&self) -> Result<EncodingKey, Error> {
        match &self.algorithm {
            JwtAlgorithm::RS256 { private_key, .. } => EncodingKey::from_rsa_pem(private_key)
                .map_err(|e| {
                    ValidationError::InvalidField(format!("Invalid RSA private key: {e}")).into()
                }),
            JwtAlgorithm::HS256 { secret_key } => Ok(EncodingKey::from_secret(secret_key)),
        }
    }

    pub fn get_decoding_key(&self) -> Result<DecodingKey, Error> {
        match &self.algorithm {
            JwtAlgorithm::RS256 { public_key, .. } => DecodingKey::from_rsa_pem(public_key)
                .map_err(|e| {
                    ValidationError::InvalidField(format!("Invalid RSA public key: {e}")).into()
                }),
            JwtAlgorithm::HS256 { secret_key } => Ok(DecodingKey::from_secret(secret_key)),
        }
    }

    /// Exact expiry, required `exp`/`sub`, and the issuer when configured.
    pub fn get_validation(&self) -> Validation {
        let mut validation = Validation::new(self.jwt_algorithm());
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

/// [`TokenSigner`] backed by `jsonwebtoken`.
///
/// Keys are parsed once at construction so a bad PEM fails at startup rather
/// than on the first login.
pub struct JwtSigner {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
}

impl JwtSigner {
    pub fn new(config: JwtConfig) -> Result<Self, Error> {
        Ok(Self {
            header: Header::new(config.jwt_algorithm()),
            encoding_key: config.get_encoding_key()?,
            decoding_key: config.get_decoding_key()?,
            validation: config.get_validation(),
            issuer: config.issuer,
        })
    }
}

impl std::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &self.header.alg)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, claims: &AccessClaims) -> Result<String, Error> {
        let claims = AccessClaims {
            iss: self.issuer.clone(),
            ..claims.clone()
        };
        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| CryptoError::TokenSigning(e.to_string()).into())
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, Error> {
        match decode::<AccessClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), JwtErrorKind::ExpiredSignature) => {
                Err(TokenError::Expired.into())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Access token failed verification");
                Err(TokenError::Invalid.into())
            }
        }
    }
}
