//! Lifetimes and sizes for everything the engine issues

use chrono::{Duration, Utc};

use crate::{Error, error::ValidationError};

const ENV_SESSION_TTL: &str = "PORTCULLIS_SESSION_TTL_SECS";
const ENV_REFRESH_TOKEN_TTL: &str = "PORTCULLIS_REFRESH_TOKEN_TTL_SECS";
const ENV_ACCESS_TOKEN_TTL: &str = "PORTCULLIS_ACCESS_TOKEN_TTL_SECS";
const ENV_VERIFICATION_CODE_TTL: &str = "PORTCULLIS_VERIFICATION_CODE_TTL_SECS";
const ENV_CODE_LENGTH: &str = "PORTCULLIS_CODE_LENGTH";

/// Configuration for sessions, tokens and one-time codes
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use portcullis_core::AuthConfig;
///
/// let config = AuthConfig::default().with_access_token_ttl(Duration::minutes(5));
/// assert_eq!(config.access_token_ttl, Duration::minutes(5));
/// assert_eq!(config.code_length, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Lifetime of a session row
    pub session_ttl: Duration,
    /// Lifetime of a refresh token
    pub refresh_token_ttl: Duration,
    /// Lifetime of a signed access token
    pub access_token_ttl: Duration,
    /// Lifetime of an email verification code issued by the engine
    pub verification_code_ttl: Duration,
    /// Number of symbols in generated one-time codes
    pub code_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::days(365),
            refresh_token_ttl: Duration::days(7),
            access_token_ttl: Duration::minutes(15),
            verification_code_ttl: Duration::hours(24),
            code_length: 8,
        }
    }
}

impl AuthConfig {
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_verification_code_ttl(mut self, ttl: Duration) -> Self {
        self.verification_code_ttl = ttl;
        self
    }

    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Read overrides from `PORTCULLIS_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are an
    /// error.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ttl) = parse_ttl(&lookup, ENV_SESSION_TTL)? {
            config.session_ttl = ttl;
        }
        if let Some(ttl) = parse_ttl(&lookup, ENV_REFRESH_TOKEN_TTL)? {
            config.refresh_token_ttl = ttl;
        }
        if let Some(ttl) = parse_ttl(&lookup, ENV_ACCESS_TOKEN_TTL)? {
            config.access_token_ttl = ttl;
        }
        if let Some(ttl) = parse_ttl(&lookup, ENV_VERIFICATION_CODE_TTL)? {
            config.verification_code_ttl = ttl;
        }
        if let Some(length) = parse_var(&lookup, ENV_CODE_LENGTH)? {
            config.code_length = length;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would issue already-expired artifacts, or
    /// expiry instants past the end of the calendar.
    pub fn validate(&self) -> Result<(), Error> {
        let ttls = [
            ("session_ttl", self.session_ttl),
            ("refresh_token_ttl", self.refresh_token_ttl),
            ("access_token_ttl", self.access_token_ttl),
            ("verification_code_ttl", self.verification_code_ttl),
        ];
        for (name, ttl) in ttls {
            if ttl <= Duration::zero() {
                return Err(ValidationError::InvalidField(format!("{name} must be positive")).into());
            }
            if Utc::now().checked_add_signed(ttl).is_none() {
                return Err(ValidationError::InvalidField(format!("{name} is too large")).into());
            }
        }
        if self.code_length == 0 {
            return Err(
                ValidationError::InvalidField("code_length must be positive".to_string()).into(),
            );
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, Error>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ValidationError::InvalidField(format!("{key} is not a valid number: {raw}")).into()
        }),
    }
}

fn parse_ttl<F>(lookup: &F, key: &str) -> Result<Option<Duration>, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(secs) = parse_var::<F, i64>(lookup, key)? else {
        return Ok(None);
    };
    Duration::try_seconds(secs).map(Some).ok_or_else(|| {
        ValidationError::InvalidField(format!("{key} is out of range: {secs}")).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl, Duration::days(365));
        assert_eq!(config.refresh_token_ttl, Duration::days(7));
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.verification_code_ttl, Duration::hours(24));
        assert_eq!(config.code_length, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AuthConfig::from_lookup(lookup(&[
            (ENV_ACCESS_TOKEN_TTL, "60"),
            (ENV_CODE_LENGTH, "10"),
        ]))
        .unwrap();

        assert_eq!(config.access_token_ttl, Duration::seconds(60));
        assert_eq!(config.code_length, 10);
        assert_eq!(config.session_ttl, Duration::days(365));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = AuthConfig::from_lookup(lookup(&[(ENV_SESSION_TTL, "forever")]));
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidField(_)))
        ));
    }

    #[test]
    fn test_from_lookup_rejects_zero_ttl() {
        let result = AuthConfig::from_lookup(lookup(&[(ENV_REFRESH_TOKEN_TTL, "0")]));
        assert!(result.is_err());

        let result = AuthConfig::from_lookup(lookup(&[(ENV_CODE_LENGTH, "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_lookup_rejects_out_of_range_ttl() {
        let huge = i64::MAX.to_string();
        let result = AuthConfig::from_lookup(lookup(&[(ENV_SESSION_TTL, huge.as_str())]));
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidField(_)))
        ));

        // Representable, but no expiry instant can be computed from it.
        let result = AuthConfig::from_lookup(lookup(&[(ENV_REFRESH_TOKEN_TTL, "100000000000000")]));
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidField(_)))
        ));
    }

    #[test]
    fn test_validate_rejects_unbounded_ttl() {
        let config = AuthConfig::default().with_session_ttl(Duration::MAX);
        assert!(config.validate().is_err());
    }
}
