//! Input validation for the account use cases
//!
//! Password strength is a policy decision for the embedding application; this
//! module only rejects input that can never be a usable credential.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_USERNAME_LENGTH: usize = 100;
const MAX_BIO_LENGTH: usize = 1000;

/// Validates an email address
///
/// ```rust
/// use portcullis_core::validation::validate_email;
///
/// assert!(validate_email("a@x.com").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(
            "Email address is malformed".to_string(),
        ))
    }
}

/// Validates a password
///
/// Any non-blank password up to 128 bytes is accepted.
///
/// ```rust
/// use portcullis_core::validation::validate_password;
///
/// assert!(validate_password("pw1").is_ok());
/// assert!(validate_password("").is_err());
/// ```
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    if password.trim().is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password cannot be only whitespace".to_string(),
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be no more than {MAX_PASSWORD_LENGTH} characters long"
        )));
    }

    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::InvalidUsername(
            "Username cannot be empty or whitespace only".to_string(),
        ));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Username must be no more than {MAX_USERNAME_LENGTH} characters long"
        )));
    }

    Ok(())
}

pub fn validate_bio(bio: Option<&str>) -> Result<(), ValidationError> {
    match bio {
        Some(bio) if bio.len() > MAX_BIO_LENGTH => Err(ValidationError::InvalidField(format!(
            "Bio must be no more than {MAX_BIO_LENGTH} characters long"
        ))),
        _ => Ok(()),
    }
}

/// Rejects empty codes before they reach storage.
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code.trim().is_empty() {
        return Err(ValidationError::MissingField("Code is required".to_string()));
    }
    Ok(())
}
