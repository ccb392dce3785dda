use crate::{
    Error,
    error::{StorageError, ValidationError},
};

/// Extension trait for Result types to simplify database error mapping
///
/// The driver error is logged where it happens and only the fixed `context`
/// string is kept in the returned [`StorageError`], so SQL text and driver
/// messages never travel up to callers.
///
/// # Example
///
/// ```rust,ignore
/// use portcullis_core::error::utilities::DatabaseResultExt;
///
/// query.execute(&mut **tx).await.map_db_err("Failed to save account")?;
/// ```
pub trait DatabaseResultExt<T> {
    /// Convert a database error to a [`StorageError::Database`]
    fn map_db_err(self, context: &str) -> Result<T, Error>;

    /// Convert a transaction begin/commit/rollback error to a [`StorageError::Transaction`]
    fn map_tx_err(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> DatabaseResultExt<T> for Result<T, E> {
    fn map_db_err(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{context}");
            Error::Storage(StorageError::Database(context.to_string()))
        })
    }

    fn map_tx_err(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, "{context}");
            Error::Storage(StorageError::Transaction(context.to_string()))
        })
    }
}

/// Extension trait for Option types to simplify required field validation
///
/// # Example
///
/// ```rust
/// use portcullis_core::error::utilities::RequiredFieldExt;
///
/// let email: Option<String> = Some("a@example.com".to_string());
/// let email = email.require_field("Email").unwrap();
/// assert_eq!(email, "a@example.com");
/// ```
pub trait RequiredFieldExt<T> {
    /// Convert None to a ValidationError::MissingField
    fn require_field(self, field_name: &str) -> Result<T, ValidationError>;
}

impl<T> RequiredFieldExt<T> for Option<T> {
    fn require_field(self, field_name: &str) -> Result<T, ValidationError> {
        self.ok_or_else(|| ValidationError::MissingField(format!("{field_name} is required")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_db_err_keeps_context_only() {
        let error_result: Result<i32, &str> = Err("near \"SELEC\": syntax error");
        let mapped = error_result.map_db_err("Failed to save account");

        match mapped.unwrap_err() {
            Error::Storage(StorageError::Database(msg)) => {
                assert_eq!(msg, "Failed to save account");
            }
            other => panic!("Expected storage database error, got {other:?}"),
        }
    }

    #[test]
    fn test_map_tx_err() {
        let error_result: Result<(), &str> = Err("database is locked");
        let mapped = error_result.map_tx_err("Failed to commit transaction");

        match mapped.unwrap_err() {
            Error::Storage(StorageError::Transaction(msg)) => {
                assert_eq!(msg, "Failed to commit transaction");
            }
            other => panic!("Expected storage transaction error, got {other:?}"),
        }
    }

    #[test]
    fn test_required_field_ext() {
        let some_value = Some("secret".to_string());
        assert_eq!(some_value.require_field("Secret").unwrap(), "secret");

        let none_value: Option<String> = None;
        match none_value.require_field("Secret").unwrap_err() {
            ValidationError::MissingField(msg) => assert_eq!(msg, "Secret is required"),
            other => panic!("Expected missing field validation error, got {other:?}"),
        }
    }
}
