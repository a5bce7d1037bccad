//! Error types module
//!
//! All failures in the document lifecycle engine are unified under the
//! [`AppError`] enum. Each variant carries a human-readable message and maps
//! to exactly one machine-readable code via [`ErrorMetadata`], so the HTTP
//! and broker adapters can translate errors deterministically.
//!
//! The `Database` variant's `From<sqlx::Error>` is gated behind the `sqlx`
//! feature. With `default-features = false` the variant carries a plain
//! string instead.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// Allows errors to self-describe how adapters should surface them.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (the caller may retry)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File read error: {0}")]
    FileRead(String),

    #[error("Hash calculation failed: {0}")]
    HashCalculation(String),

    #[error("Storage upload error: {0}")]
    StorageUpload(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Signed URL generation failed: {0}")]
    SignedUrl(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::FileRead(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata per variant: (error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::Validation(_) => ("VALIDATION_ERROR", false, LogLevel::Debug),
        AppError::FileRead(_) => ("FILE_READ_ERROR", false, LogLevel::Warn),
        AppError::HashCalculation(_) => ("HASH_CALCULATION_ERROR", false, LogLevel::Warn),
        AppError::StorageUpload(_) => ("STORAGE_UPLOAD_ERROR", true, LogLevel::Error),
        AppError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        AppError::Database(_) => ("PERSISTENCE_ERROR", true, LogLevel::Error),
        AppError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        AppError::SignedUrl(_) => ("SIGNED_URL_ERROR", true, LogLevel::Error),
        AppError::Publish(_) => ("PUBLISH_ERROR", true, LogLevel::Error),
        AppError::Internal(_) => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::FileRead(_) => "FileRead",
            AppError::HashCalculation(_) => "HashCalculation",
            AppError::StorageUpload(_) => "StorageUpload",
            AppError::Storage(_) => "Storage",
            AppError::Database(_) => "Database",
            AppError::NotFound(_) => "NotFound",
            AppError::SignedUrl(_) => "SignedUrl",
            AppError::Publish(_) => "Publish",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ref msg) => msg.clone(),
            AppError::FileRead(_) => "Failed to read uploaded file".to_string(),
            AppError::HashCalculation(_) => "Failed to process uploaded file".to_string(),
            AppError::StorageUpload(_) => "Failed to store uploaded file".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::SignedUrl(_) => "Failed to generate download link".to_string(),
            AppError::Publish(_) => "Failed to deliver notification".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_validation() {
        let err = AppError::Validation("filename must not be blank".to_string());
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "filename must not be blank");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("document not found".to_string());
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "document not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.error_code(), "PERSISTENCE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_upload_failure_codes_are_distinct() {
        let codes = [
            AppError::FileRead("x".into()).error_code(),
            AppError::HashCalculation("x".into()).error_code(),
            AppError::StorageUpload("x".into()).error_code(),
            AppError::SignedUrl("x".into()).error_code(),
            AppError::Publish("x".into()).error_code(),
        ];
        let mut unique = codes.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_io_error_maps_to_file_read() {
        let err: AppError = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated").into();
        assert_eq!(err.error_code(), "FILE_READ_ERROR");
    }
}
