//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all blob-store backends
//! must implement.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Blob-store abstraction trait
///
/// All backends (S3, local filesystem) must implement this trait. The
/// document lifecycle engine depends only on this interface; there is one
/// production implementation per backend and an in-memory double for tests.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store bytes under a key with the given content type.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Delete the object under a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Publicly addressable (unsigned) URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Generate a time-bounded signed URL granting temporary GET access.
    async fn presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Name of the bucket/container this backend writes into.
    fn bucket_name(&self) -> &str;
}
