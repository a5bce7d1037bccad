//! CiviDoc Core Library
//!
//! This crate provides the domain models, error types, configuration,
//! content addressing, and MIME detection shared across all CiviDoc
//! components. It performs no I/O of its own.

pub mod config;
pub mod content_address;
pub mod error;
pub mod mime;
pub mod models;

// Re-export commonly used types
pub use config::{Config, StorageBackend};
pub use content_address::{derive_storage_key, hash_reader, sha256_hex};
pub use error::{AppError, ErrorMetadata, LogLevel};
