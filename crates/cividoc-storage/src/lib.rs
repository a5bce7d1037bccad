//! CiviDoc Storage Library
//!
//! This crate provides the blob-store abstraction and its implementations.
//! It includes the [`ObjectStorage`] trait plus S3 and local-filesystem
//! backends.
//!
//! # Storage key format
//!
//! Keys are content-derived: `{first 2 hex chars of digest}/{digest}{ext}`
//! (see `cividoc_core::content_address`). The sharding prefix only spreads
//! objects across partitions; backends treat keys as opaque paths. Keys must
//! not contain `..` or a leading `/`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use cividoc_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectStorage, StorageError, StorageResult};
