//! CiviDoc Database Library
//!
//! Capability traits for the persistent store ([`DocumentRepository`],
//! [`ProcessedMessageRepository`]) and their PostgreSQL implementations.
//! The engine depends only on the traits; in-memory test doubles live in
//! `cividoc-engine`.

pub mod document;
pub mod processed_message;

pub use document::{DocumentRepository, PgDocumentRepository};
pub use processed_message::{PgProcessedMessageRepository, ProcessedMessageRepository};

use cividoc_core::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Create a connection pool from configuration.
pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
}
