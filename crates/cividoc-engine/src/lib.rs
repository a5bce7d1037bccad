//! CiviDoc Engine Library
//!
//! The document lifecycle engines: content-addressed upload with
//! per-owner deduplication, the three-state authentication workflow,
//! time-limited transfer batches, and best-effort retention deletion.
//! Inbound broker events pass through the idempotent ingestion layer.
//!
//! Everything here depends only on the capability traits
//! ([`DocumentRepository`](cividoc_db::DocumentRepository),
//! [`ObjectStorage`](cividoc_storage::ObjectStorage),
//! [`MessagePublisher`](cividoc_broker::MessagePublisher),
//! [`ProcessedMessageRepository`](cividoc_db::ProcessedMessageRepository)),
//! so the engines run unchanged against PostgreSQL/S3/NATS in production
//! and against the in-memory doubles in `test_helpers`.

pub mod authentication;
pub mod ingestion;
pub mod retention;
pub mod test_helpers;
pub mod transfer;
pub mod upload;

pub use authentication::AuthenticationEngine;
pub use ingestion::{AuthenticationCompletedHandler, IngestionService, UserTransferredHandler};
pub use retention::RetentionEngine;
pub use transfer::{TransferEngine, TransferItem};
pub use upload::UploadEngine;
