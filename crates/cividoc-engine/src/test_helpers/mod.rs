//! In-memory capability doubles for testing the engines without
//! PostgreSQL, object storage, or a broker.

mod in_memory_repositories;
mod recording_adapters;

pub use in_memory_repositories::{InMemoryDocumentRepository, InMemoryProcessedMessages};
pub use recording_adapters::{CapturingPublisher, RecordingStorage};
