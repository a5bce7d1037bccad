use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use cividoc_core::models::Document;
use cividoc_core::AppError;
use cividoc_db::DocumentRepository;
use cividoc_storage::ObjectStorage;

// Blob cleanup works on at most one listing page per bulk delete; records
// beyond it are still removed, their blobs are reclaimed out of band.
const BULK_BLOB_CLEANUP_LIMIT: i64 = 1000;

/// Deletion with best-effort blob cleanup.
///
/// The metadata delete is authoritative: once the record is gone the
/// document no longer exists, whatever happens to the blob afterwards. A
/// failed blob delete is logged and swallowed, never surfaced to the
/// caller.
pub struct RetentionEngine {
    documents: Arc<dyn DocumentRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl RetentionEngine {
    pub fn new(documents: Arc<dyn DocumentRepository>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { documents, storage }
    }

    pub async fn delete(&self, document_id: Uuid) -> Result<Document, AppError> {
        let document = self
            .documents
            .delete_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document {} not found", document_id)))?;

        self.delete_blob_best_effort(&document).await;

        info!(
            document_id = %document.id,
            owner_id = document.owner_id,
            "Document deleted"
        );

        Ok(document)
    }

    /// Purge every document of an owner, returning the deleted record count.
    pub async fn delete_all(&self, owner_id: i64) -> Result<u64, AppError> {
        let (documents, total) = self
            .documents
            .list(owner_id, BULK_BLOB_CLEANUP_LIMIT, 0)
            .await?;

        if documents.is_empty() {
            return Ok(0);
        }

        let deleted = self.documents.delete_all_by_owner(owner_id).await?;

        for document in &documents {
            self.delete_blob_best_effort(document).await;
        }

        info!(
            owner_id,
            deleted,
            blobs_cleaned = documents.len(),
            total_listed = total,
            "Owner documents purged"
        );

        Ok(deleted)
    }

    async fn delete_blob_best_effort(&self, document: &Document) {
        if let Err(e) = self.storage.delete(&document.storage_key).await {
            error!(
                document_id = %document.id,
                key = %document.storage_key,
                error = %e,
                "Blob delete failed, leaving orphaned blob"
            );
        }
    }
}
