use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use cividoc_core::models::Document;
use cividoc_core::AppError;
use cividoc_db::DocumentRepository;
use cividoc_storage::ObjectStorage;

/// One document in a transfer batch, with its time-limited download URL.
#[derive(Debug, Clone)]
pub struct TransferItem {
    pub document: Document,
    pub signed_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Time-limited export of an owner's documents.
///
/// Every URL in a batch expires at the same instant, computed once up
/// front, so the receiving side gets a single deadline for the whole
/// batch rather than a stagger of per-document ones.
pub struct TransferEngine {
    documents: Arc<dyn DocumentRepository>,
    storage: Arc<dyn ObjectStorage>,
    batch_limit: i64,
    url_ttl: Duration,
}

impl TransferEngine {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        storage: Arc<dyn ObjectStorage>,
        batch_limit: i64,
        url_ttl: Duration,
    ) -> Self {
        Self {
            documents,
            storage,
            batch_limit,
            url_ttl,
        }
    }

    /// Sign download URLs for up to `batch_limit` of the owner's documents.
    ///
    /// All-or-nothing: any signing failure fails the whole batch. Zero
    /// documents is an empty batch, not an error.
    pub async fn prepare_transfer(&self, owner_id: i64) -> Result<Vec<TransferItem>, AppError> {
        let (documents, total) = self.documents.list(owner_id, self.batch_limit, 0).await?;

        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.url_ttl)
                .map_err(|e| AppError::Internal(format!("invalid transfer URL TTL: {}", e)))?;

        let mut items = Vec::with_capacity(documents.len());
        for document in documents {
            // Per-URL TTL is the time remaining to the shared batch expiry.
            let remaining = (expires_at - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);

            let signed_url = self
                .storage
                .presigned_url(&document.storage_key, remaining)
                .await
                .map_err(|e| AppError::SignedUrl(e.to_string()))?;

            items.push(TransferItem {
                document,
                signed_url,
                expires_at,
            });
        }

        info!(
            owner_id,
            batch_size = items.len(),
            total_documents = total,
            expires_at = %expires_at,
            "Transfer batch prepared"
        );

        Ok(items)
    }
}
