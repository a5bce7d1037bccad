use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use cividoc_core::models::{AuthenticationStatus, Document, ProcessedMessage};
use cividoc_core::AppError;
use cividoc_db::{DocumentRepository, ProcessedMessageRepository};

/// In-memory document repository backed by a `HashMap`.
#[derive(Clone, Default)]
pub struct InMemoryDocumentRepository {
    documents: Arc<Mutex<HashMap<Uuid, Document>>>,
    bulk_delete_calls: Arc<AtomicU64>,
    fail_bulk_delete: Arc<AtomicBool>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `delete_all_by_owner` invocations observed.
    pub fn bulk_delete_calls(&self) -> u64 {
        self.bulk_delete_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent `delete_all_by_owner` calls fail.
    pub fn fail_bulk_delete(&self, fail: bool) {
        self.fail_bulk_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn create(&self, document: &Document) -> Result<Document, AppError> {
        self.documents
            .lock()
            .unwrap()
            .insert(document.id, document.clone());
        Ok(document.clone())
    }

    async fn find_by_hash_and_owner(
        &self,
        hash: &str,
        owner_id: i64,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .find(|d| d.hash_sha256 == hash && d.owner_id == owner_id)
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.documents.lock().unwrap().get(&id).cloned())
    }

    async fn list(
        &self,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Document>, i64), AppError> {
        let mut owned: Vec<Document> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = owned.len() as i64;
        let page = owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.documents.lock().unwrap().remove(&id))
    }

    async fn delete_all_by_owner(&self, owner_id: i64) -> Result<u64, AppError> {
        self.bulk_delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_bulk_delete.load(Ordering::SeqCst) {
            return Err(AppError::Internal(
                "simulated bulk delete failure".to_string(),
            ));
        }

        let mut documents = self.documents.lock().unwrap();
        let before = documents.len();
        documents.retain(|_, d| d.owner_id != owner_id);
        Ok((before - documents.len()) as u64)
    }

    async fn update_authentication_status(
        &self,
        id: Uuid,
        status: AuthenticationStatus,
    ) -> Result<Document, AppError> {
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("document {} not found", id)))?;
        document.status = status;
        document.updated_at = Utc::now();
        Ok(document.clone())
    }
}

/// In-memory processed-message ledger.
#[derive(Clone, Default)]
pub struct InMemoryProcessedMessages {
    entries: Arc<Mutex<HashMap<String, ProcessedMessage>>>,
}

impl InMemoryProcessedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProcessedMessageRepository for InMemoryProcessedMessages {
    async fn check_if_processed(&self, message_id: &str) -> Result<bool, AppError> {
        Ok(self.entries.lock().unwrap().contains_key(message_id))
    }

    async fn mark_as_processed(&self, entry: &ProcessedMessage) -> Result<(), AppError> {
        self.entries
            .lock()
            .unwrap()
            .entry(entry.message_id.clone())
            .or_insert_with(|| entry.clone());
        Ok(())
    }
}
