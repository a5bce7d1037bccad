use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use cividoc_broker::{MessageHandler, MessagePublisher};
use cividoc_core::models::{
    AuthenticationCompleted, DeliveryStatus, DocumentsReady, ProcessedMessage, UserTransferred,
};
use cividoc_core::AppError;
use cividoc_db::ProcessedMessageRepository;

use crate::authentication::AuthenticationEngine;
use crate::retention::RetentionEngine;

/// Idempotency gate shared by all inbound event handlers.
///
/// The broker delivers at least once; the ledger turns that into
/// effectively-once processing. A message is marked processed only AFTER
/// its handler succeeds, so a crash mid-handler results in redelivery,
/// not a lost event.
#[derive(Clone)]
pub struct IngestionService {
    processed: Arc<dyn ProcessedMessageRepository>,
    ttl_days: i64,
}

impl IngestionService {
    pub fn new(processed: Arc<dyn ProcessedMessageRepository>, ttl_days: i64) -> Self {
        Self {
            processed,
            ttl_days,
        }
    }

    pub async fn already_processed(&self, message_id: &str) -> Result<bool, AppError> {
        self.processed.check_if_processed(message_id).await
    }

    pub async fn record(
        &self,
        message_id: &str,
        document_id: Option<Uuid>,
        handler_name: &str,
    ) -> Result<(), AppError> {
        self.processed
            .mark_as_processed(&ProcessedMessage::new(
                message_id,
                document_id,
                handler_name,
                self.ttl_days,
            ))
            .await
    }
}

/// Applies authentication verdicts delivered on the completed queue.
pub struct AuthenticationCompletedHandler {
    ingestion: IngestionService,
    authentication: Arc<AuthenticationEngine>,
}

impl AuthenticationCompletedHandler {
    pub fn new(ingestion: IngestionService, authentication: Arc<AuthenticationEngine>) -> Self {
        Self {
            ingestion,
            authentication,
        }
    }
}

#[async_trait]
impl MessageHandler for AuthenticationCompletedHandler {
    fn name(&self) -> &'static str {
        "authentication_completed"
    }

    async fn handle(&self, message_id: &str, payload: &[u8]) -> Result<(), AppError> {
        // Malformed payload is terminal and is never marked processed.
        let event: AuthenticationCompleted = serde_json::from_slice(payload)?;

        if self.ingestion.already_processed(message_id).await? {
            info!(
                message_id = %message_id,
                document_id = %event.document_id,
                "Skipping already-processed authentication verdict"
            );
            return Ok(());
        }

        self.authentication
            .handle_authentication_completed(&event)
            .await?;

        self.ingestion
            .record(message_id, Some(event.document_id), self.name())
            .await
    }
}

/// Purges a transferred user's documents, then notifies the outcome.
pub struct UserTransferredHandler {
    ingestion: IngestionService,
    retention: Arc<RetentionEngine>,
    publisher: Arc<dyn MessagePublisher>,
    ready_queue: String,
}

impl UserTransferredHandler {
    pub fn new(
        ingestion: IngestionService,
        retention: Arc<RetentionEngine>,
        publisher: Arc<dyn MessagePublisher>,
        ready_queue: String,
    ) -> Self {
        Self {
            ingestion,
            retention,
            publisher,
            ready_queue,
        }
    }

    async fn notify(&self, owner_id: i64, status: DeliveryStatus, message: Option<String>) {
        let event = DocumentsReady {
            owner_id,
            status,
            message,
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(owner_id, error = %e, "Failed to serialize readiness notification");
                return;
            }
        };
        if let Err(e) = self.publisher.publish(&self.ready_queue, payload).await {
            error!(
                owner_id,
                queue = %self.ready_queue,
                error = %e,
                "Failed to publish readiness notification"
            );
        }
    }
}

#[async_trait]
impl MessageHandler for UserTransferredHandler {
    fn name(&self) -> &'static str {
        "user_transferred"
    }

    async fn handle(&self, message_id: &str, payload: &[u8]) -> Result<(), AppError> {
        let event: UserTransferred = serde_json::from_slice(payload)?;

        if self.ingestion.already_processed(message_id).await? {
            info!(
                message_id = %message_id,
                owner_id = event.owner_id,
                "Skipping already-processed transfer event"
            );
            return Ok(());
        }

        match self.retention.delete_all(event.owner_id).await {
            Ok(deleted) => {
                self.notify(
                    event.owner_id,
                    DeliveryStatus::Success,
                    Some(format!("{} documents deleted", deleted)),
                )
                .await;
            }
            Err(e) => {
                // Failure notification is best-effort; the error propagates
                // so the broker requeues the event.
                self.notify(
                    event.owner_id,
                    DeliveryStatus::Failure,
                    Some(e.to_string()),
                )
                .await;
                return Err(e);
            }
        }

        self.ingestion
            .record(message_id, None, self.name())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        CapturingPublisher, InMemoryDocumentRepository, InMemoryProcessedMessages,
        RecordingStorage,
    };
    use crate::upload::UploadEngine;
    use cividoc_core::models::{AuthenticationStatus, Document};
    use cividoc_db::DocumentRepository;
    use std::time::Duration;

    const READY_QUEUE: &str = "documents.ready";

    struct Fixture {
        documents: InMemoryDocumentRepository,
        processed: InMemoryProcessedMessages,
        publisher: CapturingPublisher,
        upload: UploadEngine,
        completed_handler: AuthenticationCompletedHandler,
        transferred_handler: UserTransferredHandler,
    }

    fn fixture() -> Fixture {
        let documents = InMemoryDocumentRepository::new();
        let processed = InMemoryProcessedMessages::new();
        let storage = RecordingStorage::new();
        let publisher = CapturingPublisher::new();

        let upload = UploadEngine::new(Arc::new(documents.clone()), Arc::new(storage.clone()));
        let authentication = Arc::new(AuthenticationEngine::new(
            Arc::new(documents.clone()),
            Arc::new(storage.clone()),
            Arc::new(publisher.clone()),
            "documents.authentication.request".to_string(),
            Duration::from_secs(24 * 3600),
        ));
        let retention = Arc::new(RetentionEngine::new(
            Arc::new(documents.clone()),
            Arc::new(storage),
        ));

        let ingestion = IngestionService::new(Arc::new(processed.clone()), 7);
        let completed_handler =
            AuthenticationCompletedHandler::new(ingestion.clone(), authentication);
        let transferred_handler = UserTransferredHandler::new(
            ingestion,
            retention,
            Arc::new(publisher.clone()),
            READY_QUEUE.to_string(),
        );

        Fixture {
            documents,
            processed,
            publisher,
            upload,
            completed_handler,
            transferred_handler,
        }
    }

    async fn authenticating_document(fx: &Fixture, owner_id: i64) -> Document {
        let doc = fx
            .upload
            .upload(b"scan".to_vec(), "scan.pdf", owner_id)
            .await
            .unwrap();
        fx.documents
            .update_authentication_status(doc.id, AuthenticationStatus::Authenticating)
            .await
            .unwrap()
    }

    fn completed_payload(doc: &Document, authenticated: bool) -> Vec<u8> {
        serde_json::to_vec(&AuthenticationCompleted {
            document_id: doc.id,
            owner_id: doc.owner_id,
            authenticated,
            message: None,
            authenticated_at: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn verdict_is_applied_once_and_recorded() {
        let fx = fixture();
        let doc = authenticating_document(&fx, 9).await;

        fx.completed_handler
            .handle("msg-1", &completed_payload(&doc, true))
            .await
            .unwrap();

        let stored = fx.documents.get_by_id(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AuthenticationStatus::Authenticated);
        assert_eq!(fx.processed.len(), 1);
    }

    #[tokio::test]
    async fn redelivered_verdict_applies_nothing() {
        let fx = fixture();
        let doc = authenticating_document(&fx, 9).await;

        fx.completed_handler
            .handle("msg-1", &completed_payload(&doc, true))
            .await
            .unwrap();

        // The document has since moved on; a redelivery of the same message
        // id must not drag the status backwards.
        let redelivery = completed_payload(&doc, false);
        fx.completed_handler.handle("msg-1", &redelivery).await.unwrap();

        let stored = fx.documents.get_by_id(doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AuthenticationStatus::Authenticated);
        assert_eq!(fx.processed.len(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_and_not_recorded() {
        let fx = fixture();

        let err = fx.completed_handler.handle("msg-bad", b"not json").await;

        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(fx.processed.is_empty());
    }

    #[tokio::test]
    async fn failed_verdict_is_not_recorded_so_redelivery_retries() {
        let fx = fixture();
        let ghost = Document {
            id: Uuid::new_v4(),
            ..authenticating_document(&fx, 9).await
        };

        let err = fx
            .completed_handler
            .handle("msg-1", &completed_payload(&ghost, true))
            .await;

        assert!(matches!(err, Err(AppError::NotFound(_))));
        assert!(fx.processed.is_empty());
    }

    #[tokio::test]
    async fn transfer_purges_and_notifies_success() {
        let fx = fixture();
        fx.upload.upload(b"a".to_vec(), "a.pdf", 4).await.unwrap();
        fx.upload.upload(b"b".to_vec(), "b.pdf", 4).await.unwrap();

        let payload = serde_json::to_vec(&UserTransferred { owner_id: 4 }).unwrap();
        fx.transferred_handler.handle("msg-t", &payload).await.unwrap();

        assert!(fx.documents.is_empty());
        assert_eq!(fx.processed.len(), 1);

        let published = fx.publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, READY_QUEUE);
        let notice: DocumentsReady = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(notice.owner_id, 4);
        assert_eq!(notice.status, DeliveryStatus::Success);
    }

    #[tokio::test]
    async fn transfer_with_no_documents_still_notifies_success() {
        let fx = fixture();

        let payload = serde_json::to_vec(&UserTransferred { owner_id: 4 }).unwrap();
        fx.transferred_handler.handle("msg-t", &payload).await.unwrap();

        let published = fx.publisher.published();
        assert_eq!(published.len(), 1);
        let notice: DocumentsReady = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(notice.status, DeliveryStatus::Success);
    }

    #[tokio::test]
    async fn redelivered_transfer_applies_nothing() {
        let fx = fixture();
        let payload = serde_json::to_vec(&UserTransferred { owner_id: 4 }).unwrap();

        fx.transferred_handler.handle("msg-t", &payload).await.unwrap();
        fx.transferred_handler.handle("msg-t", &payload).await.unwrap();

        assert_eq!(fx.publisher.published().len(), 1);
        assert_eq!(fx.processed.len(), 1);
    }

    #[tokio::test]
    async fn failed_purge_notifies_failure_and_requeues() {
        let fx = fixture();
        fx.upload.upload(b"a".to_vec(), "a.pdf", 4).await.unwrap();
        fx.documents.fail_bulk_delete(true);

        let payload = serde_json::to_vec(&UserTransferred { owner_id: 4 }).unwrap();
        let err = fx.transferred_handler.handle("msg-t", &payload).await;

        assert!(err.is_err());
        assert!(fx.processed.is_empty());

        let published = fx.publisher.published();
        assert_eq!(published.len(), 1);
        let notice: DocumentsReady = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(notice.status, DeliveryStatus::Failure);
    }
}
