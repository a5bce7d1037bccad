use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use cividoc_core::models::{AuthenticationCompleted, AuthenticationRequested, AuthenticationStatus};
use cividoc_core::AppError;
use cividoc_broker::MessagePublisher;
use cividoc_db::DocumentRepository;
use cividoc_storage::ObjectStorage;

/// Three-state authentication workflow.
///
/// Requesting authentication persists the `authenticating` status BEFORE
/// any outbound side effect, so a crash between the status write and the
/// publish leaves the document observably in-flight rather than silently
/// stuck. There is no internal retry; the caller re-requests.
pub struct AuthenticationEngine {
    documents: Arc<dyn DocumentRepository>,
    storage: Arc<dyn ObjectStorage>,
    publisher: Arc<dyn MessagePublisher>,
    request_queue: String,
    signed_url_ttl: Duration,
}

impl AuthenticationEngine {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        storage: Arc<dyn ObjectStorage>,
        publisher: Arc<dyn MessagePublisher>,
        request_queue: String,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            documents,
            storage,
            publisher,
            request_queue,
            signed_url_ttl,
        }
    }

    /// Start (or restart) authentication for a document.
    ///
    /// Re-requesting while already `authenticating` is allowed and simply
    /// re-publishes the request event with a fresh signed URL.
    pub async fn request_authentication(
        &self,
        document_id: Uuid,
    ) -> Result<AuthenticationRequested, AppError> {
        let document = self
            .documents
            .get_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document {} not found", document_id)))?;

        if !document
            .status
            .can_transition_to(AuthenticationStatus::Authenticating)
        {
            return Err(AppError::Validation(format!(
                "cannot request authentication for document in status {}",
                document.status
            )));
        }

        let document = self
            .documents
            .update_authentication_status(document_id, AuthenticationStatus::Authenticating)
            .await?;

        let signed_url = self
            .storage
            .presigned_url(&document.storage_key, self.signed_url_ttl)
            .await
            .map_err(|e| AppError::SignedUrl(e.to_string()))?;

        let event = AuthenticationRequested {
            owner_id: document.owner_id,
            signed_url,
            document_title: document.filename.clone(),
            document_id: document.id,
        };

        self.publisher
            .publish(&self.request_queue, serde_json::to_vec(&event)?)
            .await?;

        info!(
            document_id = %document.id,
            owner_id = document.owner_id,
            queue = %self.request_queue,
            "Authentication requested"
        );

        Ok(event)
    }

    /// Apply an authentication verdict delivered by the broker.
    ///
    /// `authenticated: true` finalizes the document; `false` returns it to
    /// `unauthenticated` so it can be resubmitted. Store failures propagate
    /// so the broker adapter requeues the event.
    pub async fn handle_authentication_completed(
        &self,
        event: &AuthenticationCompleted,
    ) -> Result<(), AppError> {
        let next = AuthenticationStatus::from_completion(event.authenticated);

        let current = self
            .documents
            .get_by_id(event.document_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("document {} not found", event.document_id))
            })?;

        if !current.status.can_transition_to(next) {
            // Usually a late or reordered event. Applying the verdict is
            // still correct: the broker side owns the outcome.
            warn!(
                document_id = %event.document_id,
                from = %current.status,
                to = %next,
                "Out-of-order authentication verdict, applying anyway"
            );
        }

        let document = self
            .documents
            .update_authentication_status(event.document_id, next)
            .await?;

        info!(
            document_id = %document.id,
            owner_id = document.owner_id,
            status = %document.status,
            "Authentication verdict applied"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{CapturingPublisher, InMemoryDocumentRepository, RecordingStorage};
    use crate::upload::UploadEngine;
    use cividoc_core::models::Document;

    const QUEUE: &str = "documents.authentication.request";

    struct Fixture {
        documents: InMemoryDocumentRepository,
        storage: RecordingStorage,
        publisher: CapturingPublisher,
        engine: AuthenticationEngine,
    }

    async fn fixture_with_document() -> (Fixture, Document) {
        let documents = InMemoryDocumentRepository::new();
        let storage = RecordingStorage::new();
        let publisher = CapturingPublisher::new();

        let upload = UploadEngine::new(Arc::new(documents.clone()), Arc::new(storage.clone()));
        let document = upload
            .upload(b"identity scan".to_vec(), "passport.pdf", 11)
            .await
            .unwrap();

        let engine = AuthenticationEngine::new(
            Arc::new(documents.clone()),
            Arc::new(storage.clone()),
            Arc::new(publisher.clone()),
            QUEUE.to_string(),
            Duration::from_secs(24 * 3600),
        );

        (
            Fixture {
                documents,
                storage,
                publisher,
                engine,
            },
            document,
        )
    }

    #[tokio::test]
    async fn request_persists_status_and_publishes_exactly_one_event() {
        let (fx, document) = fixture_with_document().await;

        let event = fx.engine.request_authentication(document.id).await.unwrap();

        let stored = fx.documents.get_by_id(document.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AuthenticationStatus::Authenticating);

        let published = fx.publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, QUEUE);

        let payload: AuthenticationRequested =
            serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(payload.document_id, document.id);
        assert_eq!(payload.owner_id, 11);
        assert_eq!(payload.document_title, "passport.pdf");
        assert_eq!(payload.signed_url, event.signed_url);
        assert!(payload.signed_url.contains(&document.storage_key));
    }

    #[tokio::test]
    async fn re_request_while_authenticating_republishes() {
        let (fx, document) = fixture_with_document().await;

        fx.engine.request_authentication(document.id).await.unwrap();
        fx.engine.request_authentication(document.id).await.unwrap();

        assert_eq!(fx.publisher.published().len(), 2);
        let stored = fx.documents.get_by_id(document.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AuthenticationStatus::Authenticating);
    }

    #[tokio::test]
    async fn request_on_authenticated_document_is_rejected() {
        let (fx, document) = fixture_with_document().await;
        fx.documents
            .update_authentication_status(document.id, AuthenticationStatus::Authenticating)
            .await
            .unwrap();
        fx.documents
            .update_authentication_status(document.id, AuthenticationStatus::Authenticated)
            .await
            .unwrap();

        let err = fx.engine.request_authentication(document.id).await;

        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(fx.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn request_for_unknown_document_is_not_found() {
        let (fx, _document) = fixture_with_document().await;

        let err = fx.engine.request_authentication(Uuid::new_v4()).await;

        assert!(matches!(err, Err(AppError::NotFound(_))));
        assert!(fx.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn signing_failure_leaves_status_authenticating_and_publishes_nothing() {
        let (fx, document) = fixture_with_document().await;
        fx.storage.fail_signing(true);

        let err = fx.engine.request_authentication(document.id).await;

        assert!(matches!(err, Err(AppError::SignedUrl(_))));
        let stored = fx.documents.get_by_id(document.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AuthenticationStatus::Authenticating);
        assert!(fx.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_leaves_status_authenticating() {
        let (fx, document) = fixture_with_document().await;
        fx.publisher.fail_publish(true);

        let err = fx.engine.request_authentication(document.id).await;

        assert!(matches!(err, Err(AppError::Publish(_))));
        let stored = fx.documents.get_by_id(document.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AuthenticationStatus::Authenticating);
    }

    #[tokio::test]
    async fn positive_verdict_finalizes_document() {
        let (fx, document) = fixture_with_document().await;
        fx.engine.request_authentication(document.id).await.unwrap();

        fx.engine
            .handle_authentication_completed(&AuthenticationCompleted {
                document_id: document.id,
                owner_id: document.owner_id,
                authenticated: true,
                message: None,
                authenticated_at: None,
            })
            .await
            .unwrap();

        let stored = fx.documents.get_by_id(document.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AuthenticationStatus::Authenticated);
    }

    #[tokio::test]
    async fn negative_verdict_returns_document_to_unauthenticated() {
        let (fx, document) = fixture_with_document().await;
        fx.engine.request_authentication(document.id).await.unwrap();

        fx.engine
            .handle_authentication_completed(&AuthenticationCompleted {
                document_id: document.id,
                owner_id: document.owner_id,
                authenticated: false,
                message: Some("blurry scan".to_string()),
                authenticated_at: None,
            })
            .await
            .unwrap();

        let stored = fx.documents.get_by_id(document.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AuthenticationStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn verdict_for_unknown_document_is_not_found() {
        let (fx, _document) = fixture_with_document().await;

        let err = fx
            .engine
            .handle_authentication_completed(&AuthenticationCompleted {
                document_id: Uuid::new_v4(),
                owner_id: 11,
                authenticated: true,
                message: None,
                authenticated_at: None,
            })
            .await;

        assert!(matches!(err, Err(AppError::NotFound(_))));
    }
}
