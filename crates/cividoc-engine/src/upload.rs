use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};
use uuid::Uuid;

use cividoc_core::models::{AuthenticationStatus, Document};
use cividoc_core::{derive_storage_key, mime, sha256_hex, AppError};
use cividoc_db::DocumentRepository;
use cividoc_storage::ObjectStorage;

/// Content-addressed upload with per-owner deduplication.
///
/// Uploading the same bytes twice for the same owner is not an error: the
/// second call returns the existing record without touching blob storage.
/// The dedup fingerprint is `(hash_sha256, owner_id)`, so identical bytes
/// from different owners produce independent documents and blobs.
pub struct UploadEngine {
    documents: Arc<dyn DocumentRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl UploadEngine {
    pub fn new(documents: Arc<dyn DocumentRepository>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { documents, storage }
    }

    /// Buffer a stream fully, then upload. Buffering once means the hash
    /// pass cannot disturb the subsequent blob write.
    pub async fn upload_reader<R>(
        &self,
        mut reader: R,
        filename: &str,
        owner_id: i64,
    ) -> Result<Document, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .await
            .map_err(|e| AppError::FileRead(format!("Failed to read upload stream: {}", e)))?;

        self.upload(content, filename, owner_id).await
    }

    pub async fn upload(
        &self,
        content: Vec<u8>,
        filename: &str,
        owner_id: i64,
    ) -> Result<Document, AppError> {
        let hash = sha256_hex(&content);

        if let Some(existing) = self
            .documents
            .find_by_hash_and_owner(&hash, owner_id)
            .await?
        {
            info!(
                document_id = %existing.id,
                owner_id,
                hash = %hash,
                "Duplicate upload, returning existing document"
            );
            return Ok(existing);
        }

        let content_type = mime::detect_content_type(filename);
        let storage_key = derive_storage_key(&hash, filename);
        let size_bytes = content.len() as i64;

        self.storage
            .put(&storage_key, content, content_type)
            .await
            .map_err(|e| AppError::StorageUpload(e.to_string()))?;

        debug!(key = %storage_key, size_bytes, "Blob stored");

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size_bytes,
            hash_sha256: hash,
            bucket: self.storage.bucket_name().to_string(),
            storage_key: storage_key.clone(),
            public_url: Some(self.storage.public_url(&storage_key)),
            owner_id,
            status: AuthenticationStatus::Unauthenticated,
            created_at: now,
            updated_at: now,
        };

        document.validate()?;

        let created = self.documents.create(&document).await?;

        info!(
            document_id = %created.id,
            owner_id,
            key = %created.storage_key,
            size_bytes = created.size_bytes,
            "Document uploaded"
        );

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{InMemoryDocumentRepository, RecordingStorage};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn engine() -> (UploadEngine, InMemoryDocumentRepository, RecordingStorage) {
        let documents = InMemoryDocumentRepository::new();
        let storage = RecordingStorage::new();
        let engine = UploadEngine::new(Arc::new(documents.clone()), Arc::new(storage.clone()));
        (engine, documents, storage)
    }

    #[tokio::test]
    async fn duplicate_upload_returns_existing_without_second_blob_write() {
        let (engine, documents, storage) = engine();

        let first = engine
            .upload(b"scan bytes".to_vec(), "passport.pdf", 7)
            .await
            .unwrap();
        let second = engine
            .upload(b"scan bytes".to_vec(), "passport.pdf", 7)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(documents.len(), 1);
        assert_eq!(storage.puts().len(), 1);
    }

    #[tokio::test]
    async fn same_bytes_different_owners_are_independent_documents() {
        let (engine, documents, storage) = engine();

        let a = engine
            .upload(b"shared bytes".to_vec(), "id.pdf", 1)
            .await
            .unwrap();
        let b = engine
            .upload(b"shared bytes".to_vec(), "id.pdf", 2)
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.hash_sha256, b.hash_sha256);
        assert_eq!(documents.len(), 2);
        assert_eq!(storage.puts().len(), 2);
    }

    #[tokio::test]
    async fn storage_key_is_deterministic_and_extension_lowercased() {
        let (engine, _documents, _storage) = engine();

        let doc = engine
            .upload(b"content".to_vec(), "Scan.PDF", 3)
            .await
            .unwrap();

        let expected = format!("{}/{}.pdf", &doc.hash_sha256[..2], doc.hash_sha256);
        assert_eq!(doc.storage_key, expected);
        assert_eq!(doc.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn filename_without_extension_gets_no_suffix_and_generic_type() {
        let (engine, _documents, _storage) = engine();

        let doc = engine.upload(b"content".to_vec(), "README", 3).await.unwrap();

        let expected = format!("{}/{}", &doc.hash_sha256[..2], doc.hash_sha256);
        assert_eq!(doc.storage_key, expected);
        assert_eq!(doc.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn empty_content_fails_validation_and_is_never_persisted() {
        let (engine, documents, _storage) = engine();

        let err = engine.upload(Vec::new(), "empty.pdf", 3).await;

        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn blob_write_failure_persists_nothing() {
        let (engine, documents, storage) = engine();
        storage.fail_puts(true);

        let err = engine.upload(b"content".to_vec(), "doc.pdf", 3).await;

        assert!(matches!(err, Err(AppError::StorageUpload(_))));
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn new_documents_start_unauthenticated() {
        let (engine, _documents, _storage) = engine();

        let doc = engine.upload(b"content".to_vec(), "doc.pdf", 3).await.unwrap();

        assert_eq!(doc.status, AuthenticationStatus::Unauthenticated);
        assert_eq!(doc.size_bytes, 7);
        assert_eq!(doc.bucket, "test-bucket");
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream died")))
        }
    }

    #[tokio::test]
    async fn stream_read_failure_surfaces_as_file_read_error() {
        let (engine, documents, storage) = engine();

        let err = engine.upload_reader(FailingReader, "doc.pdf", 3).await;

        assert!(matches!(err, Err(AppError::FileRead(_))));
        assert!(documents.is_empty());
        assert!(storage.puts().is_empty());
    }
}
