use crate::traits::{ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    bucket: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blob storage (e.g., "/var/lib/cividoc/documents")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/documents")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let bucket = base_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());

        Ok(LocalStorage {
            base_path,
            base_url,
            bucket,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys containing path traversal sequences that could escape
    /// the base storage directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(key))
    }

    /// Generate public URL for a key
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.generate_url(key)
    }

    async fn presigned_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
        // The local backend has no signing authority; it validates the key
        // and returns the public URL. Development use only.
        self.key_to_path(key)?;
        Ok(self.generate_url(key))
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:4000/documents".to_string())
            .await
            .unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn put_then_delete_round_trip() {
        let (dir, storage) = test_storage().await;

        storage
            .put("ab/abcd.pdf", b"content".to_vec(), "application/pdf")
            .await
            .unwrap();
        assert!(dir.path().join("ab/abcd.pdf").exists());

        storage.delete("ab/abcd.pdf").await.unwrap();
        assert!(!dir.path().join("ab/abcd.pdf").exists());
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_ok() {
        let (_dir, storage) = test_storage().await;
        assert!(storage.delete("zz/missing.pdf").await.is_ok());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let (_dir, storage) = test_storage().await;
        let err = storage
            .put("../escape.pdf", b"x".to_vec(), "application/pdf")
            .await;
        assert!(matches!(err, Err(StorageError::InvalidKey(_))));

        let err = storage.presigned_url("/absolute", Duration::from_secs(60)).await;
        assert!(matches!(err, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn urls_are_base_url_plus_key() {
        let (_dir, storage) = test_storage().await;
        assert_eq!(
            storage.public_url("ab/abcd.pdf"),
            "http://localhost:4000/documents/ab/abcd.pdf"
        );
        let signed = storage
            .presigned_url("ab/abcd.pdf", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(signed, storage.public_url("ab/abcd.pdf"));
    }
}
