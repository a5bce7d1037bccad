use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use cividoc_broker::MessagePublisher;
use cividoc_core::AppError;
use cividoc_storage::{ObjectStorage, StorageError, StorageResult};

/// Object storage double that records every call instead of storing bytes.
///
/// Failure flags flip individual operations into errors so tests can drive
/// the engines through their storage failure paths.
#[derive(Clone, Default)]
pub struct RecordingStorage {
    puts: Arc<Mutex<Vec<(String, usize)>>>,
    deletes: Arc<Mutex<Vec<String>>>,
    fail_puts: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
    fail_signing: Arc<AtomicBool>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puts(&self) -> Vec<(String, usize)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_signing(&self, fail: bool) {
        self.fail_signing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed(
                "simulated upload failure".to_string(),
            ));
        }
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), data.len()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(
                "simulated delete failure".to_string(),
            ));
        }
        self.deletes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://storage.test/{}", key)
    }

    async fn presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(StorageError::SigningFailed(
                "simulated signing failure".to_string(),
            ));
        }
        Ok(format!(
            "https://storage.test/{}?expires={}",
            key,
            expires_in.as_secs()
        ))
    }

    fn bucket_name(&self) -> &str {
        "test-bucket"
    }
}

/// Publisher double that captures published messages in memory.
#[derive(Clone, Default)]
pub struct CapturingPublisher {
    published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    fail_publish: Arc<AtomicBool>,
}

impl CapturingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessagePublisher for CapturingPublisher {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), AppError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(AppError::Publish("simulated publish failure".to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push((queue.to_string(), payload));
        Ok(())
    }
}
