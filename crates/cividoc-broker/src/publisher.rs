use async_nats::jetstream;
use async_trait::async_trait;
use tracing::debug;

use cividoc_core::AppError;

/// Outbound message capability. The engine publishes through this trait so
/// tests can capture events without a running broker.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a payload to the named queue and wait for broker
    /// acknowledgment. An error means the message may not be durably stored.
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), AppError>;
}

/// JetStream-backed publisher. Publishes are double-acked: the call returns
/// only after the server confirms the message is stored in the stream.
pub struct JetStreamPublisher {
    jetstream: jetstream::Context,
}

impl JetStreamPublisher {
    pub fn new(jetstream: jetstream::Context) -> Self {
        Self { jetstream }
    }
}

#[async_trait]
impl MessagePublisher for JetStreamPublisher {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), AppError> {
        let size_bytes = payload.len();

        let ack = self
            .jetstream
            .publish(queue.to_string(), payload.into())
            .await
            .map_err(|e| AppError::Publish(format!("Failed to publish to {}: {}", queue, e)))?;

        ack.await.map_err(|e| {
            AppError::Publish(format!("No broker acknowledgment for {}: {}", queue, e))
        })?;

        debug!(queue = queue, size_bytes, "Published message");
        Ok(())
    }
}
