use std::time::Duration;

use async_nats::jetstream::{self, consumer::PullConsumer, Message};
use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use cividoc_core::AppError;

const FETCH_BATCH_SIZE: usize = 16;
const FETCH_MAX_WAIT: Duration = Duration::from_secs(5);
const FETCH_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Per-message business handler. `Ok` acknowledges the message; `Err` naks
/// it for redelivery, so handlers must be idempotent.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Stable handler name, recorded in the idempotency ledger.
    fn name(&self) -> &'static str;

    async fn handle(&self, message_id: &str, payload: &[u8]) -> Result<(), AppError>;
}

/// Durable JetStream pull consumer bound to one queue and one handler.
pub struct QueueConsumer {
    consumer: PullConsumer,
    handler: Box<dyn MessageHandler>,
    queue: String,
}

impl QueueConsumer {
    pub async fn new(
        jetstream: &jetstream::Context,
        stream_name: &str,
        consumer_name: &str,
        queue: &str,
        handler: Box<dyn MessageHandler>,
    ) -> Result<Self, AppError> {
        let consumer = jetstream
            .create_consumer_on_stream(
                jetstream::consumer::pull::Config {
                    name: Some(consumer_name.to_string()),
                    durable_name: Some(consumer_name.to_string()),
                    filter_subject: queue.to_string(),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
                stream_name,
            )
            .await
            .map_err(|e| {
                AppError::Publish(format!(
                    "Failed to create consumer {} on {}: {}",
                    consumer_name, stream_name, e
                ))
            })?;

        info!(
            stream = stream_name,
            consumer = consumer_name,
            queue = queue,
            "Consumer created"
        );

        Ok(Self {
            consumer,
            handler,
            queue: queue.to_string(),
        })
    }

    /// Consume until cancelled. Fetch errors are logged and retried after a
    /// short backoff; handler errors nak only the affected message.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(queue = %self.queue, handler = self.handler.name(), "Starting consumer loop");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(queue = %self.queue, "Shutdown signal received, stopping consumer");
                    break;
                }
                result = self.fetch_and_process() => {
                    if let Err(e) = result {
                        error!(queue = %self.queue, error = %e, "Error fetching batch");
                        tokio::time::sleep(FETCH_ERROR_BACKOFF).await;
                    }
                }
            }
        }

        info!(queue = %self.queue, "Consumer stopped");
    }

    async fn fetch_and_process(&self) -> Result<(), AppError> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(FETCH_BATCH_SIZE)
            .expires(FETCH_MAX_WAIT)
            .messages()
            .await
            .map_err(|e| AppError::Publish(format!("Failed to fetch messages: {}", e)))?;

        while let Some(result) = messages.next().await {
            let message = match result {
                Ok(message) => message,
                Err(e) => {
                    warn!(queue = %self.queue, error = %e, "Error receiving message");
                    continue;
                }
            };

            self.process_one(message).await;
        }

        Ok(())
    }

    async fn process_one(&self, message: Message) {
        let message_id = derive_message_id(&message);

        match self.handler.handle(&message_id, &message.payload).await {
            Ok(()) => {
                if let Err(e) = message.ack().await {
                    error!(
                        queue = %self.queue,
                        message_id = %message_id,
                        error = %e,
                        "Failed to acknowledge message"
                    );
                }
                debug!(queue = %self.queue, message_id = %message_id, "Message processed");
            }
            Err(e) => {
                error!(
                    queue = %self.queue,
                    message_id = %message_id,
                    handler = self.handler.name(),
                    error = %e,
                    "Handler failed, requeueing message"
                );
                if let Err(e) = message.ack_with(jetstream::AckKind::Nak(None)).await {
                    error!(
                        queue = %self.queue,
                        message_id = %message_id,
                        error = %e,
                        "Failed to requeue message"
                    );
                }
            }
        }
    }
}

/// Stable id for the idempotency ledger. Prefer the publisher-supplied
/// `Nats-Msg-Id` header; fall back to subject plus stream sequence, which
/// is constant across redeliveries of the same stored message.
fn derive_message_id(message: &Message) -> String {
    if let Some(headers) = &message.headers {
        if let Some(id) = headers.get("Nats-Msg-Id") {
            return id.as_str().to_string();
        }
    }

    match message.info() {
        Ok(info) => format!("{}:{}", message.subject, info.stream_sequence),
        Err(_) => format!("{}:unknown", message.subject),
    }
}
