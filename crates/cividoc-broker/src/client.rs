use std::time::Duration;

use async_nats::jetstream::{self, stream::Config as StreamConfig};
use tracing::info;

use cividoc_core::AppError;

/// Owner of the single NATS connection for the process.
///
/// Publishers and consumers each hold their own JetStream context cloned
/// from this client; the underlying TCP connection is shared.
pub struct BrokerClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl BrokerClient {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, AppError> {
        info!(url = %url, timeout_secs = timeout.as_secs(), "Connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .map_err(|e| AppError::Publish(format!("Failed to connect to NATS: {}", e)))?;

        let jetstream = jetstream::new(client.clone());

        info!("Connected to NATS");
        Ok(Self { client, jetstream })
    }

    /// Create the stream if it does not exist. Each queue subject lives on
    /// its own stream so retention and consumers stay independent.
    pub async fn ensure_stream(&self, stream_name: &str, subject: &str) -> Result<(), AppError> {
        let stream_config = StreamConfig {
            name: stream_name.to_string(),
            subjects: vec![subject.to_string()],
            ..Default::default()
        };

        match self.jetstream.get_stream(stream_name).await {
            Ok(_) => {
                info!(stream = stream_name, "Stream already exists");
            }
            Err(_) => {
                self.jetstream
                    .create_stream(stream_config)
                    .await
                    .map_err(|e| {
                        AppError::Publish(format!("Failed to create stream {}: {}", stream_name, e))
                    })?;
                info!(stream = stream_name, subject = subject, "Created stream");
            }
        }

        Ok(())
    }

    pub fn jetstream(&self) -> jetstream::Context {
        self.jetstream.clone()
    }

    pub async fn flush(&self) -> Result<(), AppError> {
        self.client
            .flush()
            .await
            .map_err(|e| AppError::Publish(format!("Failed to flush NATS connection: {}", e)))
    }
}
