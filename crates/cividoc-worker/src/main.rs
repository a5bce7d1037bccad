//! CiviDoc worker binary.
//!
//! Wires configuration, PostgreSQL, object storage, and NATS together,
//! then runs the broker consumer loops until a shutdown signal arrives.

mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cividoc_broker::{BrokerClient, JetStreamPublisher, QueueConsumer};
use cividoc_core::Config;
use cividoc_db::{PgDocumentRepository, PgProcessedMessageRepository};
use cividoc_engine::{
    AuthenticationCompletedHandler, AuthenticationEngine, IngestionService, RetentionEngine,
    UserTransferredHandler,
};

const LEDGER_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    telemetry::init_telemetry(&config);

    info!(environment = %config.environment, "Starting cividoc worker");

    let pool = cividoc_db::create_pool(&config)
        .await
        .context("Failed to connect to PostgreSQL")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let documents = Arc::new(PgDocumentRepository::new(pool.clone()));
    let processed = PgProcessedMessageRepository::new(pool.clone());

    let storage = cividoc_storage::create_storage(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize object storage: {}", e))?;

    let broker = BrokerClient::connect(
        &config.nats_url,
        Duration::from_secs(config.nats_connect_timeout_seconds),
    )
    .await
    .context("Failed to connect to NATS")?;

    for queue in [
        &config.authentication_request_queue,
        &config.authentication_completed_queue,
        &config.user_transferred_queue,
        &config.documents_ready_queue,
    ] {
        broker
            .ensure_stream(&stream_name(queue), queue)
            .await
            .with_context(|| format!("Failed to ensure stream for {}", queue))?;
    }

    let publisher = Arc::new(JetStreamPublisher::new(broker.jetstream()));

    let authentication = Arc::new(AuthenticationEngine::new(
        documents.clone(),
        storage.clone(),
        publisher.clone(),
        config.authentication_request_queue.clone(),
        Duration::from_secs(config.auth_url_ttl_hours as u64 * 3600),
    ));
    let retention = Arc::new(RetentionEngine::new(documents.clone(), storage.clone()));
    let ingestion = IngestionService::new(
        Arc::new(processed.clone()),
        config.processed_message_ttl_days,
    );

    let completed_consumer = QueueConsumer::new(
        &broker.jetstream(),
        &stream_name(&config.authentication_completed_queue),
        "cividoc-authentication-completed",
        &config.authentication_completed_queue,
        Box::new(AuthenticationCompletedHandler::new(
            ingestion.clone(),
            authentication,
        )),
    )
    .await
    .context("Failed to create authentication-completed consumer")?;

    let transferred_consumer = QueueConsumer::new(
        &broker.jetstream(),
        &stream_name(&config.user_transferred_queue),
        "cividoc-user-transferred",
        &config.user_transferred_queue,
        Box::new(UserTransferredHandler::new(
            ingestion,
            retention,
            publisher,
            config.documents_ready_queue.clone(),
        )),
    )
    .await
    .context("Failed to create user-transferred consumer")?;

    let shutdown = CancellationToken::new();

    let mut tasks = Vec::new();
    {
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            completed_consumer.run(token).await;
        }));
    }
    {
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            transferred_consumer.run(token).await;
        }));
    }
    {
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            run_ledger_purge(processed, token).await;
        }));
    }

    info!("Worker started, waiting for shutdown signal");
    wait_for_shutdown_signal().await;

    info!("Shutdown signal received, stopping consumers");
    shutdown.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            error!(error = %e, "Worker task panicked during shutdown");
        }
    }

    broker.flush().await.ok();
    pool.close().await;
    info!("Worker stopped");
    Ok(())
}

/// JetStream stream names cannot contain dots.
fn stream_name(queue: &str) -> String {
    queue.replace('.', "_").to_uppercase()
}

/// Periodically delete expired idempotency-ledger entries.
async fn run_ledger_purge(ledger: PgProcessedMessageRepository, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(LEDGER_PURGE_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = ledger.purge_expired().await {
                    error!(error = %e, "Ledger purge failed");
                }
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
