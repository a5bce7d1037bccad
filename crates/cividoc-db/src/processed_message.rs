use async_trait::async_trait;
use sqlx::PgPool;

use cividoc_core::models::ProcessedMessage;
use cividoc_core::AppError;

/// Idempotency ledger for inbound broker messages.
///
/// A message id not present in the ledger is treated as unprocessed. This
/// sits on top of at-least-once broker delivery: the broker may redeliver
/// on ack timeout or consumer restart, and the ledger makes the handlers
/// idempotent instead of relying on the operations being naturally so.
#[async_trait]
pub trait ProcessedMessageRepository: Send + Sync {
    async fn check_if_processed(&self, message_id: &str) -> Result<bool, AppError>;

    async fn mark_as_processed(&self, entry: &ProcessedMessage) -> Result<(), AppError>;
}

/// PostgreSQL-backed processed-message ledger.
#[derive(Clone)]
pub struct PgProcessedMessageRepository {
    pool: PgPool,
}

impl PgProcessedMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Purge entries past their TTL. Bounds ledger growth; intended to be
    /// run periodically by the worker.
    #[tracing::instrument(skip(self), fields(db.table = "processed_messages", db.operation = "delete"))]
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM processed_messages WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        let purged = result.rows_affected();
        if purged > 0 {
            tracing::info!(purged, "Purged expired processed-message entries");
        }
        Ok(purged)
    }
}

#[async_trait]
impl ProcessedMessageRepository for PgProcessedMessageRepository {
    #[tracing::instrument(skip(self), fields(db.table = "processed_messages", db.operation = "select"))]
    async fn check_if_processed(&self, message_id: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM processed_messages WHERE message_id = $1)",
        )
        .bind(message_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip(self, entry), fields(db.table = "processed_messages", db.operation = "insert", message_id = %entry.message_id))]
    async fn mark_as_processed(&self, entry: &ProcessedMessage) -> Result<(), AppError> {
        // ON CONFLICT DO NOTHING: a concurrent redelivery racing past the
        // check must not fail the handler.
        sqlx::query(
            r#"
            INSERT INTO processed_messages (
                message_id, processed_at, document_id, handler_name, expires_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (message_id) DO NOTHING
            "#,
        )
        .bind(&entry.message_id)
        .bind(entry.processed_at)
        .bind(entry.document_id)
        .bind(&entry.handler_name)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
