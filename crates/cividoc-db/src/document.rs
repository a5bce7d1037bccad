use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use cividoc_core::models::{AuthenticationStatus, Document};
use cividoc_core::AppError;

/// Durable store for document records, keyed by id and by (hash, owner).
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Persist a new document record. The record must already be validated.
    async fn create(&self, document: &Document) -> Result<Document, AppError>;

    /// Dedup lookup by content fingerprint `(hash, owner_id)`.
    async fn find_by_hash_and_owner(
        &self,
        hash: &str,
        owner_id: i64,
    ) -> Result<Option<Document>, AppError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    /// List an owner's documents, newest first, with the total count.
    async fn list(
        &self,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Document>, i64), AppError>;

    /// Delete by id, returning the deleted record when it existed.
    async fn delete_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError>;

    /// Bulk delete all of an owner's records, returning the deleted count.
    async fn delete_all_by_owner(&self, owner_id: i64) -> Result<u64, AppError>;

    /// Persist an authentication status transition.
    async fn update_authentication_status(
        &self,
        id: Uuid,
        status: AuthenticationStatus,
    ) -> Result<Document, AppError>;
}

/// Database row shape for the `documents` table.
///
/// Status is stored as text and parsed back into the enum; the parse can
/// only fail if the table holds a value the application never wrote.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    filename: String,
    content_type: String,
    size_bytes: i64,
    hash_sha256: String,
    bucket: String,
    storage_key: String,
    public_url: Option<String>,
    owner_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, AppError> {
        let status = self
            .status
            .parse::<AuthenticationStatus>()
            .map_err(|_| AppError::Internal(format!("invalid status in store: {}", self.status)))?;
        Ok(Document {
            id: self.id,
            filename: self.filename,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            hash_sha256: self.hash_sha256,
            bucket: self.bucket,
            storage_key: self.storage_key,
            public_url: self.public_url,
            owner_id: self.owner_id,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// PostgreSQL-backed document repository.
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    #[tracing::instrument(skip(self, document), fields(db.table = "documents", db.operation = "insert", document_id = %document.id))]
    async fn create(&self, document: &Document) -> Result<Document, AppError> {
        let row: DocumentRow = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            INSERT INTO documents (
                id, filename, content_type, size_bytes, hash_sha256,
                bucket, storage_key, public_url, owner_id, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(document.id)
        .bind(&document.filename)
        .bind(&document.content_type)
        .bind(document.size_bytes)
        .bind(&document.hash_sha256)
        .bind(&document.bucket)
        .bind(&document.storage_key)
        .bind(&document.public_url)
        .bind(document.owner_id)
        .bind(document.status.as_str())
        .bind(document.created_at)
        .bind(document.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row.into_document()
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn find_by_hash_and_owner(
        &self,
        hash: &str,
        owner_id: i64,
    ) -> Result<Option<Document>, AppError> {
        let row: Option<DocumentRow> = sqlx::query_as::<Postgres, DocumentRow>(
            "SELECT * FROM documents WHERE hash_sha256 = $1 AND owner_id = $2",
        )
        .bind(hash)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let row: Option<DocumentRow> =
            sqlx::query_as::<Postgres, DocumentRow>("SELECT * FROM documents WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn list(
        &self,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Document>, i64), AppError> {
        let rows: Vec<DocumentRow> = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            SELECT * FROM documents
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await?;

        let documents = rows
            .into_iter()
            .map(DocumentRow::into_document)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((documents, total))
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete"))]
    async fn delete_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let row: Option<DocumentRow> = sqlx::query_as::<Postgres, DocumentRow>(
            "DELETE FROM documents WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_document).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete"))]
    async fn delete_all_by_owner(&self, owner_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", document_id = %id))]
    async fn update_authentication_status(
        &self,
        id: Uuid,
        status: AuthenticationStatus,
    ) -> Result<Document, AppError> {
        let row: Option<DocumentRow> = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            UPDATE documents
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRow::into_document)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("document {} not found", id)))
    }
}
