//! PostgreSQL metadata store: CRUD for the documents table.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scanvault_core::{AnalysisStatus, Document, StatusTransitionError};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};

use crate::traits::{MetadataError, MetadataResult, MetadataStore};

/// Row type for documents table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct DocumentRow {
    pub document_id: String,
    pub hash: String,
    pub tag: String,
    pub status: String,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DocumentRow {
    pub fn into_document(self) -> MetadataResult<Document> {
        let status = self
            .status
            .parse::<AnalysisStatus>()
            .map_err(MetadataError::Backend)?;
        Ok(Document {
            id: self.document_id,
            fingerprint: self.hash,
            tag: self.tag,
            status,
            analyzed_at: self.analyzed_at,
            created_at: self.created_at,
        })
    }
}

/// Connect a pool and apply the embedded migrations.
pub async fn connect_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> anyhow::Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Database connected successfully");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run database migrations: {}", e))?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Metadata store on the documents table.
#[derive(Clone)]
pub struct PostgresMetadataStore {
    pool: PgPool,
}

impl PostgresMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    #[tracing::instrument(skip(self, doc), fields(db.table = "documents", db.record_id = %doc.id))]
    async fn save(&self, doc: &Document) -> MetadataResult<()> {
        sqlx::query::<Postgres>(
            r#"
            INSERT INTO documents (document_id, hash, tag, status, analyzed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.fingerprint)
        .bind(&doc.tag)
        .bind(doc.status.as_str())
        .bind(doc.analyzed_at)
        .bind(doc.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = %id))]
    async fn get(&self, id: &str) -> MetadataResult<Document> {
        let row: Option<DocumentRow> = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            SELECT document_id, hash, tag, status, analyzed_at, created_at
            FROM documents
            WHERE document_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| MetadataError::NotFound(format!("id {id}")))?
            .into_document()
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents"))]
    async fn get_by_fingerprint(&self, fingerprint: &str) -> MetadataResult<Document> {
        let row: Option<DocumentRow> = sqlx::query_as::<Postgres, DocumentRow>(
            r#"
            SELECT document_id, hash, tag, status, analyzed_at, created_at
            FROM documents
            WHERE hash = $1
            "#,
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| MetadataError::NotFound(format!("fingerprint {fingerprint}")))?
            .into_document()
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = %id))]
    async fn update_status(
        &self,
        id: &str,
        status: AnalysisStatus,
        analyzed_at: DateTime<Utc>,
    ) -> MetadataResult<()> {
        if !status.is_terminal() {
            return Err(StatusTransitionError {
                id: id.to_string(),
                from: AnalysisStatus::Pending,
                to: status,
            }
            .into());
        }

        // The WHERE clause makes the pending -> verdict transition atomic.
        let result = sqlx::query::<Postgres>(
            r#"
            UPDATE documents
            SET status = $2, analyzed_at = $3
            WHERE document_id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(analyzed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let current = self.get(id).await?;
        Err(StatusTransitionError {
            id: id.to_string(),
            from: current.status,
            to: status,
        }
        .into())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = %id))]
    async fn delete(&self, id: &str) -> MetadataResult<()> {
        let result = sqlx::query::<Postgres>("DELETE FROM documents WHERE document_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("id {id}")));
        }
        Ok(())
    }

    async fn ping(&self) -> MetadataResult<()> {
        sqlx::query::<Postgres>("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| MetadataError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
