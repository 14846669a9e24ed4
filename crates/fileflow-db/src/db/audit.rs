use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fileflow_core::models::{AuditEntry, AuditFilter, FileActionType, FileProcessingStatus, NewAuditEntry};
use fileflow_core::AppError;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::checked_table_name;

/// Rows fetched per round trip when streaming a query.
const AUDIT_PAGE_SIZE: i64 = 100;

/// Append-only log of actions taken on files.
///
/// Entries are never updated or deleted. Queries yield newest first.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Create the log if it does not exist. Idempotent.
    async fn ensure_exists(&self) -> Result<(), AppError>;

    /// Store an entry and return it with its server timestamp.
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError>;

    /// Lazily stream the entries matching `filter`, newest first.
    fn query(&self, filter: AuditFilter) -> BoxStream<'static, Result<AuditEntry, AppError>>;
}

/// PostgreSQL-backed audit log
///
/// `seq` orders entries by insertion and doubles as the keyset cursor for streaming.
#[derive(Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
    table: String,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool, table_name: &str) -> Result<Self, AppError> {
        Ok(Self {
            pool,
            table: checked_table_name(table_name)?,
        })
    }

    fn entry_from_row(row: &PgRow) -> Result<(i64, AuditEntry), AppError> {
        let status: String = row.try_get("status")?;
        let action: String = row.try_get("action")?;
        let status = status
            .parse::<FileProcessingStatus>()
            .map_err(|e| AppError::Internal(format!("Corrupt status column: {}", e)))?;
        let action = action
            .parse::<FileActionType>()
            .map_err(|e| AppError::Internal(format!("Corrupt action column: {}", e)))?;

        let entry = AuditEntry {
            partition_key: row.try_get("partition_key")?,
            id: row.try_get("id")?,
            blob_name: row.try_get("blob_name")?,
            container_name: row.try_get("container_name")?,
            file_name: row.try_get("file_name")?,
            folder: row.try_get("folder")?,
            status,
            action,
            content_type: row.try_get("content_type")?,
            content_length: row.try_get("content_length")?,
            comment: row.try_get("comment")?,
            correlation_id: row.try_get("correlation_id")?,
            timestamp: row.try_get("created_at")?,
        };
        Ok((row.try_get("seq")?, entry))
    }
}

/// Cursor state for a streaming query.
struct QueryCursor {
    pool: PgPool,
    sql: String,
    value: String,
    before_seq: Option<i64>,
    exhausted: bool,
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    #[tracing::instrument(skip(self), fields(db.table = %self.table, db.operation = "create"))]
    async fn ensure_exists(&self) -> Result<(), AppError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                seq BIGSERIAL PRIMARY KEY,
                partition_key TEXT NOT NULL,
                id UUID NOT NULL UNIQUE,
                blob_name TEXT NOT NULL,
                container_name TEXT NOT NULL,
                file_name TEXT NOT NULL,
                folder TEXT,
                status TEXT NOT NULL,
                action TEXT NOT NULL,
                content_type TEXT,
                content_length BIGINT NOT NULL DEFAULT 0,
                comment TEXT,
                correlation_id TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            self.table
        );
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_blob_name_idx ON {table} (blob_name, seq DESC)",
            table = self.table
        );

        sqlx::query(&create_table).execute(&self.pool).await?;
        sqlx::query(&create_index).execute(&self.pool).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, entry), fields(db.table = %self.table, db.operation = "insert", db.record_id = %entry.id))]
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError> {
        let sql = format!(
            r#"
            INSERT INTO {} (partition_key, id, blob_name, container_name, file_name, folder,
                            status, action, content_type, content_length, comment, correlation_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING created_at
            "#,
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(fileflow_core::constants::AUDIT_PARTITION)
            .bind(entry.id)
            .bind(&entry.blob_name)
            .bind(&entry.container_name)
            .bind(&entry.file_name)
            .bind(&entry.folder)
            .bind(entry.status.to_string())
            .bind(entry.action.to_string())
            .bind(&entry.content_type)
            .bind(entry.content_length)
            .bind(&entry.comment)
            .bind(&entry.correlation_id)
            .fetch_one(&self.pool)
            .await?;

        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        Ok(AuditEntry::stamped(entry, created_at))
    }

    fn query(&self, filter: AuditFilter) -> BoxStream<'static, Result<AuditEntry, AppError>> {
        let (column, value) = match filter {
            AuditFilter::BlobName(name) => ("blob_name", name),
            AuditFilter::Partition(partition) => ("partition_key", partition),
        };
        let sql = format!(
            r#"
            SELECT seq, partition_key, id, blob_name, container_name, file_name, folder, status,
                   action, content_type, content_length, comment, correlation_id, created_at
            FROM {}
            WHERE {} = $1 AND ($2::BIGINT IS NULL OR seq < $2)
            ORDER BY seq DESC
            LIMIT $3
            "#,
            self.table, column
        );
        tracing::debug!(db.table = %self.table, filter_column = column, "Streaming audit entries");

        let cursor = QueryCursor {
            pool: self.pool.clone(),
            sql,
            value,
            before_seq: None,
            exhausted: false,
        };

        stream::try_unfold(cursor, |mut cursor| async move {
            if cursor.exhausted {
                return Ok::<_, AppError>(None);
            }

            let rows = sqlx::query(&cursor.sql)
                .bind(&cursor.value)
                .bind(cursor.before_seq)
                .bind(AUDIT_PAGE_SIZE)
                .fetch_all(&cursor.pool)
                .await?;

            let mut page = Vec::with_capacity(rows.len());
            for row in &rows {
                let (seq, entry) = Self::entry_from_row(row)?;
                cursor.before_seq = Some(seq);
                page.push(entry);
            }
            cursor.exhausted = (rows.len() as i64) < AUDIT_PAGE_SIZE;

            if page.is_empty() {
                Ok(None)
            } else {
                Ok(Some((page, cursor)))
            }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, AppError>)))
        .try_flatten()
        .boxed()
    }
}
