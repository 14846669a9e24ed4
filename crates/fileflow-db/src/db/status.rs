use async_trait::async_trait;
use fileflow_core::models::{FileProcessingStatus, StatusRecord, VersionTag, Versioned};
use fileflow_core::AppError;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::checked_table_name;

/// Keyed lookup of the current processing status of each file.
///
/// Every read returns a version tag; [`update_conditional`](StatusTable::update_conditional)
/// only succeeds while the stored version still matches it.
#[async_trait]
pub trait StatusTable: Send + Sync {
    /// Create the table if it does not exist. Idempotent.
    async fn ensure_exists(&self) -> Result<(), AppError>;

    async fn get(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Versioned<StatusRecord>>, AppError>;

    /// Insert or replace unconditionally. Last writer wins.
    async fn upsert_replace(&self, record: &StatusRecord) -> Result<(), AppError>;

    /// Replace the record if its stored version is still `version`, otherwise
    /// [`AppError::Conflict`].
    async fn update_conditional(
        &self,
        record: &StatusRecord,
        version: VersionTag,
    ) -> Result<(), AppError>;

    /// Insert a new record; [`AppError::Conflict`] if one already exists under the key.
    async fn insert(&self, record: &StatusRecord) -> Result<(), AppError>;
}

const STATUS_COLUMNS: &str = "partition_key, row_key, file_name, container_name, folder, status, \
     correlation_id, content_type, content_length, updated_at, version";

/// PostgreSQL-backed status table
#[derive(Clone)]
pub struct PostgresStatusTable {
    pool: PgPool,
    table: String,
}

impl PostgresStatusTable {
    pub fn new(pool: PgPool, table_name: &str) -> Result<Self, AppError> {
        Ok(Self {
            pool,
            table: checked_table_name(table_name)?,
        })
    }

    fn record_from_row(row: &PgRow) -> Result<Versioned<StatusRecord>, AppError> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<FileProcessingStatus>()
            .map_err(|e| AppError::Internal(format!("Corrupt status column: {}", e)))?;

        Ok(Versioned {
            value: StatusRecord {
                partition_key: row.try_get("partition_key")?,
                row_key: row.try_get("row_key")?,
                file_name: row.try_get("file_name")?,
                container_name: row.try_get("container_name")?,
                folder: row.try_get("folder")?,
                status,
                correlation_id: row.try_get("correlation_id")?,
                content_type: row.try_get("content_type")?,
                content_length: row.try_get("content_length")?,
                updated_at: Some(row.try_get("updated_at")?),
            },
            version: VersionTag(row.try_get("version")?),
        })
    }
}

#[async_trait]
impl StatusTable for PostgresStatusTable {
    #[tracing::instrument(skip(self), fields(db.table = %self.table, db.operation = "create"))]
    async fn ensure_exists(&self) -> Result<(), AppError> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                partition_key TEXT NOT NULL,
                row_key TEXT NOT NULL,
                file_name TEXT NOT NULL,
                container_name TEXT NOT NULL,
                folder TEXT NOT NULL,
                status TEXT NOT NULL,
                correlation_id TEXT,
                content_type TEXT,
                content_length BIGINT NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                version BIGINT NOT NULL DEFAULT 1,
                PRIMARY KEY (partition_key, row_key)
            )
            "#,
            self.table
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = %self.table, db.operation = "select"))]
    async fn get(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Versioned<StatusRecord>>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE partition_key = $1 AND row_key = $2",
            STATUS_COLUMNS, self.table
        );
        let row = sqlx::query(&sql)
            .bind(partition_key)
            .bind(row_key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    #[tracing::instrument(skip(self, record), fields(db.table = %self.table, db.operation = "upsert", db.record_id = %record.row_key))]
    async fn upsert_replace(&self, record: &StatusRecord) -> Result<(), AppError> {
        let sql = format!(
            r#"
            INSERT INTO {table} (partition_key, row_key, file_name, container_name, folder,
                                 status, correlation_id, content_type, content_length)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (partition_key, row_key) DO UPDATE SET
                file_name = EXCLUDED.file_name,
                container_name = EXCLUDED.container_name,
                folder = EXCLUDED.folder,
                status = EXCLUDED.status,
                correlation_id = EXCLUDED.correlation_id,
                content_type = EXCLUDED.content_type,
                content_length = EXCLUDED.content_length,
                updated_at = now(),
                version = {table}.version + 1
            "#,
            table = self.table
        );
        sqlx::query(&sql)
            .bind(&record.partition_key)
            .bind(&record.row_key)
            .bind(&record.file_name)
            .bind(&record.container_name)
            .bind(&record.folder)
            .bind(record.status.to_string())
            .bind(&record.correlation_id)
            .bind(&record.content_type)
            .bind(record.content_length)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(db.table = %self.table, db.operation = "update", db.record_id = %record.row_key, db.version = %version))]
    async fn update_conditional(
        &self,
        record: &StatusRecord,
        version: VersionTag,
    ) -> Result<(), AppError> {
        let sql = format!(
            r#"
            UPDATE {} SET
                file_name = $3,
                container_name = $4,
                folder = $5,
                status = $6,
                correlation_id = $7,
                content_type = $8,
                content_length = $9,
                updated_at = now(),
                version = version + 1
            WHERE partition_key = $1 AND row_key = $2 AND version = $10
            "#,
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(&record.partition_key)
            .bind(&record.row_key)
            .bind(&record.file_name)
            .bind(&record.container_name)
            .bind(&record.folder)
            .bind(record.status.to_string())
            .bind(&record.correlation_id)
            .bind(&record.content_type)
            .bind(record.content_length)
            .bind(version.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Status record '{}' changed since version {} was read",
                record.row_key, version
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(db.table = %self.table, db.operation = "insert", db.record_id = %record.row_key))]
    async fn insert(&self, record: &StatusRecord) -> Result<(), AppError> {
        let sql = format!(
            r#"
            INSERT INTO {} (partition_key, row_key, file_name, container_name, folder,
                            status, correlation_id, content_type, content_length)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (partition_key, row_key) DO NOTHING
            "#,
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(&record.partition_key)
            .bind(&record.row_key)
            .bind(&record.file_name)
            .bind(&record.container_name)
            .bind(&record.folder)
            .bind(record.status.to_string())
            .bind(&record.correlation_id)
            .bind(&record.content_type)
            .bind(record.content_length)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Status record '{}' was created concurrently",
                record.row_key
            )));
        }
        Ok(())
    }
}
