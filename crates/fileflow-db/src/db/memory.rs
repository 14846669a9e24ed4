//! In-process status table and audit log
//!
//! Same contracts as the PostgreSQL stores, held in `Arc<Mutex<..>>` so clones share state.

use async_trait::async_trait;
use chrono::Utc;
use fileflow_core::models::{AuditEntry, AuditFilter, NewAuditEntry, StatusRecord, VersionTag, Versioned};
use fileflow_core::AppError;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{AuditLog, StatusTable};

/// In-memory status table
#[derive(Clone, Default)]
#[allow(clippy::type_complexity)]
pub struct InMemoryStatusTable {
    rows: Arc<Mutex<HashMap<(String, String), Versioned<StatusRecord>>>>,
}

impl InMemoryStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

fn stamped(record: &StatusRecord) -> StatusRecord {
    StatusRecord {
        updated_at: Some(Utc::now()),
        ..record.clone()
    }
}

fn key_of(record: &StatusRecord) -> (String, String) {
    (record.partition_key.clone(), record.row_key.clone())
}

#[async_trait]
impl StatusTable for InMemoryStatusTable {
    async fn ensure_exists(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn get(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Versioned<StatusRecord>>, AppError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .get(&(partition_key.to_string(), row_key.to_string()))
            .cloned())
    }

    async fn upsert_replace(&self, record: &StatusRecord) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let key = key_of(record);
        let version = rows.get(&key).map_or(1, |current| current.version.0 + 1);
        rows.insert(
            key,
            Versioned {
                value: stamped(record),
                version: VersionTag(version),
            },
        );
        Ok(())
    }

    async fn update_conditional(
        &self,
        record: &StatusRecord,
        version: VersionTag,
    ) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let key = key_of(record);
        match rows.get(&key) {
            Some(current) if current.version == version => {
                let next = VersionTag(version.0 + 1);
                rows.insert(
                    key,
                    Versioned {
                        value: stamped(record),
                        version: next,
                    },
                );
                Ok(())
            }
            _ => Err(AppError::Conflict(format!(
                "Status record '{}' changed since version {} was read",
                record.row_key, version
            ))),
        }
    }

    async fn insert(&self, record: &StatusRecord) -> Result<(), AppError> {
        let mut rows = self.rows.lock().await;
        let key = key_of(record);
        if rows.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "Status record '{}' was created concurrently",
                record.row_key
            )));
        }
        rows.insert(
            key,
            Versioned {
                value: stamped(record),
                version: VersionTag(1),
            },
        );
        Ok(())
    }
}

/// In-memory audit log
#[derive(Clone, Default)]
pub struct InMemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entry in insertion order.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn ensure_exists(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AppError> {
        let mut entries = self.entries.lock().await;
        // Keep timestamps strictly increasing so newest-first order is total.
        let mut timestamp = Utc::now();
        if let Some(last) = entries.last() {
            if timestamp <= last.timestamp {
                timestamp = last.timestamp + chrono::Duration::microseconds(1);
            }
        }
        let stored = AuditEntry::stamped(entry, timestamp);
        entries.push(stored.clone());
        Ok(stored)
    }

    fn query(&self, filter: AuditFilter) -> BoxStream<'static, Result<AuditEntry, AppError>> {
        let entries = self.entries.clone();
        stream::once(async move {
            let snapshot = entries.lock().await;
            let matching: Vec<_> = snapshot
                .iter()
                .rev()
                .filter(|entry| match &filter {
                    AuditFilter::BlobName(name) => &entry.blob_name == name,
                    AuditFilter::Partition(partition) => &entry.partition_key == partition,
                })
                .cloned()
                .map(Ok)
                .collect();
            stream::iter(matching)
        })
        .flatten()
        .boxed()
    }
}
