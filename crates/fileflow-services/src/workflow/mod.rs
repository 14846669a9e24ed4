//! File workflow engine
//!
//! There is no transaction spanning the object store, the status table, the audit log and
//! the queue. Each operation runs its steps in a fixed order and never reverses a step that
//! already succeeded, so a failure part-way leaves the earlier writes in place.

mod archive;
mod audit;
mod scan;
mod status;
mod transfer;

use fileflow_core::models::{FileActionType, FileProcessingStatus, NewAuditEntry};
use fileflow_core::{AppError, WorkflowConfig};
use fileflow_db::{AuditLog, StatusTable};
use fileflow_infra::NotificationQueue;
use fileflow_storage::Storage;
use std::sync::Arc;
use uuid::Uuid;

/// Orchestrates uploads, downloads, archival and status updates.
///
/// The only writer to the status table and the audit log. Cheap to clone; clones share
/// the same backends.
#[derive(Clone)]
pub struct FileWorkflowService {
    storage: Arc<dyn Storage>,
    status_table: Arc<dyn StatusTable>,
    audit_log: Arc<dyn AuditLog>,
    queue: Arc<dyn NotificationQueue>,
    config: Arc<WorkflowConfig>,
}

impl FileWorkflowService {
    pub fn new(
        storage: Arc<dyn Storage>,
        status_table: Arc<dyn StatusTable>,
        audit_log: Arc<dyn AuditLog>,
        queue: Arc<dyn NotificationQueue>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            storage,
            status_table,
            audit_log,
            queue,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Create the container, queue, status table and audit log if missing.
    ///
    /// Runs at the start of every operation; each step is create-if-absent.
    async fn ensure_resources(&self) -> Result<(), AppError> {
        self.storage.ensure_container().await?;
        self.queue.ensure_exists().await?;
        self.status_table.ensure_exists().await?;
        self.audit_log.ensure_exists().await?;
        Ok(())
    }

    async fn record_audit(&self, entry: AuditDraft) -> Result<(), AppError> {
        let stored = self
            .audit_log
            .append(NewAuditEntry {
                id: Uuid::new_v4(),
                blob_name: entry.blob_name,
                container_name: self.config.container_name.clone(),
                file_name: entry.file_name,
                folder: entry.folder,
                status: entry.status,
                action: entry.action,
                content_type: entry.content_type,
                content_length: entry.content_length,
                comment: entry.comment,
                correlation_id: entry.correlation_id,
            })
            .await?;

        tracing::debug!(
            audit_id = %stored.id.simple(),
            blob_name = %stored.blob_name,
            action = %stored.action,
            "Audit entry recorded"
        );
        Ok(())
    }
}

/// Audit fields that vary per action.
struct AuditDraft {
    blob_name: String,
    file_name: String,
    folder: Option<String>,
    status: FileProcessingStatus,
    action: FileActionType,
    content_type: Option<String>,
    content_length: i64,
    comment: Option<String>,
    correlation_id: Option<String>,
}

/// Object lengths are stored as signed 64-bit values.
fn stored_length(length: u64) -> i64 {
    i64::try_from(length).unwrap_or(i64::MAX)
}
