//! Fileflow Services Layer
//!
//! This crate hosts the file workflow engine: upload, download, archive and status
//! bookkeeping across the object store, status table, audit log and notification queue.
//! It re-exports the backend crates so front ends depend on a single facade.

pub mod workflow;

pub use workflow::FileWorkflowService;

pub use fileflow_db::{AuditLog, PostgresAuditLog, PostgresStatusTable, StatusTable};
#[cfg(feature = "memory")]
pub use fileflow_db::{InMemoryAuditLog, InMemoryStatusTable};
pub use fileflow_infra::{create_queue, ChannelQueue, NotificationQueue, QueueError};
#[cfg(feature = "storage-local")]
pub use fileflow_storage::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use fileflow_storage::S3Storage;
pub use fileflow_storage::{
    create_storage, ByteReader, Storage, StorageBackend, StorageError, StorageResult,
};
pub use tokio_util::sync::CancellationToken;
