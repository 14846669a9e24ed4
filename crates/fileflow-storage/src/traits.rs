//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object store backends must implement.
//! Keys are flat object names relative to the configured container; "folders" are only
//! `/`-separated prefixes.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked object content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Content source for uploads.
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// State of a server-side copy into an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyStatus {
    Pending,
    Success,
    Failed,
    Aborted,
}

impl Display for CopyStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CopyStatus::Pending => write!(f, "Pending"),
            CopyStatus::Success => write!(f, "Success"),
            CopyStatus::Failed => write!(f, "Failed"),
            CopyStatus::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Authoritative metadata of a stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperties {
    pub content_type: Option<String>,
    pub content_length: u64,
    pub last_modified: DateTime<Utc>,
    /// Status of the last copy into this object. `None` when the object was not written by
    /// a copy, or the backend copies synchronously and keeps no copy state.
    pub copy_status: Option<CopyStatus>,
}

/// Handle returned when a copy is started.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyHandle {
    pub copy_id: String,
    pub status: CopyStatus,
}

/// One entry of a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub name: String,
    pub content_length: u64,
    pub content_type: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// One page of a listing. `continuation` is `None` on the last page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPage {
    pub items: Vec<ObjectSummary>,
    pub continuation: Option<String>,
}

/// Storage abstraction trait
///
/// All object store backends (S3, local filesystem) implement this trait so the workflow
/// engine never couples to a specific backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Create the container if it does not exist. Idempotent.
    async fn ensure_container(&self) -> StorageResult<()>;

    /// Upload content from a reader to `storage_key`, replacing any existing object.
    /// Returns the number of bytes stored.
    async fn upload_stream(
        &self,
        storage_key: &str,
        content_type: Option<&str>,
        reader: ByteReader,
    ) -> StorageResult<u64>;

    /// Download a whole object into memory.
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Download an object as a stream of chunks.
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Fetch the current metadata of an object.
    async fn properties(&self, storage_key: &str) -> StorageResult<ObjectProperties>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Start a server-side copy. The copy may still be pending when this returns; poll
    /// [`properties`](Storage::properties) of the destination for its copy status.
    async fn start_copy(&self, from_key: &str, to_key: &str) -> StorageResult<CopyHandle>;

    /// Delete an object if it exists. With `include_snapshots`, snapshots go with it on
    /// backends that keep them.
    async fn delete(&self, storage_key: &str, include_snapshots: bool) -> StorageResult<()>;

    /// List up to `page_size` objects whose names start with `prefix`, in name order,
    /// resuming after `continuation` (the token of the previous page).
    async fn list_page(
        &self,
        prefix: Option<&str>,
        continuation: Option<&str>,
        page_size: usize,
    ) -> StorageResult<ObjectPage>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
