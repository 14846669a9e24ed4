//! Backend wrappers that inject the failures the workflow must survive.

use async_trait::async_trait;
use fileflow_core::models::{StatusRecord, VersionTag, Versioned};
use fileflow_core::AppError;
use fileflow_db::StatusTable;
use fileflow_infra::{NotificationQueue, QueueError, QueueResult};
use fileflow_storage::{
    ByteReader, ByteStream, CopyHandle, CopyStatus, ObjectPage, ObjectProperties, Storage,
    StorageBackend, StorageResult,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

/// Storage whose copies report scripted statuses.
///
/// Properties of any copy destination take the next status from the script; the last one
/// repeats once the script runs out. Everything else goes to the wrapped storage.
pub struct ScriptedCopyStorage {
    inner: Arc<dyn Storage>,
    script: Mutex<VecDeque<CopyStatus>>,
    destinations: Mutex<HashSet<String>>,
    polls: AtomicUsize,
}

impl ScriptedCopyStorage {
    pub fn new(inner: Arc<dyn Storage>, script: Vec<CopyStatus>) -> Self {
        Self {
            inner,
            script: Mutex::new(script.into()),
            destinations: Mutex::new(HashSet::new()),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> CopyStatus {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().copied().unwrap_or(CopyStatus::Success)
        }
    }
}

#[async_trait]
impl Storage for ScriptedCopyStorage {
    async fn ensure_container(&self) -> StorageResult<()> {
        self.inner.ensure_container().await
    }

    async fn upload_stream(
        &self,
        storage_key: &str,
        content_type: Option<&str>,
        reader: ByteReader,
    ) -> StorageResult<u64> {
        self.inner
            .upload_stream(storage_key, content_type, reader)
            .await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.inner.download(storage_key).await
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        self.inner.download_stream(storage_key).await
    }

    async fn properties(&self, storage_key: &str) -> StorageResult<ObjectProperties> {
        let mut properties = self.inner.properties(storage_key).await?;
        if self.destinations.lock().unwrap().contains(storage_key) {
            self.polls.fetch_add(1, Ordering::SeqCst);
            properties.copy_status = Some(self.next_status());
        }
        Ok(properties)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    async fn start_copy(&self, from_key: &str, to_key: &str) -> StorageResult<CopyHandle> {
        let mut handle = self.inner.start_copy(from_key, to_key).await?;
        self.destinations.lock().unwrap().insert(to_key.to_string());
        handle.status = CopyStatus::Pending;
        Ok(handle)
    }

    async fn delete(&self, storage_key: &str, include_snapshots: bool) -> StorageResult<()> {
        self.inner.delete(storage_key, include_snapshots).await
    }

    async fn list_page(
        &self,
        prefix: Option<&str>,
        continuation: Option<&str>,
        page_size: usize,
    ) -> StorageResult<ObjectPage> {
        self.inner.list_page(prefix, continuation, page_size).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

/// Queue that exists but rejects every message.
pub struct FailingQueue;

#[async_trait]
impl NotificationQueue for FailingQueue {
    async fn ensure_exists(&self) -> QueueResult<()> {
        Ok(())
    }

    async fn send(&self, _payload: String) -> QueueResult<()> {
        Err(QueueError::SendFailed("queue unavailable".to_string()))
    }
}

/// Status table whose reads wait for each other, so concurrent updaters all see the same
/// version before any of them writes.
pub struct LockstepStatusTable {
    inner: Arc<dyn StatusTable>,
    barrier: Barrier,
}

impl LockstepStatusTable {
    pub fn new(inner: Arc<dyn StatusTable>, readers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(readers),
        }
    }
}

#[async_trait]
impl StatusTable for LockstepStatusTable {
    async fn ensure_exists(&self) -> Result<(), AppError> {
        self.inner.ensure_exists().await
    }

    async fn get(
        &self,
        partition_key: &str,
        row_key: &str,
    ) -> Result<Option<Versioned<StatusRecord>>, AppError> {
        let record = self.inner.get(partition_key, row_key).await?;
        self.barrier.wait().await;
        Ok(record)
    }

    async fn upsert_replace(&self, record: &StatusRecord) -> Result<(), AppError> {
        self.inner.upsert_replace(record).await
    }

    async fn update_conditional(
        &self,
        record: &StatusRecord,
        version: VersionTag,
    ) -> Result<(), AppError> {
        self.inner.update_conditional(record, version).await
    }

    async fn insert(&self, record: &StatusRecord) -> Result<(), AppError> {
        self.inner.insert(record).await
    }
}
