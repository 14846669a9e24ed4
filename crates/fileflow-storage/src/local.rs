use crate::keys::{after_continuation, validate_key};
use crate::traits::{
    ByteReader, ByteStream, CopyHandle, CopyStatus, ObjectPage, ObjectProperties, ObjectSummary,
    Storage, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Per-object metadata the filesystem cannot hold itself.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SidecarMeta {
    content_type: Option<String>,
    copy_status: Option<CopyStatus>,
    copy_source: Option<String>,
}

/// Local filesystem storage implementation
///
/// Objects of container `c` live under `{base}/c/{key}`; their content type and copy state
/// live in JSON sidecars under `{base}/.meta/c/{key}.json`, outside the listed tree.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    meta_root: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/fileflow")
    /// * `container` - Container name; a sub-directory of `base_path`
    pub async fn new(base_path: impl Into<PathBuf>, container: &str) -> StorageResult<Self> {
        let base_path = base_path.into();
        validate_key(container)?;

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            root: base_path.join(container),
            meta_root: base_path.join(".meta").join(container),
        })
    }

    /// Convert storage key to filesystem path, rejecting traversal
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        Ok(self.root.join(storage_key))
    }

    fn meta_path(&self, storage_key: &str) -> PathBuf {
        self.meta_root.join(format!("{}.json", storage_key))
    }

    async fn read_meta(&self, storage_key: &str) -> SidecarMeta {
        match fs::read(self.meta_path(storage_key)).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                tracing::warn!(key = %storage_key, error = %e, "Ignoring unreadable metadata sidecar");
                SidecarMeta::default()
            }),
            Err(_) => SidecarMeta::default(),
        }
    }

    async fn write_meta(&self, storage_key: &str, meta: &SidecarMeta) -> StorageResult<()> {
        let path = self.meta_path(storage_key);
        self.ensure_parent_dir(&path).await?;
        let raw = serde_json::to_vec(meta)
            .map_err(|e| StorageError::BackendError(format!("Failed to encode metadata: {}", e)))?;
        fs::write(&path, raw).await?;
        Ok(())
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Every object key in the container, sorted.
    async fn collect_keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            return Ok(keys);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        let key = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy().into_owned())
                            .collect::<Vec<_>>()
                            .join("/");
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn summary(&self, key: String) -> StorageResult<ObjectSummary> {
        let meta = fs::metadata(self.root.join(&key)).await?;
        let sidecar = self.read_meta(&key).await;
        Ok(ObjectSummary {
            content_length: meta.len(),
            content_type: sidecar.content_type,
            last_modified: meta.modified().map(DateTime::<Utc>::from)?,
            name: key,
        })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn ensure_container(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(&self.meta_root).await?;
        Ok(())
    }

    async fn upload_stream(
        &self,
        storage_key: &str,
        content_type: Option<&str>,
        mut reader: ByteReader,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.flush().await?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        self.write_meta(
            storage_key,
            &SidecarMeta {
                content_type: content_type.map(str::to_string),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(bytes_copied)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let key = storage_key.to_string();
        let path_display = path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    path = %path_display,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn properties(&self, storage_key: &str) -> StorageResult<ObjectProperties> {
        let path = self.key_to_path(storage_key)?;

        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(StorageError::NotFound(storage_key.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let sidecar = self.read_meta(storage_key).await;

        Ok(ObjectProperties {
            content_type: sidecar.content_type,
            content_length: meta.len(),
            last_modified: meta.modified().map(DateTime::<Utc>::from)?,
            copy_status: sidecar.copy_status,
        })
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        is_object(&path).await
    }

    async fn start_copy(&self, from_key: &str, to_key: &str) -> StorageResult<CopyHandle> {
        let from_path = self.key_to_path(from_key)?;
        let to_path = self.key_to_path(to_key)?;

        if !is_object(&from_path).await? {
            return Err(StorageError::NotFound(from_key.to_string()));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            StorageError::CopyFailed(format!(
                "Failed to copy {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        let source_meta = self.read_meta(from_key).await;
        self.write_meta(
            to_key,
            &SidecarMeta {
                content_type: source_meta.content_type,
                copy_status: Some(CopyStatus::Success),
                copy_source: Some(from_key.to_string()),
            },
        )
        .await?;

        tracing::info!(
            from_key = %from_key,
            to_key = %to_key,
            from_path = %from_path.display(),
            to_path = %to_path.display(),
            "Local storage copy successful"
        );

        Ok(CopyHandle {
            copy_id: Uuid::new_v4().simple().to_string(),
            status: CopyStatus::Success,
        })
    }

    async fn delete(&self, storage_key: &str, include_snapshots: bool) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        if let Err(e) = fs::remove_file(self.meta_path(storage_key)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(key = %storage_key, error = %e, "Failed to remove metadata sidecar");
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            include_snapshots = include_snapshots,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn list_page(
        &self,
        prefix: Option<&str>,
        continuation: Option<&str>,
        page_size: usize,
    ) -> StorageResult<ObjectPage> {
        let page_size = page_size.max(1);
        let mut matching = self
            .collect_keys()
            .await?
            .into_iter()
            .filter(|key| prefix.map_or(true, |p| key.starts_with(p)))
            .filter(|key| after_continuation(key, continuation))
            .take(page_size + 1)
            .collect::<Vec<_>>();

        let has_more = matching.len() > page_size;
        matching.truncate(page_size);

        let continuation = if has_more { matching.last().cloned() } else { None };

        let mut items = Vec::with_capacity(matching.len());
        for key in matching {
            items.push(self.summary(key).await?);
        }

        Ok(ObjectPage {
            items,
            continuation,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Only regular files count as objects; folder directories do not.
async fn is_object(path: &std::path::Path) -> StorageResult<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
