use crate::keys::{after_continuation, validate_key};
use crate::traits::{
    ByteReader, ByteStream, CopyHandle, CopyStatus, ObjectPage, ObjectProperties, ObjectSummary,
    Storage, StorageError, StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectMeta, ObjectStore, ObjectStoreExt,
    PutOptions, PutPayload, Result as ObjectResult,
};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

/// S3 storage implementation
///
/// A container maps to a top-level prefix of the bucket, so one bucket can host several
/// containers. S3 copies complete before the request returns, so no copy state is kept.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    container: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `container` - Key prefix all objects of this store live under
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        container: String,
    ) -> StorageResult<Self> {
        validate_key(&container)?;

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            container,
        })
    }

    fn location(&self, storage_key: &str) -> StorageResult<Path> {
        validate_key(storage_key)?;
        Ok(Path::from(format!("{}/{}", self.container, storage_key)))
    }

    /// Deepest whole-segment location covering `prefix`; the listing filters the rest.
    fn list_root(&self, prefix: Option<&str>) -> Path {
        let dir = prefix
            .and_then(|p| p.rfind('/').map(|idx| &p[..idx]))
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty());
        match dir {
            Some(dir) => Path::from(format!("{}/{}", self.container, dir)),
            None => Path::from(self.container.clone()),
        }
    }

    /// Strip the container prefix from a listed location.
    fn key_of(&self, location: &Path) -> Option<String> {
        location
            .as_ref()
            .strip_prefix(self.container.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
    }

    fn map_not_found(storage_key: &str, err: ObjectStoreError) -> StorageError {
        match err {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => StorageError::BackendError(other.to_string()),
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn ensure_container(&self) -> StorageResult<()> {
        tracing::debug!(
            bucket = %self.bucket,
            container = %self.container,
            "S3 containers are key prefixes; nothing to create"
        );
        Ok(())
    }

    async fn upload_stream(
        &self,
        storage_key: &str,
        content_type: Option<&str>,
        mut reader: ByteReader,
    ) -> StorageResult<u64> {
        let location = self.location(storage_key)?;
        let start = std::time::Instant::now();

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read from stream: {}", e))
        })?;

        let size = buffer.len() as u64;
        let mut attributes = Attributes::new();
        if let Some(content_type) = content_type {
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type.to_string()),
            );
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(Bytes::from(buffer)), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 stream upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 stream upload successful"
        );

        Ok(size)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();
        let location = self.location(storage_key)?;

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let start = std::time::Instant::now();
        let location = self.location(storage_key)?;

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;

        let bucket = self.bucket.clone();
        let key = storage_key.to_string();

        let stream = result.into_stream().map(move |res| match res {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                Err(StorageError::DownloadFailed(e.to_string()))
            }
        });

        Ok(Box::pin(stream))
    }

    async fn properties(&self, storage_key: &str) -> StorageResult<ObjectProperties> {
        let location = self.location(storage_key)?;
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        let result = self
            .store
            .get_opts(&location, options)
            .await
            .map_err(|e| Self::map_not_found(storage_key, e))?;

        Ok(ObjectProperties {
            content_type: result
                .attributes
                .get(&Attribute::ContentType)
                .map(|value| value.to_string()),
            content_length: result.meta.size,
            last_modified: result.meta.last_modified,
            copy_status: None,
        })
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = self.location(storage_key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn start_copy(&self, from_key: &str, to_key: &str) -> StorageResult<CopyHandle> {
        let start = std::time::Instant::now();
        let from = self.location(from_key)?;
        let to = self.location(to_key)?;

        let copy_result: ObjectResult<_> = self.store.copy(&from, &to).await;

        copy_result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(from_key.to_string()),
            other => StorageError::CopyFailed(other.to_string()),
        })?;

        tracing::info!(
            bucket = %self.bucket,
            from_key = %from_key,
            to_key = %to_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(CopyHandle {
            copy_id: Uuid::new_v4().simple().to_string(),
            status: CopyStatus::Success,
        })
    }

    async fn delete(&self, storage_key: &str, include_snapshots: bool) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = self.location(storage_key)?;

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            include_snapshots = include_snapshots,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
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
        let root = self.list_root(prefix);
        let listing = match continuation {
            Some(token) => {
                let offset = self.location(token)?;
                self.store.list_with_offset(Some(&root), &offset)
            }
            None => self.store.list(Some(&root)),
        };

        let metas: Vec<ObjectMeta> = listing
            .map_err(|e| StorageError::BackendError(e.to_string()))
            .try_filter(|meta| {
                let keep = self.key_of(&meta.location).is_some_and(|key| {
                    prefix.map_or(true, |p| key.starts_with(p))
                        && after_continuation(&key, continuation)
                });
                futures::future::ready(keep)
            })
            .take(page_size + 1)
            .try_collect()
            .await?;

        let has_more = metas.len() > page_size;
        let mut items: Vec<ObjectSummary> = metas
            .into_iter()
            .take(page_size)
            .filter_map(|meta| {
                self.key_of(&meta.location).map(|name| ObjectSummary {
                    name,
                    content_length: meta.size,
                    content_type: None,
                    last_modified: meta.last_modified,
                })
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        let continuation = if has_more {
            items.last().map(|item| item.name.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            items,
            continuation,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
