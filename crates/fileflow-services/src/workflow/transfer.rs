use chrono::Utc;
use fileflow_core::constants::STATUS_PARTITION;
use fileflow_core::keys::{
    combine, file_name_of, folder_of, normalize_folder, resolve, to_row_key,
};
use fileflow_core::models::{
    FileActionType, FileProcessingStatus, FileUploadedEvent, StatusRecord, UploadRequest,
};
use fileflow_core::AppError;
use fileflow_storage::ByteReader;
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{stored_length, AuditDraft, FileWorkflowService};

impl FileWorkflowService {
    /// Store a new file and announce it.
    ///
    /// The object lands at `{folder}/{file_name}` (folder defaults to the in-folder). Content
    /// type and length recorded downstream are read back from the store, not taken from the
    /// request. Returns the object path.
    #[tracing::instrument(
        skip(self, request, content),
        fields(file_name = %request.file_name, folder = ?request.folder, correlation_id = ?request.correlation_id)
    )]
    pub async fn upload(
        &self,
        request: UploadRequest,
        content: ByteReader,
    ) -> Result<String, AppError> {
        if request.file_name.trim().is_empty() {
            return Err(AppError::InvalidInput("File name must not be empty".to_string()));
        }

        self.ensure_resources().await?;

        let folder = request
            .folder
            .as_deref()
            .map(|f| normalize_folder(f).to_string())
            .unwrap_or_else(|| self.config.in_folder.clone());
        let path = combine(&folder, &request.file_name);

        self.storage
            .upload_stream(&path, request.content_type.as_deref(), content)
            .await?;

        let properties = self.storage.properties(&path).await?;
        let content_length = stored_length(properties.content_length);

        // Unconditional replace: a re-upload overwrites whatever record exists, regardless
        // of its version. Only update_status goes through the version check.
        let status = FileProcessingStatus::Uploaded;
        let record = StatusRecord {
            correlation_id: request.correlation_id.clone(),
            content_type: properties.content_type.clone(),
            content_length,
            ..StatusRecord::new(
                to_row_key(&path),
                request.file_name.clone(),
                self.config.container_name.clone(),
                self.config.folder_for_status(status),
                status,
            )
        };
        self.status_table.upsert_replace(&record).await?;

        let event = FileUploadedEvent {
            blob_name: path.clone(),
            container_name: self.config.container_name.clone(),
            folder: Some(folder.clone()),
            correlation_id: request.correlation_id.clone(),
            content_type: properties.content_type.clone(),
            content_length,
            uploaded_at_utc: Utc::now(),
        };
        self.publish_uploaded(&event).await;

        self.record_audit(AuditDraft {
            blob_name: path.clone(),
            file_name: request.file_name,
            folder: Some(folder),
            status,
            action: FileActionType::Upload,
            content_type: properties.content_type,
            content_length,
            comment: request.comment,
            correlation_id: request.correlation_id,
        })
        .await?;

        tracing::info!(
            path = %path,
            size_bytes = properties.content_length,
            "File uploaded"
        );

        Ok(path)
    }

    /// Send the upload notification. Failures are logged and swallowed: the object and its
    /// status record are already committed and stay in place.
    async fn publish_uploaded(&self, event: &FileUploadedEvent) {
        let message = match event.to_message() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    blob_name = %event.blob_name,
                    "Failed to encode upload notification"
                );
                return;
            }
        };

        if let Err(e) = self.queue.send(message).await {
            tracing::warn!(
                error = %e,
                blob_name = %event.blob_name,
                queue = %self.config.queue_name,
                "Upload notification not delivered"
            );
        }
    }

    /// Stream an object into `sink` and return the number of bytes written.
    ///
    /// Without a folder, `blob_name` is the full object path. The audit entry carries the
    /// current stored status; download never changes it.
    #[tracing::instrument(skip(self, sink), fields(blob_name = %blob_name, folder = ?folder))]
    pub async fn download<W>(
        &self,
        blob_name: &str,
        folder: Option<&str>,
        sink: &mut W,
    ) -> Result<u64, AppError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        self.ensure_resources().await?;

        let path = resolve(folder, blob_name);
        let properties = self.storage.properties(&path).await?;

        let mut stream = self.storage.download_stream(&path).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        let status = self
            .status_table
            .get(STATUS_PARTITION, &to_row_key(&path))
            .await?
            .map(|record| record.value.status)
            .unwrap_or(FileProcessingStatus::Initial);

        let audit_folder = match folder {
            Some(folder) => Some(normalize_folder(folder).to_string()),
            None => Some(folder_of(&path).to_string()).filter(|f| !f.is_empty()),
        };

        self.record_audit(AuditDraft {
            blob_name: path.clone(),
            file_name: file_name_of(&path).to_string(),
            folder: audit_folder,
            status,
            action: FileActionType::Download,
            content_type: properties.content_type,
            content_length: stored_length(properties.content_length),
            comment: None,
            correlation_id: None,
        })
        .await?;

        tracing::info!(path = %path, size_bytes = written, "File downloaded");

        Ok(written)
    }
}
