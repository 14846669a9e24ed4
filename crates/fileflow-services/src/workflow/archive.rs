use fileflow_core::keys::{combine, file_name_of, resolve};
use fileflow_core::models::{ArchiveRequest, FileActionType, FileProcessingStatus};
use fileflow_core::AppError;
use fileflow_storage::{CopyStatus, ObjectProperties};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{stored_length, AuditDraft, FileWorkflowService};

impl FileWorkflowService {
    /// Move a file into the archive folder and return its new path.
    ///
    /// Copy, wait for the copy to settle, then delete the source. Until the delete the source
    /// is untouched, so a failed or timed-out copy can simply be retried. A crash between the
    /// copy and the delete leaves both objects; archiving again converges.
    #[tracing::instrument(
        skip(self, request, cancel),
        fields(blob_name = %request.blob_name, from_folder = ?request.from_folder, correlation_id = ?request.correlation_id)
    )]
    pub async fn archive(
        &self,
        request: ArchiveRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AppError> {
        self.ensure_resources().await?;

        let source = resolve(request.from_folder.as_deref(), &request.blob_name);
        if !self.storage.exists(&source).await? {
            return Err(AppError::NotFound(format!("Blob not found: {}", source)));
        }

        let file_name = file_name_of(&source).to_string();
        let destination = combine(&self.config.archive_folder, &file_name);
        if destination == source {
            return Err(AppError::InvalidInput(format!(
                "Blob '{}' is already in the archive folder",
                source
            )));
        }

        let handle = self.storage.start_copy(&source, &destination).await?;
        tracing::debug!(
            copy_id = %handle.copy_id,
            initial_status = %handle.status,
            source = %source,
            destination = %destination,
            "Archive copy started"
        );

        let properties = self.wait_for_copy(&destination, cancel).await?;

        // Point of no return: from here the archived copy is the only one.
        self.storage.delete(&source, true).await?;

        self.apply_status(
            &file_name,
            FileProcessingStatus::Archived,
            Some(self.config.archive_folder.as_str()),
        )
        .await?;

        self.record_audit(AuditDraft {
            blob_name: destination.clone(),
            file_name,
            folder: Some(self.config.archive_folder.clone()),
            status: FileProcessingStatus::Archived,
            action: FileActionType::Archive,
            content_type: properties.content_type,
            content_length: stored_length(properties.content_length),
            comment: request.comment,
            correlation_id: request.correlation_id,
        })
        .await?;

        tracing::info!(source = %source, destination = %destination, "File archived");

        Ok(destination)
    }

    /// Poll the destination until its copy leaves `Pending`.
    ///
    /// The interval starts at `copy_poll.initial_interval` and doubles up to
    /// `copy_poll.max_interval`; after `copy_poll.max_wait` the wait gives up with
    /// [`AppError::CopyTimedOut`]. Cancellation ends the wait but not the copy.
    async fn wait_for_copy(
        &self,
        destination: &str,
        cancel: &CancellationToken,
    ) -> Result<ObjectProperties, AppError> {
        let poll = &self.config.copy_poll;
        let started = Instant::now();
        let mut interval = poll.initial_interval;
        let mut polls = 0u32;

        loop {
            let properties = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(destination)),
                result = self.storage.properties(destination) => result?,
            };
            polls += 1;

            match properties.copy_status {
                // Backends that copy synchronously report no copy state.
                None | Some(CopyStatus::Success) => {
                    tracing::debug!(
                        destination = %destination,
                        polls = polls,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Archive copy settled"
                    );
                    return Ok(properties);
                }
                Some(CopyStatus::Pending) => {}
                Some(other) => {
                    tracing::error!(
                        destination = %destination,
                        status = %other,
                        "Archive copy failed"
                    );
                    return Err(AppError::CopyFailed {
                        destination: destination.to_string(),
                        status: other.to_string(),
                    });
                }
            }

            let waited = started.elapsed();
            if waited >= poll.max_wait {
                tracing::warn!(
                    destination = %destination,
                    polls = polls,
                    waited_ms = waited.as_millis() as u64,
                    "Archive copy still pending, giving up"
                );
                return Err(AppError::CopyTimedOut {
                    destination: destination.to_string(),
                    waited_ms: waited.as_millis() as u64,
                });
            }

            let sleep_for = interval.min(poll.max_wait.saturating_sub(waited));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(destination)),
                _ = tokio::time::sleep(sleep_for.max(Duration::from_millis(1))) => {}
            }
            interval = poll.next_interval(interval);
        }
    }
}

fn cancelled(destination: &str) -> AppError {
    AppError::Cancelled(format!("Wait for archive copy to {} was cancelled", destination))
}
