use fileflow_core::constants::STATUS_PARTITION;
use fileflow_core::keys::{file_name_of, resolve, to_row_key};
use fileflow_core::models::{FileProcessingStatus, StatusRecord, Versioned};
use fileflow_core::AppError;

use super::FileWorkflowService;

impl FileWorkflowService {
    /// Move a file's status record to `status`.
    ///
    /// An existing record is replaced only if it is unchanged since it was read; a concurrent
    /// writer makes this fail with [`AppError::Conflict`], which is not retried. A missing
    /// record is created. The folder always follows the status.
    #[tracing::instrument(skip(self), fields(blob_name = %blob_name, status = %status, folder = ?folder))]
    pub async fn update_status(
        &self,
        blob_name: &str,
        status: FileProcessingStatus,
        folder: Option<&str>,
    ) -> Result<(), AppError> {
        self.ensure_resources().await?;
        self.apply_status(blob_name, status, folder).await
    }

    pub(super) async fn apply_status(
        &self,
        blob_name: &str,
        status: FileProcessingStatus,
        folder: Option<&str>,
    ) -> Result<(), AppError> {
        let path = resolve(folder, blob_name);
        let row_key = to_row_key(&path);
        let target_folder = self.config.folder_for_status(status).to_string();

        match self.status_table.get(STATUS_PARTITION, &row_key).await? {
            Some(Versioned { mut value, version }) => {
                let previous = value.status;
                value.status = status;
                value.folder = target_folder;
                self.status_table.update_conditional(&value, version).await?;

                tracing::info!(
                    row_key = %row_key,
                    previous = %previous,
                    status = %status,
                    "Status updated"
                );
            }
            None => {
                let record = StatusRecord::new(
                    row_key.clone(),
                    file_name_of(&path),
                    self.config.container_name.clone(),
                    target_folder,
                    status,
                );
                self.status_table.insert(&record).await?;

                tracing::info!(row_key = %row_key, status = %status, "Status record created");
            }
        }

        Ok(())
    }
}
