use fileflow_core::keys::{extension_bucket, file_name_of, folder_of, list_prefix};
use fileflow_core::models::{FileItem, FileTypeCount};
use fileflow_core::AppError;
use fileflow_storage::ObjectSummary;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use super::FileWorkflowService;

/// Paging state of one listing.
struct ListCursor {
    service: FileWorkflowService,
    prefix: Option<String>,
    continuation: Option<String>,
    cancel: CancellationToken,
    started: bool,
    exhausted: bool,
}

fn file_item(summary: ObjectSummary) -> FileItem {
    FileItem {
        name: file_name_of(&summary.name).to_string(),
        folder: folder_of(&summary.name).to_string(),
        content_length: summary.content_length,
        content_type: summary.content_type.unwrap_or_default(),
        last_modified: summary.last_modified,
    }
}

impl FileWorkflowService {
    /// Lazily list the files under `folder` (all files without one).
    ///
    /// Pages are fetched one at a time as the stream is polled; cancelling `cancel` ends the
    /// stream with [`AppError::Cancelled`] before the next page fetch. Each call starts a
    /// fresh listing.
    pub fn list_files(
        &self,
        folder: Option<&str>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<FileItem, AppError>> {
        let cursor = ListCursor {
            service: self.clone(),
            prefix: list_prefix(folder),
            continuation: None,
            cancel,
            started: false,
            exhausted: false,
        };

        stream::try_unfold(cursor, |mut cursor| async move {
            if cursor.exhausted {
                return Ok(None);
            }
            if cursor.cancel.is_cancelled() {
                return Err(AppError::Cancelled("File listing was cancelled".to_string()));
            }
            if !cursor.started {
                cursor.service.ensure_resources().await?;
                cursor.started = true;
            }

            let page = cursor
                .service
                .storage
                .list_page(
                    cursor.prefix.as_deref(),
                    cursor.continuation.as_deref(),
                    cursor.service.config.list_page_size,
                )
                .await?;

            tracing::debug!(
                prefix = ?cursor.prefix,
                items = page.items.len(),
                has_more = page.continuation.is_some(),
                "Fetched listing page"
            );

            cursor.exhausted = page.continuation.is_none();
            cursor.continuation = page.continuation;
            let items: Vec<FileItem> = page.items.into_iter().map(file_item).collect();
            Ok(Some((items, cursor)))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, AppError>)))
        .try_flatten()
        .boxed()
    }

    /// Count the files under `folder` by lowercased extension, most common first.
    #[tracing::instrument(skip(self, cancel), fields(folder = ?folder))]
    pub async fn file_type_counts(
        &self,
        folder: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Vec<FileTypeCount>, AppError> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut files = self.list_files(folder, cancel);
        while let Some(item) = files.next().await {
            *counts.entry(extension_bucket(&item?.name)).or_insert(0) += 1;
        }

        let mut result: Vec<FileTypeCount> = counts
            .into_iter()
            .map(|(file_type, count)| FileTypeCount { file_type, count })
            .collect();
        result.sort_by(FileTypeCount::display_order);
        Ok(result)
    }
}
