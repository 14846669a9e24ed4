use fileflow_core::constants::AUDIT_PARTITION;
use fileflow_core::keys::resolve;
use fileflow_core::models::{AuditEntry, AuditFilter, AuditQuery};
use fileflow_core::AppError;
use futures::{future, StreamExt, TryStreamExt};

use super::FileWorkflowService;

impl FileWorkflowService {
    /// Read audit entries, newest first.
    ///
    /// With a blob name, entries for exactly that path (prefixed by `folder` when given).
    /// Otherwise every entry whose folder equals `folder` ignoring case, or all entries.
    /// `take` caps the result after filtering.
    #[tracing::instrument(skip(self), fields(blob_name = ?query.blob_name, folder = ?query.folder, take = ?query.take))]
    pub async fn audit(&self, query: AuditQuery) -> Result<Vec<AuditEntry>, AppError> {
        self.ensure_resources().await?;

        let take = query.take.unwrap_or(usize::MAX);
        let blob_name = query.blob_name.as_deref().filter(|b| !b.trim().is_empty());
        let folder = query.folder.as_deref().filter(|f| !f.trim().is_empty());

        let mut entries: Vec<AuditEntry> = match blob_name {
            Some(name) => {
                let path = resolve(folder, name);
                self.audit_log
                    .query(AuditFilter::BlobName(path))
                    .take(take)
                    .try_collect()
                    .await?
            }
            None => {
                let wanted = folder.map(str::to_lowercase);
                self.audit_log
                    .query(AuditFilter::Partition(AUDIT_PARTITION.to_string()))
                    .try_filter(|entry| {
                        let keep = match &wanted {
                            Some(wanted) => entry
                                .folder
                                .as_deref()
                                .is_some_and(|f| f.to_lowercase() == *wanted),
                            None => true,
                        };
                        future::ready(keep)
                    })
                    .take(take)
                    .try_collect()
                    .await?
            }
        };

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}
