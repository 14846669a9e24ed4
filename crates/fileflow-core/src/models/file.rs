use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Listing summary of one stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileItem {
    pub name: String,
    pub folder: String,
    pub content_length: u64,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// Number of objects sharing one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeCount {
    pub file_type: String,
    pub count: u64,
}

impl FileTypeCount {
    /// Count descending, then type ascending ignoring case.
    pub fn display_order(a: &FileTypeCount, b: &FileTypeCount) -> Ordering {
        b.count
            .cmp(&a.count)
            .then_with(|| a.file_type.to_lowercase().cmp(&b.file_type.to_lowercase()))
    }
}

/// Input of an upload, apart from the content itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub folder: Option<String>,
    pub content_type: Option<String>,
    pub correlation_id: Option<String>,
    pub comment: Option<String>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }
}

/// Input of an archive move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveRequest {
    pub blob_name: String,
    pub from_folder: Option<String>,
    pub correlation_id: Option<String>,
    pub comment: Option<String>,
}

impl ArchiveRequest {
    pub fn new(blob_name: impl Into<String>) -> Self {
        Self {
            blob_name: blob_name.into(),
            ..Default::default()
        }
    }
}
