use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::STATUS_PARTITION;

/// Processing status of a logical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileProcessingStatus {
    Initial,
    Uploaded,
    Processing,
    Processed,
    Archived,
}

impl Display for FileProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileProcessingStatus::Initial => write!(f, "Initial"),
            FileProcessingStatus::Uploaded => write!(f, "Uploaded"),
            FileProcessingStatus::Processing => write!(f, "Processing"),
            FileProcessingStatus::Processed => write!(f, "Processed"),
            FileProcessingStatus::Archived => write!(f, "Archived"),
        }
    }
}

impl FromStr for FileProcessingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial" => Ok(FileProcessingStatus::Initial),
            "uploaded" => Ok(FileProcessingStatus::Uploaded),
            "processing" => Ok(FileProcessingStatus::Processing),
            "processed" => Ok(FileProcessingStatus::Processed),
            "archived" => Ok(FileProcessingStatus::Archived),
            _ => Err(anyhow::anyhow!("Invalid processing status: {}", s)),
        }
    }
}

/// Opaque optimistic-concurrency token handed out with every status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTag(pub i64);

impl Display for VersionTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "v{}", self.0)
    }
}

/// A stored value together with the version tag it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: VersionTag,
}

/// Current processing status of one logical file.
///
/// `folder` always mirrors `status`; callers set both through
/// [`WorkflowConfig::folder_for_status`](crate::WorkflowConfig::folder_for_status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub partition_key: String,
    pub row_key: String,
    pub file_name: String,
    pub container_name: String,
    pub folder: String,
    pub status: FileProcessingStatus,
    pub correlation_id: Option<String>,
    pub content_type: Option<String>,
    pub content_length: i64,
    /// Server-assigned; ignored on writes.
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatusRecord {
    /// A record in the fixed status partition with no content details.
    pub fn new(
        row_key: impl Into<String>,
        file_name: impl Into<String>,
        container_name: impl Into<String>,
        folder: impl Into<String>,
        status: FileProcessingStatus,
    ) -> Self {
        Self {
            partition_key: STATUS_PARTITION.to_string(),
            row_key: row_key.into(),
            file_name: file_name.into(),
            container_name: container_name.into(),
            folder: folder.into(),
            status,
            correlation_id: None,
            content_type: None,
            content_length: 0,
            updated_at: None,
        }
    }
}
