use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::status::FileProcessingStatus;
use crate::constants::AUDIT_PARTITION;

/// Action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileActionType {
    Upload,
    Download,
    Archive,
    Delete,
}

impl Display for FileActionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileActionType::Upload => write!(f, "Upload"),
            FileActionType::Download => write!(f, "Download"),
            FileActionType::Archive => write!(f, "Archive"),
            FileActionType::Delete => write!(f, "Delete"),
        }
    }
}

impl FromStr for FileActionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upload" => Ok(FileActionType::Upload),
            "download" => Ok(FileActionType::Download),
            "archive" => Ok(FileActionType::Archive),
            "delete" => Ok(FileActionType::Delete),
            _ => Err(anyhow::anyhow!("Invalid file action: {}", s)),
        }
    }
}

/// Audit entry as built by the workflow engine, before the log stamps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub id: Uuid,
    pub blob_name: String,
    pub container_name: String,
    pub file_name: String,
    pub folder: Option<String>,
    pub status: FileProcessingStatus,
    pub action: FileActionType,
    pub content_type: Option<String>,
    pub content_length: i64,
    pub comment: Option<String>,
    pub correlation_id: Option<String>,
}

/// Stored, immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub partition_key: String,
    pub id: Uuid,
    pub blob_name: String,
    pub container_name: String,
    pub file_name: String,
    pub folder: Option<String>,
    pub status: FileProcessingStatus,
    pub action: FileActionType,
    pub content_type: Option<String>,
    pub content_length: i64,
    pub comment: Option<String>,
    pub correlation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Stamp a new entry into the audit partition.
    pub fn stamped(entry: NewAuditEntry, timestamp: DateTime<Utc>) -> Self {
        Self {
            partition_key: AUDIT_PARTITION.to_string(),
            id: entry.id,
            blob_name: entry.blob_name,
            container_name: entry.container_name,
            file_name: entry.file_name,
            folder: entry.folder,
            status: entry.status,
            action: entry.action,
            content_type: entry.content_type,
            content_length: entry.content_length,
            comment: entry.comment,
            correlation_id: entry.correlation_id,
            timestamp,
        }
    }
}

/// Server-side selection applied by an audit log query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditFilter {
    /// Exact match on the stored blob path.
    BlobName(String),
    /// Every entry in the partition.
    Partition(String),
}

/// Caller-facing audit query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub blob_name: Option<String>,
    pub folder: Option<String>,
    pub take: Option<usize>,
}
