use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification emitted once per upload.
///
/// Field names are PascalCase on the wire; downstream consumers decode the base64 body
/// produced by [`FileUploadedEvent::to_message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileUploadedEvent {
    pub blob_name: String,
    pub container_name: String,
    pub folder: Option<String>,
    pub correlation_id: Option<String>,
    pub content_type: Option<String>,
    pub content_length: i64,
    pub uploaded_at_utc: DateTime<Utc>,
}

impl FileUploadedEvent {
    /// JSON body, base64-encoded with the standard alphabet.
    pub fn to_message(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json.as_bytes()))
    }

    /// Inverse of [`to_message`](Self::to_message).
    pub fn from_message(message: &str) -> anyhow::Result<Self> {
        let raw = base64::engine::general_purpose::STANDARD.decode(message)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
