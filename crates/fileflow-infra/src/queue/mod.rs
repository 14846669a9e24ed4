//! Notification queue abstraction
//!
//! Upload notifications are opaque string payloads. Delivery is best effort: callers decide
//! whether a failed send matters.

mod channel;
#[cfg(feature = "queue-sqs")]
mod sqs;

pub use channel::ChannelQueue;
#[cfg(feature = "queue-sqs")]
pub use sqs::SqsNotificationQueue;

use async_trait::async_trait;
use fileflow_core::{AppError, BackendConfig, QueueBackend};
use std::sync::Arc;
use thiserror::Error;

/// Queue operation errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue not found: {0}")]
    NotFound(String),

    #[error("Queue is full: {0}")]
    Full(String),

    #[error("Queue is closed: {0}")]
    Closed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Queue backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Queue(other.to_string()),
        }
    }
}

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Create the queue if it does not exist. Idempotent.
    async fn ensure_exists(&self) -> QueueResult<()>;

    /// Send one message.
    async fn send(&self, payload: String) -> QueueResult<()>;
}

/// Create a notification queue named `queue_name` based on configuration
pub async fn create_queue(
    config: &BackendConfig,
    queue_name: &str,
) -> QueueResult<Arc<dyn NotificationQueue>> {
    match config.queue_backend {
        #[cfg(feature = "queue-sqs")]
        QueueBackend::Sqs => {
            let region = config.aws_region.clone().or_else(|| config.s3_region.clone());
            let queue = SqsNotificationQueue::new(queue_name.to_string(), region).await;
            Ok(Arc::new(queue))
        }

        #[cfg(not(feature = "queue-sqs"))]
        QueueBackend::Sqs => Err(QueueError::ConfigError(
            "SQS queue backend not available (queue-sqs feature not enabled)".to_string(),
        )),

        QueueBackend::Channel => Ok(Arc::new(ChannelQueue::with_log_consumer(
            queue_name,
            ChannelQueue::DEFAULT_CAPACITY,
        ))),
    }
}
