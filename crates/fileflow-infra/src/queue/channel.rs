use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{NotificationQueue, QueueError, QueueResult};

/// In-process queue over a bounded channel
///
/// Sends never wait: a full channel is reported as [`QueueError::Full`].
#[derive(Clone)]
pub struct ChannelQueue {
    name: String,
    tx: mpsc::Sender<String>,
}

impl ChannelQueue {
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create a queue and hand back the receiving end.
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }

    /// Create a queue whose messages are drained by a background task that logs them.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn with_log_consumer(name: &str, capacity: usize) -> Self {
        let (queue, mut rx) = Self::new(name, capacity);
        let queue_name = name.to_string();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                tracing::info!(
                    queue = %queue_name,
                    size_bytes = message.len(),
                    "Notification delivered to in-process consumer"
                );
            }
        });

        tracing::info!(
            queue = %name,
            capacity = capacity,
            "In-process notification queue initialized with bounded channel"
        );

        queue
    }
}

#[async_trait]
impl NotificationQueue for ChannelQueue {
    async fn ensure_exists(&self) -> QueueResult<()> {
        if self.tx.is_closed() {
            return Err(QueueError::Closed(self.name.clone()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, payload), fields(queue = %self.name, size_bytes = payload.len()))]
    async fn send(&self, payload: String) -> QueueResult<()> {
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => {
                tracing::warn!("Notification queue is full, rejecting message");
                QueueError::Full(self.name.clone())
            }
            TrySendError::Closed(_) => QueueError::Closed(self.name.clone()),
        })
    }
}
