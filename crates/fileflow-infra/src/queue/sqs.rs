use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;

use super::{NotificationQueue, QueueError, QueueResult};

/// AWS SQS notification queue
///
/// The queue URL is resolved from its name on each send.
#[derive(Clone)]
pub struct SqsNotificationQueue {
    client: Client,
    queue_name: String,
}

impl SqsNotificationQueue {
    /// Build a client from the default AWS credential chain, optionally pinning the region.
    pub async fn new(queue_name: String, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            queue_name,
        }
    }

    async fn queue_url(&self) -> QueueResult<String> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(&self.queue_name)
            .send()
            .await
            .map_err(|e| {
                QueueError::NotFound(format!("{}: {}", self.queue_name, DisplayErrorContext(&e)))
            })?;

        output
            .queue_url()
            .map(str::to_string)
            .ok_or_else(|| QueueError::NotFound(self.queue_name.clone()))
    }
}

#[async_trait]
impl NotificationQueue for SqsNotificationQueue {
    async fn ensure_exists(&self) -> QueueResult<()> {
        let start = std::time::Instant::now();

        self.client
            .create_queue()
            .queue_name(&self.queue_name)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    queue = %self.queue_name,
                    "SQS create queue failed"
                );
                QueueError::BackendError(DisplayErrorContext(&e).to_string())
            })?;

        tracing::debug!(
            queue = %self.queue_name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "SQS queue ensured"
        );
        Ok(())
    }

    async fn send(&self, payload: String) -> QueueResult<()> {
        let start = std::time::Instant::now();
        let size = payload.len();
        let queue_url = self.queue_url().await?;

        let output = self
            .client
            .send_message()
            .queue_url(&queue_url)
            .message_body(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    queue = %self.queue_name,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "SQS send failed"
                );
                QueueError::SendFailed(DisplayErrorContext(&e).to_string())
            })?;

        tracing::info!(
            queue = %self.queue_name,
            message_id = output.message_id().unwrap_or_default(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "SQS send successful"
        );
        Ok(())
    }
}
