//! Fileflow Infrastructure Library
//!
//! Shared infrastructure for Fileflow front ends:
//! - Telemetry initialization (tracing subscriber)
//! - Notification queue backends (SQS, in-process channel)

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod queue;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::init_telemetry;

pub use queue::{create_queue, ChannelQueue, NotificationQueue, QueueError, QueueResult};

#[cfg(feature = "queue-sqs")]
pub use queue::SqsNotificationQueue;
