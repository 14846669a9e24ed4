//! Fileflow Core Library
//!
//! This crate provides the domain models, error types, configuration, key helpers and
//! upload validation shared by every Fileflow component.

pub mod config;
pub mod constants;
pub mod error;
pub mod keys;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{
    BackendConfig, Config, CopyPollConfig, QueueBackend, StorageBackend, WorkflowConfig,
};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use validation::{FileValidator, ValidationError};
// Note: Storage, StorageError, StorageResult live in fileflow-storage
