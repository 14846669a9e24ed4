//! Fileflow Storage Library
//!
//! This crate provides the object store abstraction used by the file workflow and its
//! implementations for S3 (through `object_store`) and the local filesystem.
//!
//! # Key format
//!
//! Keys are relative to a container: `{folder}/{file_name}` or a bare `{file_name}`.
//! Keys must not contain `..` or a leading `/`; see the `keys` module.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use fileflow_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{
    ByteReader, ByteStream, CopyHandle, CopyStatus, ObjectPage, ObjectProperties, ObjectSummary,
    Storage, StorageError, StorageResult,
};

use fileflow_core::AppError;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Blob not found: {}", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}
