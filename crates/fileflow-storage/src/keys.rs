//! Shared key checks for storage backends.
//!
//! Key format: `{folder}/{file_name}` or `{file_name}`, relative to the container.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the container or address nothing.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty()
        || storage_key.starts_with('/')
        || storage_key.split('/').any(|segment| segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage key '{}' is empty, absolute or contains '..'",
            storage_key
        )));
    }
    Ok(())
}

/// Resume point for a listing: first key strictly after `continuation`.
pub fn after_continuation(key: &str, continuation: Option<&str>) -> bool {
    continuation.map_or(true, |c| key > c)
}
