//! Fixed partition keys and sentinels.

/// Partition holding every status record.
pub const STATUS_PARTITION: &str = "fileProcessing";

/// Partition holding every audit entry.
pub const AUDIT_PARTITION: &str = "fileAudit";

/// Type-count bucket for names without an extension.
pub const NO_EXTENSION: &str = "(none)";
