//! Repositories for the status table and the audit log
//!
//! Each store is a trait with a PostgreSQL implementation. Table names come from
//! configuration and are checked to be plain SQL identifiers before use.
//
// Status table (current processing status per file)
pub mod status;
//
// Audit log (append-only action history)
pub mod audit;
//
// In-process stores
#[cfg(feature = "memory")]
pub mod memory;

pub use audit::{AuditLog, PostgresAuditLog};
#[cfg(feature = "memory")]
pub use memory::{InMemoryAuditLog, InMemoryStatusTable};
pub use status::{PostgresStatusTable, StatusTable};

use fileflow_core::config::is_sql_identifier;
use fileflow_core::AppError;

/// Reject table names that cannot be spliced into SQL unquoted.
pub(crate) fn checked_table_name(name: &str) -> Result<String, AppError> {
    if is_sql_identifier(name) {
        Ok(name.to_string())
    } else {
        Err(AppError::Config(format!(
            "Table name '{}' is not a valid SQL identifier",
            name
        )))
    }
}
