//! Fileflow database layer
//!
//! Status table and audit log repositories. PostgreSQL implementations back production runs;
//! the `memory` feature adds in-process implementations with the same semantics.

pub mod db;

pub use db::{AuditLog, PostgresAuditLog, PostgresStatusTable, StatusTable};
#[cfg(feature = "memory")]
pub use db::{InMemoryAuditLog, InMemoryStatusTable};
