//! Data models for the file workflow
//!
//! Status records and audit entries are the two persisted shapes; listing items, type
//! counts and upload events are derived on demand.

mod audit;
mod event;
mod file;
mod status;

pub use audit::*;
pub use event::*;
pub use file::*;
pub use status::*;
