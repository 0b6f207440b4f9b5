//! Output of the monitor
//!
//! - `PermissionRecord` / `PermissionLog` - One JSON line per classified request
//! - `PermissionManifest` - The aggregated `permissions:` block

pub mod log;
pub mod manifest;
pub mod record;

pub use log::{read_records, PermissionLog};
pub use manifest::PermissionManifest;
pub use record::PermissionRecord;
