//! Request intake
//!
//! - `ObservedRequest` - What the capture layer saw
//! - `RequestGate` - Host and credential checks
//! - `Monitor` - Classifies in-scope requests into `PermissionRecord`s

pub mod gate;
pub mod monitor;
pub mod request;

pub use gate::{contains_token, GateDecision, RequestGate};
pub use monitor::Monitor;
pub use request::{ObservedRequest, ParsedRequest};
