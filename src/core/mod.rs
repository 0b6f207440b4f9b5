//! Core types shared across the monitor
//!
//! - `MonitorConfig` / `RepositoryIdentity` - Startup configuration
//! - `MonitorError` / `LookupError` - Error types

pub mod config;
pub mod error;

pub use config::{IdTokenEndpoint, MonitorConfig, RepositoryIdentity, DEFAULT_LOOKUP_TIMEOUT};
pub use error::{LookupError, LookupResult, MonitorError, MonitorResult};
