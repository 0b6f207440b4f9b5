//! Command-line front end
//!
//! - `Console` - Colored terminal output
//! - `commands` - Capture replay and log summaries

pub mod commands;
pub mod console;

pub use commands::{read_capture, replay, summarize, ReplayStats};
pub use console::Console;
