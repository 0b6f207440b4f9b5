//! Logging setup
//!
//! Human-readable logs go to stderr so stdout stays free for command output.
//! With a log directory configured, a debug-level copy is also written to
//! `debug.log` there.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::core::{MonitorError, MonitorResult};

pub const LOG_FILE: &str = "debug.log";

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Lower the stderr level to `debug` when `RUST_LOG` is unset
    pub debug: bool,

    /// Directory receiving `debug.log`
    pub log_dir: Option<PathBuf>,

    /// Write the file log as JSON lines
    pub json: bool,
}

impl LoggingOptions {
    fn default_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Non-blocking `debug.log` layer in `dir`, JSON lines when `json` is set
pub fn file_layer(dir: &Path, json: bool) -> MonitorResult<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE));
    let layer = fmt::layer().with_writer(writer).with_ansi(false);
    let layer = if json {
        layer.json().with_filter(EnvFilter::new("debug")).boxed()
    } else {
        layer.with_filter(EnvFilter::new("debug")).boxed()
    };
    Ok((layer, guard))
}

/// Install the global subscriber
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and closes the file writer.
pub fn init_logging(options: &LoggingOptions) -> MonitorResult<Option<WorkerGuard>> {
    let (file, guard) = match &options.log_dir {
        Some(dir) => {
            let (layer, guard) = file_layer(dir, options.json)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.default_directive()));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    tracing_subscriber::registry()
        .with(file)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| MonitorError::invalid(format!("logging already initialised: {}", e)))?;

    tracing::debug!("[Logging] Initialised ({:?})", options);
    Ok(guard)
}
