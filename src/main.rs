use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use permission_monitor::cli::{self, Console};
use permission_monitor::core::config::debug_requested;
use permission_monitor::core::MonitorConfig;
use permission_monitor::logging::{self, LoggingOptions};
use permission_monitor::monitor::{Monitor, ObservedRequest};
use permission_monitor::report::PermissionLog;

#[derive(Parser)]
#[command(name = "permission-monitor")]
#[command(version)]
#[command(about = "Infers the minimal workflow token permissions from observed API calls", long_about = None)]
struct Cli {
    /// Debug-level logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Also write debug.log into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Write debug.log as JSON lines
    #[arg(long, global = true, requires = "log_dir")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single request using the environment configuration
    Classify {
        /// HTTP method
        method: String,

        /// Full request URL
        url: String,
    },

    /// Classify a capture file and append the results to a permission log
    Replay {
        /// Captured requests, one JSON object per line
        #[arg(long)]
        input: PathBuf,

        /// Permission log to append to
        #[arg(long)]
        output: PathBuf,

        /// Requests classified concurrently
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
    },

    /// Print the minimal permissions block for one or more permission logs
    Summarize {
        /// Permission logs
        #[arg(required = true)]
        logs: Vec<PathBuf>,

        /// Only count records for these hosts (comma-separated)
        #[arg(long, value_delimiter = ',')]
        hosts: Vec<String>,

        /// Earlier artifacts to merge in
        #[arg(long)]
        merge: Vec<PathBuf>,

        /// Write the merged permissions as a JSON artifact
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let _guard = logging::init_logging(&LoggingOptions {
        debug: args.debug || debug_requested(),
        log_dir: args.log_dir.clone(),
        json: args.log_json,
    })?;

    let console = Console::new();
    if let Err(err) = run(args, &console).await {
        tracing::error!("{:#}", err);
        console.print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Cli, console: &Console) -> Result<()> {
    match args.command {
        Commands::Classify { method, url } => {
            let config = load_config()?;
            let monitor = Monitor::from_config(&config)?;

            let parsed = ObservedRequest::new(method.as_str(), url.as_str()).parse()?;
            let requirements = monitor.resolver().resolve(&method, &parsed.path, &parsed.query).await;

            console.print_classification(&method, &parsed.path, &requirements);
            println!("{}", serde_json::to_string(&requirements)?);
        }

        Commands::Replay {
            input,
            output,
            concurrency,
        } => {
            let config = load_config()?;
            let monitor = Arc::new(Monitor::from_config(&config)?);

            let requests = cli::read_capture(&input).with_context(|| format!("Failed to read {:?}", input))?;
            let log = PermissionLog::open(&output).with_context(|| format!("Failed to open {:?}", output))?;

            let stats = cli::replay(monitor, requests, &log, concurrency).await?;
            console.print_replay_stats(&stats);
        }

        Commands::Summarize {
            logs,
            hosts,
            merge,
            artifact,
        } => {
            let hosts: HashSet<String> = hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect();
            let host_filter = if hosts.is_empty() { None } else { Some(&hosts) };

            let manifest = cli::summarize(&logs, host_filter, &merge)?;
            console.print_manifest(&manifest);
            console.print_unclassified(manifest.unclassified());

            if let Some(path) = artifact {
                std::fs::write(&path, serde_json::to_string(&manifest.to_json())?)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                tracing::info!("Wrote permissions artifact to {:?}", path);
            }
        }
    }

    Ok(())
}

fn load_config() -> Result<MonitorConfig> {
    MonitorConfig::from_env().context("Failed to load configuration from the environment")
}
