//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dd - delayed-job dispatch daemon
#[derive(Parser)]
#[command(
    name = "dd",
    about = "Delayed-job dispatch daemon: moves due jobs into immediate-execution queues",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/delayd/logs/delayd.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Start the daemon in the background
    Start {
        /// Don't fork to background (run in foreground)
        #[arg(long)]
        foreground: bool,
    },

    /// Request cooperative shutdown of the running daemon
    Stop,

    /// Show daemon status
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a single drain pass without the polling loop
    RunOnce {
        /// Drain up to this instant (RFC 3339) instead of now
        #[arg(long, value_name = "TIMESTAMP")]
        at: Option<String>,
    },

    /// Internal: Run as daemon process (used by `start`)
    #[command(hide = true)]
    RunDaemon,

    /// Show daemon logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short, long, default_value = "50")]
        lines: usize,
    },
}

/// Output format for the status command
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Path of the daemon log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("delayd")
        .join("logs")
        .join("delayd.log")
}
