//! dd - delayed-job dispatch daemon
//!
//! CLI entry point for running and managing the delayed-job worker.

use std::fs;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use delayd::cli::{Cli, Command, OutputFormat, get_log_path};
use delayd::config::Config;
use delayd::daemon::DaemonManager;
use delayd::domain::{Horizon, WorkerIdentity};
use delayd::events::{EventBus, EventLogger};
use delayd::poller::Poller;
use delayd::store::{MemoryDelayStore, MemoryDispatchSink};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    // Write to the log file, not stdout/stderr; the CLI owns the terminal
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Start { foreground } => cmd_start(&config, foreground).await,
        Command::Stop => cmd_stop(),
        Command::Status { format } => cmd_status(format),
        Command::RunOnce { at } => cmd_run_once(&config, at.as_deref()).await,
        Command::RunDaemon => cmd_run_daemon(&config).await,
        Command::Logs { follow, lines } => cmd_logs(follow, lines),
    }
}

/// Assemble a worker against the process-local backends.
///
/// The library is written against the [`delayd::store::DelayStore`] and
/// [`delayd::store::DispatchSink`] traits; deployments supply networked
/// implementations and reuse [`Poller`] unchanged. The bundled daemon
/// wires the in-memory pair, which is enough for development use.
fn build_worker(config: &Config) -> (Arc<Poller>, Arc<EventBus>) {
    let store = Arc::new(MemoryDelayStore::new());
    let sink = Arc::new(MemoryDispatchSink::new());
    let events = Arc::new(EventBus::new(config.events.channel_capacity));

    let poller = Poller::new(
        store,
        sink,
        events.clone(),
        WorkerIdentity::local(),
        config.poll.interval(),
    );
    (Arc::new(poller), events)
}

/// Start the daemon
async fn cmd_start(config: &Config, foreground: bool) -> Result<()> {
    let daemon = DaemonManager::new();

    if let Some(pid) = daemon.running_pid() {
        println!("delayd is already running (PID: {})", pid);
        return Ok(());
    }

    if foreground {
        println!("Starting delayd in foreground mode...");
        run_daemon(config).await
    } else {
        let pid = daemon.start()?;
        println!("delayd started (PID: {})", pid);
        Ok(())
    }
}

/// Request cooperative shutdown of the running daemon
fn cmd_stop() -> Result<()> {
    let daemon = DaemonManager::new();

    let Some(pid) = daemon.running_pid() else {
        println!("delayd is not running");
        return Ok(());
    };

    daemon.stop()?;
    println!("delayd stopped (was PID: {})", pid);
    Ok(())
}

/// Show daemon status
fn cmd_status(format: OutputFormat) -> Result<()> {
    let daemon = DaemonManager::new();
    let status = daemon.status();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "running": status.running,
                "pid": status.pid,
                "pid_file": status.pid_file.to_string_lossy()
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("delayd Status");
            println!("-------------");
            if let Some(pid) = status.pid {
                println!("Status: running");
                println!("PID: {}", pid);
            } else {
                println!("Status: stopped");
            }
            println!("PID file: {}", status.pid_file.display());
        }
    }

    Ok(())
}

/// Run a single drain pass without the polling loop
async fn cmd_run_once(config: &Config, at: Option<&str>) -> Result<()> {
    let horizon = match at {
        Some(raw) => {
            let instant = DateTime::parse_from_rfc3339(raw)
                .context(format!("Invalid --at timestamp: {}", raw))?
                .with_timezone(&Utc);
            Horizon::At(instant)
        }
        None => Horizon::Now,
    };

    let (poller, _events) = build_worker(config);
    let dispatched = poller.drain_due(horizon).await?;
    println!("Dispatched {} job(s)", dispatched);
    Ok(())
}

/// Run as the daemon process (internal command)
async fn cmd_run_daemon(config: &Config) -> Result<()> {
    let daemon = DaemonManager::new();
    daemon.register_self()?;

    run_daemon(config).await
}

/// Run the worker until shutdown
async fn run_daemon(config: &Config) -> Result<()> {
    let (poller, events) = build_worker(config);

    // Persist dispatch events when a log directory is configured
    if let Some(log_dir) = &config.events.log_dir {
        let logger = EventLogger::new(log_dir);
        tokio::spawn(logger.run(events.clone()));
        info!(dir = %log_dir.display(), "event log enabled");
    }

    poller.run().await
}

/// Show daemon logs
fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        println!("The daemon may not have been started yet.");
        return Ok(());
    }

    if follow {
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}
