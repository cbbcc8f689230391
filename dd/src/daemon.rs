//! Daemon process management
//!
//! Handles background start, PID file management, and process control.
//! `stop` delivers SIGTERM, which the worker's signal handler converts
//! into a cooperative shutdown request; SIGKILL is a last resort after
//! the grace period.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use eyre::{Context, Result};
use tracing::{debug, info, warn};

/// Current version from git describe (set at compile time)
pub const VERSION: &str = env!("GIT_DESCRIBE");

/// How long `stop` waits for a graceful exit before SIGKILL
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Default PID file location
fn default_pid_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("delayd")
        .join("delayd.pid")
}

/// Daemon process manager
#[derive(Debug)]
pub struct DaemonManager {
    /// Path to the PID file
    pid_file: PathBuf,
}

impl Default for DaemonManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DaemonManager {
    /// Create a new daemon manager with the default PID file location
    pub fn new() -> Self {
        Self {
            pid_file: default_pid_path(),
        }
    }

    /// Create a daemon manager with a custom PID file path
    pub fn with_pid_file(pid_file: PathBuf) -> Self {
        Self { pid_file }
    }

    /// Check if a daemon is running
    pub fn is_running(&self) -> bool {
        self.read_pid().is_some_and(is_process_running)
    }

    /// Get the running daemon's PID
    pub fn running_pid(&self) -> Option<u32> {
        self.read_pid().filter(|&pid| is_process_running(pid))
    }

    /// Read the PID from the PID file
    fn read_pid(&self) -> Option<u32> {
        let contents = fs::read_to_string(&self.pid_file).ok()?;
        contents.trim().parse().ok()
    }

    /// Write the PID to the PID file
    fn write_pid(&self, pid: u32) -> Result<()> {
        if let Some(parent) = self.pid_file.parent() {
            fs::create_dir_all(parent).context("Failed to create PID file directory")?;
        }
        fs::write(&self.pid_file, pid.to_string()).context("Failed to write PID file")?;
        debug!(pid, path = ?self.pid_file, "wrote PID file");
        Ok(())
    }

    /// Remove the PID file
    fn remove_pid_file(&self) -> Result<()> {
        if self.pid_file.exists() {
            fs::remove_file(&self.pid_file).context("Failed to remove PID file")?;
            debug!(path = ?self.pid_file, "removed PID file");
        }
        Ok(())
    }

    /// Start the daemon.
    ///
    /// Spawns the current executable detached from the terminal and
    /// returns immediately with the child PID.
    pub fn start(&self) -> Result<u32> {
        if let Some(pid) = self.running_pid() {
            return Err(eyre::eyre!("Daemon already running with PID {}", pid));
        }

        let exe = std::env::current_exe().context("Failed to get current executable")?;

        let child = Command::new(&exe)
            .arg("run-daemon")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn daemon process")?;

        let pid = child.id();
        self.write_pid(pid)?;

        info!(pid, "Daemon started");
        Ok(pid)
    }

    /// Stop the daemon by requesting cooperative shutdown
    pub fn stop(&self) -> Result<()> {
        let pid = self
            .running_pid()
            .ok_or_else(|| eyre::eyre!("Daemon is not running"))?;

        info!(pid, "Requesting daemon shutdown");

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            kill(Pid::from_raw(pid as i32), Signal::SIGTERM).context("Failed to send SIGTERM")?;
        }

        #[cfg(not(unix))]
        {
            Command::new("taskkill")
                .args(["/PID", &pid.to_string(), "/F"])
                .output()
                .context("Failed to kill process")?;
        }

        // The worker finishes its in-flight drain cycle before exiting,
        // so allow a grace period proportional to that
        let poll = Duration::from_millis(100);
        let mut waited = Duration::ZERO;
        while is_process_running(pid) && waited < STOP_GRACE_PERIOD {
            std::thread::sleep(poll);
            waited += poll;
        }

        if is_process_running(pid) {
            warn!(pid, "Daemon did not stop gracefully, sending SIGKILL");
            #[cfg(unix)]
            {
                use nix::sys::signal::{Signal, kill};
                use nix::unistd::Pid;
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
        }

        self.remove_pid_file()?;
        info!(pid, "Daemon stopped");
        Ok(())
    }

    /// Register the current process as the daemon.
    ///
    /// Called by the daemon process itself once it is up.
    pub fn register_self(&self) -> Result<()> {
        let pid = std::process::id();
        self.write_pid(pid)?;
        info!(pid, version = VERSION, "Daemon registered");
        Ok(())
    }

    /// Get the PID file path
    pub fn pid_file(&self) -> &PathBuf {
        &self.pid_file
    }

    /// Get the daemon status
    pub fn status(&self) -> DaemonStatus {
        let pid = self.running_pid();
        DaemonStatus {
            running: pid.is_some(),
            pid,
            pid_file: self.pid_file.clone(),
        }
    }
}

/// Check if a process with the given PID is running
fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        // Signal 0 probes for existence without affecting the process
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    #[cfg(not(unix))]
    {
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH"])
            .output()
            .map(|o| !o.stdout.is_empty() && !String::from_utf8_lossy(&o.stdout).contains("No tasks"))
            .unwrap_or(false)
    }
}

/// Daemon status information
#[derive(Debug)]
pub struct DaemonStatus {
    /// Whether the daemon is running
    pub running: bool,
    /// Process ID (if running)
    pub pid: Option<u32>,
    /// PID file path
    pub pid_file: PathBuf,
}
