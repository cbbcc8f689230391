//! Worker identity string

use std::fmt;

/// Process-wide worker identity, `hostname:pid:schedule`.
///
/// Computed once at startup and passed to logging calls; it has no
/// influence on scheduling behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    hostname: String,
    pid: u32,
}

impl WorkerIdentity {
    /// Derive the identity of the current process
    pub fn local() -> Self {
        Self {
            hostname: local_hostname(),
            pid: std::process::id(),
        }
    }

    /// Build an identity from explicit parts (for tests and tooling)
    pub fn new(hostname: impl Into<String>, pid: u32) -> Self {
        Self {
            hostname: hostname.into(),
            pid,
        }
    }

    /// The host part of the identity
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The process id part of the identity
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:schedule", self.hostname, self.pid)
    }
}

/// Hostname of this machine, falling back to the environment and then a
/// fixed placeholder when the OS lookup is unavailable.
fn local_hostname() -> String {
    #[cfg(unix)]
    {
        if let Ok(name) = nix::unistd::gethostname() {
            if let Ok(name) = name.into_string() {
                if !name.is_empty() {
                    return name;
                }
            }
        }
    }

    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_format() {
        let identity = WorkerIdentity::new("worker-01", 4242);
        assert_eq!(identity.to_string(), "worker-01:4242:schedule");
    }

    #[test]
    fn test_local_identity_uses_current_pid() {
        let identity = WorkerIdentity::local();
        assert_eq!(identity.pid(), std::process::id());
        assert!(!identity.hostname().is_empty());
    }

    #[test]
    fn test_identity_is_stable() {
        let a = WorkerIdentity::local();
        let b = WorkerIdentity::local();
        assert_eq!(a, b);
    }
}
