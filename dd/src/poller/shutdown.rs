//! Cooperative shutdown flag and signal wiring
//!
//! Termination requests become a flag that the polling loop checks at
//! iteration boundaries, never mid-drain. The signal path and the loop
//! path run on different tasks; the flag is an `AtomicBool` with
//! `SeqCst` ordering so the loop always observes the latest write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

/// Cooperative shutdown handle.
///
/// Cheap to clone; all clones share one flag. The flag transitions
/// false → true exactly once, no matter how many times [`request`]
/// is called or how many signals arrive.
///
/// [`request`]: Shutdown::request
#[derive(Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    signals_installed: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a handle with the flag unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns true on the first transition; later
    /// calls are harmless no-ops.
    pub fn request(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::SeqCst);
        if first {
            info!("shutdown requested, finishing current cycle before exit");
        }
        first
    }

    /// True once shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// True when OS signal handlers were registered for this handle
    pub fn signals_installed(&self) -> bool {
        self.signals_installed.load(Ordering::SeqCst)
    }

    /// Register handlers for the standard termination signals and spawn
    /// the listener task. Returns false when the runtime offers no
    /// signal handling; the process can then only be stopped by
    /// external kill, which is reported once here.
    ///
    /// Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn install_signals(&self) -> bool {
        use tokio::signal::unix::{SignalKind, signal};

        let registered = (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
            signal(SignalKind::quit()),
        );

        let (mut interrupt, mut terminate, mut quit) = match registered {
            (Ok(interrupt), Ok(terminate), Ok(quit)) => (interrupt, terminate, quit),
            _ => {
                warn!("could not register signal handlers; graceful shutdown unavailable");
                return false;
            }
        };

        debug!("registered handlers for SIGINT, SIGTERM, SIGQUIT");
        self.signals_installed.store(true, Ordering::SeqCst);

        let shutdown = self.clone();
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = interrupt.recv() => "SIGINT",
                    _ = terminate.recv() => "SIGTERM",
                    _ = quit.recv() => "SIGQUIT",
                };
                info!(signal = received, "termination signal received");
                shutdown.request();
            }
        });

        true
    }

    /// Non-Unix fallback: Ctrl-C only.
    #[cfg(not(unix))]
    pub fn install_signals(&self) -> bool {
        self.signals_installed.store(true, Ordering::SeqCst);

        let shutdown = self.clone();
        tokio::spawn(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    warn!("Ctrl-C handler unavailable; graceful shutdown unavailable");
                    break;
                }
                info!("interrupt received");
                shutdown.request();
            }
        });

        true
    }
}
