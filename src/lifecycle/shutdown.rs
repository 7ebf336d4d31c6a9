//! Signal handling for graceful shutdown

use std::fmt;

use tokio::signal::unix::{signal, SignalKind};

/// Which signal asked the daemon to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    Sigterm,
    Sigint,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::Sigterm => write!(f, "SIGTERM"),
            ShutdownCause::Sigint => write!(f, "SIGINT"),
        }
    }
}

/// Waits for SIGTERM or SIGINT and reports which one arrived, so the
/// daemon can log whether it was stopped by a supervisor or a Ctrl-C
pub struct ShutdownSignal;

impl ShutdownSignal {
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    pub async fn wait(&self) -> ShutdownCause {
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt())
            .expect("failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => ShutdownCause::Sigterm,
            _ = sigint.recv() => ShutdownCause::Sigint,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
