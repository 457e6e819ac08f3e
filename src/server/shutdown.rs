//! Shutdown coordination for the server.
//!
//! ```text
//!   Running ──stop()──> Stopping ──listener released──> Stopped
//! ```
//!
//! The transition is one-shot: there is no way back to `Running`.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Lifecycle state of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Accepting connections
    Running,
    /// Stop requested; the accept loop is winding down
    Stopping,
    /// The listening socket has been released
    Stopped,
}

/// Coordinator for graceful shutdown.
///
/// Cloning yields another handle to the same state, so the signal trap,
/// the accept loop and any embedding code can share it.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    state: Arc<watch::Sender<ServerState>>,
}

impl ShutdownController {
    /// Creates a controller in the `Running` state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Running);
        Self { state: Arc::new(tx) }
    }

    /// Current state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Requests shutdown: stop accepting and release the listener.
    ///
    /// Open connections are not touched. Returns `true` only for the call
    /// that actually moved the server out of `Running`.
    pub fn stop(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ServerState::Running {
                *state = ServerState::Stopping;
                true
            } else {
                false
            }
        })
    }

    /// Resolves once shutdown has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state != ServerState::Running).await;
    }

    pub(crate) fn mark_stopped(&self) {
        self.state.send_replace(ServerState::Stopped);
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for SIGINT and then stops the server.
pub async fn trap_interrupt(shutdown: ShutdownController) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("SIGINT, shutting down");
            shutdown.stop();
        }
        Err(e) => error!(error = %e, "Failed to install SIGINT handler"),
    }
}
