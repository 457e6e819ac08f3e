//! Connection Server Module
//!
//! Owns the listening socket and the set of live connection tasks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Server::run                             │
//! │                  (accept loop)                              │
//! └──────────────┬─────────────────────────────┬────────────────┘
//!                │ accept()                    │ ShutdownController
//!                ▼                             ▼ leaves Running
//!   ┌────────────────────────┐      ┌────────────────────────┐
//!   │ spawn into JoinSet:    │      │ drop listener          │
//!   │ handle_connection(..)  │      │ return Connections     │
//!   └────────────────────────┘      └────────────────────────┘
//! ```
//!
//! Stopping the server only ends the accept loop. Connections already
//! open keep running until their clients leave; the caller decides
//! whether to wait for them (`Connections::drain`) or abort them.

pub mod shutdown;

use crate::config::ServerConfig;
use crate::connection::{handle_connection, ConnectionStats};
use crate::session::SessionFactory;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, info_span, Instrument, Span};

pub use shutdown::{trap_interrupt, ServerState, ShutdownController};

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Errors that prevent the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The address could not be bound (in use, permission denied, ...)
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A bound TCP server handing each connection to its own session.
pub struct Server<F: SessionFactory> {
    listener: TcpListener,
    local_addr: SocketAddr,
    factory: Arc<F>,
    stats: Arc<ConnectionStats>,
    shutdown: ShutdownController,
    span: Span,
}

impl<F: SessionFactory> Server<F> {
    /// Binds the configured address and starts listening.
    ///
    /// A bind failure is returned as-is; the server never retries.
    pub async fn start(config: &ServerConfig, factory: F) -> Result<Self, ServerError> {
        let addr = config.address();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let span = info_span!("server", address = %local_addr);
        span.in_scope(|| info!("starting server on {}", addr));

        Ok(Self {
            listener,
            local_addr,
            factory: Arc::new(factory),
            stats: Arc::new(ConnectionStats::new()),
            shutdown: ShutdownController::new(),
            span,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Handle used to stop the server from elsewhere.
    pub fn shutdown_controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// Accepts connections until the shutdown controller leaves `Running`.
    ///
    /// Returns the connections still open at that point.
    pub async fn run(self) -> Connections {
        let Server {
            listener,
            factory,
            stats,
            shutdown,
            span,
            ..
        } = self;
        async move {
            let mut connections = JoinSet::new();

            loop {
                tokio::select! {
                    _ = shutdown.stopped() => break,

                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            let factory = Arc::clone(&factory);
                            let stats = Arc::clone(&stats);
                            connections.spawn(
                                handle_connection(stream, peer, factory, stats)
                                    .instrument(info_span!("connection", peer = %peer)),
                            );
                        }
                        Err(e) => accept_failed(&e).await,
                    },

                    Some(finished) = connections.join_next() => reap(finished),
                }
            }

            drop(listener);
            shutdown.mark_stopped();
            info!(
                open_connections = connections.len(),
                "Listener closed, no longer accepting connections"
            );

            Connections { tasks: connections }
        }
        .instrument(span)
        .await
    }

    /// Like [`Server::run`], with SIGINT triggering shutdown.
    pub async fn run_until_interrupt(self) -> Connections {
        let trap = tokio::spawn(trap_interrupt(self.shutdown.clone()).instrument(self.span.clone()));

        let connections = self.run().await;

        // Leave the next SIGINT to the caller.
        trap.abort();
        connections
    }
}

/// Connections still open after the accept loop stopped.
///
/// Dropping this aborts the remaining connection tasks, exactly like
/// [`Connections::abort_all`].
#[derive(Debug)]
pub struct Connections {
    tasks: JoinSet<()>,
}

impl Connections {
    /// Number of connection tasks not yet reaped.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits until every open connection has closed on its own.
    pub async fn drain(mut self) {
        while let Some(finished) = self.tasks.join_next().await {
            reap(finished);
        }
    }

    /// Aborts every open connection.
    ///
    /// Aborted tasks are cancelled at their next await point: their sessions
    /// are dropped without `Session::on_disconnect` being called, and the
    /// `active_connections` statistic is not decremented for them. Use
    /// [`Connections::drain`] when sessions must see their teardown.
    pub fn abort_all(&mut self) {
        self.tasks.abort_all();
    }
}

/// Logs a failed accept and waits before the next attempt.
async fn accept_failed(error: &io::Error) {
    error!(error = %error, "Failed to accept connection");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// Logs connection tasks that did not finish cleanly.
fn reap(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        if e.is_panic() {
            error!(error = %e, "Connection task panicked");
        }
    }
}
