//! Session Interface
//!
//! A session owns the protocol semantics for exactly one connection. The
//! server knows nothing about the protocol: it frames lines, hands each one
//! to the session, and writes back whatever the session sends.
//!
//! ## Lifecycle
//!
//! ```text
//!   accept ──> SessionFactory::on_accept(peer, LineSender) ──> Session
//!                                                               │
//!   each line ──────────────> Session::on_line(line) ──────────┤
//!                                                               │
//!   disconnect / error ─────> Session::on_disconnect() ─────────┘  (once)
//! ```
//!
//! Sessions talk back through the [`LineSender`] handed to them on accept.
//! Sending never blocks; lines are queued and written in order by the
//! connection's own task.

pub mod keepalive;

use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::trace;

pub use keepalive::{KeepaliveFactory, KeepaliveSession};

/// Per-connection protocol state machine.
///
/// All methods are called from the connection's own task, one at a time,
/// in the order the lines arrived.
pub trait Session: Send + 'static {
    /// Called for every line received, with the delimiter stripped.
    ///
    /// Returning an error closes this connection only.
    fn on_line(&mut self, line: &str) -> Result<(), SessionError>;

    /// Called exactly once when the connection has closed, for any reason.
    ///
    /// The connection's `LineSender` is already closed at this point.
    fn on_disconnect(&mut self) {}
}

/// Creates one session per accepted connection.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: Session;

    /// Builds the session for a newly accepted connection.
    ///
    /// Returning an error drops the connection without affecting the server.
    fn on_accept(&self, peer: SocketAddr, sender: LineSender)
        -> Result<Self::Session, SessionError>;
}

impl<F, S> SessionFactory for F
where
    F: Fn(SocketAddr, LineSender) -> Result<S, SessionError> + Send + Sync + 'static,
    S: Session,
{
    type Session = S;

    fn on_accept(&self, peer: SocketAddr, sender: LineSender) -> Result<S, SessionError> {
        self(peer, sender)
    }
}

/// Errors a session can report back to the server.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session refused the connection at accept time
    #[error("connection rejected: {0}")]
    Rejected(String),

    /// The peer violated the protocol badly enough to be dropped
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The session panicked while handling a callback
    #[error("session panicked: {0}")]
    Panicked(String),

    /// Anything else
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Messages queued from a session to its connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outbound {
    /// A line to encode and write
    Line(String),
    /// Flush what is queued, then close the connection
    Close,
}

/// Handle a session uses to write lines to its client.
///
/// Cloning is cheap. Once the connection has closed every method is a
/// no-op that returns `false`.
#[derive(Debug, Clone)]
pub struct LineSender {
    tx: mpsc::UnboundedSender<Outbound>,
    peer: SocketAddr,
}

impl LineSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Outbound>, peer: SocketAddr) -> Self {
        Self { tx, peer }
    }

    /// Queues `line` for sending. The line must not contain CRLF; the
    /// delimiter is appended on the wire.
    ///
    /// Returns `false` if the connection has already closed.
    pub fn send_line(&self, line: impl Into<String>) -> bool {
        match self.tx.send(Outbound::Line(line.into())) {
            Ok(()) => true,
            Err(mpsc::error::SendError(_)) => {
                trace!(peer = %self.peer, "Dropping line for closed connection");
                false
            }
        }
    }

    /// Asks the connection to close once everything queued so far is written.
    ///
    /// Returns `false` if the connection has already closed.
    pub fn close(&self) -> bool {
        self.tx.send(Outbound::Close).is_ok()
    }

    /// Returns true once the connection has closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// The remote address of the client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
