//! Connection Handler Module
//!
//! This module binds one accepted TCP connection to one session.
//! Each client gets its own handler task that runs in a loop, reading
//! lines, handing them to the session, and writing back whatever the
//! session queued.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler created, SessionFactory::on_accept
//!        │
//!        ▼
//! 3. ┌──────────────────────────────────────┐
//!    │      Main Loop                       │
//!    │                                      │
//!    │  ┌────────────────────────────────┐  │
//!    │  │ Write queued outbound lines    │  │
//!    │  └───────────────┬────────────────┘  │
//!    │                  │ (queue empty)     │
//!    │                  ▼                   │
//!    │  ┌────────────────────────────────┐  │
//!    │  │ Read next CRLF line            │  │
//!    │  └───────────────┬────────────────┘  │
//!    │                  │                   │
//!    │                  ▼                   │
//!    │  ┌────────────────────────────────┐  │
//!    │  │ Session::on_line               │  │
//!    │  └───────────────┬────────────────┘  │
//!    │                  │                   │
//!    │                  ▼                   │
//!    │             [Loop back]              │
//!    └──────────────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / I/O error / session error / session close
//!        │
//!        ▼
//! 5. Session::on_disconnect (exactly once), handler task ends
//! ```
//!
//! Lines from one connection are handled strictly in order. Nothing here is
//! shared with other connections except the statistics counters.

use crate::protocol::{LineCodec, LineReader};
use crate::session::{LineSender, Outbound, Session, SessionError, SessionFactory};
use bytes::BytesMut;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total lines received from clients
    pub lines_received: AtomicU64,
    /// Total lines sent to clients
    pub lines_sent: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn line_received(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn line_sent(&self, bytes: usize) {
        self.lines_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Owns the socket halves, the line buffer and the session for one
/// connected client.
pub struct ConnectionHandler<S: Session> {
    /// Inbound half, wrapped in the line framer
    reader: LineReader<OwnedReadHalf>,

    /// Outbound half
    writer: BufWriter<OwnedWriteHalf>,

    /// Client's address, captured once at accept
    peer: SocketAddr,

    /// The bound session; `None` once torn down
    session: Option<S>,

    /// Lines and close requests queued by the session
    outbound: mpsc::UnboundedReceiver<Outbound>,

    codec: LineCodec,
    write_buf: BytesMut,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S: Session> ConnectionHandler<S> {
    /// Creates a new connection handler and asks `factory` for its session.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `peer` - The client's socket address
    /// * `factory` - Builds the session bound to this connection
    /// * `stats` - Shared connection statistics
    pub fn new<F>(
        stream: TcpStream,
        peer: SocketAddr,
        factory: &F,
        stats: Arc<ConnectionStats>,
    ) -> Result<Self, ConnectionError>
    where
        F: SessionFactory<Session = S>,
    {
        let (tx, outbound) = mpsc::unbounded_channel();
        let session = factory.on_accept(peer, LineSender::new(tx, peer))?;
        let (read_half, write_half) = stream.into_split();

        stats.connection_opened();

        Ok(Self {
            reader: LineReader::new(read_half),
            writer: BufWriter::new(write_half),
            peer,
            session: Some(session),
            outbound,
            codec: LineCodec::new(),
            write_buf: BytesMut::new(),
            stats,
        })
    }

    /// Runs the connection until it closes, then tears the session down.
    ///
    /// `Ok(())` means the session asked to close; every other ending is
    /// reported as an error, `ClientDisconnected` being the normal one.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(peer = %self.peer, "got connection from {}", self.peer.ip());

        let result = self.main_loop().await;

        if result.is_ok() {
            if let Err(e) = self.writer.shutdown().await {
                trace!(peer = %self.peer, error = %e, "Shutdown after close failed");
            }
        }

        self.teardown();
        self.stats.connection_closed();

        match &result {
            Ok(()) => info!(peer = %self.peer, reason = "closed by session", "closed connection from {}", self.peer.ip()),
            Err(ConnectionError::ClientDisconnected) => {
                info!(peer = %self.peer, reason = "client disconnected", "closed connection from {}", self.peer.ip())
            }
            Err(ConnectionError::Session(e)) => {
                warn!(peer = %self.peer, error = %e, "closed connection from {} after session error", self.peer.ip())
            }
            Err(e) => info!(peer = %self.peer, error = %e, "closed connection from {}", self.peer.ip()),
        }

        result
    }

    /// The main write-read-dispatch loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            tokio::select! {
                biased;

                Some(message) = self.outbound.recv() => match message {
                    Outbound::Line(line) => self.send_line(&line).await?,
                    Outbound::Close => return Ok(()),
                },

                line = self.reader.next_line() => match line? {
                    Some(line) => self.dispatch(&line)?,
                    None => return Err(ConnectionError::ClientDisconnected),
                },
            }
        }
    }

    /// Hands one received line to the session.
    fn dispatch(&mut self, line: &str) -> Result<(), ConnectionError> {
        debug!(peer = %self.peer, "irc -> {}", line.trim());
        self.stats.line_received();

        if let Some(session) = self.session.as_mut() {
            panic::catch_unwind(AssertUnwindSafe(|| session.on_line(line)))
                .map_err(|payload| SessionError::Panicked(panic_message(payload)))??;
        }
        Ok(())
    }

    /// Encodes and writes one line to the client.
    async fn send_line(&mut self, line: &str) -> Result<(), ConnectionError> {
        debug!(peer = %self.peer, "irc <- {}", line);

        self.write_buf.clear();
        self.codec.encode(line, &mut self.write_buf);
        self.writer.write_all(&self.write_buf).await?;
        self.writer.flush().await?;

        self.stats.line_sent(self.write_buf.len());
        Ok(())
    }

    /// Closes the outbound queue and notifies the session, once.
    fn teardown(&mut self) {
        self.outbound.close();
        if let Some(mut session) = self.session.take() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| session.on_disconnect())) {
                warn!(peer = %self.peer, panic = %panic_message(payload), "Session panicked in on_disconnect");
            }
        }
    }
}

/// Extracts the message from a panic payload.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => "unknown panic".to_string(),
        },
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The session failed on accept or while handling a line
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Failures stay local to this connection.
///
/// # Arguments
///
/// * `stream` - The TCP stream for this connection
/// * `peer` - The client's socket address
/// * `factory` - Builds the session for this connection
/// * `stats` - Shared connection statistics
pub async fn handle_connection<F: SessionFactory>(
    stream: TcpStream,
    peer: SocketAddr,
    factory: Arc<F>,
    stats: Arc<ConnectionStats>,
) {
    let handler = match ConnectionHandler::new(stream, peer, factory.as_ref(), stats) {
        Ok(handler) => handler,
        Err(e) => {
            info!(peer = %peer, "got connection from {}", peer.ip());
            warn!(peer = %peer, error = %e, "Dropping connection, no session");
            info!(peer = %peer, reason = "rejected by session factory", "closed connection from {}", peer.ip());
            return;
        }
    };
    drop(factory);

    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            _ => debug!(peer = %peer, error = %e, "Connection ended with error"),
        }
    }
}
