//! # ircfront - A TCP Front-End for Line-Oriented Protocols
//!
//! ircfront accepts TCP connections speaking a CRLF-delimited text protocol
//! (IRC-style) and binds each connection to its own session object, which
//! owns the actual protocol semantics. The crate provides the listener,
//! the line framing, the per-connection lifecycle and a clean shutdown on
//! SIGINT; sessions plug in through a small trait.
//!
//! ## Features
//!
//! - **One session per connection**: created on accept, torn down exactly once
//! - **CRLF framing**: chunk-boundary independent, empty lines preserved
//! - **Async I/O**: Built on Tokio, one task per connection
//! - **Graceful shutdown**: SIGINT stops accepting, open connections finish
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              ircfront                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Session    │                  │
//! │  │ (Listener)  │    │  Handler    │<───│ (LineSender)│                  │
//! │  └──────┬──────┘    └──────┬──────┘    └─────────────┘                  │
//! │         │                  │                                            │
//! │         ▼                  ▼                                            │
//! │  ┌─────────────┐    ┌─────────────┐                                     │
//! │  │  Shutdown   │    │ CRLF Line   │                                     │
//! │  │ Controller  │    │   Codec     │                                     │
//! │  └─────────────┘    └─────────────┘                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use ircfront::{KeepaliveFactory, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = Server::start(&ServerConfig::default(), KeepaliveFactory).await?;
//!
//!     // Runs until SIGINT, then stops accepting.
//!     let connections = server.run_until_interrupt().await;
//!
//!     // Let the clients that are still connected finish.
//!     connections.drain().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Writing a Session
//!
//! ```ignore
//! use ircfront::{LineSender, Session, SessionError};
//!
//! struct Shout { sender: LineSender }
//!
//! impl Session for Shout {
//!     fn on_line(&mut self, line: &str) -> Result<(), SessionError> {
//!         self.sender.send_line(line.to_uppercase());
//!         Ok(())
//!     }
//! }
//!
//! let factory = |_peer, sender| -> Result<Shout, SessionError> { Ok(Shout { sender }) };
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: CRLF line codec and lazy line reader
//! - [`session`]: The session interface and the keepalive session
//! - [`connection`]: Per-connection lifecycle
//! - [`server`]: Listener, accept loop and shutdown controller
//! - [`config`] / [`logging`]: Settings and subscriber initialisation

pub mod config;
pub mod connection;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types for convenience
pub use config::{LogConfig, LogTarget, ServerConfig};
pub use connection::{handle_connection, ConnectionError, ConnectionStats};
pub use protocol::{encode_line, LineCodec, LineReader, CRLF};
pub use server::{Connections, Server, ServerError, ServerState, ShutdownController};
pub use session::{KeepaliveFactory, KeepaliveSession, LineSender, Session, SessionError, SessionFactory};

/// The default port ircfront listens on (the standard IRC port)
pub const DEFAULT_PORT: u16 = 6667;

/// The default host ircfront binds to
pub const DEFAULT_HOST: &str = "localhost";

/// Version of ircfront
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
