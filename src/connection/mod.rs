//! Connection Handler Module
//!
//! This module manages individual client connections.
//! Each client connection is handled by its own async task and bound to
//! exactly one session for its whole life.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server module)                          │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Split CRLF  │───>│ on_line()   │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │                                               │ LineSender  │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Write line  │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Ordering**: lines of one connection reach the session in order
//! - **Isolation**: I/O and session errors close only their own connection
//! - **Teardown**: `on_disconnect` runs exactly once per session
//! - **Statistics**: Tracks connection and line metrics

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
