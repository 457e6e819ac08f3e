//! Configuration
//!
//! Plain settings structs with sensible defaults. The binary fills them in
//! from the command line; embedders construct them directly.

use crate::{DEFAULT_HOST, DEFAULT_PORT};
use std::path::PathBuf;
use tracing::Level;

/// Where and how the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or IP address to bind to
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_address: impl Into<String>, port: u16) -> Self {
        Self {
            bind_address: bind_address.into(),
            port,
        }
    }

    /// Returns the bind address as `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.bind_address.contains(':') && !self.bind_address.starts_with('[') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }
}

/// Log destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    #[default]
    Stdout,
    /// Append to the given file
    File(PathBuf),
}

/// Logging settings applied once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Most verbose level emitted, unless `RUST_LOG` says otherwise
    pub level: Level,
    pub target: LogTarget,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::Stdout,
        }
    }
}
