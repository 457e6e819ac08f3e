//! Logging initialisation.
//!
//! Installs the process-wide `tracing` subscriber once, from `main`.
//! Every event carries a timestamp, level, target (the emitting module)
//! and message; connection events also carry the `peer` span field.

use crate::config::{LogConfig, LogTarget};
use anyhow::{anyhow, Context};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG`, when set, takes precedence over `config.level`.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match &config.target {
        LogTarget::Stdout => builder.try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
    }
    .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}
