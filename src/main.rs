//! ircfront - TCP Front-End for Line-Oriented Protocols
//!
//! This is the main entry point for the ircfront server.
//! It parses the command line, sets up logging, and serves the keepalive
//! session until SIGINT.

use clap::Parser;
use ircfront::{KeepaliveFactory, LogConfig, LogTarget, Server, ServerConfig};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn, Level};

/// Command-line options
#[derive(Debug, Parser)]
#[command(name = "ircfront", version = ircfront::VERSION, about = "TCP front-end for CRLF line protocols")]
struct Cli {
    /// Host or address to bind to
    #[arg(short, long, default_value = ircfront::DEFAULT_HOST)]
    bind: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = ircfront::DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    /// Log to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    log_to: Option<PathBuf>,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.bind.clone(), self.port)
    }

    fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level,
            target: self
                .log_to
                .clone()
                .map(LogTarget::File)
                .unwrap_or_default(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    ircfront::logging::init(&cli.log_config())?;
    info!("ircfront v{} starting", ircfront::VERSION);

    let server = match Server::start(&cli.server_config(), KeepaliveFactory).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Could not start server");
            return Err(e.into());
        }
    };

    let connections = server.run_until_interrupt().await;

    if !connections.is_empty() {
        info!(
            open_connections = connections.len(),
            "Waiting for open connections to close, interrupt again to force"
        );
        tokio::select! {
            _ = connections.drain() => {}
            _ = signal::ctrl_c() => warn!("Second SIGINT, dropping remaining connections"),
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
