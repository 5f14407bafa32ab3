//! input-shield: sanitizing reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────────────┐
//!                         │                   INPUT SHIELD                     │
//!                         │                                                    │
//!     Client Request      │  ┌──────────┐   ┌──────────────┐   ┌───────────┐   │
//!     ────────────────────┼─▶│  http    │──▶│ interceptor  │──▶│  surface  │   │
//!                         │  │ server   │   │ (policy,     │   │ decompose │   │
//!                         │  └──────────┘   │  exclusions) │   └─────┬─────┘   │
//!                         │                 └──────┬───────┘         │         │
//!                         │                        │          ┌──────▼──────┐  │
//!                         │          400 ◀─────────┤          │ detection + │  │
//!                         │                        │          │ sanitize    │  │
//!                         │                        ▼          └─────────────┘  │
//!     Client Response     │                 ┌──────────────┐                   │
//!     ◀───────────────────┼─────────────────│ proxy client │◀──────────────────┼──── Upstream
//!                         │                 └──────────────┘                   │
//!                         │  config · observability (logs, metrics, audit)     │
//!                         └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use input_shield::config::load_with_env;
use input_shield::http::HttpServer;
use input_shield::lifecycle::{signals, Shutdown};
use input_shield::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "input-shield")]
#[command(about = "Reverse proxy that sanitizes untrusted request input", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "INPUT_SHIELD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_with_env(args.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    tracing::info!("input-shield v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        sanitizer_enabled = config.sanitizer.enabled,
        blocking_threshold = %config.sanitizer.blocking_risk_threshold,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run_until(listener, shutdown.signalled()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
