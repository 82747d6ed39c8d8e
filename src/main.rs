//! Request-path authorization gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                    ROUTE GATE                     │
//!                      │                                                   │
//!   Client Request     │  ┌─────────┐   ┌────────────────┐   ┌─────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ access control │──▶│ forward │──┼──▶ Upstream
//!                      │  │ server  │   │   middleware   │   │ handler │  │    application
//!                      │  └─────────┘   └───────┬────────┘   └─────────┘  │
//!                      │                        │                         │
//!                      │          session token │ path                    │
//!                      │                        ▼                         │
//!                      │   ┌──────────────┐  ┌──────────────┐             │
//!                      │   │    trust     │─▶│    policy    │             │
//!                      │   │   resolver   │  │    engine    │             │
//!                      │   └──────────────┘  └──────┬───────┘             │
//!                      │                            │ route table         │
//!   307 Redirect       │                            ▼                     │
//!   ◀──────────────────┼─── login / landing   ┌──────────────┐            │
//!                      │                      │   routing    │            │
//!                      │                      │   matcher    │            │
//!                      │                      └──────────────┘            │
//!                      │  config (watch + atomic swap) · observability    │
//!                      │  lifecycle (signals, graceful shutdown)          │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use route_gate::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use route_gate::http::GatewayServer;
use route_gate::lifecycle::{signals, Shutdown};
use route_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "route-gate")]
#[command(about = "Session-aware authorization gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not reload the route table when the config file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Fail fast: a bad config never starts serving.
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("route-gate v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        login = %config.redirects.login,
        default = %config.redirects.default,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = GatewayServer::new(config.clone())?;

    // Config updates come from the watcher when a file is in use; otherwise
    // the channel is closed straight away and the table never changes.
    let (_watcher, config_updates) = match &args.config {
        Some(path) if !args.no_watch => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        _ => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_handler(shutdown.clone());

    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
