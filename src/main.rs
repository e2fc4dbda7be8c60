//! Path-based reverse proxy server.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────────┐
//!                     │                      ROUTE PROXY                        │
//!   Client Request    │  ┌─────────┐    ┌─────────────┐    ┌──────────────┐    │
//!   ──────────────────┼─▶│  axum   │───▶│ route table │───▶│   target     │    │
//!                     │  │ server  │    │  (matcher)  │    │  resolver    │    │
//!                     │  └─────────┘    └──────┬──────┘    └──────┬───────┘    │
//!                     │                        │ no match         │            │
//!                     │                        ▼                  ▼            │
//!                     │                 ┌────────────┐    ┌──────────────┐     │
//!                     │                 │  fallback  │    │ cache store  │     │
//!                     │                 │  (404)     │    │ fetch-or-    │     │
//!                     │                 └────────────┘    │ compute      │     │
//!                     │                                   └──────┬───────┘     │
//!   Client Response   │  ┌──────────┐                    ┌──────▼───────┐     │
//!   ◀─────────────────┼──│normalized│◀───────────────────│  forwarder   │◀────┼── Backend
//!                     │  │ response │                    │  (reqwest)   │     │
//!                     │  └──────────┘                    └──────────────┘     │
//!                     └────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use route_proxy::config::load_config;
use route_proxy::lifecycle::{signals, Shutdown};
use route_proxy::observability::{logging, metrics};
use route_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "route-proxy")]
#[command(about = "Path-based reverse proxy with response caching", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "route-proxy.toml")]
    config: PathBuf,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("route-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        matching_mode = ?config.options.matching_mode,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::forward_to(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
