//! Contract gateway (v1)
//!
//! HTTP service for compiling, deploying and calling smart contracts on
//! configured EVM networks.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http (axum) ──┬──▶ compiler (solc, build/ artifacts)
//!                            │
//!                            ├──▶ blockchain
//!                            │      identity ─▶ lifecycle manager ─▶ RPC client ─▶ Ledger
//!                            │                        │
//!                            │                        ▼
//!                            └──▶ metadata store (deployments.jsonl)
//!
//!   Cross-cutting: config (TOML + ${VAR}), observability (tracing, metrics),
//!                  lifecycle (startup, signals, shutdown)
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tokio::net::TcpListener;

use contract_gateway::config::loader::log_resolved_config;
use contract_gateway::config::load_config;
use contract_gateway::lifecycle::{build_state, signals, Shutdown};
use contract_gateway::observability::{logging, metrics};
use contract_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "contract-gateway", version, about = "Smart contract deployment gateway")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml", env = "GATEWAY_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // .env is optional; placeholders fall back to the process environment.
    let dotenv = dotenvy::dotenv();

    let config = load_config(&args.config)?;
    logging::init_logging(&config.api_server);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "contract-gateway starting");
    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded .env"),
        Err(_) => tracing::debug!("No .env file found"),
    }
    tracing::info!(
        path = %args.config.display(),
        networks = config.networks.len(),
        accounts = config.accounts.len(),
        "Configuration loaded"
    );
    log_resolved_config(&config);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.api_server.bind_address();
    let shutdown_grace = config.api_server.shutdown_grace();
    let state = build_state(config).await?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let in_flight = state.tasks.clone();
    let server = HttpServer::new(state);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();
    let deadline = Instant::now() + shutdown_grace;

    if let Some(result) = shutdown.drain(server_task, shutdown_grace).await {
        result?;
    }
    // Runs whose callers already hung up are not covered by the server drain.
    in_flight
        .drain(deadline.saturating_duration_since(Instant::now()))
        .await;
    tracing::info!("Shutdown complete");
    Ok(())
}
