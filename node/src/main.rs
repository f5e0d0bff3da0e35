// Copyright (c) 2026 Umbra Labs. MIT License.
// See LICENSE for details.

//! # Umbra Wallet Node
//!
//! Entry point for the `umbra-node` binary. Parses CLI arguments,
//! initializes logging and metrics, seeds the devnet genesis, and serves
//! the JSON-RPC API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the wallet node
//! - `status`  — query a running node's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use umbra_wallet::{Amount, WalletRequest, WalletService};

use cli::{Commands, UmbraNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = UmbraNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full wallet node: JSON-RPC server, metrics endpoint, and
/// the settlement metrics pump.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "umbra_node=info,umbra_wallet=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        genesis_wallet = %args.genesis_wallet,
        "starting umbra-node"
    );

    // --- Wallet engine ---
    let service = Arc::new(WalletService::devnet());

    // --- Genesis seeding ---
    let genesis_amount: Amount = args
        .genesis_amount
        .parse()
        .context("invalid --genesis-amount")?;
    let genesis_owner = WalletRequest {
        name: args.genesis_wallet.clone(),
        passphrase: args.genesis_passphrase.clone(),
    };
    let genesis_address = service
        .wallet_address(&genesis_owner)
        .context("failed to derive the genesis wallet address")?
        .parse()
        .context("failed to parse the genesis wallet address")?;
    service.seed_genesis(&genesis_address, vec![genesis_amount]);
    tracing::info!(
        wallet = %args.genesis_wallet,
        amount = %genesis_amount,
        "genesis seeded"
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());
    let pump = tokio::spawn(api::pump_settlement_metrics(
        Arc::clone(&service),
        Arc::clone(&node_metrics),
    ));

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        network: "devnet".to_string(),
        service,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("RPC server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    pump.abort();
    tracing::info!("umbra-node stopped");
    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.rpc_url.trim_end_matches('/'));
    let body = http_get(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP GET without pulling in `reqwest` as a dependency.
/// In a real deployment, swap this for a proper HTTP client.
async fn http_get(url: &str) -> Result<String> {
    let (host, port, path) = split_url(url)?;

    let addr = format!("{}:{}", host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Everything after the first blank line is the body.
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());

    Ok(body)
}

/// Prints version information to stdout.
fn print_version() {
    println!("umbra-node {}", env!("CARGO_PKG_VERSION"));
    println!(
        "tx format v{}",
        umbra_wallet::config::TX_VERSION
    );
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Splits `http://host[:port]/path` into its pieces. Just enough URL
/// handling for the status subcommand; the port defaults to 80.
fn split_url(url: &str) -> Result<(String, u16, String)> {
    let rest = url.strip_prefix("http://").unwrap_or(url);

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], rest[i..].to_string()),
        None => (rest, "/".to_string()),
    };
    if authority.is_empty() {
        anyhow::bail!("missing host in URL '{}'", url);
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("bad port in URL '{}'", url))?;
            Ok((host.to_string(), port, path))
        }
        None => Ok((authority.to_string(), 80, path)),
    }
}
