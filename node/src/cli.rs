//! # CLI Interface
//!
//! Defines the command-line argument structure for `umbra-node` using
//! `clap` derive. Supports three subcommands: `run`, `status`, and
//! `version`.

use clap::{Parser, Subcommand};

/// Umbra devnet wallet node.
///
/// Serves the wallet engine over JSON-RPC: balance resolution under view
/// keys, transfer construction and broadcast under spend keys, and the
/// settlement pipeline that finalizes transactions. Exposes Prometheus
/// metrics on a dedicated port.
#[derive(Parser, Debug)]
#[command(
    name = "umbra-node",
    about = "Umbra wallet devnet node",
    version,
    propagate_version = true
)]
pub struct UmbraNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Umbra node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the wallet node.
    Run(RunArgs),
    /// Query the status of a running node via its RPC endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the JSON-RPC API.
    #[arg(long, env = "UMBRA_RPC_PORT", default_value_t = 9851)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "UMBRA_METRICS_PORT", default_value_t = 9852)]
    pub metrics_port: u16,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "UMBRA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Name of the wallet granted the genesis funds.
    #[arg(long, env = "UMBRA_GENESIS_WALLET", default_value = "Default")]
    pub genesis_wallet: String,

    /// Passphrase of the genesis wallet.
    ///
    /// **Never pass this flag on a shared machine's command line** — use
    /// the environment variable instead.
    #[arg(long, env = "UMBRA_GENESIS_PASSPHRASE", default_value = "123456")]
    pub genesis_passphrase: String,

    /// Genesis grant in base units, as a decimal string.
    #[arg(
        long,
        env = "UMBRA_GENESIS_AMOUNT",
        default_value = "2500000000000000000"
    )]
    pub genesis_amount: String,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// RPC endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9851")]
    pub rpc_url: String,
}
