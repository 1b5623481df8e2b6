//! # CLI Interface
//!
//! Defines the command-line argument structure for `humanlink-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.
//!
//! Every `run` flag is optional and falls back to an environment variable,
//! then to the TOML config file, then to the built-in default. See
//! [`crate::config::NodeConfig::apply_overrides`].

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use humanlink_protocol::config::NETWORK_ID_DEVNET;
use humanlink_protocol::Address;

use crate::logging::LogFormat;

/// HumanLink registry node.
///
/// Hosts one registry instance for one network: accepts links on the home
/// network, claims everywhere, and serves the notification log that
/// relayers carry between networks.
#[derive(Parser, Debug)]
#[command(
    name = "humanlink-node",
    about = "HumanLink registry node",
    version,
    propagate_version = true
)]
pub struct HumanLinkNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the registry node.
    Run(RunArgs),
    /// Create the data directory and write a default `config.toml`.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Path to the node configuration file (TOML).
    ///
    /// When omitted, the node looks for `config.toml` in the data directory.
    #[arg(long, short = 'c', env = "HUMANLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the registry database and credential state.
    #[arg(long, short = 'd', env = "HUMANLINK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Network (chain) id this instance runs on.
    #[arg(long, env = "HUMANLINK_NETWORK_ID")]
    pub network_id: Option<u64>,

    /// Network id on which links are accepted.
    #[arg(long, env = "HUMANLINK_HOME_NETWORK_ID")]
    pub home_network_id: Option<u64>,

    /// Address of the credential token contract.
    #[arg(long, env = "HUMANLINK_CREDENTIAL_CONTRACT")]
    pub credential_contract: Option<Address>,

    /// Address allowed to mint credentials.
    #[arg(long, env = "HUMANLINK_CREDENTIAL_ISSUER")]
    pub credential_issuer: Option<Address>,

    /// Address of the proof verifier contract.
    #[arg(long, env = "HUMANLINK_VERIFIER_CONTRACT")]
    pub verifier_contract: Option<Address>,

    /// File holding the compressed Groth16 verification key.
    #[arg(long, env = "HUMANLINK_VERIFYING_KEY")]
    pub verifying_key_path: Option<PathBuf>,

    /// Address allowed to import home-network commitments.
    #[arg(long, env = "HUMANLINK_RELAYER")]
    pub relayer: Option<Address>,

    /// Port for the REST and WebSocket API.
    #[arg(long, env = "HUMANLINK_RPC_PORT")]
    pub rpc_port: Option<u16>,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "HUMANLINK_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Log output format.
    #[arg(long, value_enum, env = "HUMANLINK_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "HUMANLINK_DATA_DIR", default_value = "~/.humanlink")]
    pub data_dir: PathBuf,

    /// Network id this instance will run on.
    #[arg(long, default_value_t = NETWORK_ID_DEVNET)]
    pub network_id: u64,

    /// Home network id. Defaults to `--network-id`.
    #[arg(long)]
    pub home_network_id: Option<u64>,

    /// Overwrite an existing `config.toml`.
    #[arg(long)]
    pub force: bool,
}
