// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # HumanLink Registry Node
//!
//! Entry point for the `humanlink-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the registry, and serves the
//! HTTP/WS API.
//!
//! The binary supports three subcommands:
//!
//! - `run`    : start the registry node
//! - `init`   : create the data directory and a default `config.toml`
//! - `version`: print build version information

mod api;
mod cli;
mod config;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use humanlink_contracts::{CredentialToken, HumanRegistry, TokenSnapshot};
use humanlink_protocol::storage::RegistryDb;
use humanlink_protocol::zkp::Groth16Verifier;
use humanlink_protocol::ProofVerifier;

use cli::{Commands, HumanLinkNodeCli};
use config::{expand_home, NodeConfig, CONFIG_FILE_NAME};
use logging::LogFormat;
use metrics::{NodeMetrics, TimedVerifier};

/// Broadcast channel capacity for live event streaming.
/// Slow WebSocket clients that fall further behind than this are told how
/// many events they missed and can backfill from `GET /events`.
const EVENT_CHANNEL_CAPACITY: usize = 256;

const CREDENTIAL_NAME: &str = "HumanLink Credential";
const CREDENTIAL_SYMBOL: &str = "HLC";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = HumanLinkNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the registry node: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    let config = NodeConfig::load(&args)?;
    logging::init_logging(logging::DEFAULT_FILTER, config.log_format);

    tracing::info!(
        network = %config.network(),
        home_network_id = config.home_network_id,
        is_home = config.is_home(),
        rpc_port = config.rpc_port,
        metrics_port = config.metrics_port,
        data_dir = %config.data_dir.display(),
        "starting humanlink-node"
    );

    // --- Persistent storage ---
    let db_path = config.registry_db_path();
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = RegistryDb::open(&db_path)
        .with_context(|| format!("failed to open registry database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "registry database opened");

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- Capabilities ---
    let credentials_path = config.credentials_path();
    let credentials = Arc::new(load_credentials(&config, &credentials_path)?);
    let verifier = load_verifier(&config)?;
    let verifier: Arc<dyn ProofVerifier> =
        Arc::new(TimedVerifier::new(verifier, Arc::clone(&node_metrics)));

    // --- Registry ---
    let registry = HumanRegistry::new(
        config.registry_config(),
        credentials.clone(),
        verifier,
        db,
    )
    .context("failed to initialize registry")?;
    let stats = registry.stats().context("failed to read registry stats")?;
    node_metrics.observe_stats(&stats);
    tracing::info!(
        linked_commitments = stats.linked_commitments,
        verified_addresses = stats.verified_addresses,
        events = stats.events,
        "registry ready"
    );

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            humanlink_protocol::config::PROTOCOL_VERSION,
        ),
        network: config.network(),
        registry: Arc::new(Mutex::new(registry)),
        credentials,
        credentials_path: Some(credentials_path),
        event_tx,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", config.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
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

    tracing::info!("humanlink-node stopped");
    Ok(())
}

/// Restores the credential contract from its last snapshot, or starts it
/// empty on first run.
fn load_credentials(config: &NodeConfig, path: &Path) -> Result<CredentialToken> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no credential snapshot, starting empty");
        return Ok(CredentialToken::new(
            config.credential_contract,
            config.credential_issuer,
            CREDENTIAL_NAME,
            CREDENTIAL_SYMBOL,
        ));
    }

    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read credential snapshot {}", path.display()))?;
    let snapshot: TokenSnapshot = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse credential snapshot {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        holders = snapshot.tokens.len(),
        "credential snapshot restored"
    );

    Ok(CredentialToken::restore(
        config.credential_contract,
        config.credential_issuer,
        CREDENTIAL_NAME,
        CREDENTIAL_SYMBOL,
        snapshot,
    ))
}

/// Builds the Groth16 verifier from the configured verification key file.
fn load_verifier(config: &NodeConfig) -> Result<Arc<dyn ProofVerifier>> {
    let Some(path) = config.resolved_verifying_key_path() else {
        bail!("verifying_key_path is not configured");
    };
    let bytes = std::fs::read(&path)
        .with_context(|| format!("failed to read verification key {}", path.display()))?;
    let verifier = Groth16Verifier::from_vk_bytes(config.verifier_contract, &bytes)
        .with_context(|| format!("invalid verification key {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        verifier = %config.verifier_contract,
        "verification key loaded"
    );
    Ok(Arc::new(verifier))
}

/// Creates the data directory and writes a default `config.toml`.
///
/// Contract addresses are left zero: `run` refuses to start until they are
/// filled in.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("humanlink_node=info", LogFormat::Pretty);

    let data_dir = expand_home(&args.data_dir);
    let config_path = data_dir.join(CONFIG_FILE_NAME);
    tracing::info!(data_dir = %data_dir.display(), network_id = args.network_id, "initializing node");

    if config_path.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config = NodeConfig {
        network_id: args.network_id,
        home_network_id: args.home_network_id.unwrap_or(args.network_id),
        data_dir: data_dir.clone(),
        ..NodeConfig::default()
    };
    std::fs::write(&config_path, config.to_toml()?)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Network        : {}", config.network());
    println!("  Home network   : {}", config.home_network_id);
    println!("  Config file    : {}", config_path.display());
    println!();
    println!("Set credential_contract, credential_issuer, verifier_contract and");
    println!("verifying_key_path in the config file before running the node.");

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("humanlink-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", humanlink_protocol::config::PROTOCOL_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed the failure is logged and that signal is never delivered.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
