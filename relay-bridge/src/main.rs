//! Relay Bridge Service
//!
//! Watches the fulfillment ledger for `IntentFulfilled` events and calls
//! `verifyFill` on the intent ledger as the operator.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: The operator address is the only identity allowed to verify fills.
//! The destination node signs with the operator's managed key, so access to this
//! service and to that node must be restricted.

use anyhow::Result;
use tracing::{error, info};

use relay_bridge::config::{Config, CONFIG_PATH_ENV};
use relay_bridge::{ApiServer, RelayBridge};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Initializes logging, loads configuration, and runs the relay and the API
/// server until Ctrl-C.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Relay Bridge Service");
        println!();
        println!("Usage: relay-bridge [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  RELAY_BRIDGE_CONFIG_PATH   Path to config file (used when --config is absent)");
        println!("  RELAY_OPERATOR_ADDR        Operator address (name configurable via relay.operator_addr_env)");
        return Ok(());
    }

    info!("Starting Relay Bridge Service");

    let mut config_path = None;
    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            info!("Using custom config: {}", path);
            Config::load_from(&path)?
        }
        None => {
            if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
                info!("Using config from {}: {}", CONFIG_PATH_ENV, path);
            }
            Config::load()?
        }
    };
    info!(
        "Configuration loaded: {} (chain {}) -> {} (chain {})",
        config.source_chain.name,
        config.source_chain.chain_id,
        config.destination_chain.name,
        config.destination_chain.chain_id
    );

    let relay = RelayBridge::from_config(&config)?;
    let api_server = ApiServer::new(config.api.clone(), relay.stats());
    info!("Relay bridge initialized successfully");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Ctrl-C received");
    };

    tokio::select! {
        result = relay.run_until(shutdown) => result,
        result = api_server.run() => result,
    }
}
