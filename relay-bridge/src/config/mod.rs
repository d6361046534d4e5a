//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the relay bridge.
//! Configuration includes both chain endpoints, contract addresses, relay tuning
//! parameters, and API settings.

use anyhow::Context;
use intent_ledger::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "RELAY_BRIDGE_CONFIG_PATH";

/// Config file location used when neither `--config` nor the env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/relay-bridge.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain hosting the fulfillment ledger (where fills are paid)
    pub source_chain: SourceChainConfig,
    /// Chain hosting the intent ledger (where fills are verified)
    pub destination_chain: DestinationChainConfig,
    /// Relay behaviour: operator identity, retries, concurrency
    pub relay: RelaySettingsConfig,
    /// API server configuration
    pub api: ApiConfig,
}

/// Source chain connection: the relay reads `IntentFulfilled` logs from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Chain ID (e.g., 31337 for Hardhat)
    pub chain_id: u64,
    /// Address of the fulfillment ledger contract
    pub fulfillment_contract_addr: String,
}

/// Destination chain connection: the relay submits `verifyFill` here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Chain ID
    pub chain_id: u64,
    /// Address of the intent ledger contract
    pub intent_contract_addr: String,
}

/// Relay tuning parameters.
///
/// The operator address is read from the environment at runtime; the config
/// file holds only the variable name. The node at the destination RPC must
/// manage the key for that address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettingsConfig {
    /// Environment variable name containing the operator address
    /// Default: "RELAY_OPERATOR_ADDR"
    #[serde(default = "default_operator_addr_env")]
    pub operator_addr_env: String,
    /// Log polling interval in milliseconds
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Maximum block span of one `eth_getLogs` request
    #[serde(default = "default_max_log_block_range")]
    pub max_log_block_range: u64,
    /// Fixed delay before re-opening a lost subscription
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Attempts per event before giving up on transport failures
    #[serde(default = "default_max_submit_attempts")]
    pub max_submit_attempts: u32,
    /// Fixed delay between submission attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Maximum concurrent `verifyFill` submissions
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Capacity of the queue between the subscription and the workers
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long to wait for a submitted transaction's receipt
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,
    /// Resume after the last observed event on reconnect instead of the live head
    #[serde(default)]
    pub replay_missed_events: bool,
}

fn default_operator_addr_env() -> String {
    "RELAY_OPERATOR_ADDR".to_string()
}

fn default_polling_interval_ms() -> u64 {
    2000
}

fn default_max_log_block_range() -> u64 {
    1000
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_max_submit_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_in_flight() -> usize {
    16
}

fn default_queue_capacity() -> usize {
    256
}

fn default_confirmation_timeout_ms() -> u64 {
    60_000
}

impl Default for RelaySettingsConfig {
    fn default() -> Self {
        Self {
            operator_addr_env: default_operator_addr_env(),
            polling_interval_ms: default_polling_interval_ms(),
            max_log_block_range: default_max_log_block_range(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_submit_attempts: default_max_submit_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            max_in_flight: default_max_in_flight(),
            queue_capacity: default_queue_capacity(),
            confirmation_timeout_ms: default_confirmation_timeout_ms(),
            replay_missed_events: false,
        }
    }
}

impl RelaySettingsConfig {
    /// Loads the operator address from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(Address)` - The operator address
    /// * `Err(anyhow::Error)` - Variable missing or not a valid address
    pub fn get_operator_addr(&self) -> anyhow::Result<Address> {
        let raw = std::env::var(&self.operator_addr_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it to the operator address (0x-prefixed hex).",
                self.operator_addr_env
            )
        })?;
        Address::from_str(raw.trim()).with_context(|| {
            format!(
                "Environment variable '{}' does not contain a valid address",
                self.operator_addr_env
            )
        })
    }
}

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates chain identities, contract addresses, and relay limits.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - First problem found
    pub fn validate(&self) -> anyhow::Result<()> {
        let source_id = self.source_chain.chain_id;
        let destination_id = self.destination_chain.chain_id;

        if source_id == destination_id {
            return Err(anyhow::anyhow!(
                "Configuration error: Source chain and destination chain have the same chain ID {}. Each chain must have a unique chain ID.",
                source_id
            ));
        }

        Address::from_str(&self.source_chain.fulfillment_contract_addr).with_context(|| {
            format!(
                "Configuration error: invalid fulfillment_contract_addr '{}'",
                self.source_chain.fulfillment_contract_addr
            )
        })?;
        Address::from_str(&self.destination_chain.intent_contract_addr).with_context(|| {
            format!(
                "Configuration error: invalid intent_contract_addr '{}'",
                self.destination_chain.intent_contract_addr
            )
        })?;

        let relay = &self.relay;
        for (name, value) in [
            ("polling_interval_ms", relay.polling_interval_ms),
            ("max_log_block_range", relay.max_log_block_range),
            ("max_submit_attempts", u64::from(relay.max_submit_attempts)),
            ("max_in_flight", relay.max_in_flight as u64),
            ("queue_capacity", relay.queue_capacity as u64),
        ] {
            if value == 0 {
                return Err(anyhow::anyhow!(
                    "Configuration error: relay.{} must be greater than zero",
                    name
                ));
            }
        }

        Ok(())
    }

    /// Loads configuration from the TOML file.
    ///
    /// The path comes from `RELAY_BRIDGE_CONFIG_PATH` if set, otherwise
    /// `config/relay-bridge.toml`. A missing file is an error that points at
    /// the template.
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from(config_path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file '{}'", config_path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file '{}'", config_path))?;
            config.validate()?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/relay-bridge.template.toml config/relay-bridge.toml\n\
                Then edit config/relay-bridge.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Creates a default configuration for a local two-node development setup.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self {
            source_chain: SourceChainConfig {
                name: "Source Chain".to_string(),
                rpc_url: "http://127.0.0.1:8545".to_string(),
                chain_id: 31337,
                fulfillment_contract_addr: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
            },
            destination_chain: DestinationChainConfig {
                name: "Destination Chain".to_string(),
                rpc_url: "http://127.0.0.1:8546".to_string(),
                chain_id: 31338,
                intent_contract_addr: "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512".to_string(),
            },
            relay: RelaySettingsConfig::default(),
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3340,
            },
        }
    }
}
