//! EVM Client Module
//!
//! This module provides a client for communicating with EVM-compatible blockchain nodes
//! via their JSON-RPC API. It covers the calls the relay needs: head tracking, log
//! queries, node-signed transaction submission, and receipt lookup.

use intent_ledger::Address;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::time::Duration;

use crate::error::TransportError;

// ============================================================================
// API RESPONSE STRUCTURES
// ============================================================================

/// EVM JSON-RPC request wrapper
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: Vec<serde_json::Value>,
    id: u64,
}

/// EVM JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// EVM event log entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmLog {
    /// Address of the contract that emitted the event
    pub address: String,
    /// Array of topics (indexed event parameters)
    pub topics: Vec<String>,
    /// Event data (non-indexed parameters)
    pub data: String,
    /// Block number (JSON-RPC uses camelCase: blockNumber)
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    /// Transaction hash (JSON-RPC uses camelCase: transactionHash)
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    /// Log index (JSON-RPC uses camelCase: logIndex)
    #[serde(rename = "logIndex")]
    pub log_index: String,
}

/// Subset of an EVM transaction receipt
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<String>,
    /// Transaction status ("0x1" = success, "0x0" = failure)
    pub status: Option<String>,
}

impl EvmReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

// ============================================================================
// EVM CLIENT IMPLEMENTATION
// ============================================================================

/// Client for communicating with EVM-compatible blockchain nodes via JSON-RPC
pub struct EvmClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the EVM node (e.g., "http://127.0.0.1:8545")
    base_url: String,
}

impl EvmClient {
    /// Creates a new EVM client for the given node URL
    ///
    /// # Arguments
    ///
    /// * `node_url` - Base URL of the EVM node (e.g., "http://127.0.0.1:8545")
    ///
    /// # Returns
    ///
    /// * `Ok(EvmClient)` - Successfully created client
    /// * `Err(anyhow::Error)` - Invalid URL or failed to create client
    pub fn new(node_url: &str) -> anyhow::Result<Self> {
        url::Url::parse(node_url)
            .map_err(|e| anyhow::anyhow!("Invalid RPC URL '{}': {}", node_url, e))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .no_proxy()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: node_url.to_string(),
        })
    }

    /// Sends one JSON-RPC call. A JSON `null` result is returned as `Ok(None)`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<Option<T>, TransportError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                TransportError::Request(format!(
                    "Failed to send {} request to {}: {}",
                    method, self.base_url, e
                ))
            })?;

        let response: JsonRpcResponse<T> = response.json().await.map_err(|e| {
            TransportError::MalformedResponse(format!(
                "Failed to parse {} response from {}: {}",
                method, self.base_url, e
            ))
        })?;

        if let Some(error) = response.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result)
    }

    /// Gets the current block number
    pub async fn get_block_number(&self) -> Result<u64, TransportError> {
        let hex_number: String = self
            .call("eth_blockNumber", vec![])
            .await?
            .ok_or_else(|| TransportError::MalformedResponse("eth_blockNumber returned null".to_string()))?;
        parse_hex_u64(&hex_number)
    }

    /// Queries logs emitted by `address` with the given first topic in an inclusive block range
    pub async fn get_logs(
        &self,
        address: &str,
        topic0: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EvmLog>, TransportError> {
        let filter = serde_json::json!({
            "address": address,
            "topics": [topic0],
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": format!("0x{:x}", to_block),
        });

        Ok(self
            .call::<Vec<EvmLog>>("eth_getLogs", vec![filter])
            .await?
            .unwrap_or_default())
    }

    /// Submits a transaction signed by the node's managed key for `from`.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Transaction hash
    /// * `Err(TransportError)` - Submission failed; reverts surface as `TransportError::Rpc`
    pub async fn send_transaction(
        &self,
        from: &Address,
        to: &str,
        data: &[u8],
    ) -> Result<String, TransportError> {
        let tx = serde_json::json!({
            "from": from.to_string(),
            "to": to,
            "data": format!("0x{}", hex::encode(data)),
        });

        self.call::<String>("eth_sendTransaction", vec![tx])
            .await?
            .ok_or_else(|| {
                TransportError::MalformedResponse("eth_sendTransaction returned null".to_string())
            })
    }

    /// Queries a transaction receipt. `Ok(None)` means the transaction is still pending.
    pub async fn get_transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<EvmReceipt>, TransportError> {
        let hash = if hash.starts_with("0x") {
            hash.to_string()
        } else {
            format!("0x{}", hash)
        };

        self.call("eth_getTransactionReceipt", vec![serde_json::json!(hash)])
            .await
    }
}

// ============================================================================
// ABI HELPERS
// ============================================================================

/// keccak256 of a canonical event signature, as a 0x-prefixed topic.
pub fn event_topic(signature: &str) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(signature.as_bytes())))
}

/// First four bytes of keccak256 of a canonical function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Big-endian 32-byte ABI word for an unsigned integer.
pub fn encode_uint256(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Parses a 0x-prefixed hex quantity such as "0x1b4".
pub fn parse_hex_u64(value: &str) -> Result<u64, TransportError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    u64::from_str_radix(digits, 16)
        .map_err(|_| TransportError::MalformedResponse(format!("Invalid hex quantity: {}", value)))
}

/// Decodes a 0x-prefixed hex payload. Anything other than an even number of
/// ASCII hex digits is malformed.
pub fn decode_hex_bytes(value: &str) -> Result<Vec<u8>, TransportError> {
    hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .map_err(|e| TransportError::MalformedResponse(format!("Invalid hex payload: {}", e)))
}

/// Decodes a 32-byte ABI word into a u128, rejecting values that do not fit.
pub fn decode_uint_bytes(word: &[u8]) -> Result<u128, TransportError> {
    if word.len() != 32 {
        return Err(TransportError::MalformedResponse(format!(
            "ABI word must be 32 bytes, got {}",
            word.len()
        )));
    }
    if word[..16].iter().any(|b| *b != 0) {
        return Err(TransportError::MalformedResponse(format!(
            "Value does not fit in 128 bits: 0x{}",
            hex::encode(word)
        )));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Decodes a hex-encoded 32-byte ABI word into a u128.
pub fn decode_uint_word(word: &str) -> Result<u128, TransportError> {
    decode_uint_bytes(&decode_hex_bytes(word)?)
}

/// Extracts the address from a left-padded 32-byte topic.
pub fn decode_address_word(word: &str) -> Result<Address, TransportError> {
    let bytes = decode_hex_bytes(word)?;
    if bytes.len() != 32 {
        return Err(TransportError::MalformedResponse(format!(
            "Address topic must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut address = [0u8; 20];
    address.copy_from_slice(&bytes[12..]);
    Ok(Address::new(address))
}
