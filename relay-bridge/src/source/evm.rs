//! EVM fulfillment source
//!
//! Subscribes to `IntentFulfilled` logs by polling `eth_blockNumber` and
//! `eth_getLogs` over consecutive block ranges. Any RPC failure ends the
//! stream so the relay supervisor can reconnect.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use intent_ledger::FulfillmentRecord;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{FulfillmentSource, ObservedFulfillment, Subscription};
use crate::config::Config;
use crate::error::TransportError;
use crate::evm_client::{
    decode_address_word, decode_hex_bytes, decode_uint_bytes, decode_uint_word, event_topic,
    parse_hex_u64, EvmClient, EvmLog,
};

/// `IntentFulfilled(uint256 indexed intentId, address indexed filler, address indexed recipient, uint256 amount, uint256 timestamp)`
pub const INTENT_FULFILLED_SIGNATURE: &str = "IntentFulfilled(uint256,address,address,uint256,uint256)";

/// Default upper bound on the block span of a single `eth_getLogs` call.
pub const DEFAULT_MAX_LOG_BLOCK_RANGE: u64 = 1000;

pub struct EvmFulfillmentSource {
    client: Arc<EvmClient>,
    contract_addr: String,
    topic: String,
    polling_interval: Duration,
    max_block_range: u64,
}

impl EvmFulfillmentSource {
    pub fn new(rpc_url: &str, contract_addr: &str, polling_interval: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Arc::new(EvmClient::new(rpc_url)?),
            contract_addr: contract_addr.to_lowercase(),
            topic: event_topic(INTENT_FULFILLED_SIGNATURE),
            polling_interval,
            max_block_range: DEFAULT_MAX_LOG_BLOCK_RANGE,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            &config.source_chain.rpc_url,
            &config.source_chain.fulfillment_contract_addr,
            Duration::from_millis(config.relay.polling_interval_ms),
        )?
        .with_max_block_range(config.relay.max_log_block_range))
    }

    /// Caps the number of blocks covered by one `eth_getLogs` request.
    pub fn with_max_block_range(mut self, max_block_range: u64) -> Self {
        self.max_block_range = max_block_range.max(1);
        self
    }
}

#[async_trait]
impl FulfillmentSource for EvmFulfillmentSource {
    async fn subscribe(&self, resume_after: Option<u64>) -> Result<Subscription, TransportError> {
        let start_after = match resume_after {
            Some(block) => block,
            None => self.client.get_block_number().await?,
        };
        debug!(
            "Subscribed to IntentFulfilled logs on {} after block {}",
            self.contract_addr, start_after
        );

        let state = PollState {
            client: self.client.clone(),
            contract_addr: self.contract_addr.clone(),
            topic: self.topic.clone(),
            interval: self.polling_interval,
            max_block_range: self.max_block_range,
            next_block: start_after + 1,
            pending: VecDeque::new(),
            error: None,
            finished: false,
        };

        let events = stream::unfold(state, |mut state| async move {
            loop {
                // Logs fetched before a failure are still delivered.
                if let Some(event) = state.pending.pop_front() {
                    return Some((Ok(event), state));
                }
                if state.finished {
                    return None;
                }
                if let Some(e) = state.error.take() {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                tokio::time::sleep(state.interval).await;
                if let Err(e) = state.poll_once().await {
                    state.error = Some(e);
                }
            }
        })
        .boxed();

        Ok(Subscription { start_after, events })
    }
}

struct PollState {
    client: Arc<EvmClient>,
    contract_addr: String,
    topic: String,
    interval: Duration,
    max_block_range: u64,
    next_block: u64,
    pending: VecDeque<ObservedFulfillment>,
    error: Option<TransportError>,
    finished: bool,
}

impl PollState {
    /// Fetches logs from `next_block` up to the current head, at most
    /// `max_block_range` blocks per request. Progress made before a failed
    /// request is kept.
    async fn poll_once(&mut self) -> Result<(), TransportError> {
        let head = self.client.get_block_number().await?;

        while self.next_block <= head {
            let to_block = head.min(self.next_block.saturating_add(self.max_block_range - 1));
            let logs = self
                .client
                .get_logs(&self.contract_addr, &self.topic, self.next_block, to_block)
                .await?;
            for log in logs {
                match decode_fulfillment_log(&log) {
                    Ok(event) => self.pending.push_back(event),
                    Err(e) => warn!(
                        "Skipping malformed IntentFulfilled log in tx {}: {}",
                        log.transaction_hash, e
                    ),
                }
            }
            self.next_block = to_block + 1;
        }
        Ok(())
    }
}

/// Decodes one `IntentFulfilled` log.
///
/// topics[1] = intentId, topics[2] = filler, topics[3] = recipient,
/// data = abi.encode(amount, timestamp).
pub fn decode_fulfillment_log(log: &EvmLog) -> Result<ObservedFulfillment, TransportError> {
    if log.topics.len() < 4 {
        return Err(TransportError::MalformedResponse(format!(
            "expected 4 topics, got {}",
            log.topics.len()
        )));
    }

    let intent_id = u64::try_from(decode_uint_word(&log.topics[1])?).map_err(|_| {
        TransportError::MalformedResponse(format!("intent id out of range: {}", log.topics[1]))
    })?;
    let filler = decode_address_word(&log.topics[2])?;
    let recipient = decode_address_word(&log.topics[3])?;

    let data = decode_hex_bytes(&log.data)?;
    if data.len() < 64 {
        return Err(TransportError::MalformedResponse(format!(
            "expected 64 bytes of data, got {}",
            data.len()
        )));
    }
    let amount = decode_uint_bytes(&data[..32])?;
    let timestamp = u64::try_from(decode_uint_bytes(&data[32..64])?).map_err(|_| {
        TransportError::MalformedResponse("timestamp out of range".to_string())
    })?;

    Ok(ObservedFulfillment {
        record: FulfillmentRecord {
            intent_id,
            filler,
            recipient,
            amount,
            timestamp,
        },
        position: parse_hex_u64(&log.block_number)?,
        tx_hash: Some(log.transaction_hash.clone()),
    })
}
