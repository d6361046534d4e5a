//! EVM intent ledger client
//!
//! Submits `verifyFill(uint256,uint256)` from the operator address through
//! `eth_sendTransaction` (the node signs with its managed key) and polls for
//! the receipt.

use async_trait::async_trait;
use intent_ledger::{
    Address, AuthorizationError, IntentId, LedgerError, StateError, ValidationError, Wei,
};
use std::time::Duration;
use tracing::debug;

use super::{IntentLedgerClient, TxReceipt};
use crate::config::Config;
use crate::error::{SubmitError, TransportError};
use crate::evm_client::{encode_uint256, function_selector, parse_hex_u64, EvmClient};

pub const VERIFY_FILL_SIGNATURE: &str = "verifyFill(uint256,uint256)";

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct EvmIntentLedgerClient {
    client: EvmClient,
    contract_addr: String,
    operator: Address,
    confirmation_timeout: Duration,
    receipt_poll_interval: Duration,
}

impl EvmIntentLedgerClient {
    pub fn new(
        rpc_url: &str,
        contract_addr: &str,
        operator: Address,
        confirmation_timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: EvmClient::new(rpc_url)?,
            contract_addr: contract_addr.to_lowercase(),
            operator,
            confirmation_timeout,
            receipt_poll_interval: RECEIPT_POLL_INTERVAL,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let operator = config.relay.get_operator_addr()?;
        Self::new(
            &config.destination_chain.rpc_url,
            &config.destination_chain.intent_contract_addr,
            operator,
            Duration::from_millis(config.relay.confirmation_timeout_ms),
        )
    }

    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, SubmitError> {
        let poll = async {
            loop {
                if let Some(receipt) = self.client.get_transaction_receipt(tx_hash).await? {
                    return Ok::<_, TransportError>(receipt);
                }
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| TransportError::ConfirmationTimeout {
                tx_hash: tx_hash.to_string(),
                timeout_ms: self.confirmation_timeout.as_millis() as u64,
            })??;

        if !receipt.succeeded() {
            return Err(SubmitError::Reverted(format!(
                "transaction {} failed with status {}",
                tx_hash,
                receipt.status.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.as_deref().map(parse_hex_u64).transpose()?,
            gas_used: receipt.gas_used.as_deref().map(parse_hex_u64).transpose()?,
        })
    }
}

#[async_trait]
impl IntentLedgerClient for EvmIntentLedgerClient {
    async fn verify_fill(&self, intent_id: IntentId, amount: Wei) -> Result<TxReceipt, SubmitError> {
        let calldata = encode_verify_fill(intent_id, amount);
        let tx_hash = self
            .client
            .send_transaction(&self.operator, &self.contract_addr, &calldata)
            .await
            .map_err(classify_submit_error)?;
        debug!("verifyFill({}) submitted as {}", intent_id, tx_hash);

        self.wait_for_receipt(&tx_hash).await
    }
}

/// ABI calldata for `verifyFill(intentId, amount)`.
pub fn encode_verify_fill(intent_id: IntentId, amount: Wei) -> Vec<u8> {
    let mut calldata = Vec::with_capacity(4 + 64);
    calldata.extend_from_slice(&function_selector(VERIFY_FILL_SIGNATURE));
    calldata.extend_from_slice(&encode_uint256(u128::from(intent_id)));
    calldata.extend_from_slice(&encode_uint256(amount));
    calldata
}

/// Maps a submission failure onto the relay's classification.
///
/// Recognised revert reasons become `Rejected`, other reverts `Reverted`, and
/// everything else stays a transport failure.
pub fn classify_submit_error(err: TransportError) -> SubmitError {
    if let TransportError::Rpc { message, .. } = &err {
        if let Some(ledger_error) = classify_revert(message) {
            return SubmitError::Rejected(ledger_error);
        }
        if message.to_lowercase().contains("revert") {
            return SubmitError::Reverted(message.clone());
        }
    }
    SubmitError::Transport(err)
}

/// Recognises the intent ledger's revert reasons inside a node error message.
pub fn classify_revert(message: &str) -> Option<LedgerError> {
    let known: [(&str, LedgerError); 13] = [
        ("Intent already claimed", StateError::AlreadyClaimed.into()),
        ("Intent not claimed yet", StateError::NotClaimed.into()),
        ("Intent already fulfilled", StateError::AlreadyFulfilled.into()),
        ("Intent not fulfilled yet", StateError::NotFulfilled.into()),
        ("Intent already paid", StateError::AlreadyPaid.into()),
        ("Intent still active", StateError::StillActive.into()),
        ("Intent closed", StateError::Closed.into()),
        ("Intent does not exist", StateError::NotFound.into()),
        ("Contract is disabled", StateError::Disabled.into()),
        ("Only owner can call this", AuthorizationError::OnlyOwner.into()),
        ("Only filler can claim", AuthorizationError::OnlyFiller.into()),
        ("Only creator can close", AuthorizationError::OnlyCreator.into()),
        ("Function does not accept value", ValidationError::UnexpectedValue.into()),
    ];

    known
        .into_iter()
        .find(|(reason, _)| message.contains(reason))
        .map(|(_, err)| err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_fill_calldata_layout() {
        let calldata = encode_verify_fill(7, 1_000);

        assert_eq!(calldata.len(), 68);
        assert_eq!(&calldata[..4], &function_selector(VERIFY_FILL_SIGNATURE));
        assert_eq!(calldata[35], 7);
        assert_eq!(&calldata[66..], &[0x03, 0xe8]);
    }

    #[test]
    fn test_classify_hardhat_revert_message() {
        let message = "VM Exception while processing transaction: reverted with reason string 'Intent already fulfilled'";
        assert_eq!(
            classify_revert(message),
            Some(LedgerError::State(StateError::AlreadyFulfilled))
        );
        assert_eq!(classify_revert("nonce too low"), None);
    }

    #[test]
    fn test_unknown_revert_is_not_retryable() {
        let err = classify_submit_error(TransportError::Rpc {
            code: -32603,
            message: "execution reverted: custom".to_string(),
        });
        assert!(matches!(err, SubmitError::Reverted(_)));

        let err = classify_submit_error(TransportError::Rpc {
            code: -32000,
            message: "header not found".to_string(),
        });
        assert!(err.is_retryable());
    }
}
