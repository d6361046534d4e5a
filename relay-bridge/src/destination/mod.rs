//! Intent ledger clients
//!
//! The relay submits `verifyFill` through this seam, either to an EVM node or
//! to an in-process `IntentLedger`.

use async_trait::async_trait;
use intent_ledger::{IntentId, Wei};
use serde::{Deserialize, Serialize};

use crate::error::SubmitError;

pub mod evm;
pub mod local;

pub use evm::EvmIntentLedgerClient;
pub use local::LocalIntentLedgerClient;

/// Confirmation of a successful `verifyFill`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    /// Resource cost reported by the destination, when it has one.
    pub gas_used: Option<u64>,
}

#[async_trait]
pub trait IntentLedgerClient: Send + Sync {
    /// Submits `verifyFill(intent_id, amount)` as the operator and waits for confirmation.
    async fn verify_fill(&self, intent_id: IntentId, amount: Wei) -> Result<TxReceipt, SubmitError>;
}
