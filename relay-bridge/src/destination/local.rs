//! In-process intent ledger client

use async_trait::async_trait;
use intent_ledger::{Address, CallContext, Clock, IntentId, IntentInstruction, IntentLedger, Wei};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{IntentLedgerClient, TxReceipt};
use crate::error::SubmitError;

/// Calls a shared `IntentLedger` as the operator. The mutex serializes
/// transactions the way a ledger host would.
pub struct LocalIntentLedgerClient {
    ledger: Arc<Mutex<IntentLedger>>,
    operator: Address,
    clock: Arc<dyn Clock>,
}

impl LocalIntentLedgerClient {
    pub fn new(ledger: Arc<Mutex<IntentLedger>>, operator: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            operator,
            clock,
        }
    }

    pub fn ledger(&self) -> Arc<Mutex<IntentLedger>> {
        self.ledger.clone()
    }
}

#[async_trait]
impl IntentLedgerClient for LocalIntentLedgerClient {
    async fn verify_fill(&self, intent_id: IntentId, amount: Wei) -> Result<TxReceipt, SubmitError> {
        let ctx = CallContext::new(self.operator, self.clock.now());
        let receipt = self
            .ledger
            .lock()
            .await
            .execute(&ctx, IntentInstruction::VerifyFill { intent_id, amount })?;

        Ok(TxReceipt {
            tx_hash: receipt.tx_hash,
            block_number: Some(receipt.sequence),
            gas_used: None,
        })
    }
}
