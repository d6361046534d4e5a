//! Fulfillment ledger on the source chain
//!
//! A filler sends value here to pay an intent's recipient. The ledger forwards
//! the value and records the fulfillment; the relay watches that record stream.
//! Nothing here consults the intent ledger, so a record for an unknown or
//! already-settled intent is accepted and left for the destination to reject.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    accounts::Accounts,
    context::CallContext,
    error::{LedgerError, ValidationError},
    types::{Address, IntentId, Timestamp, Wei},
};

/// One `IntentFulfilled` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentRecord {
    pub intent_id: IntentId,
    pub filler: Address,
    pub recipient: Address,
    pub amount: Wei,
    pub timestamp: Timestamp,
}

#[derive(Debug, Default)]
pub struct FulfillmentLedger {
    accounts: Accounts,
    records: Vec<FulfillmentRecord>,
}

impl FulfillmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut Accounts {
        &mut self.accounts
    }

    /// Forwards `ctx.value` from the caller to `recipient` and appends a record.
    pub fn fulfill_intent(
        &mut self,
        ctx: &CallContext,
        intent_id: IntentId,
        recipient: Address,
    ) -> Result<FulfillmentRecord, LedgerError> {
        if ctx.value == 0 {
            return Err(ValidationError::ZeroValue.into());
        }
        if recipient.is_zero() {
            return Err(ValidationError::InvalidRecipient.into());
        }
        self.accounts.debit(&ctx.caller, ctx.value)?;
        self.accounts.credit(recipient, ctx.value);

        let record = FulfillmentRecord {
            intent_id,
            filler: ctx.caller,
            recipient,
            amount: ctx.value,
            timestamp: ctx.now,
        };
        self.records.push(record.clone());

        debug!(
            "IntentFulfilled: intent_id={}, filler={}, recipient={}, amount={}",
            intent_id, ctx.caller, recipient, ctx.value
        );
        Ok(record)
    }

    pub fn records(&self) -> &[FulfillmentRecord] {
        &self.records
    }

    /// Sequence number of the newest record. Sequences start at 1; 0 means empty.
    pub fn last_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    /// Records with sequence strictly greater than `sequence`, paired with their sequence.
    pub fn records_after(&self, sequence: u64) -> Vec<(u64, FulfillmentRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (index as u64 + 1, record))
            .filter(|(seq, _)| *seq > sequence)
            .map(|(seq, record)| (seq, record.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_after_uses_one_based_sequence() {
        let filler = Address::from_low_u64(1);
        let recipient = Address::from_low_u64(2);
        let mut ledger = FulfillmentLedger::new();
        ledger.accounts_mut().credit(filler, 30);

        for id in 0..3 {
            let ctx = CallContext::new(filler, 100).with_value(10);
            ledger.fulfill_intent(&ctx, id, recipient).unwrap();
        }

        assert_eq!(ledger.last_sequence(), 3);
        let tail = ledger.records_after(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].0, 2);
        assert_eq!(tail[0].1.intent_id, 1);
        assert!(ledger.records_after(3).is_empty());
    }
}
