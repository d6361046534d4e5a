//! Events appended by the intent ledger on every successful mutation

use serde::{Deserialize, Serialize};

use crate::types::{Address, IntentId, Timestamp, Wei};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    IntentCreated {
        intent_id: IntentId,
        creator: Address,
        recipient: Address,
        amount: Wei,
        fee: Wei,
        created_at: Timestamp,
    },
    IntentClaimed {
        intent_id: IntentId,
        filler: Address,
        deposit: Wei,
    },
    /// `reported_amount` is the relay's audit value, not necessarily the intent amount.
    FillVerified {
        intent_id: IntentId,
        reported_amount: Wei,
    },
    PaymentClaimed {
        intent_id: IntentId,
        filler: Address,
        amount: Wei,
    },
    IntentClosed {
        intent_id: IntentId,
        creator: Address,
        refund: Wei,
    },
    LedgerDisabled {
        owner: Address,
        swept: Wei,
    },
    Funded {
        from: Address,
        value: Wei,
    },
}
