//! Intent record and ledger parameters

use serde::{Deserialize, Serialize};

use crate::types::{milli_ether, Address, Timestamp, Wei};

/// Minimum filler deposit: 0.005 native-currency units.
pub const DEFAULT_MIN_DEPOSIT: Wei = milli_ether(5);

/// Window after creation during which an intent cannot be closed: 30 minutes.
pub const DEFAULT_EXPIRY_WINDOW_SECS: u64 = 30 * 60;

/// How `verifyFill` treats the amount reported by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillAmountPolicy {
    /// The reported amount is recorded in the event log only.
    #[default]
    Informational,
    /// The reported amount must equal the intent's amount.
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    pub min_deposit: Wei,
    pub expiry_window_secs: u64,
    pub fill_amount_policy: FillAmountPolicy,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            min_deposit: DEFAULT_MIN_DEPOSIT,
            expiry_window_secs: DEFAULT_EXPIRY_WINDOW_SECS,
            fill_amount_policy: FillAmountPolicy::Informational,
        }
    }
}

/// Lifecycle stage of an intent, derived from its stored fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentStatus {
    Created,
    Claimed,
    Verified,
    Paid,
    Closed,
}

/// A creator's request that `recipient` be paid `amount`, funded by an escrowed `fee`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub creator: Address,
    pub recipient: Address,
    /// Owed to the filler once verified; zeroed when paid.
    pub amount: Wei,
    pub fee: Wei,
    /// `Address::ZERO` until claimed.
    pub filler: Address,
    pub deposit: Wei,
    pub fulfilled: bool,
    pub created_at: Timestamp,
    pub closed: bool,
}

impl Intent {
    pub fn new(creator: Address, recipient: Address, amount: Wei, fee: Wei, created_at: Timestamp) -> Self {
        Self {
            creator,
            recipient,
            amount,
            fee,
            filler: Address::ZERO,
            deposit: 0,
            fulfilled: false,
            created_at,
            closed: false,
        }
    }

    pub fn is_claimed(&self) -> bool {
        !self.filler.is_zero()
    }

    pub fn is_paid(&self) -> bool {
        self.fulfilled && self.amount == 0
    }

    pub fn expires_at(&self, expiry_window_secs: u64) -> Timestamp {
        self.created_at.saturating_add(expiry_window_secs)
    }

    pub fn is_expired(&self, now: Timestamp, expiry_window_secs: u64) -> bool {
        now >= self.expires_at(expiry_window_secs)
    }

    pub fn status(&self) -> IntentStatus {
        if self.closed {
            IntentStatus::Closed
        } else if self.is_paid() {
            IntentStatus::Paid
        } else if self.fulfilled {
            IntentStatus::Verified
        } else if self.is_claimed() {
            IntentStatus::Claimed
        } else {
            IntentStatus::Created
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_progression() {
        let mut intent = Intent::new(
            Address::from_low_u64(1),
            Address::from_low_u64(2),
            100,
            5,
            1_000,
        );
        assert_eq!(intent.status(), IntentStatus::Created);

        intent.filler = Address::from_low_u64(3);
        assert_eq!(intent.status(), IntentStatus::Claimed);

        intent.fulfilled = true;
        assert_eq!(intent.status(), IntentStatus::Verified);

        intent.amount = 0;
        assert_eq!(intent.status(), IntentStatus::Paid);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let intent = Intent::new(Address::from_low_u64(1), Address::from_low_u64(2), 1, 0, 1_000);
        assert!(!intent.is_expired(1_000 + DEFAULT_EXPIRY_WINDOW_SECS - 1, DEFAULT_EXPIRY_WINDOW_SECS));
        assert!(intent.is_expired(1_000 + DEFAULT_EXPIRY_WINDOW_SECS, DEFAULT_EXPIRY_WINDOW_SECS));
    }
}
