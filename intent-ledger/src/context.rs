//! Transaction envelope

use serde::{Deserialize, Serialize};

use crate::types::{Address, Timestamp, Wei};

/// Who is calling, how much value is attached, and the ledger time at which the call executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub value: Wei,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self {
            caller,
            value: 0,
            now,
        }
    }

    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }
}
