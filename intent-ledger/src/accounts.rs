//! External account balances held by a ledger host

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ValidationError;
use crate::types::{Address, Wei};

/// Native balances of the accounts that transact with a ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Accounts {
    balances: HashMap<Address, Wei>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> Wei {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, account: Address, value: Wei) {
        if value == 0 {
            return;
        }
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(value);
    }

    /// Checks that `account` could pay `value` without moving anything.
    pub fn ensure_funds(&self, account: &Address, value: Wei) -> Result<(), ValidationError> {
        let balance = self.balance_of(account);
        if balance < value {
            return Err(ValidationError::InsufficientFunds {
                balance,
                required: value,
            });
        }
        Ok(())
    }

    pub fn debit(&mut self, account: &Address, value: Wei) -> Result<(), ValidationError> {
        self.ensure_funds(account, value)?;
        if value == 0 {
            return Ok(());
        }
        if let Some(balance) = self.balances.get_mut(account) {
            *balance -= value;
        }
        Ok(())
    }
}
