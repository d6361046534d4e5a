//! Intent ledger: authoritative intent store and transition guard
//!
//! Every mutating operation takes the ledger by exclusive reference, checks
//! `disabled` first, validates all preconditions, and only then moves value
//! and writes state. A failed call leaves intents, balances, the event log
//! and the disabled flag untouched.
//!
//! The one exception is the transaction sequence. It behaves like an account
//! nonce: `execute` advances it for every submitted transaction before any
//! guard runs, so a rejected call still consumes a sequence number. Direct
//! calls to the operation methods never touch it.

use std::collections::BTreeMap;
use tracing::debug;

use crate::{
    accounts::Accounts,
    context::CallContext,
    error::{AuthorizationError, LedgerError, StateError, ValidationError},
    events::LedgerEvent,
    instruction::{transaction_hash, ExecutionReceipt, IntentInstruction, Outcome},
    state::{FillAmountPolicy, Intent, LedgerParams},
    types::{Address, IntentId, Wei},
};

pub struct IntentLedger {
    owner: Address,
    params: LedgerParams,
    intents: BTreeMap<IntentId, Intent>,
    next_intent_id: IntentId,
    /// Value held in custody by the ledger itself
    balance: Wei,
    disabled: bool,
    accounts: Accounts,
    events: Vec<LedgerEvent>,
    sequence: u64,
}

impl IntentLedger {
    pub fn new(owner: Address) -> Self {
        Self::with_params(owner, LedgerParams::default())
    }

    pub fn with_params(owner: Address, params: LedgerParams) -> Self {
        Self {
            owner,
            params,
            intents: BTreeMap::new(),
            next_intent_id: 0,
            balance: 0,
            disabled: false,
            accounts: Accounts::new(),
            events: Vec::new(),
            sequence: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn balance(&self) -> Wei {
        self.balance
    }

    pub fn intent(&self, intent_id: IntentId) -> Option<&Intent> {
        self.intents.get(&intent_id)
    }

    pub fn intent_count(&self) -> u64 {
        self.next_intent_id
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut Accounts {
        &mut self.accounts
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Executes one instruction as a single serialized transaction.
    ///
    /// The sequence number advances for every submitted transaction, including
    /// failed ones, so that receipts reflect ordering.
    pub fn execute(
        &mut self,
        ctx: &CallContext,
        instruction: IntentInstruction,
    ) -> Result<ExecutionReceipt, LedgerError> {
        self.sequence += 1;
        let sequence = self.sequence;
        debug!("Instruction: {} (sequence={})", instruction.name(), sequence);

        let outcome = match instruction {
            IntentInstruction::CreateIntent { recipient, amount, fee } => {
                let intent_id = self.create_intent(ctx, recipient, amount, fee)?;
                Outcome::IntentCreated { intent_id }
            }
            IntentInstruction::ClaimIntent { intent_id } => {
                self.claim_intent(ctx, intent_id)?;
                Outcome::IntentClaimed { intent_id }
            }
            IntentInstruction::VerifyFill { intent_id, amount } => {
                self.verify_fill(ctx, intent_id, amount)?;
                Outcome::FillVerified { intent_id }
            }
            IntentInstruction::ClaimPayment { intent_id } => {
                let paid = self.claim_payment(ctx, intent_id)?;
                Outcome::PaymentClaimed { intent_id, paid }
            }
            IntentInstruction::CloseExpiredIntent { intent_id } => {
                let refund = self.close_expired_intent(ctx, intent_id)?;
                Outcome::IntentClosed { intent_id, refund }
            }
            IntentInstruction::WithdrawAndDisable => {
                let swept = self.withdraw_and_disable(ctx)?;
                Outcome::LedgerDisabled { swept }
            }
            IntentInstruction::Fund => {
                self.fund(ctx)?;
                Outcome::Funded { value: ctx.value }
            }
        };

        Ok(ExecutionReceipt {
            sequence,
            tx_hash: transaction_hash(sequence, ctx, &instruction),
            outcome,
        })
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    pub fn create_intent(
        &mut self,
        ctx: &CallContext,
        recipient: Address,
        amount: Wei,
        fee: Wei,
    ) -> Result<IntentId, LedgerError> {
        self.ensure_enabled()?;
        if ctx.value != fee {
            return Err(ValidationError::FeeMismatch {
                expected: fee,
                attached: ctx.value,
            }
            .into());
        }
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        if recipient.is_zero() {
            return Err(ValidationError::InvalidRecipient.into());
        }
        self.accounts.ensure_funds(&ctx.caller, ctx.value)?;

        self.take_value(ctx)?;
        let intent_id = self.next_intent_id;
        self.next_intent_id += 1;
        self.intents
            .insert(intent_id, Intent::new(ctx.caller, recipient, amount, fee, ctx.now));
        self.events.push(LedgerEvent::IntentCreated {
            intent_id,
            creator: ctx.caller,
            recipient,
            amount,
            fee,
            created_at: ctx.now,
        });

        debug!("Intent created: intent_id={}, amount={}, fee={}", intent_id, amount, fee);
        Ok(intent_id)
    }

    pub fn claim_intent(&mut self, ctx: &CallContext, intent_id: IntentId) -> Result<(), LedgerError> {
        self.ensure_enabled()?;
        let intent = self.intents.get(&intent_id).ok_or(StateError::NotFound)?;
        if intent.closed {
            return Err(StateError::Closed.into());
        }
        if intent.is_claimed() {
            return Err(StateError::AlreadyClaimed.into());
        }
        if ctx.value < self.params.min_deposit {
            return Err(ValidationError::DepositTooLow {
                minimum: self.params.min_deposit,
                attached: ctx.value,
            }
            .into());
        }
        self.accounts.ensure_funds(&ctx.caller, ctx.value)?;

        self.take_value(ctx)?;
        let intent = self.intent_mut(intent_id)?;
        intent.filler = ctx.caller;
        intent.deposit = ctx.value;
        self.events.push(LedgerEvent::IntentClaimed {
            intent_id,
            filler: ctx.caller,
            deposit: ctx.value,
        });

        debug!("Intent claimed: intent_id={}, filler={}", intent_id, ctx.caller);
        Ok(())
    }

    /// Marks a claimed intent fulfilled. `amount` is compared against the intent
    /// only under `FillAmountPolicy::Exact`.
    pub fn verify_fill(
        &mut self,
        ctx: &CallContext,
        intent_id: IntentId,
        amount: Wei,
    ) -> Result<(), LedgerError> {
        self.ensure_enabled()?;
        self.ensure_owner(ctx)?;
        ensure_no_value(ctx)?;
        let intent = self.intents.get(&intent_id).ok_or(StateError::NotClaimed)?;
        if intent.closed {
            return Err(StateError::Closed.into());
        }
        if !intent.is_claimed() {
            return Err(StateError::NotClaimed.into());
        }
        if intent.fulfilled {
            return Err(StateError::AlreadyFulfilled.into());
        }
        if self.params.fill_amount_policy == FillAmountPolicy::Exact && amount != intent.amount {
            return Err(ValidationError::FillAmountMismatch {
                expected: intent.amount,
                reported: amount,
            }
            .into());
        }

        self.intent_mut(intent_id)?.fulfilled = true;
        self.events.push(LedgerEvent::FillVerified {
            intent_id,
            reported_amount: amount,
        });

        debug!("Fill verified: intent_id={}, reported_amount={}", intent_id, amount);
        Ok(())
    }

    /// Pays the intent amount to its filler and zeroes it. Returns the amount paid.
    pub fn claim_payment(&mut self, ctx: &CallContext, intent_id: IntentId) -> Result<Wei, LedgerError> {
        self.ensure_enabled()?;
        ensure_no_value(ctx)?;
        let intent = self.intents.get(&intent_id).ok_or(StateError::NotFulfilled)?;
        if intent.closed {
            return Err(StateError::Closed.into());
        }
        if !intent.fulfilled {
            return Err(StateError::NotFulfilled.into());
        }
        if ctx.caller != intent.filler {
            return Err(AuthorizationError::OnlyFiller.into());
        }
        if intent.amount == 0 {
            return Err(StateError::AlreadyPaid.into());
        }
        let amount = intent.amount;
        self.ensure_liquidity(amount)?;

        self.balance -= amount;
        self.accounts.credit(ctx.caller, amount);
        self.intent_mut(intent_id)?.amount = 0;
        self.events.push(LedgerEvent::PaymentClaimed {
            intent_id,
            filler: ctx.caller,
            amount,
        });

        debug!("Payment claimed: intent_id={}, amount={}", intent_id, amount);
        Ok(amount)
    }

    /// Refunds fee and deposit to the creator once the expiry window has passed.
    /// Returns the refunded value.
    pub fn close_expired_intent(
        &mut self,
        ctx: &CallContext,
        intent_id: IntentId,
    ) -> Result<Wei, LedgerError> {
        self.ensure_enabled()?;
        ensure_no_value(ctx)?;
        let intent = self.intents.get(&intent_id).ok_or(StateError::NotFound)?;
        if intent.closed {
            return Err(StateError::Closed.into());
        }
        if intent.fulfilled {
            return Err(StateError::AlreadyFulfilled.into());
        }
        if !intent.is_expired(ctx.now, self.params.expiry_window_secs) {
            return Err(StateError::StillActive.into());
        }
        if ctx.caller != intent.creator {
            return Err(AuthorizationError::OnlyCreator.into());
        }
        let refund = intent.fee.saturating_add(intent.deposit);
        self.ensure_liquidity(refund)?;

        self.balance -= refund;
        self.accounts.credit(ctx.caller, refund);
        self.intent_mut(intent_id)?.closed = true;
        self.events.push(LedgerEvent::IntentClosed {
            intent_id,
            creator: ctx.caller,
            refund,
        });

        debug!("Intent closed: intent_id={}, refund={}", intent_id, refund);
        Ok(refund)
    }

    /// Sweeps the whole ledger balance to the owner and disables the ledger.
    /// Irreversible. Returns the swept value.
    pub fn withdraw_and_disable(&mut self, ctx: &CallContext) -> Result<Wei, LedgerError> {
        self.ensure_enabled()?;
        self.ensure_owner(ctx)?;
        ensure_no_value(ctx)?;

        let swept = self.balance;
        self.balance = 0;
        self.accounts.credit(self.owner, swept);
        self.disabled = true;
        self.events.push(LedgerEvent::LedgerDisabled {
            owner: self.owner,
            swept,
        });

        debug!("Ledger disabled: swept={}", swept);
        Ok(swept)
    }

    pub fn fund(&mut self, ctx: &CallContext) -> Result<(), LedgerError> {
        self.ensure_enabled()?;
        if ctx.value == 0 {
            return Err(ValidationError::ZeroValue.into());
        }
        self.accounts.ensure_funds(&ctx.caller, ctx.value)?;

        self.take_value(ctx)?;
        self.events.push(LedgerEvent::Funded {
            from: ctx.caller,
            value: ctx.value,
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------------

    fn ensure_enabled(&self) -> Result<(), LedgerError> {
        if self.disabled {
            return Err(StateError::Disabled.into());
        }
        Ok(())
    }

    fn ensure_owner(&self, ctx: &CallContext) -> Result<(), LedgerError> {
        if ctx.caller != self.owner {
            return Err(AuthorizationError::OnlyOwner.into());
        }
        Ok(())
    }

    fn ensure_liquidity(&self, required: Wei) -> Result<(), LedgerError> {
        if self.balance < required {
            return Err(StateError::InsufficientLiquidity {
                available: self.balance,
                required,
            }
            .into());
        }
        Ok(())
    }

    /// Moves the attached value from the caller into ledger custody.
    fn take_value(&mut self, ctx: &CallContext) -> Result<(), LedgerError> {
        self.accounts.debit(&ctx.caller, ctx.value)?;
        self.balance = self.balance.saturating_add(ctx.value);
        Ok(())
    }

    fn intent_mut(&mut self, intent_id: IntentId) -> Result<&mut Intent, LedgerError> {
        Ok(self.intents.get_mut(&intent_id).ok_or(StateError::NotFound)?)
    }
}

fn ensure_no_value(ctx: &CallContext) -> Result<(), LedgerError> {
    if ctx.value != 0 {
        return Err(ValidationError::UnexpectedValue.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::milli_ether;

    fn funded_ledger() -> (IntentLedger, Address, Address) {
        let owner = Address::from_low_u64(1);
        let creator = Address::from_low_u64(2);
        let mut ledger = IntentLedger::new(owner);
        ledger.accounts_mut().credit(creator, milli_ether(1_000));
        (ledger, owner, creator)
    }

    #[test]
    fn test_ids_are_assigned_monotonically() {
        let (mut ledger, _, creator) = funded_ledger();
        let ctx = CallContext::new(creator, 10).with_value(milli_ether(50));
        let recipient = Address::from_low_u64(3);

        let first = ledger.create_intent(&ctx, recipient, 1, milli_ether(50)).unwrap();
        let second = ledger.create_intent(&ctx, recipient, 1, milli_ether(50)).unwrap();

        assert_eq!((first, second), (0, 1));
        assert_eq!(ledger.intent_count(), 2);
    }

    #[test]
    fn test_failed_execute_still_advances_sequence() {
        let (mut ledger, owner, creator) = funded_ledger();
        ledger
            .fund(&CallContext::new(creator, 10).with_value(milli_ether(5)))
            .unwrap();
        let events_before = ledger.events().len();

        let bad = CallContext::new(creator, 10);
        assert!(ledger
            .execute(&bad, IntentInstruction::WithdrawAndDisable)
            .is_err());
        assert!(!ledger.is_disabled());
        assert_eq!(ledger.balance(), milli_ether(5));
        assert_eq!(ledger.intent_count(), 0);
        assert_eq!(ledger.events().len(), events_before);

        let receipt = ledger
            .execute(
                &CallContext::new(owner, 10),
                IntentInstruction::WithdrawAndDisable,
            )
            .unwrap();
        assert_eq!(receipt.sequence, 2);
        assert_eq!(
            receipt.outcome,
            Outcome::LedgerDisabled {
                swept: milli_ether(5)
            }
        );
    }

    #[test]
    fn test_take_value_moves_funds_into_custody() {
        let (mut ledger, _, creator) = funded_ledger();
        let ctx = CallContext::new(creator, 10).with_value(milli_ether(5));
        ledger.fund(&ctx).unwrap();

        assert_eq!(ledger.balance(), milli_ether(5));
        assert_eq!(ledger.accounts().balance_of(&creator), milli_ether(995));
    }
}
