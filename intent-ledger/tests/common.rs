#![allow(dead_code)]

use intent_ledger::{milli_ether, Address, CallContext, IntentId, IntentLedger, LedgerParams, Timestamp, Wei};

// ============================================================================
// TEST ACTORS
// ============================================================================

pub const START: Timestamp = 1_700_000_000;

pub fn owner() -> Address {
    Address::from_low_u64(0x0a)
}

pub fn creator() -> Address {
    Address::from_low_u64(0x0b)
}

pub fn filler() -> Address {
    Address::from_low_u64(0x0c)
}

pub fn recipient() -> Address {
    Address::from_low_u64(0x0d)
}

pub fn stranger() -> Address {
    Address::from_low_u64(0x0e)
}

// ============================================================================
// AMOUNTS
// ============================================================================

pub const AMOUNT: Wei = milli_ether(1_000);
pub const FEE: Wei = milli_ether(50);
pub const DEPOSIT: Wei = milli_ether(5);
pub const STARTING_BALANCE: Wei = milli_ether(100_000);

// ============================================================================
// LEDGER HELPERS
// ============================================================================

/// Helper: Ledger with every test actor funded
pub fn setup_ledger() -> IntentLedger {
    setup_ledger_with(LedgerParams::default())
}

/// Helper: Ledger with custom parameters and every test actor funded
pub fn setup_ledger_with(params: LedgerParams) -> IntentLedger {
    let mut ledger = IntentLedger::with_params(owner(), params);
    for actor in [owner(), creator(), filler(), stranger()] {
        ledger.accounts_mut().credit(actor, STARTING_BALANCE);
    }
    ledger
}

/// Helper: Call context at the start time
pub fn ctx(caller: Address) -> CallContext {
    CallContext::new(caller, START)
}

/// Helper: Owner adds payout liquidity
pub fn fund(ledger: &mut IntentLedger, value: Wei) {
    ledger
        .fund(&ctx(owner()).with_value(value))
        .expect("funding should succeed");
}

/// Helper: Creator creates the standard intent
pub fn create_intent(ledger: &mut IntentLedger) -> IntentId {
    ledger
        .create_intent(&ctx(creator()).with_value(FEE), recipient(), AMOUNT, FEE)
        .expect("create should succeed")
}

/// Helper: Standard intent, claimed by the filler
pub fn claimed_intent(ledger: &mut IntentLedger) -> IntentId {
    let id = create_intent(ledger);
    ledger
        .claim_intent(&ctx(filler()).with_value(DEPOSIT), id)
        .expect("claim should succeed");
    id
}

/// Helper: Standard intent, claimed and verified
pub fn verified_intent(ledger: &mut IntentLedger) -> IntentId {
    let id = claimed_intent(ledger);
    ledger
        .verify_fill(&ctx(owner()), id, AMOUNT)
        .expect("verify should succeed");
    id
}
