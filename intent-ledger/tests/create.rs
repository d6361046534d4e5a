mod common;

use common::*;
use intent_ledger::{
    Address, IntentStatus, LedgerError, LedgerEvent, StateError, ValidationError,
};

// ============================================================================
// CREATE INTENT TESTS
// ============================================================================

/// 1. Test: Intent Creation
/// Verifies that createIntent stores the intent and escrows the fee.
/// Why: The fee is the creator's only stake and must be held until payout or refund.
#[test]
fn test_create_intent_escrows_fee() {
    let mut ledger = setup_ledger();

    let id = create_intent(&mut ledger);

    assert_eq!(id, 0);
    let intent = ledger.intent(id).unwrap();
    assert_eq!(intent.creator, creator());
    assert_eq!(intent.recipient, recipient());
    assert_eq!(intent.amount, AMOUNT);
    assert_eq!(intent.fee, FEE);
    assert_eq!(intent.filler, Address::ZERO);
    assert_eq!(intent.created_at, START);
    assert_eq!(intent.status(), IntentStatus::Created);
    assert_eq!(ledger.balance(), FEE);
    assert_eq!(
        ledger.accounts().balance_of(&creator()),
        STARTING_BALANCE - FEE
    );
}

/// 2. Test: Sequential Intent Ids
/// Verifies that ids start at zero and increase by one per created intent.
/// Why: Ids are the only handle fillers and the relay share for an intent.
#[test]
fn test_intent_ids_are_sequential() {
    let mut ledger = setup_ledger();

    let ids: Vec<_> = (0..4).map(|_| create_intent(&mut ledger)).collect();

    assert_eq!(ids, vec![0, 1, 2, 3]);
    assert_eq!(ledger.intent_count(), 4);
}

/// 3. Test: Fee Mismatch Rejection
/// Verifies that createIntent reverts when the attached value differs from the fee.
/// Why: Overpayment would be stranded and underpayment would underfund the refund.
#[test]
fn test_reject_fee_mismatch() {
    let mut ledger = setup_ledger();

    for attached in [FEE - 1, FEE + 1, 0] {
        let err = ledger
            .create_intent(&ctx(creator()).with_value(attached), recipient(), AMOUNT, FEE)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Validation(ValidationError::FeeMismatch {
                expected: FEE,
                attached
            })
        );
    }
    assert_eq!(ledger.intent_count(), 0);
    assert_eq!(ledger.balance(), 0);
}

/// 4. Test: Zero Fee Intent
/// Verifies that a zero fee is accepted when no value is attached.
/// Why: The fee is a market choice; only the exact-match rule is enforced.
#[test]
fn test_zero_fee_intent_is_accepted() {
    let mut ledger = setup_ledger();

    let id = ledger
        .create_intent(&ctx(creator()), recipient(), AMOUNT, 0)
        .unwrap();

    assert_eq!(ledger.intent(id).unwrap().fee, 0);
    assert_eq!(ledger.balance(), 0);
}

/// 5. Test: Zero Amount Rejection
/// Verifies that createIntent reverts when amount is zero.
/// Why: A zero amount is indistinguishable from a paid intent.
#[test]
fn test_reject_zero_amount() {
    let mut ledger = setup_ledger();

    let err = ledger
        .create_intent(&ctx(creator()).with_value(FEE), recipient(), 0, FEE)
        .unwrap_err();

    assert_eq!(err, LedgerError::from(ValidationError::ZeroAmount));
    assert_eq!(ledger.intent_count(), 0);
}

/// 6. Test: Zero Recipient Rejection
/// Verifies that createIntent reverts for the zero address recipient.
/// Why: Value sent to the zero address is unrecoverable.
#[test]
fn test_reject_zero_recipient() {
    let mut ledger = setup_ledger();

    let err = ledger
        .create_intent(&ctx(creator()).with_value(FEE), Address::ZERO, AMOUNT, FEE)
        .unwrap_err();

    assert_eq!(err, LedgerError::from(ValidationError::InvalidRecipient));
}

/// 7. Test: Insufficient Caller Funds
/// Verifies that createIntent fails without side effects when the caller cannot pay the fee.
/// Why: Value transfer and state write happen atomically.
#[test]
fn test_reject_when_caller_cannot_pay() {
    let mut ledger = setup_ledger();
    let broke = Address::from_low_u64(0xff);

    let err = ledger
        .create_intent(&ctx(broke).with_value(FEE), recipient(), AMOUNT, FEE)
        .unwrap_err();

    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::InsufficientFunds { balance: 0, .. })
    ));
    assert_eq!(ledger.intent_count(), 0);
    assert!(ledger.events().is_empty());
}

/// 8. Test: Creation Event
/// Verifies that a successful creation appends an IntentCreated event.
/// Why: Off-chain fillers discover work through the event log.
#[test]
fn test_create_emits_event() {
    let mut ledger = setup_ledger();

    let id = create_intent(&mut ledger);

    assert_eq!(
        ledger.events(),
        &[LedgerEvent::IntentCreated {
            intent_id: id,
            creator: creator(),
            recipient: recipient(),
            amount: AMOUNT,
            fee: FEE,
            created_at: START,
        }]
    );
}

/// 9. Test: Unknown Intent Lookup
/// Verifies that reading an id that was never assigned returns nothing.
/// Why: Lookups must not fabricate default intents.
#[test]
fn test_unknown_intent_is_absent() {
    let mut ledger = setup_ledger();
    create_intent(&mut ledger);

    assert!(ledger.intent(1).is_none());
    let err = ledger
        .claim_intent(&ctx(filler()).with_value(DEPOSIT), 1)
        .unwrap_err();
    assert_eq!(err, LedgerError::from(StateError::NotFound));
}
