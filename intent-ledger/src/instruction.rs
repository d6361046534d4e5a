//! Instruction definitions

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::context::CallContext;
use crate::types::{Address, IntentId, Wei};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentInstruction {
    /// Create a new intent, escrowing the fee
    ///
    /// Caller: any. Value: exactly `fee`.
    CreateIntent {
        recipient: Address,
        amount: Wei,
        fee: Wei,
    },

    /// Claim an unclaimed intent as its filler
    ///
    /// Caller: any, once per intent. Value: deposit, at least `min_deposit`.
    ClaimIntent { intent_id: IntentId },

    /// Mark a claimed intent fulfilled
    ///
    /// Caller: owner. Value: none.
    VerifyFill { intent_id: IntentId, amount: Wei },

    /// Pay a verified intent's amount to its filler
    ///
    /// Caller: filler. Value: none.
    ClaimPayment { intent_id: IntentId },

    /// Refund fee and deposit to the creator after the expiry window
    ///
    /// Caller: creator. Value: none.
    CloseExpiredIntent { intent_id: IntentId },

    /// Sweep the ledger balance to the owner and disable the ledger permanently
    ///
    /// Caller: owner. Value: none.
    WithdrawAndDisable,

    /// Add payout liquidity to the ledger
    ///
    /// Caller: any. Value: non-zero.
    Fund,
}

impl IntentInstruction {
    pub fn name(&self) -> &'static str {
        match self {
            IntentInstruction::CreateIntent { .. } => "CreateIntent",
            IntentInstruction::ClaimIntent { .. } => "ClaimIntent",
            IntentInstruction::VerifyFill { .. } => "VerifyFill",
            IntentInstruction::ClaimPayment { .. } => "ClaimPayment",
            IntentInstruction::CloseExpiredIntent { .. } => "CloseExpiredIntent",
            IntentInstruction::WithdrawAndDisable => "WithdrawAndDisable",
            IntentInstruction::Fund => "Fund",
        }
    }

    /// Compact binary encoding: one tag byte followed by big-endian fields.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 20 + 16 + 16);
        match self {
            IntentInstruction::CreateIntent { recipient, amount, fee } => {
                out.push(0);
                out.extend_from_slice(recipient.as_bytes());
                out.extend_from_slice(&amount.to_be_bytes());
                out.extend_from_slice(&fee.to_be_bytes());
            }
            IntentInstruction::ClaimIntent { intent_id } => {
                out.push(1);
                out.extend_from_slice(&intent_id.to_be_bytes());
            }
            IntentInstruction::VerifyFill { intent_id, amount } => {
                out.push(2);
                out.extend_from_slice(&intent_id.to_be_bytes());
                out.extend_from_slice(&amount.to_be_bytes());
            }
            IntentInstruction::ClaimPayment { intent_id } => {
                out.push(3);
                out.extend_from_slice(&intent_id.to_be_bytes());
            }
            IntentInstruction::CloseExpiredIntent { intent_id } => {
                out.push(4);
                out.extend_from_slice(&intent_id.to_be_bytes());
            }
            IntentInstruction::WithdrawAndDisable => out.push(5),
            IntentInstruction::Fund => out.push(6),
        }
        out
    }
}

/// Effect of a successfully executed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    IntentCreated { intent_id: IntentId },
    IntentClaimed { intent_id: IntentId },
    FillVerified { intent_id: IntentId },
    PaymentClaimed { intent_id: IntentId, paid: Wei },
    IntentClosed { intent_id: IntentId, refund: Wei },
    LedgerDisabled { swept: Wei },
    Funded { value: Wei },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    /// Position of the transaction in the ledger's serialized order
    pub sequence: u64,
    /// Keccak-256 over sequence, caller, value and instruction (0x-prefixed hex)
    pub tx_hash: String,
    pub outcome: Outcome,
}

pub fn transaction_hash(sequence: u64, ctx: &CallContext, instruction: &IntentInstruction) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(sequence.to_be_bytes());
    hasher.update(ctx.caller.as_bytes());
    hasher.update(ctx.value.to_be_bytes());
    hasher.update(instruction.encode());
    format!("0x{}", hex::encode(hasher.finalize()))
}
