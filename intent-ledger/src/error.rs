//! Error types

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::Wei;

/// Malformed or insufficient input value.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Must send exact fee")]
    FeeMismatch { expected: Wei, attached: Wei },

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid recipient")]
    InvalidRecipient,

    #[error("Deposit must be at least {minimum} wei")]
    DepositTooLow { minimum: Wei, attached: Wei },

    #[error("Must send ETH")]
    ZeroValue,

    #[error("Function does not accept value")]
    UnexpectedValue,

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Wei, required: Wei },

    #[error("Fill amount {reported} does not match intent amount {expected}")]
    FillAmountMismatch { expected: Wei, reported: Wei },
}

/// Caller does not hold the role the operation requires.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Only owner can call this")]
    OnlyOwner,

    #[error("Only filler can claim")]
    OnlyFiller,

    #[error("Only creator can close")]
    OnlyCreator,
}

/// Operation is invalid for the intent's (or the ledger's) current lifecycle stage.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Contract is disabled")]
    Disabled,

    #[error("Intent does not exist")]
    NotFound,

    #[error("Intent already claimed")]
    AlreadyClaimed,

    #[error("Intent not claimed yet")]
    NotClaimed,

    #[error("Intent already fulfilled")]
    AlreadyFulfilled,

    #[error("Intent not fulfilled yet")]
    NotFulfilled,

    #[error("Intent already paid")]
    AlreadyPaid,

    #[error("Intent still active")]
    StillActive,

    #[error("Intent closed")]
    Closed,

    #[error("Insufficient ledger balance: available {available}, required {required}")]
    InsufficientLiquidity { available: Wei, required: Wei },
}

/// Any failure of a ledger operation. A failed operation leaves the ledger unchanged.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Coarse error category, used by callers that only need to classify a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Authorization,
    State,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::Authorization(_) => ErrorKind::Authorization,
            LedgerError::State(_) => ErrorKind::State,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authorization => "authorization",
            ErrorKind::State => "state",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(
            LedgerError::from(ValidationError::ZeroAmount).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::from(AuthorizationError::OnlyOwner).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(LedgerError::from(StateError::Disabled).kind(), ErrorKind::State);
    }

    #[test]
    fn test_error_messages_are_transparent() {
        let err = LedgerError::from(StateError::AlreadyFulfilled);
        assert_eq!(err.to_string(), "Intent already fulfilled");

        let err = LedgerError::from(ValidationError::FeeMismatch { expected: 5, attached: 0 });
        assert_eq!(err.to_string(), "Must send exact fee");
    }
}
