//! Relay error types
//!
//! `TransportError` covers everything that prevents a request or subscription
//! from reaching a ledger. `SubmitError` is the outcome of a failed `verifyFill`
//! submission, split so the relay can decide between retry and drop.

use intent_ledger::{ErrorKind, LedgerError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("JSON-RPC error: {message} (code: {code})")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Subscription closed")]
    SubscriptionClosed,

    #[error("Subscription lagged, {0} events skipped")]
    Lagged(u64),

    #[error("Transaction {tx_hash} not confirmed within {timeout_ms}ms")]
    ConfirmationTimeout { tx_hash: String, timeout_ms: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The intent ledger refused the call with a recognised error.
    #[error("Rejected by intent ledger: {0}")]
    Rejected(LedgerError),

    /// The call reverted with a reason that does not map onto `LedgerError`.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SubmitError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::Transport(_))
    }

    /// State rejections mean the destination already reflects this event, or never will.
    pub fn is_stale(&self) -> bool {
        matches!(self, SubmitError::Rejected(err) if err.kind() == ErrorKind::State)
    }
}

impl From<LedgerError> for SubmitError {
    fn from(err: LedgerError) -> Self {
        SubmitError::Rejected(err)
    }
}
