//! Fulfillment sources
//!
//! A source turns the fulfillment ledger's record log into a subscription
//! stream. The stream ends, or yields an error, when the underlying connection
//! is lost; the relay supervisor then opens a new one.

use async_trait::async_trait;
use futures::stream::BoxStream;
use intent_ledger::FulfillmentRecord;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

pub mod evm;
pub mod local;

pub use evm::EvmFulfillmentSource;
pub use local::LocalFulfillmentFeed;

/// A fulfillment record as seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedFulfillment {
    pub record: FulfillmentRecord,
    /// Monotonic position in the source log: block number on EVM, record sequence in-process.
    pub position: u64,
    /// Source transaction, when the transport reports one.
    pub tx_hash: Option<String>,
}

pub type FulfillmentStream = BoxStream<'static, Result<ObservedFulfillment, TransportError>>;

/// An open subscription.
pub struct Subscription {
    /// Position the stream starts strictly after. Every later record is
    /// delivered unless the stream fails first.
    pub start_after: u64,
    pub events: FulfillmentStream,
}

#[async_trait]
pub trait FulfillmentSource: Send + Sync {
    /// Opens a subscription.
    ///
    /// With `resume_after = None` the stream starts at the live head. With
    /// `Some(position)` it first yields every record after `position`.
    async fn subscribe(&self, resume_after: Option<u64>) -> Result<Subscription, TransportError>;
}
