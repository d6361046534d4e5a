//! Relay Bridge Service Library
//!
//! Watches the fulfillment ledger on the source chain for `IntentFulfilled`
//! records and submits `verifyFill` to the intent ledger on the destination
//! chain, surviving transport failures without duplicating settlement effects.

pub mod api;
pub mod config;
pub mod destination;
pub mod error;
pub mod evm_client;
pub mod relay;
pub mod source;

// Re-export commonly used types
pub use api::{ApiResponse, ApiServer};
pub use config::{ApiConfig, Config, DestinationChainConfig, RelaySettingsConfig, SourceChainConfig};
pub use destination::{EvmIntentLedgerClient, IntentLedgerClient, LocalIntentLedgerClient, TxReceipt};
pub use error::{SubmitError, TransportError};
pub use relay::{RelayBridge, RelaySettings, RelayStats, RelayStatsSnapshot};
pub use source::{
    EvmFulfillmentSource, FulfillmentSource, FulfillmentStream, LocalFulfillmentFeed,
    ObservedFulfillment, Subscription,
};
