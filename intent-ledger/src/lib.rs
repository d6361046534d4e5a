//! Intent settlement ledgers
//!
//! `IntentLedger` runs on the destination chain and owns the intent lifecycle:
//! create, claim, verify, pay, close, and the owner's one-way disable.
//! `FulfillmentLedger` runs on the source chain and records fills for the relay.

pub mod accounts;
pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod fulfillment;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod types;

pub use accounts::Accounts;
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::CallContext;
pub use error::{AuthorizationError, ErrorKind, LedgerError, StateError, ValidationError};
pub use events::LedgerEvent;
pub use fulfillment::{FulfillmentLedger, FulfillmentRecord};
pub use instruction::{ExecutionReceipt, IntentInstruction, Outcome};
pub use processor::IntentLedger;
pub use state::{FillAmountPolicy, Intent, IntentStatus, LedgerParams};
pub use types::{milli_ether, Address, AddressParseError, IntentId, Timestamp, Wei, WEI_PER_ETHER};
