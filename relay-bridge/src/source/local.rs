//! In-process fulfillment feed
//!
//! Wraps a `FulfillmentLedger` and broadcasts each new record to live
//! subscribers. The feed can drop every subscription at once and refuse new
//! ones, which is how connection loss is simulated.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use intent_ledger::{Address, CallContext, FulfillmentLedger, FulfillmentRecord, IntentId, LedgerError, Wei};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use super::{FulfillmentSource, ObservedFulfillment, Subscription};
use crate::error::TransportError;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

pub struct LocalFulfillmentFeed {
    ledger: Mutex<FulfillmentLedger>,
    sender: Mutex<broadcast::Sender<ObservedFulfillment>>,
    available: AtomicBool,
    capacity: usize,
}

impl Default for LocalFulfillmentFeed {
    fn default() -> Self {
        Self::new(FulfillmentLedger::new())
    }
}

impl LocalFulfillmentFeed {
    pub fn new(ledger: FulfillmentLedger) -> Self {
        Self::with_capacity(ledger, DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may fall behind before it lags.
    pub fn with_capacity(ledger: FulfillmentLedger, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            ledger: Mutex::new(ledger),
            sender: Mutex::new(sender),
            available: AtomicBool::new(true),
            capacity,
        }
    }

    pub async fn credit(&self, account: Address, value: Wei) {
        self.ledger.lock().await.accounts_mut().credit(account, value);
    }

    pub async fn balance_of(&self, account: &Address) -> Wei {
        self.ledger.lock().await.accounts().balance_of(account)
    }

    pub async fn records(&self) -> Vec<FulfillmentRecord> {
        self.ledger.lock().await.records().to_vec()
    }

    /// Executes `fulfillIntent` and publishes the record to current subscribers.
    ///
    /// A record emitted while nobody is subscribed stays in the ledger log and is
    /// only delivered by a later subscription that resumes before it.
    pub async fn fulfill_intent(
        &self,
        ctx: &CallContext,
        intent_id: IntentId,
        recipient: Address,
    ) -> Result<FulfillmentRecord, LedgerError> {
        let mut ledger = self.ledger.lock().await;
        let record = ledger.fulfill_intent(ctx, intent_id, recipient)?;
        let observed = ObservedFulfillment {
            record: record.clone(),
            position: ledger.last_sequence(),
            tx_hash: None,
        };

        let delivered = self.sender.lock().await.send(observed).unwrap_or(0);
        debug!(
            "Published fulfillment for intent {} to {} subscriber(s)",
            intent_id, delivered
        );
        Ok(record)
    }

    /// Closes every open subscription.
    pub async fn disconnect_all(&self) {
        let (sender, _) = broadcast::channel(self.capacity);
        *self.sender.lock().await = sender;
        info!("Local fulfillment feed dropped all subscriptions");
    }

    /// While unavailable, `subscribe` fails as a refused connection would.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.sender.lock().await.receiver_count()
    }
}

#[async_trait]
impl FulfillmentSource for LocalFulfillmentFeed {
    async fn subscribe(&self, resume_after: Option<u64>) -> Result<Subscription, TransportError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TransportError::Request(
                "local fulfillment feed unavailable".to_string(),
            ));
        }

        // Snapshot and subscribe under the ledger lock so no record falls between them.
        let ledger = self.ledger.lock().await;
        let receiver = self.sender.lock().await.subscribe();
        let start_after = resume_after.unwrap_or_else(|| ledger.last_sequence());
        let backlog: Vec<Result<ObservedFulfillment, TransportError>> = match resume_after {
            Some(sequence) => ledger
                .records_after(sequence)
                .into_iter()
                .map(|(position, record)| {
                    Ok(ObservedFulfillment {
                        record,
                        position,
                        tx_hash: None,
                    })
                })
                .collect(),
            None => Vec::new(),
        };
        drop(ledger);

        let live = stream::unfold(Some(receiver), |receiver| async move {
            let mut receiver = receiver?;
            match receiver.recv().await {
                Ok(event) => Some((Ok(event), Some(receiver))),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    Some((Err(TransportError::Lagged(skipped)), None))
                }
                Err(broadcast::error::RecvError::Closed) => {
                    Some((Err(TransportError::SubscriptionClosed), None))
                }
            }
        });

        Ok(Subscription {
            start_after,
            events: stream::iter(backlog).chain(live).boxed(),
        })
    }
}
