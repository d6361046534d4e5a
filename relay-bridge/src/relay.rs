//! Relay Bridge Module
//!
//! Carries fulfillment evidence from the source ledger to the intent ledger.
//!
//! ## Architecture
//!
//! 1. A supervisor loop owns the subscription. When the stream errors or ends it
//!    waits a fixed delay and opens a new one, indefinitely.
//! 2. Observed events go through a bounded queue to a dispatcher.
//! 3. The dispatcher runs one task per event, at most `max_in_flight` at a time.
//!    Each task submits `verifyFill` and classifies the outcome: transport
//!    failures are retried a bounded number of times, state rejections are
//!    dropped as stale, anything else is logged and dropped.
//!
//! A single event's failure never stops the relay.

use anyhow::Result;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{Config, RelaySettingsConfig};
use crate::destination::{EvmIntentLedgerClient, IntentLedgerClient};
use crate::source::{EvmFulfillmentSource, FulfillmentSource, ObservedFulfillment, Subscription};

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub reconnect_delay: Duration,
    pub max_submit_attempts: u32,
    pub retry_delay: Duration,
    pub max_in_flight: usize,
    pub queue_capacity: usize,
    pub replay_missed_events: bool,
}

impl RelaySettings {
    pub fn from_config(config: &RelaySettingsConfig) -> Self {
        Self {
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            max_submit_attempts: config.max_submit_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_in_flight: config.max_in_flight.max(1),
            queue_capacity: config.queue_capacity.max(1),
            replay_missed_events: config.replay_missed_events,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from_config(&RelaySettingsConfig::default())
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Relay counters, shared with the API.
#[derive(Debug, Default)]
pub struct RelayStats {
    subscriptions: AtomicU64,
    reconnects: AtomicU64,
    received: AtomicU64,
    verified: AtomicU64,
    dropped_stale: AtomicU64,
    rejected: AtomicU64,
    gave_up: AtomicU64,
    retries: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatsSnapshot {
    /// Subscriptions opened successfully
    pub subscriptions: u64,
    /// Subscriptions lost (stream error or end)
    pub reconnects: u64,
    /// Fulfillment events taken off the subscription
    pub received: u64,
    /// Events whose `verifyFill` was confirmed
    pub verified: u64,
    /// Events dropped because the intent ledger reported a state conflict
    pub dropped_stale: u64,
    /// Events dropped for any other non-retryable failure
    pub rejected: u64,
    /// Events dropped after exhausting transport retries
    pub gave_up: u64,
    /// Individual retry attempts
    pub retries: u64,
}

impl RelayStats {
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            subscriptions: self.subscriptions.load(Ordering::SeqCst),
            reconnects: self.reconnects.load(Ordering::SeqCst),
            received: self.received.load(Ordering::SeqCst),
            verified: self.verified.load(Ordering::SeqCst),
            dropped_stale: self.dropped_stale.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            gave_up: self.gave_up.load(Ordering::SeqCst),
            retries: self.retries.load(Ordering::SeqCst),
        }
    }

    /// Events that reached a terminal outcome.
    pub fn settled(&self) -> u64 {
        let s = self.snapshot();
        s.verified + s.dropped_stale + s.rejected + s.gave_up
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::SeqCst);
}

// ============================================================================
// RELAY BRIDGE
// ============================================================================

pub struct RelayBridge {
    source: Arc<dyn FulfillmentSource>,
    destination: Arc<dyn IntentLedgerClient>,
    settings: RelaySettings,
    stats: Arc<RelayStats>,
}

impl RelayBridge {
    pub fn new(
        source: Arc<dyn FulfillmentSource>,
        destination: Arc<dyn IntentLedgerClient>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            source,
            destination,
            settings,
            stats: Arc::new(RelayStats::default()),
        }
    }

    /// Builds a relay over the EVM transports described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = EvmFulfillmentSource::from_config(config)?;
        let destination = EvmIntentLedgerClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(source),
            Arc::new(destination),
            RelaySettings::from_config(&config.relay),
        ))
    }

    pub fn stats(&self) -> Arc<RelayStats> {
        self.stats.clone()
    }

    /// Runs the relay until the process is terminated.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the relay until `shutdown` resolves, then lets queued and in-flight
    /// events finish before returning.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting relay bridge: max_in_flight={}, max_submit_attempts={}, reconnect_delay={}ms, replay_missed_events={}",
            self.settings.max_in_flight,
            self.settings.max_submit_attempts,
            self.settings.reconnect_delay.as_millis(),
            self.settings.replay_missed_events
        );

        let (queue_tx, queue_rx) = mpsc::channel(self.settings.queue_capacity);
        let dispatcher = tokio::spawn(dispatch(
            queue_rx,
            self.destination.clone(),
            self.settings.clone(),
            self.stats.clone(),
        ));

        tokio::select! {
            _ = shutdown => info!("Shutdown requested, draining relay queue"),
            _ = self.supervise(queue_tx) => warn!("Relay dispatcher stopped accepting events"),
        }

        dispatcher
            .await
            .map_err(|e| anyhow::anyhow!("Relay dispatcher task failed: {}", e))?;
        info!("Relay bridge stopped after settling {} event(s)", self.stats.settled());
        Ok(())
    }

    /// Owns the subscription. Returns only if the dispatcher has gone away.
    async fn supervise(&self, queue: mpsc::Sender<ObservedFulfillment>) {
        let mut cursor: Option<u64> = None;

        loop {
            let resume_after = if self.settings.replay_missed_events {
                cursor
            } else {
                None
            };

            match self.source.subscribe(resume_after).await {
                Ok(Subscription {
                    start_after,
                    mut events,
                }) => {
                    bump(&self.stats.subscriptions);
                    info!("Subscribed to fulfillment events after position {}", start_after);
                    // Everything up to the starting position is either already
                    // seen or predates the relay.
                    cursor = Some(cursor.map_or(start_after, |c| c.max(start_after)));

                    while let Some(item) = events.next().await {
                        match item {
                            Ok(event) => {
                                cursor = Some(cursor.map_or(event.position, |c| c.max(event.position)));
                                bump(&self.stats.received);
                                if queue.send(event).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!("Fulfillment subscription lost: {}", e);
                                break;
                            }
                        }
                    }

                    bump(&self.stats.reconnects);
                    warn!(
                        "Fulfillment subscription closed, reconnecting in {}ms",
                        self.settings.reconnect_delay.as_millis()
                    );
                }
                Err(e) => {
                    warn!(
                        "Failed to subscribe to fulfillment events: {}. Retrying in {}ms",
                        e,
                        self.settings.reconnect_delay.as_millis()
                    );
                }
            }

            tokio::time::sleep(self.settings.reconnect_delay).await;
        }
    }
}

// ============================================================================
// DISPATCH
// ============================================================================

async fn dispatch(
    mut queue: mpsc::Receiver<ObservedFulfillment>,
    destination: Arc<dyn IntentLedgerClient>,
    settings: RelaySettings,
    stats: Arc<RelayStats>,
) {
    let permits = Arc::new(Semaphore::new(settings.max_in_flight));
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    error!("Relay task failed: {}", e);
                }
            }
            next = queue.recv() => {
                let Some(event) = next else { break };
                let Ok(permit) = permits.clone().acquire_owned().await else { break };
                let destination = destination.clone();
                let settings = settings.clone();
                let stats = stats.clone();
                tasks.spawn(async move {
                    relay_event(event, destination.as_ref(), &settings, &stats).await;
                    drop(permit);
                });
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Relay task failed: {}", e);
        }
    }
}

/// Submits one fulfillment and records its terminal outcome.
async fn relay_event(
    event: ObservedFulfillment,
    destination: &dyn IntentLedgerClient,
    settings: &RelaySettings,
    stats: &RelayStats,
) {
    let job_id = Uuid::new_v4();
    let record = &event.record;
    info!(
        "Relaying fulfillment: job_id={}, intent_id={}, filler={}, amount={}, source_tx={}",
        job_id,
        record.intent_id,
        record.filler,
        record.amount,
        event.tx_hash.as_deref().unwrap_or("-")
    );

    let mut attempt = 1;
    loop {
        match destination.verify_fill(record.intent_id, record.amount).await {
            Ok(receipt) => {
                bump(&stats.verified);
                info!(
                    "verifyFill confirmed: job_id={}, intent_id={}, tx_hash={}, gas_used={}",
                    job_id,
                    record.intent_id,
                    receipt.tx_hash,
                    receipt
                        .gas_used
                        .map(|gas| gas.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
                return;
            }
            Err(e) if e.is_retryable() && attempt < settings.max_submit_attempts => {
                bump(&stats.retries);
                warn!(
                    "verifyFill attempt {}/{} failed: job_id={}, intent_id={}: {}. Retrying in {}ms",
                    attempt,
                    settings.max_submit_attempts,
                    job_id,
                    record.intent_id,
                    e,
                    settings.retry_delay.as_millis()
                );
                attempt += 1;
                tokio::time::sleep(settings.retry_delay).await;
            }
            Err(e) if e.is_retryable() => {
                bump(&stats.gave_up);
                error!(
                    "Giving up on verifyFill after {} attempts: job_id={}, intent_id={}: {}",
                    attempt, job_id, record.intent_id, e
                );
                return;
            }
            Err(e) if e.is_stale() => {
                bump(&stats.dropped_stale);
                warn!(
                    "Dropping stale fulfillment: job_id={}, intent_id={}: {}",
                    job_id, record.intent_id, e
                );
                return;
            }
            Err(e) => {
                bump(&stats.rejected);
                error!(
                    "verifyFill rejected: job_id={}, intent_id={}: {}",
                    job_id, record.intent_id, e
                );
                return;
            }
        }
    }
}
