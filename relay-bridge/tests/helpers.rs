//! Shared test helpers
//!
//! Builds in-process ledgers, a relay wired to them, and a scripted
//! destination client that injects failures and measures concurrency.

#![allow(dead_code)]

use async_trait::async_trait;
use intent_ledger::{
    milli_ether, Address, CallContext, IntentId, IntentLedger, ManualClock, Wei,
};
use relay_bridge::config::Config;
use relay_bridge::{
    IntentLedgerClient, LocalFulfillmentFeed, LocalIntentLedgerClient, RelayBridge, RelaySettings,
    RelayStats, RelayStatsSnapshot, SubmitError, TxReceipt,
};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const START: u64 = 1_700_000_000;
pub const AMOUNT: Wei = milli_ether(1_000);
pub const FEE: Wei = milli_ether(50);
pub const DEPOSIT: Wei = milli_ether(5);

pub const DUMMY_FULFILLMENT_CONTRACT_ADDR: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const DUMMY_INTENT_CONTRACT_ADDR: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";
pub const DUMMY_OPERATOR_ADDR: &str = "0x00000000000000000000000000000000000000aa";
pub const DUMMY_TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

pub fn operator() -> Address {
    Address::from_low_u64(0xaa)
}

pub fn creator() -> Address {
    Address::from_low_u64(0xbb)
}

pub fn filler() -> Address {
    Address::from_low_u64(0xcc)
}

pub fn recipient() -> Address {
    Address::from_low_u64(0xdd)
}

// ============================================================================
// CONFIG HELPERS
// ============================================================================

/// Config pointing both chains at the given RPC URL.
pub fn build_test_config_with_rpc(rpc_url: &str) -> Config {
    let mut config = Config::default();
    config.source_chain.rpc_url = rpc_url.to_string();
    config.destination_chain.rpc_url = rpc_url.to_string();
    config.source_chain.fulfillment_contract_addr = DUMMY_FULFILLMENT_CONTRACT_ADDR.to_string();
    config.destination_chain.intent_contract_addr = DUMMY_INTENT_CONTRACT_ADDR.to_string();
    config
}

/// Relay settings with short delays.
pub fn fast_settings() -> RelaySettings {
    RelaySettings {
        reconnect_delay: Duration::from_millis(50),
        max_submit_attempts: 3,
        retry_delay: Duration::from_millis(10),
        max_in_flight: 4,
        queue_capacity: 16,
        replay_missed_events: false,
    }
}

// ============================================================================
// LEDGER HARNESS
// ============================================================================

/// Both ledgers in-process, with creator and filler funded on each.
pub struct Harness {
    pub feed: Arc<LocalFulfillmentFeed>,
    pub ledger: Arc<Mutex<IntentLedger>>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new() -> Self {
        let mut ledger = IntentLedger::new(operator());
        ledger.accounts_mut().credit(creator(), milli_ether(100_000));
        ledger.accounts_mut().credit(filler(), milli_ether(100_000));
        ledger.accounts_mut().credit(operator(), milli_ether(100_000));

        let feed = LocalFulfillmentFeed::default();
        feed.credit(filler(), milli_ether(100_000)).await;

        Self {
            feed: Arc::new(feed),
            ledger: Arc::new(Mutex::new(ledger)),
            clock: Arc::new(ManualClock::new(START)),
        }
    }

    pub fn client(&self) -> Arc<LocalIntentLedgerClient> {
        Arc::new(LocalIntentLedgerClient::new(
            self.ledger.clone(),
            operator(),
            self.clock.clone(),
        ))
    }

    /// Creates and claims one intent, returning its id.
    pub async fn claimed_intent(&self) -> IntentId {
        let mut ledger = self.ledger.lock().await;
        let id = ledger
            .create_intent(
                &CallContext::new(creator(), START).with_value(FEE),
                recipient(),
                AMOUNT,
                FEE,
            )
            .unwrap();
        ledger
            .claim_intent(&CallContext::new(filler(), START).with_value(DEPOSIT), id)
            .unwrap();
        id
    }

    /// The filler pays the recipient on the source ledger.
    pub async fn fulfill(&self, intent_id: IntentId) {
        self.feed
            .fulfill_intent(
                &CallContext::new(filler(), START + 10).with_value(AMOUNT),
                intent_id,
                recipient(),
            )
            .await
            .unwrap();
    }

    pub async fn is_fulfilled(&self, intent_id: IntentId) -> bool {
        self.ledger
            .lock()
            .await
            .intent(intent_id)
            .map(|intent| intent.fulfilled)
            .unwrap_or(false)
    }
}

// ============================================================================
// RUNNING RELAY
// ============================================================================

/// A relay running on a background task.
pub struct RunningRelay {
    pub stats: Arc<RelayStats>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl RunningRelay {
    pub fn spawn(bridge: RelayBridge) -> Self {
        let stats = bridge.stats();
        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            bridge
                .run_until(async {
                    let _ = signal.await;
                })
                .await
        });
        Self {
            stats,
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

/// Polls `condition` every 10ms until it holds, panicking after 5 seconds.
pub async fn wait_until<F, Fut>(description: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition().await {
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting for: {}", description);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_subscribers(feed: &LocalFulfillmentFeed, count: usize) {
    wait_until("feed subscribers", move || async move {
        feed.subscriber_count().await >= count
    })
    .await;
}

/// Polls the relay counters every 10ms until `condition` holds, panicking after 5 seconds.
pub async fn wait_for_stats<F>(stats: &RelayStats, description: &str, condition: F)
where
    F: Fn(&RelayStatsSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition(&stats.snapshot()) {
        if tokio::time::Instant::now() > deadline {
            panic!(
                "Timed out waiting for: {} (stats: {:?})",
                description,
                stats.snapshot()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ============================================================================
// SCRIPTED DESTINATION CLIENT
// ============================================================================

/// Wraps a real client, failing with queued errors first and tracking concurrency.
pub struct ScriptedClient {
    inner: Arc<dyn IntentLedgerClient>,
    failures: std::sync::Mutex<VecDeque<SubmitError>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(inner: Arc<dyn IntentLedgerClient>) -> Self {
        Self {
            inner,
            failures: std::sync::Mutex::new(VecDeque::new()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_failures(self, failures: Vec<SubmitError>) -> Self {
        *self.failures.lock().unwrap() = failures.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentLedgerClient for ScriptedClient {
    async fn verify_fill(&self, intent_id: IntentId, amount: Wei) -> Result<TxReceipt, SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.failures.lock().unwrap().pop_front();
        let result = match scripted {
            Some(err) => Err(err),
            None => self.inner.verify_fill(intent_id, amount).await,
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
