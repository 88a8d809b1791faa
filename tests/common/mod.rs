//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rand::seq::SliceRandom;
pub use stockade::{
    IssuanceService, IssueOutcome, ItemId, LockHandle, LockProvider, LockResult, LockStats,
    QueuedLockProvider, ReleaseOutcome, RequesterId, SetIfAbsentLockProvider, StockStore,
    StockadeConfig, StrategyKind, UnavailableReason,
};
use stockade::InMemoryStockStore;

/// The item every harness creates
pub const ITEM: ItemId = ItemId(1);

// ============================================================================
// Configuration
// ============================================================================

/// Config for `kind` with budgets generous enough that no request gives up
/// and delays short enough to keep the suite fast.
pub fn patient_config(kind: StrategyKind) -> StockadeConfig {
    let mut config = StockadeConfig::for_strategy(kind);
    config.optimistic.max_attempts = 100_000;
    config.optimistic.backoff_ms = 1;
    config.spin_lock.max_attempts = 100_000;
    config.spin_lock.retry_delay_ms = 1;
    config.lease_lock.wait_timeout_ms = 60_000;
    config.store.lock_timeout_ms = 60_000;
    config
}

// ============================================================================
// Harness
// ============================================================================

/// A service plus handles on everything behind it
pub struct Harness {
    pub service: Arc<IssuanceService>,
    pub store: Arc<InMemoryStockStore>,
    pub spin_locks: Arc<SetIfAbsentLockProvider>,
    pub queued_locks: Arc<QueuedLockProvider>,
    pub kind: StrategyKind,
}

impl Harness {
    /// Service for `kind` over a store holding `stock` units of [`ITEM`]
    pub fn new(kind: StrategyKind, stock: u64) -> Self {
        Self::with_config(patient_config(kind), stock)
    }

    /// Service built from `config` over a store holding `stock` units of [`ITEM`]
    pub fn with_config(config: StockadeConfig, stock: u64) -> Self {
        Self::with_lock_layer(config, stock, |locks| locks)
    }

    /// Like [`Harness::with_config`], with the service's lock provider
    /// wrapped by `layer`
    pub fn with_lock_layer<F>(config: StockadeConfig, stock: u64, layer: F) -> Self
    where
        F: FnOnce(Arc<dyn LockProvider>) -> Arc<dyn LockProvider>,
    {
        let kind = config.strategy_kind().unwrap();
        let store = Arc::new(InMemoryStockStore::with_lock_timeout(
            config.store.lock_timeout(),
        ));
        store.create_item(ITEM, stock).unwrap();

        let spin_locks = Arc::new(SetIfAbsentLockProvider::with_poll_interval(
            Duration::from_millis(1),
        ));
        let queued_locks = Arc::new(QueuedLockProvider::new());
        let locks: Arc<dyn LockProvider> = match kind {
            StrategyKind::SpinLock => spin_locks.clone(),
            _ => queued_locks.clone(),
        };

        let service =
            IssuanceService::from_config(&config, store.clone(), layer(locks)).unwrap();
        Self {
            service: Arc::new(service),
            store,
            spin_locks,
            queued_locks,
            kind,
        }
    }

    /// Lock counters of the provider the service uses
    pub fn lock_stats(&self) -> LockStats {
        match self.kind {
            StrategyKind::SpinLock => self.spin_locks.stats(),
            _ => self.queued_locks.stats(),
        }
    }

    /// Remaining stock of [`ITEM`]
    pub fn remaining(&self) -> u64 {
        self.store.read_plain(ITEM).unwrap().remaining
    }

    /// Issue every request in `requests` for [`ITEM`] from `threads`
    /// threads released together, in shuffled order.
    pub fn run(&self, requests: Vec<RequesterId>, threads: usize) -> Vec<IssueOutcome> {
        let mut requests = requests;
        requests.shuffle(&mut rand::thread_rng());
        let requests = Arc::new(requests);
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let service = Arc::clone(&self.service);
                let requests = Arc::clone(&requests);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    requests
                        .iter()
                        .skip(t)
                        .step_by(threads)
                        .map(|r| service.issue(*r, ITEM).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    }
}

/// `count` distinct requesters starting at 1
pub fn distinct_requesters(count: u64) -> Vec<RequesterId> {
    (1..=count).map(RequesterId).collect()
}

// ============================================================================
// Tally
// ============================================================================

/// Outcome counts of a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub issued: u64,
    pub out_of_stock: u64,
    pub already_issued: u64,
    pub unavailable: u64,
}

impl Tally {
    pub fn of(outcomes: &[IssueOutcome]) -> Self {
        let mut tally = Tally::default();
        for outcome in outcomes {
            match outcome {
                IssueOutcome::Issued { .. } => tally.issued += 1,
                IssueOutcome::OutOfStock => tally.out_of_stock += 1,
                IssueOutcome::AlreadyIssued => tally.already_issued += 1,
                IssueOutcome::Unavailable(_) => tally.unavailable += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> u64 {
        self.issued + self.out_of_stock + self.already_issued + self.unavailable
    }
}
