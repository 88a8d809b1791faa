//! Issuance service
//!
//! The inbound surface: `issue` and `query_stock`, delegated to the
//! configured strategy and counted.

use std::sync::Arc;
use stockade_concurrency::{
    IssueStrategy, LeaseLockStrategy, MutexStrategy, OptimisticStrategy, PessimisticStrategy,
    QueuedLockProvider, SetIfAbsentLockProvider, SpinLockStrategy,
};
use stockade_core::{
    IssuanceResult, IssueOutcome, ItemId, LockProvider, RequesterId, StockStore, StrategyKind,
};
use stockade_storage::InMemoryStockStore;
use tracing::{debug, info, warn};

use crate::config::StockadeConfig;
use crate::metrics::{IssuanceCounters, IssuanceMetrics};

/// Issues units of stock through one concurrency strategy
///
/// Cheap to share across threads behind an `Arc`; every method takes
/// `&self`.
///
/// # Example
/// ```text
/// let store = Arc::new(InMemoryStockStore::new());
/// store.create_item(ItemId(1), 100)?;
/// let service = IssuanceService::from_config(&config, store, locks)?;
/// match service.issue(RequesterId(7), ItemId(1))? {
///     IssueOutcome::Issued { remaining } => { /* ... */ }
///     other => { /* denied or unavailable */ }
/// }
/// ```
pub struct IssuanceService {
    strategy: Box<dyn IssueStrategy>,
    counters: IssuanceCounters,
}

impl IssuanceService {
    /// Wrap an already-built strategy
    pub fn new(strategy: Box<dyn IssueStrategy>) -> Self {
        Self {
            strategy,
            counters: IssuanceCounters::default(),
        }
    }

    /// Build the strategy named by `config` over `store` and `locks`
    ///
    /// `locks` is only consulted by the distributed strategies.
    ///
    /// # Errors
    ///
    /// Returns `IssuanceError::Config` if the config does not validate.
    pub fn from_config(
        config: &StockadeConfig,
        store: Arc<dyn StockStore>,
        locks: Arc<dyn LockProvider>,
    ) -> IssuanceResult<Self> {
        config.validate()?;
        let kind = config.strategy_kind()?;
        let strategy: Box<dyn IssueStrategy> = match kind {
            StrategyKind::Mutex => Box::new(MutexStrategy::new(store)),
            StrategyKind::Optimistic => Box::new(OptimisticStrategy::with_policy(
                store,
                config.optimistic.policy(),
            )),
            StrategyKind::Pessimistic => Box::new(PessimisticStrategy::new(store)),
            StrategyKind::SpinLock => Box::new(SpinLockStrategy::with_policy(
                store,
                locks,
                config.spin_lock.policy(),
            )),
            StrategyKind::LeaseLock => Box::new(LeaseLockStrategy::with_policy(
                store,
                locks,
                config.lease_lock.policy(),
            )),
        };
        info!(target: "stockade::service", strategy = %kind, "Issuance service ready");
        Ok(Self::new(strategy))
    }

    /// Build a service over a fresh in-memory store
    ///
    /// The store's row lock timeout comes from `[store]`. Spin-lock gets a
    /// set-if-absent lock table; every other strategy gets a queued one.
    /// The store is returned so the caller can create items.
    ///
    /// # Errors
    ///
    /// Returns `IssuanceError::Config` if the config does not validate.
    pub fn in_memory(config: &StockadeConfig) -> IssuanceResult<(Self, Arc<InMemoryStockStore>)> {
        let store = Arc::new(InMemoryStockStore::with_lock_timeout(
            config.store.lock_timeout(),
        ));
        let locks: Arc<dyn LockProvider> = match config.strategy_kind()? {
            StrategyKind::SpinLock => Arc::new(SetIfAbsentLockProvider::new()),
            _ => Arc::new(QueuedLockProvider::new()),
        };
        let service = Self::from_config(config, store.clone(), locks)?;
        Ok((service, store))
    }

    /// Issue at most one unit of `item` to `requester`
    ///
    /// # Errors
    ///
    /// Returns `IssuanceError` for store or lock faults. Denials and
    /// unavailability are `Ok` outcomes.
    pub fn issue(&self, requester: RequesterId, item: ItemId) -> IssuanceResult<IssueOutcome> {
        let result = self.strategy.issue(requester, item);
        self.counters.record(&result);
        match &result {
            Ok(outcome) => debug!(
                target: "stockade::service",
                %item,
                %requester,
                %outcome,
                "Issue request finished"
            ),
            Err(e) => warn!(
                target: "stockade::service",
                %item,
                %requester,
                error = %e,
                retryable = e.is_retryable(),
                "Issue request failed"
            ),
        }
        result
    }

    /// Current stock of `item`
    ///
    /// # Errors
    ///
    /// Returns `IssuanceError::Store` if the item has no row.
    pub fn query_stock(&self, item: ItemId) -> IssuanceResult<u64> {
        self.strategy.query_stock(item)
    }

    /// The active strategy
    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Snapshot of request counters
    pub fn metrics(&self) -> IssuanceMetrics {
        self.counters.snapshot()
    }
}

impl std::fmt::Debug for IssuanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuanceService")
            .field("strategy", &self.strategy.kind())
            .field("metrics", &self.metrics())
            .finish()
    }
}
