//! In-memory stock store
//!
//! Rows live in a DashMap keyed by item, so transactions on different items
//! never contend on the map itself; each row carries its own latch.
//!
//! # Design
//!
//! - DashMap<ItemId, Arc<Row>>: sharded lookups, rows shared with open
//!   transactions through `Arc`
//! - Row latch (`parking_lot::Mutex`): guards remaining stock, version, the
//!   issued-requester index and the exclusive lock holder
//! - Exclusive row lock: logical, owned by a `TxnId`, waiters park on the
//!   row's condition variable and give up after `lock_timeout`
//!
//! # Memory Ordering
//!
//! The metric counters use Relaxed ordering: they are observational only
//! and do not synchronize any other memory operations.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stockade_core::{
    ItemId, RequesterId, StockItem, StockStore, StockTransaction, StoreError, StoreResult, TxnId,
};
use tracing::debug;

use crate::row::Row;
use crate::transaction::InMemoryTransaction;

/// Default bound on waiting for a row's exclusive lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Counters kept by the store - uses Relaxed ordering
#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    pub(crate) commits: AtomicU64,
    pub(crate) aborts: AtomicU64,
    pub(crate) stock_writes: AtomicU64,
    pub(crate) conflicts: AtomicU64,
    pub(crate) duplicates: AtomicU64,
    pub(crate) lock_timeouts: AtomicU64,
}

impl StoreCounters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of store activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    /// Transactions committed
    pub commits: u64,
    /// Transactions rolled back or failed validation
    pub aborts: u64,
    /// Committed stock writes (each moved a row to its next version)
    pub stock_writes: u64,
    /// Version conflicts reported (eagerly or at commit)
    pub conflicts: u64,
    /// Duplicate issuance records rejected
    pub duplicates: u64,
    /// Exclusive-lock waits that timed out
    pub lock_timeouts: u64,
}

/// Transactional in-memory implementation of [`StockStore`]
///
/// # Example
/// ```text
/// let store = InMemoryStockStore::new();
/// store.create_item(ItemId(1), 100)?;
/// let row = store.read_plain(ItemId(1))?;
/// ```
#[derive(Debug)]
pub struct InMemoryStockStore {
    rows: DashMap<ItemId, Arc<Row>>,
    next_txn_id: AtomicU64,
    lock_timeout: Duration,
    pub(crate) counters: StoreCounters,
}

impl InMemoryStockStore {
    /// Create an empty store with the default lock timeout
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty store with a custom bound on row-lock waits
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            rows: DashMap::new(),
            next_txn_id: AtomicU64::new(1),
            lock_timeout,
            counters: StoreCounters::default(),
        }
    }

    /// Bound on waiting for a row's exclusive lock
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Number of items with a stock row
    pub fn item_count(&self) -> usize {
        self.rows.len()
    }

    /// Requesters holding a unit of `item`, sorted
    pub fn issued_requesters(&self, item: ItemId) -> StoreResult<Vec<RequesterId>> {
        let row = self.row(item)?;
        let state = row.state.lock();
        let mut requesters: Vec<RequesterId> = state.issued.iter().copied().collect();
        drop(state);
        requesters.sort_unstable();
        Ok(requesters)
    }

    /// Get store metrics
    pub fn metrics(&self) -> StoreMetrics {
        let c = &self.counters;
        StoreMetrics {
            commits: c.commits.load(Ordering::Relaxed),
            aborts: c.aborts.load(Ordering::Relaxed),
            stock_writes: c.stock_writes.load(Ordering::Relaxed),
            conflicts: c.conflicts.load(Ordering::Relaxed),
            duplicates: c.duplicates.load(Ordering::Relaxed),
            lock_timeouts: c.lock_timeouts.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn row(&self, item: ItemId) -> StoreResult<Arc<Row>> {
        self.rows
            .get(&item)
            .map(|row| Arc::clone(row.value()))
            .ok_or(StoreError::ItemNotFound(item))
    }

    pub(crate) fn allocate_txn_id(&self) -> TxnId {
        TxnId(self.next_txn_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for InMemoryStockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StockStore for InMemoryStockStore {
    fn create_item(&self, item: ItemId, initial_stock: u64) -> StoreResult<StockItem> {
        match self.rows.entry(item) {
            Entry::Occupied(_) => Err(StoreError::ItemExists(item)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Row::new(item, initial_stock)));
                debug!(target: "stockade::store", %item, initial_stock, "Stock row created");
                Ok(StockItem::new(item, initial_stock))
            }
        }
    }

    fn begin(&self) -> Box<dyn StockTransaction + '_> {
        Box::new(InMemoryTransaction::new(self.allocate_txn_id(), self))
    }

    fn read_plain(&self, item: ItemId) -> StoreResult<StockItem> {
        Ok(self.row(item)?.snapshot())
    }

    fn is_issued(&self, item: ItemId, requester: RequesterId) -> StoreResult<bool> {
        let row = self.row(item)?;
        let issued = row.state.lock().issued.contains(&requester);
        Ok(issued)
    }

    fn issuance_count(&self, item: ItemId) -> StoreResult<usize> {
        let row = self.row(item)?;
        let count = row.state.lock().issued.len();
        Ok(count)
    }
}
