//! In-process mutex per item
//!
//! Correct only while every writer of the store lives in this process.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use stockade_core::{IssuanceResult, IssueOutcome, ItemId, RequesterId, StockStore, StrategyKind};

use super::{attempt, read_stock, IssueStrategy, ReadDiscipline};

/// Serializes issuance per item with a `parking_lot::Mutex`
pub struct MutexStrategy {
    store: Arc<dyn StockStore>,
    item_locks: DashMap<ItemId, Arc<Mutex<()>>>,
}

impl MutexStrategy {
    /// Create a strategy over `store`
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self {
            store,
            item_locks: DashMap::new(),
        }
    }

    fn item_lock(&self, item: ItemId) -> Arc<Mutex<()>> {
        Arc::clone(self.item_locks.entry(item).or_default().value())
    }
}

impl IssueStrategy for MutexStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Mutex
    }

    fn issue(&self, requester: RequesterId, item: ItemId) -> IssuanceResult<IssueOutcome> {
        let lock = self.item_lock(item);
        let _held = lock.lock();
        // Any conflict means a writer outside this process; surface it
        Ok(attempt(&*self.store, requester, item, ReadDiscipline::Versioned)?)
    }

    fn query_stock(&self, item: ItemId) -> IssuanceResult<u64> {
        Ok(read_stock(&*self.store, item, None)?)
    }
}
