//! Pessimistic issuance: exclusive row lock for the whole transaction

use std::sync::Arc;
use stockade_core::{IssuanceResult, IssueOutcome, ItemId, RequesterId, StockStore, StrategyKind};

use super::{attempt, read_stock, IssueStrategy, ReadDiscipline};

/// Locks the stock row, decides, writes, commits
///
/// Waiters queue on the row lock inside the store. A wait longer than the
/// store's lock timeout is a store fault, not an outcome.
pub struct PessimisticStrategy {
    store: Arc<dyn StockStore>,
}

impl PessimisticStrategy {
    /// Create a strategy over `store`
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }
}

impl IssueStrategy for PessimisticStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Pessimistic
    }

    fn issue(&self, requester: RequesterId, item: ItemId) -> IssuanceResult<IssueOutcome> {
        Ok(attempt(&*self.store, requester, item, ReadDiscipline::Exclusive)?)
    }

    fn query_stock(&self, item: ItemId) -> IssuanceResult<u64> {
        Ok(read_stock(&*self.store, item, Some(ReadDiscipline::Exclusive))?)
    }
}
