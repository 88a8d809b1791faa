//! Transactions over the in-memory stock store
//!
//! A transaction buffers stock writes and issuance records and applies them
//! at commit under the latches of every touched row, taken in item order.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Collect touched items, sort, dedup
//! 2. Latch each row in item order
//! 3. Validate: versioned writes still match and the row is not locked
//!    by another transaction; locked writes still hold the lock;
//!    issuance records are not already present
//! 4. IF any check fails: apply nothing, return the error
//! 5. Apply stock writes (version + 1) and insert issuance records
//! 6. Release latches, then release exclusive row locks
//! ```

use parking_lot::MutexGuard;
use smallvec::SmallVec;
use std::sync::Arc;
use stockade_core::{
    IssuanceRecord, ItemId, RequesterId, StockItem, StockTransaction, StoreError, StoreResult,
    TxnId, Version,
};
use tracing::{debug, trace};

use crate::memory::{InMemoryStockStore, StoreCounters};
use crate::row::{Row, RowState};

/// A buffered stock write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingWrite {
    /// Conditional on the row still being at `expected`
    Versioned { remaining: u64, expected: Version },
    /// Under the row's exclusive lock held by this transaction
    Locked { remaining: u64 },
}

impl PendingWrite {
    fn remaining(&self) -> u64 {
        match *self {
            PendingWrite::Versioned { remaining, .. } => remaining,
            PendingWrite::Locked { remaining } => remaining,
        }
    }
}

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Committed` (validation passed, writes applied)
/// - `Active` → `Aborted` (rollback, drop, or failed validation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction committed successfully
    Committed,
    /// Transaction was rolled back or failed validation
    Aborted,
}

/// Transaction handle returned by [`InMemoryStockStore`]
pub struct InMemoryTransaction<'a> {
    id: TxnId,
    store: &'a InMemoryStockStore,
    writes: SmallVec<[(ItemId, PendingWrite); 1]>,
    issuances: SmallVec<[IssuanceRecord; 1]>,
    locked: SmallVec<[Arc<Row>; 1]>,
    status: TransactionStatus,
}

impl<'a> InMemoryTransaction<'a> {
    pub(crate) fn new(id: TxnId, store: &'a InMemoryStockStore) -> Self {
        Self {
            id,
            store,
            writes: SmallVec::new(),
            issuances: SmallVec::new(),
            locked: SmallVec::new(),
            status: TransactionStatus::Active,
        }
    }

    /// Current lifecycle status
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    fn ensure_active(&self) -> StoreResult<()> {
        if self.status == TransactionStatus::Active {
            Ok(())
        } else {
            Err(StoreError::InvalidOperation(format!(
                "transaction {} is {:?}",
                self.id, self.status
            )))
        }
    }

    fn buffer_write(&mut self, item: ItemId, write: PendingWrite) {
        match self.writes.iter_mut().find(|(id, _)| *id == item) {
            Some(slot) => slot.1 = write,
            None => self.writes.push((item, write)),
        }
    }

    fn holds_lock(&self, item: ItemId) -> bool {
        self.locked.iter().any(|row| row.id == item)
    }

    /// Validate every pending write under the row latches and apply them
    fn validate_and_apply(&self) -> StoreResult<()> {
        if self.writes.is_empty() && self.issuances.is_empty() {
            return Ok(());
        }

        let mut items: SmallVec<[ItemId; 2]> = self
            .writes
            .iter()
            .map(|(item, _)| *item)
            .chain(self.issuances.iter().map(|record| record.item_id))
            .collect();
        items.sort_unstable();
        items.dedup();

        let rows = items
            .iter()
            .map(|item| self.store.row(*item))
            .collect::<StoreResult<SmallVec<[Arc<Row>; 2]>>>()?;
        // Latches are always taken in item order
        let mut guards: SmallVec<[MutexGuard<'_, RowState>; 2]> =
            rows.iter().map(|row| row.state.lock()).collect();
        let slot = |item: &ItemId| items.binary_search(item).unwrap_or_default();

        for (item, write) in &self.writes {
            let state = &guards[slot(item)];
            match *write {
                PendingWrite::Versioned { expected, .. } => {
                    if state.version != expected || state.locked_by_other(self.id) {
                        StoreCounters::bump(&self.store.counters.conflicts);
                        return Err(StoreError::Conflict {
                            item: *item,
                            expected,
                            actual: state.version,
                        });
                    }
                }
                PendingWrite::Locked { .. } => {
                    if state.lock_holder != Some(self.id) {
                        return Err(StoreError::NotLocked(*item));
                    }
                }
            }
        }

        for record in &self.issuances {
            if guards[slot(&record.item_id)]
                .issued
                .contains(&record.requester_id)
            {
                StoreCounters::bump(&self.store.counters.duplicates);
                return Err(StoreError::DuplicateIssuance {
                    item: record.item_id,
                    requester: record.requester_id,
                });
            }
        }

        for (item, write) in &self.writes {
            let state = &mut guards[slot(item)];
            state.remaining = write.remaining();
            state.version = state.version.next();
            StoreCounters::bump(&self.store.counters.stock_writes);
        }
        for record in &self.issuances {
            guards[slot(&record.item_id)]
                .issued
                .insert(record.requester_id);
        }

        Ok(())
    }

    fn release_locks(&mut self) {
        for row in self.locked.drain(..) {
            row.unlock(self.id);
        }
    }

    fn finish(&mut self, status: TransactionStatus) {
        self.release_locks();
        self.writes.clear();
        self.issuances.clear();
        self.status = status;
        match status {
            TransactionStatus::Committed => StoreCounters::bump(&self.store.counters.commits),
            TransactionStatus::Aborted => StoreCounters::bump(&self.store.counters.aborts),
            TransactionStatus::Active => {}
        }
    }
}

impl StockTransaction for InMemoryTransaction<'_> {
    fn id(&self) -> TxnId {
        self.id
    }

    fn read_plain(&mut self, item: ItemId) -> StoreResult<StockItem> {
        self.ensure_active()?;
        Ok(self.store.row(item)?.snapshot())
    }

    fn read_for_versioned_update(&mut self, item: ItemId) -> StoreResult<StockItem> {
        self.ensure_active()?;
        let row = self.store.row(item)?;
        let state = row
            .wait_unlocked(self.id, self.store.lock_timeout())
            .map_err(|e| {
                StoreCounters::bump(&self.store.counters.lock_timeouts);
                e
            })?;
        Ok(Row::snapshot_of(item, &state))
    }

    fn write_if_version_matches(
        &mut self,
        item: ItemId,
        new_remaining: u64,
        expected: Version,
    ) -> StoreResult<()> {
        self.ensure_active()?;
        let current = self.store.row(item)?.snapshot();
        if current.version != expected {
            StoreCounters::bump(&self.store.counters.conflicts);
            trace!(
                target: "stockade::store",
                txn = %self.id, %item, %expected, actual = %current.version,
                "Version conflict on conditional write"
            );
            return Err(StoreError::Conflict {
                item,
                expected,
                actual: current.version,
            });
        }
        self.buffer_write(
            item,
            PendingWrite::Versioned {
                remaining: new_remaining,
                expected,
            },
        );
        Ok(())
    }

    fn read_for_exclusive_update(&mut self, item: ItemId) -> StoreResult<StockItem> {
        self.ensure_active()?;
        let row = self.store.row(item)?;
        let snapshot = row
            .lock_exclusive(self.id, self.store.lock_timeout())
            .map_err(|e| {
                StoreCounters::bump(&self.store.counters.lock_timeouts);
                debug!(target: "stockade::store", txn = %self.id, %item, error = %e, "Row lock wait failed");
                e
            })?;
        if !self.holds_lock(item) {
            self.locked.push(row);
        }
        Ok(snapshot)
    }

    fn write(&mut self, item: ItemId, new_remaining: u64) -> StoreResult<()> {
        self.ensure_active()?;
        let held = self
            .locked
            .iter()
            .any(|row| row.id == item && row.is_locked_by(self.id));
        if !held {
            return Err(StoreError::NotLocked(item));
        }
        self.buffer_write(
            item,
            PendingWrite::Locked {
                remaining: new_remaining,
            },
        );
        Ok(())
    }

    fn record_issuance(&mut self, item: ItemId, requester: RequesterId) -> StoreResult<()> {
        self.ensure_active()?;
        let record = IssuanceRecord::new(item, requester);
        let pending = self.issuances.contains(&record);
        if pending || self.store.row(item)?.state.lock().issued.contains(&requester) {
            StoreCounters::bump(&self.store.counters.duplicates);
            return Err(StoreError::DuplicateIssuance { item, requester });
        }
        self.issuances.push(record);
        Ok(())
    }

    fn is_issued(&mut self, item: ItemId, requester: RequesterId) -> StoreResult<bool> {
        self.ensure_active()?;
        let row = self.store.row(item)?;
        let issued = row.state.lock().issued.contains(&requester);
        Ok(issued)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.ensure_active()?;
        match self.validate_and_apply() {
            Ok(()) => {
                trace!(target: "stockade::store", txn = %self.id, "Transaction committed");
                self.finish(TransactionStatus::Committed);
                Ok(())
            }
            Err(e) => {
                debug!(target: "stockade::store", txn = %self.id, error = %e, "Commit validation failed");
                self.finish(TransactionStatus::Aborted);
                Err(e)
            }
        }
    }

    fn rollback(mut self: Box<Self>) {
        if self.status == TransactionStatus::Active {
            self.finish(TransactionStatus::Aborted);
        }
    }
}

impl Drop for InMemoryTransaction<'_> {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Active {
            self.finish(TransactionStatus::Aborted);
        }
    }
}
