//! Stock rows
//!
//! A row owns everything the store knows about one item: remaining stock,
//! row version, the uniqueness index of issued requesters, and the identity
//! of the transaction holding the row's exclusive lock (if any).
//!
//! The `parking_lot::Mutex` around [`RowState`] is a short latch taken for
//! individual reads and for commit validation. The exclusive row lock is a
//! logical lock recorded in `lock_holder`; waiters park on `unlocked`.

use parking_lot::{Condvar, Mutex, MutexGuard};
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant};
use stockade_core::{ItemId, RequesterId, StockItem, StoreError, StoreResult, TxnId, Version};

/// Mutable state of a row, guarded by the row latch
#[derive(Debug)]
pub(crate) struct RowState {
    pub(crate) remaining: u64,
    pub(crate) version: Version,
    pub(crate) issued: FxHashSet<RequesterId>,
    pub(crate) lock_holder: Option<TxnId>,
}

impl RowState {
    /// Whether a transaction other than `me` holds the exclusive lock
    #[inline]
    pub(crate) fn locked_by_other(&self, me: TxnId) -> bool {
        matches!(self.lock_holder, Some(holder) if holder != me)
    }
}

/// One stock row
#[derive(Debug)]
pub(crate) struct Row {
    pub(crate) id: ItemId,
    pub(crate) state: Mutex<RowState>,
    unlocked: Condvar,
}

impl Row {
    pub(crate) fn new(id: ItemId, remaining: u64) -> Self {
        Self {
            id,
            state: Mutex::new(RowState {
                remaining,
                version: Version::INITIAL,
                issued: FxHashSet::default(),
                lock_holder: None,
            }),
            unlocked: Condvar::new(),
        }
    }

    /// Snapshot the committed row
    pub(crate) fn snapshot(&self) -> StockItem {
        let state = self.state.lock();
        Self::snapshot_of(self.id, &state)
    }

    pub(crate) fn snapshot_of(id: ItemId, state: &RowState) -> StockItem {
        StockItem {
            id,
            remaining: state.remaining,
            version: state.version,
        }
    }

    /// Block until no other transaction holds the exclusive lock
    ///
    /// Returns the latch guard so the caller can act on the state it waited
    /// for. Gives up with `LockTimeout` once `timeout` has elapsed.
    pub(crate) fn wait_unlocked(
        &self,
        me: TxnId,
        timeout: Duration,
    ) -> StoreResult<MutexGuard<'_, RowState>> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut state = self.state.lock();
        while state.locked_by_other(me) {
            if self.unlocked.wait_until(&mut state, deadline).timed_out()
                && state.locked_by_other(me)
            {
                return Err(StoreError::LockTimeout {
                    item: self.id,
                    waited: started.elapsed(),
                });
            }
        }
        Ok(state)
    }

    /// Take the exclusive lock for `me`, waiting for the current holder
    pub(crate) fn lock_exclusive(&self, me: TxnId, timeout: Duration) -> StoreResult<StockItem> {
        let mut state = self.wait_unlocked(me, timeout)?;
        state.lock_holder = Some(me);
        Ok(Self::snapshot_of(self.id, &state))
    }

    /// Drop the exclusive lock if `me` holds it and wake waiters
    pub(crate) fn unlock(&self, me: TxnId) {
        let mut state = self.state.lock();
        if state.lock_holder == Some(me) {
            state.lock_holder = None;
            drop(state);
            self.unlocked.notify_all();
        }
    }

    /// Whether `me` currently holds the exclusive lock
    pub(crate) fn is_locked_by(&self, me: TxnId) -> bool {
        self.state.lock().lock_holder == Some(me)
    }
}
