//! Queued lease lock
//!
//! Each key owns a FIFO ticket queue guarded by a `parking_lot::Mutex` and a
//! `Condvar`. Blocking callers take a ticket and sleep until they are at the
//! head of the queue and the lock is free. A sleeper wakes on release, on
//! the current lease lapsing, or on its own wait deadline.
//!
//! # Fairness
//!
//! Grants follow ticket order among live waiters. A waiter that times out
//! leaves the queue and wakes the others so the next ticket can move up.
//! `try_acquire` never jumps the queue: it only succeeds when nobody waits.

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stockade_core::{LockError, LockHandle, LockProvider, LockResult, ReleaseOutcome};
use tracing::{debug, warn};

use crate::lease::{FencingCounter, Lease, LockCounters, LockStats};

#[derive(Debug, Default)]
struct QueueState {
    holder: Option<Lease>,
    next_ticket: u64,
    waiters: VecDeque<u64>,
}

impl QueueState {
    fn is_free_at(&self, now: Instant) -> bool {
        self.holder.map_or(true, |lease| !lease.is_live_at(now))
    }

    fn leave(&mut self, ticket: u64) {
        self.waiters.retain(|t| *t != ticket);
    }
}

#[derive(Debug, Default)]
struct KeyQueue {
    state: Mutex<QueueState>,
    changed: Condvar,
}

/// Lease lock with per-key FIFO wait queues
#[derive(Debug, Default)]
pub struct QueuedLockProvider {
    queues: DashMap<String, Arc<KeyQueue>>,
    fencing: FencingCounter,
    counters: LockCounters,
}

impl QueuedLockProvider {
    /// Create a provider with no keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Get lock hygiene counters
    pub fn stats(&self) -> LockStats {
        self.counters.snapshot()
    }

    /// Whether `key` is held by a live lease
    pub fn is_locked(&self, key: &str) -> bool {
        let now = Instant::now();
        self.queues
            .get(key)
            .map(|queue| !queue.state.lock().is_free_at(now))
            .unwrap_or(false)
    }

    /// Number of callers parked on `key`
    pub fn waiting(&self, key: &str) -> usize {
        self.queues
            .get(key)
            .map(|queue| queue.state.lock().waiters.len())
            .unwrap_or(0)
    }

    fn queue(&self, key: &str) -> Arc<KeyQueue> {
        if let Some(queue) = self.queues.get(key) {
            return Arc::clone(queue.value());
        }
        Arc::clone(
            self.queues
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(KeyQueue::default()))
                .value(),
        )
    }

    fn grant(
        &self,
        key: &str,
        state: &mut QueueState,
        now: Instant,
        lease: Duration,
    ) -> LockHandle {
        if state.holder.is_some() {
            self.counters.record_expired_takeover();
            debug!(target: "stockade::lock", key, "Lapsed lease taken over");
        }
        let granted = Lease::grant(self.fencing.next(), now, lease);
        state.holder = Some(granted);
        self.counters.record_acquired();
        granted.to_handle(key)
    }
}

impl LockProvider for QueuedLockProvider {
    fn try_acquire(&self, key: &str, lease: Duration) -> LockResult<Option<LockHandle>> {
        let queue = self.queue(key);
        let mut state = queue.state.lock();
        let now = Instant::now();
        if state.is_free_at(now) && state.waiters.is_empty() {
            return Ok(Some(self.grant(key, &mut state, now, lease)));
        }
        self.counters.record_contended();
        Ok(None)
    }

    fn acquire_blocking(
        &self,
        key: &str,
        wait_timeout: Duration,
        lease: Duration,
    ) -> LockResult<LockHandle> {
        let started = Instant::now();
        let deadline = started + wait_timeout;
        let queue = self.queue(key);
        let mut state = queue.state.lock();

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiters.push_back(ticket);

        loop {
            let now = Instant::now();
            if state.is_free_at(now) && state.waiters.front() == Some(&ticket) {
                state.waiters.pop_front();
                let handle = self.grant(key, &mut state, now, lease);
                // The next ticket must re-arm its timer against the new lease
                queue.changed.notify_all();
                return Ok(handle);
            }

            if now >= deadline {
                state.leave(ticket);
                queue.changed.notify_all();
                self.counters.record_timeout();
                debug!(
                    target: "stockade::lock",
                    key,
                    ticket,
                    waiting = state.waiters.len(),
                    "Lock wait timed out"
                );
                return Err(LockError::TimedOut {
                    key: key.to_string(),
                    waited: started.elapsed(),
                });
            }

            let wake_at = match state.holder {
                Some(lease) if lease.is_live_at(now) => lease.expires_at.min(deadline),
                _ => deadline,
            };
            queue.changed.wait_until(&mut state, wake_at);
        }
    }

    fn release(&self, handle: &LockHandle) -> LockResult<ReleaseOutcome> {
        let Some(queue) = self.queues.get(&handle.key).map(|q| Arc::clone(q.value())) else {
            self.counters.record_stale_release();
            warn!(
                target: "stockade::lock",
                key = %handle.key,
                "Release of a lock that was never granted"
            );
            return Ok(ReleaseOutcome::NotHeld);
        };

        let mut state = queue.state.lock();
        let now = Instant::now();
        let current = state.holder;
        match current {
            Some(lease) if lease.is_held_by(handle) => {
                state.holder = None;
                queue.changed.notify_all();
                if lease.is_live_at(now) {
                    self.counters.record_released();
                    return Ok(ReleaseOutcome::Released);
                }
            }
            _ => {}
        }
        drop(state);

        self.counters.record_stale_release();
        warn!(
            target: "stockade::lock",
            key = %handle.key,
            fencing_token = handle.fencing_token,
            "Release of a lock no longer held; lease expired"
        );
        Ok(ReleaseOutcome::NotHeld)
    }
}
