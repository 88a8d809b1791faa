//! Set-if-absent lease lock
//!
//! Models a key-value lock service with `SET key token NX PX lease`
//! semantics: a lock is a key whose value names the holder and which
//! disappears when its lease lapses. There is no wait queue; blocking
//! acquisition polls at a fixed interval until the wait timeout.
//!
//! Polling is unfair: a late arrival can win over a caller that has been
//! polling for a long time, and under heavy load some callers may starve.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::thread;
use std::time::{Duration, Instant};
use stockade_core::{LockError, LockHandle, LockProvider, LockResult, ReleaseOutcome};
use tracing::{trace, warn};

use crate::lease::{FencingCounter, Lease, LockCounters, LockStats};

/// Default interval between probes in [`LockProvider::acquire_blocking`]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Lease table with set-if-absent acquisition
#[derive(Debug)]
pub struct SetIfAbsentLockProvider {
    leases: DashMap<String, Lease>,
    fencing: FencingCounter,
    poll_interval: Duration,
    counters: LockCounters,
}

impl SetIfAbsentLockProvider {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Create an empty lock table polling at `poll_interval` when blocking
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            leases: DashMap::new(),
            fencing: FencingCounter::default(),
            poll_interval,
            counters: LockCounters::default(),
        }
    }

    /// Get lock hygiene counters
    pub fn stats(&self) -> LockStats {
        self.counters.snapshot()
    }

    /// Whether `key` is held by a live lease
    pub fn is_locked(&self, key: &str) -> bool {
        let now = Instant::now();
        self.leases
            .get(key)
            .map(|lease| lease.is_live_at(now))
            .unwrap_or(false)
    }
}

impl Default for SetIfAbsentLockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LockProvider for SetIfAbsentLockProvider {
    fn try_acquire(&self, key: &str, lease: Duration) -> LockResult<Option<LockHandle>> {
        let now = Instant::now();
        match self.leases.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().is_live_at(now) {
                    self.counters.record_contended();
                    return Ok(None);
                }
                let granted = Lease::grant(self.fencing.next(), now, lease);
                trace!(
                    target: "stockade::lock",
                    key,
                    previous = slot.get().fencing_token,
                    fencing_token = granted.fencing_token,
                    "Lapsed lease taken over"
                );
                slot.insert(granted);
                self.counters.record_expired_takeover();
                self.counters.record_acquired();
                Ok(Some(granted.to_handle(key)))
            }
            Entry::Vacant(slot) => {
                let granted = Lease::grant(self.fencing.next(), now, lease);
                slot.insert(granted);
                self.counters.record_acquired();
                Ok(Some(granted.to_handle(key)))
            }
        }
    }

    fn acquire_blocking(
        &self,
        key: &str,
        wait_timeout: Duration,
        lease: Duration,
    ) -> LockResult<LockHandle> {
        let started = Instant::now();
        let deadline = started + wait_timeout;
        loop {
            if let Some(handle) = self.try_acquire(key, lease)? {
                return Ok(handle);
            }
            let now = Instant::now();
            if now >= deadline {
                self.counters.record_timeout();
                return Err(LockError::TimedOut {
                    key: key.to_string(),
                    waited: started.elapsed(),
                });
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    fn release(&self, handle: &LockHandle) -> LockResult<ReleaseOutcome> {
        let now = Instant::now();
        let removed = self
            .leases
            .remove_if(&handle.key, |_, lease| {
                lease.is_held_by(handle) && lease.is_live_at(now)
            })
            .is_some();
        if removed {
            self.counters.record_released();
            return Ok(ReleaseOutcome::Released);
        }

        // Our lease lapsed. Drop the stale entry only if nobody re-took it.
        self.leases
            .remove_if(&handle.key, |_, lease| lease.is_held_by(handle));
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
