//! Lease bookkeeping shared by the lock backends
//!
//! A lease records who holds a named lock, the fencing token of the grant,
//! and when it lapses. Lock hygiene counters live here too.
//!
//! # Memory Ordering
//!
//! The counters use Relaxed ordering: they are observational only.
//! The fencing counter uses SeqCst so tokens are totally ordered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use stockade_core::{HolderToken, LockHandle};

/// A live grant on a named lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lease {
    pub(crate) holder: HolderToken,
    pub(crate) fencing_token: u64,
    pub(crate) expires_at: Instant,
}

impl Lease {
    pub(crate) fn grant(fencing_token: u64, now: Instant, duration: Duration) -> Self {
        Self {
            holder: HolderToken::new(),
            fencing_token,
            expires_at: now + duration,
        }
    }

    #[inline]
    pub(crate) fn is_live_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Whether `handle` is this exact grant
    #[inline]
    pub(crate) fn is_held_by(&self, handle: &LockHandle) -> bool {
        self.holder == handle.holder && self.fencing_token == handle.fencing_token
    }

    pub(crate) fn to_handle(&self, key: &str) -> LockHandle {
        LockHandle {
            key: key.to_string(),
            holder: self.holder,
            fencing_token: self.fencing_token,
            expires_at: self.expires_at,
        }
    }
}

/// Source of fencing tokens, strictly increasing across all keys
#[derive(Debug, Default)]
pub(crate) struct FencingCounter(AtomicU64);

impl FencingCounter {
    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Lock hygiene counters - uses Relaxed ordering
#[derive(Debug, Default)]
pub(crate) struct LockCounters {
    acquired: AtomicU64,
    released: AtomicU64,
    stale_releases: AtomicU64,
    contended: AtomicU64,
    timeouts: AtomicU64,
    expired_takeovers: AtomicU64,
}

impl LockCounters {
    pub(crate) fn record_acquired(&self) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_release(&self) {
        self.stale_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_contended(&self) {
        self.contended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired_takeover(&self) {
        self.expired_takeovers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LockStats {
        LockStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            stale_releases: self.stale_releases.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            expired_takeovers: self.expired_takeovers.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of a lock provider's activity
///
/// In a run where no lease lapses, `acquired == released` once all callers
/// have finished. Every release that finds the grant gone is counted in
/// `stale_releases` instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStats {
    /// Grants handed out
    pub acquired: u64,
    /// Releases that freed a grant still held by the caller
    pub released: u64,
    /// Releases that found the grant already gone
    pub stale_releases: u64,
    /// Non-blocking probes that found the lock held
    pub contended: u64,
    /// Blocking acquisitions that hit their wait timeout
    pub timeouts: u64,
    /// Grants made over a lapsed lease
    pub expired_takeovers: u64,
}

impl LockStats {
    /// Grants neither released nor reported stale
    pub fn outstanding(&self) -> u64 {
        self.acquired
            .saturating_sub(self.released + self.stale_releases)
    }
}
