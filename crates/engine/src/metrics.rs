//! Issuance counters
//!
//! # Memory Ordering
//!
//! All counters use Relaxed ordering. They are observational: a snapshot
//! taken while requests are in flight may be momentarily inconsistent, but
//! once every caller has returned the totals add up.

use std::sync::atomic::{AtomicU64, Ordering};
use stockade_core::{IssuanceResult, IssueOutcome};

/// Live counters kept by the service
#[derive(Debug, Default)]
pub(crate) struct IssuanceCounters {
    total: AtomicU64,
    issued: AtomicU64,
    out_of_stock: AtomicU64,
    already_issued: AtomicU64,
    unavailable: AtomicU64,
    store_faults: AtomicU64,
}

impl IssuanceCounters {
    /// Count one finished `issue` call
    pub(crate) fn record(&self, result: &IssuanceResult<IssueOutcome>) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let counter = match result {
            Ok(IssueOutcome::Issued { .. }) => &self.issued,
            Ok(IssueOutcome::OutOfStock) => &self.out_of_stock,
            Ok(IssueOutcome::AlreadyIssued) => &self.already_issued,
            Ok(IssueOutcome::Unavailable(_)) => &self.unavailable,
            Err(_) => &self.store_faults,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> IssuanceMetrics {
        IssuanceMetrics {
            total: self.total.load(Ordering::Relaxed),
            issued: self.issued.load(Ordering::Relaxed),
            out_of_stock: self.out_of_stock.load(Ordering::Relaxed),
            already_issued: self.already_issued.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            store_faults: self.store_faults.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of issuance activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssuanceMetrics {
    /// `issue` calls completed
    pub total: u64,
    /// Units issued
    pub issued: u64,
    /// Denied: no stock left
    pub out_of_stock: u64,
    /// Denied: requester already holds a unit
    pub already_issued: u64,
    /// Concurrency control not obtained
    pub unavailable: u64,
    /// Calls that failed with a store or lock fault
    pub store_faults: u64,
}

impl IssuanceMetrics {
    /// Calls denied for a domain reason
    pub fn denied(&self) -> u64 {
        self.out_of_stock + self.already_issued
    }

    /// Fraction of calls that issued a unit
    pub fn issue_rate(&self) -> f64 {
        if self.total > 0 {
            self.issued as f64 / self.total as f64
        } else {
            0.0
        }
    }
}
