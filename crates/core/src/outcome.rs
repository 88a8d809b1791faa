//! Issuance outcomes and strategy identifiers
//!
//! Every strategy answers `issue` with an [`IssueOutcome`]. Domain denials
//! and failure to obtain concurrency control are ordinary values here so
//! callers can tell "sold out" from "try again later" without inspecting
//! error strings.

use crate::decision::DenyReason;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Why concurrency control could not be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// Optimistic retries exhausted by repeated version conflicts
    RetriesExhausted {
        /// Attempts made before giving up
        attempts: u32,
    },
    /// Spin acquisition ran out of polling attempts
    LockNotAcquired {
        /// Polling attempts made
        attempts: u32,
    },
    /// Blocking acquisition hit its wait timeout
    LockWaitTimedOut {
        /// Time spent waiting
        waited: Duration,
    },
    /// The lease lapsed inside the critical section and another holder
    /// committed first; nothing was applied
    LeaseLost,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::RetriesExhausted { attempts } => {
                write!(f, "optimistic retries exhausted after {} attempts", attempts)
            }
            UnavailableReason::LockNotAcquired { attempts } => {
                write!(f, "lock not acquired after {} attempts", attempts)
            }
            UnavailableReason::LockWaitTimedOut { waited } => {
                write!(f, "lock wait timed out after {:?}", waited)
            }
            UnavailableReason::LeaseLost => write!(f, "lock lease lost before commit"),
        }
    }
}

/// Result of one `issue` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    /// One unit was issued and recorded
    Issued {
        /// Stock left after this issuance
        remaining: u64,
    },
    /// No units left
    OutOfStock,
    /// The requester already holds a unit of this item
    AlreadyIssued,
    /// Concurrency control could not be obtained; retry later
    Unavailable(UnavailableReason),
}

impl IssueOutcome {
    /// Whether a unit was issued
    pub fn is_issued(&self) -> bool {
        matches!(self, IssueOutcome::Issued { .. })
    }

    /// Whether the call failed to obtain concurrency control
    pub fn is_unavailable(&self) -> bool {
        matches!(self, IssueOutcome::Unavailable(_))
    }
}

impl From<DenyReason> for IssueOutcome {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::OutOfStock => IssueOutcome::OutOfStock,
            DenyReason::AlreadyIssued => IssueOutcome::AlreadyIssued,
        }
    }
}

impl fmt::Display for IssueOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueOutcome::Issued { remaining } => write!(f, "issued ({} remaining)", remaining),
            IssueOutcome::OutOfStock => write!(f, "out of stock"),
            IssueOutcome::AlreadyIssued => write!(f, "already issued"),
            IssueOutcome::Unavailable(reason) => write!(f, "unavailable: {}", reason),
        }
    }
}

/// The concurrency-control discipline a strategy implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Process-wide mutex per item
    Mutex,
    /// Versioned read, conditional write, bounded retry
    Optimistic,
    /// Exclusive row lock held for the transaction
    Pessimistic,
    /// Distributed lock taken by bounded polling
    SpinLock,
    /// Distributed lock taken by queued blocking wait with a lease
    LeaseLock,
}

impl StrategyKind {
    /// All strategy kinds, in declaration order
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Mutex,
        StrategyKind::Optimistic,
        StrategyKind::Pessimistic,
        StrategyKind::SpinLock,
        StrategyKind::LeaseLock,
    ];

    /// Config-file name of this strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Mutex => "mutex",
            StrategyKind::Optimistic => "optimistic",
            StrategyKind::Pessimistic => "pessimistic",
            StrategyKind::SpinLock => "spin-lock",
            StrategyKind::LeaseLock => "lease-lock",
        }
    }

    /// Whether the strategy stays correct across processes
    pub fn is_distributed(&self) -> bool {
        !matches!(self, StrategyKind::Mutex)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown strategy '{}'; expected one of mutex, optimistic, pessimistic, spin-lock, lease-lock",
                    s
                )
            })
    }
}
