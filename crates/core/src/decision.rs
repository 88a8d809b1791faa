//! Pure issuance decision
//!
//! Given the current stock of an item and whether the requester already
//! holds a unit, decide whether one more unit may be issued. No I/O and no
//! shared state: every concurrency strategy wraps this same function.

use crate::types::RequesterId;
use serde::{Deserialize, Serialize};

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenyReason {
    /// No units left
    OutOfStock,
    /// The requester already holds a unit of this item
    AlreadyIssued,
}

/// Outcome of [`decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Issue one unit; the row must be written with `new_stock`
    Allow {
        /// Remaining stock after this issuance
        new_stock: u64,
    },
    /// Do not touch the row
    Deny(DenyReason),
}

impl Decision {
    /// Whether the decision grants a unit
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Decide whether `requester` may take one unit out of `current_stock`
///
/// A repeat requester is told `AlreadyIssued` even when stock has since run
/// out. The outcome depends only on `current_stock` and `already_issued`.
pub fn decide(current_stock: u64, _requester: RequesterId, already_issued: bool) -> Decision {
    if already_issued {
        return Decision::Deny(DenyReason::AlreadyIssued);
    }
    match current_stock.checked_sub(1) {
        Some(new_stock) => Decision::Allow { new_stock },
        None => Decision::Deny(DenyReason::OutOfStock),
    }
}
