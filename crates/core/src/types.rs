//! Core types for stock issuance
//!
//! This module defines the identifiers and records shared by every layer:
//! - ItemId: Identifier of a sellable item (one stock row per item)
//! - RequesterId: Identifier of a party asking for one unit
//! - Version: Row version used for optimistic concurrency
//! - StockItem: Snapshot of a stock row
//! - IssuanceRecord: Durable fact that a requester received a unit
//! - TxnId: Store transaction identifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a sellable item
///
/// Exactly one stock row exists per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Create an item id from its raw value
    pub const fn new(raw: u64) -> Self {
        ItemId(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        ItemId(raw)
    }
}

/// Identifier of a requester (the party receiving a unit of stock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequesterId(pub u64);

impl RequesterId {
    /// Create a requester id from its raw value
    pub const fn new(raw: u64) -> Self {
        RequesterId(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequesterId {
    fn from(raw: u64) -> Self {
        RequesterId(raw)
    }
}

/// Row version
///
/// Starts at zero when the item is created and is incremented by exactly
/// one on every committed mutation of the row.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Version(pub u64);

impl Version {
    /// Version assigned to a freshly created row
    pub const INITIAL: Version = Version(0);

    /// Raw numeric value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The version that follows this one
    pub const fn next(&self) -> Version {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Snapshot of a stock row
///
/// `remaining` is unsigned, so the non-negative invariant is carried by the
/// type; decrements are checked by [`crate::decision::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    /// Item this row belongs to
    pub id: ItemId,
    /// Units still available for issuance
    pub remaining: u64,
    /// Row version at the time of the read
    pub version: Version,
}

impl StockItem {
    /// Create a new stock row at the initial version
    pub fn new(id: ItemId, remaining: u64) -> Self {
        Self {
            id,
            remaining,
            version: Version::INITIAL,
        }
    }

    /// Whether no units are left
    pub fn is_sold_out(&self) -> bool {
        self.remaining == 0
    }
}

/// Durable fact that one requester received one unit of one item
///
/// At most one record exists per `(item_id, requester_id)` pair; the store
/// enforces this with a uniqueness check at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssuanceRecord {
    /// Item the unit was taken from
    pub item_id: ItemId,
    /// Requester that received the unit
    pub requester_id: RequesterId,
}

impl IssuanceRecord {
    /// Create a record for the given pair
    pub fn new(item_id: ItemId, requester_id: RequesterId) -> Self {
        Self {
            item_id,
            requester_id,
        }
    }
}

/// Store transaction identifier
///
/// Unique per store instance; used to tag row lock ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(pub u64);

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_next_is_monotonic() {
        let v = Version::INITIAL;
        assert_eq!(v.next(), Version(1));
        assert!(v.next() > v);
    }

    #[test]
    fn test_stock_item_new_starts_at_initial_version() {
        let item = StockItem::new(ItemId(1), 100);
        assert_eq!(item.version, Version::INITIAL);
        assert_eq!(item.remaining, 100);
        assert!(!item.is_sold_out());
    }

    #[test]
    fn test_sold_out() {
        let item = StockItem::new(ItemId(1), 0);
        assert!(item.is_sold_out());
    }

    #[test]
    fn test_display() {
        assert_eq!(ItemId(7).to_string(), "7");
        assert_eq!(RequesterId(42).to_string(), "42");
        assert_eq!(Version(3).to_string(), "v3");
        assert_eq!(TxnId(9).to_string(), "txn-9");
    }

    #[test]
    fn test_issuance_record_identity() {
        let a = IssuanceRecord::new(ItemId(1), RequesterId(5));
        let b = IssuanceRecord::new(ItemId(1), RequesterId(5));
        let c = IssuanceRecord::new(ItemId(2), RequesterId(5));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
