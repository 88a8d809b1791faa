//! Safety: never more units than stock, never negative stock

use crate::common::*;

#[test]
fn test_contended_requests_never_oversell() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 40);
        let outcomes = harness.run(distinct_requesters(160), 16);
        let tally = Tally::of(&outcomes);

        assert_eq!(tally.issued, 40, "{}", kind);
        assert_eq!(tally.out_of_stock, 120, "{}", kind);
        assert_eq!(harness.remaining(), 0, "{}", kind);
        assert_eq!(harness.store.issuance_count(ITEM).unwrap(), 40, "{}", kind);
    }
}

#[test]
fn test_fewer_requesters_than_stock() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 50);
        let tally = Tally::of(&harness.run(distinct_requesters(30), 8));

        assert_eq!(tally.issued, 30, "{}", kind);
        assert_eq!(tally.out_of_stock, 0, "{}", kind);
        assert_eq!(harness.remaining(), 20, "{}", kind);
        assert_eq!(harness.service.query_stock(ITEM).unwrap(), 20, "{}", kind);
    }
}

#[test]
fn test_remaining_reported_by_issue_is_consistent() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 25);
        let outcomes = harness.run(distinct_requesters(25), 5);

        // Each unit leaves a distinct remaining value: 24, 23, ..., 0
        let mut remaining: Vec<u64> = outcomes
            .iter()
            .filter_map(|o| match o {
                IssueOutcome::Issued { remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        remaining.sort_unstable();
        assert_eq!(remaining, (0..25).collect::<Vec<_>>(), "{}", kind);
    }
}

#[test]
fn test_zero_stock_issues_nothing() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 0);
        let tally = Tally::of(&harness.run(distinct_requesters(20), 4));
        assert_eq!(tally.out_of_stock, 20, "{}", kind);
        assert_eq!(harness.store.metrics().stock_writes, 0, "{}", kind);
    }
}
