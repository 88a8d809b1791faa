//! No lost updates: every issued unit is exactly one committed decrement

use crate::common::*;

#[test]
fn test_committed_writes_match_issued() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 300);
        let tally = Tally::of(&harness.run(distinct_requesters(200), 10));

        let row = harness.store.read_plain(ITEM).unwrap();
        let writes = harness.store.metrics().stock_writes;
        assert_eq!(tally.issued, 200, "{}", kind);
        assert_eq!(writes, tally.issued, "{}", kind);
        assert_eq!(row.version.as_u64(), tally.issued, "{}", kind);
        assert_eq!(row.remaining, 100, "{}", kind);
    }
}

#[test]
fn test_optimistic_conflicts_are_retried_not_lost() {
    let harness = Harness::new(StrategyKind::Optimistic, 500);
    let tally = Tally::of(&harness.run(distinct_requesters(400), 16));

    let store_metrics = harness.store.metrics();
    assert_eq!(tally.issued, 400);
    assert_eq!(store_metrics.stock_writes, 400);
    // Conflicting attempts were aborted, not applied
    assert_eq!(store_metrics.commits, 400);
    assert_eq!(harness.remaining(), 100);
}

#[test]
fn test_exhausted_optimistic_budget_applies_nothing() {
    let mut config = patient_config(StrategyKind::Optimistic);
    config.optimistic.max_attempts = 1;
    let harness = Harness::with_config(config, 1_000);
    let tally = Tally::of(&harness.run(distinct_requesters(300), 16));

    // Whatever gave up left no trace in the store
    assert_eq!(tally.issued + tally.unavailable, 300);
    assert_eq!(harness.store.metrics().stock_writes, tally.issued);
    assert_eq!(harness.remaining(), 1_000 - tally.issued);
    assert_eq!(
        harness.store.issuance_count(ITEM).unwrap() as u64,
        tally.issued
    );
}
