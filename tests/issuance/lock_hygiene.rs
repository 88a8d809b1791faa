//! Lock hygiene: every grant is released, lapsed holders are harmless

use std::time::Duration;

use crate::common::*;

#[test]
fn test_every_grant_released() {
    for kind in [StrategyKind::SpinLock, StrategyKind::LeaseLock] {
        let harness = Harness::new(kind, 20);
        let requests: Vec<RequesterId> = distinct_requesters(40)
            .into_iter()
            .chain(distinct_requesters(10))
            .collect();
        let outcomes = harness.run(requests, 8);
        assert_eq!(outcomes.len(), 50);

        let stats = harness.lock_stats();
        assert_eq!(stats.acquired, 50, "{}", kind);
        assert_eq!(stats.released, stats.acquired, "{}", kind);
        assert_eq!(stats.stale_releases, 0, "{}", kind);
        assert_eq!(stats.outstanding(), 0, "{}", kind);
    }
}

#[test]
fn test_failed_acquisition_never_touches_stock() {
    let mut config = patient_config(StrategyKind::SpinLock);
    config.spin_lock.max_attempts = 3;
    let harness = Harness::with_config(config, 5);

    let held = harness
        .spin_locks
        .try_acquire(&stockade::lock_key(ITEM), Duration::from_secs(10))
        .unwrap()
        .unwrap();
    assert_eq!(
        harness.service.issue(RequesterId(1), ITEM).unwrap(),
        IssueOutcome::Unavailable(UnavailableReason::LockNotAcquired { attempts: 3 })
    );
    assert_eq!(harness.remaining(), 5);
    assert_eq!(harness.store.metrics().commits, 0);

    harness.spin_locks.release(&held).unwrap();
    assert!(harness.service.issue(RequesterId(1), ITEM).unwrap().is_issued());
}

#[test]
fn test_crashed_holder_lease_expires() {
    for kind in [StrategyKind::SpinLock, StrategyKind::LeaseLock] {
        let harness = Harness::new(kind, 5);
        let key = stockade::lock_key(ITEM);

        // A holder that dies without releasing
        let locks: &dyn LockProvider = match kind {
            StrategyKind::SpinLock => &*harness.spin_locks,
            _ => &*harness.queued_locks,
        };
        let crashed = locks
            .try_acquire(&key, Duration::from_millis(30))
            .unwrap()
            .unwrap();

        assert!(harness.service.issue(RequesterId(1), ITEM).unwrap().is_issued());

        // Its late release must not disturb anyone
        assert_eq!(
            locks.release(&crashed).unwrap(),
            stockade::ReleaseOutcome::NotHeld,
            "{}",
            kind
        );
        assert!(harness.service.issue(RequesterId(2), ITEM).unwrap().is_issued());
        assert_eq!(harness.lock_stats().expired_takeovers, 1, "{}", kind);
    }
}
