//! Flash-sale scenarios

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::common::*;

/// Holds every granted lock for `hold` before handing it back, so each
/// critical section outlasts a short wait timeout.
struct SlowCriticalSection {
    inner: Arc<dyn LockProvider>,
    hold: Duration,
}

impl LockProvider for SlowCriticalSection {
    fn try_acquire(&self, key: &str, lease: Duration) -> LockResult<Option<LockHandle>> {
        self.inner.try_acquire(key, lease)
    }

    fn acquire_blocking(
        &self,
        key: &str,
        wait_timeout: Duration,
        lease: Duration,
    ) -> LockResult<LockHandle> {
        let handle = self.inner.acquire_blocking(key, wait_timeout, lease)?;
        thread::sleep(self.hold);
        Ok(handle)
    }

    fn release(&self, handle: &LockHandle) -> LockResult<ReleaseOutcome> {
        self.inner.release(handle)
    }
}

/// Stock 100, 1000 distinct requesters
#[test]
fn test_scenario_sellout() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 100);
        let tally = Tally::of(&harness.run(distinct_requesters(1_000), 32));

        assert_eq!(
            tally,
            Tally {
                issued: 100,
                out_of_stock: 900,
                already_issued: 0,
                unavailable: 0,
            },
            "{}",
            kind
        );
        assert_eq!(harness.remaining(), 0, "{}", kind);

        let metrics = harness.service.metrics();
        assert_eq!(metrics.total, 1_000, "{}", kind);
        assert_eq!(metrics.issued, 100, "{}", kind);
    }
}

/// Stock 100, 150 requesters each asking twice at once
#[test]
fn test_scenario_double_submit() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 100);
        let requests: Vec<RequesterId> = distinct_requesters(150)
            .into_iter()
            .flat_map(|r| [r, r])
            .collect();
        let tally = Tally::of(&harness.run(requests, 24));

        assert_eq!(
            tally,
            Tally {
                issued: 100,
                out_of_stock: 100,
                already_issued: 100,
                unavailable: 0,
            },
            "{}",
            kind
        );
        assert_eq!(harness.store.issuance_count(ITEM).unwrap(), 100, "{}", kind);
    }
}

/// Lease lock whose wait timeout is shorter than one holder's turn, so
/// callers queued behind each other give up
#[test]
fn test_scenario_saturated_queue_reports_unavailable() {
    let mut config = patient_config(StrategyKind::LeaseLock);
    config.lease_lock.wait_timeout_ms = 5;
    let harness = Harness::with_lock_layer(config, 100, |inner| {
        Arc::new(SlowCriticalSection {
            inner,
            hold: Duration::from_millis(30),
        })
    });

    let outcomes = harness.run(distinct_requesters(64), 8);
    let tally = Tally::of(&outcomes);

    assert_eq!(tally.total(), 64);
    assert!(tally.issued >= 1);
    assert!(tally.unavailable >= 1, "{:?}", tally);
    assert_eq!(tally.out_of_stock, 0);
    assert_eq!(tally.already_issued, 0);
    assert!(outcomes.iter().all(|o| matches!(
        o,
        IssueOutcome::Issued { .. }
            | IssueOutcome::Unavailable(UnavailableReason::LockWaitTimedOut { .. })
    )));

    // Accounting among the callers that got through
    assert_eq!(harness.remaining(), 100 - tally.issued);
    assert_eq!(
        harness.store.issuance_count(ITEM).unwrap() as u64,
        tally.issued
    );
    let stats = harness.lock_stats();
    assert_eq!(stats.timeouts, tally.unavailable);
    assert_eq!(stats.outstanding(), 0);
    assert_eq!(harness.service.metrics().unavailable, tally.unavailable);
}

/// Lease lock with a short wait while the lock is held elsewhere
#[test]
fn test_scenario_external_holder_reports_unavailable() {
    let mut config = patient_config(StrategyKind::LeaseLock);
    config.lease_lock.wait_timeout_ms = 5;
    let harness = Harness::with_config(config, 50);
    let threads = 8;

    // Another process holds the item lock while the first wave arrives
    let held = harness
        .queued_locks
        .try_acquire(&stockade::lock_key(ITEM), Duration::from_secs(10))
        .unwrap()
        .unwrap();
    let first_wave = harness.run(distinct_requesters(threads as u64), threads);
    assert!(first_wave
        .iter()
        .all(|o| matches!(o, IssueOutcome::Unavailable(UnavailableReason::LockWaitTimedOut { .. }))));
    harness.queued_locks.release(&held).unwrap();

    let requests: Vec<RequesterId> = (100..300).map(RequesterId).collect();
    let tally = Tally::of(&harness.run(requests, threads));

    assert!(tally.issued <= 50);
    assert_eq!(tally.total(), 200);
    assert_eq!(tally.already_issued, 0);
    assert_eq!(harness.remaining(), 50 - tally.issued);
    assert_eq!(
        harness.store.issuance_count(ITEM).unwrap() as u64,
        tally.issued
    );
    assert!(harness.service.metrics().unavailable >= threads as u64);
}
