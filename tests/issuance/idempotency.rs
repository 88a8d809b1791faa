//! Idempotency: at most one unit per requester per item

use crate::common::*;

#[test]
fn test_repeat_request_is_already_issued() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 10);
        let service = &harness.service;

        assert!(service.issue(RequesterId(7), ITEM).unwrap().is_issued());
        assert_eq!(
            service.issue(RequesterId(7), ITEM).unwrap(),
            IssueOutcome::AlreadyIssued,
            "{}",
            kind
        );
        assert_eq!(harness.remaining(), 9, "{}", kind);
    }
}

#[test]
fn test_repeat_after_sellout_is_still_already_issued() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 1);
        let service = &harness.service;

        assert!(service.issue(RequesterId(1), ITEM).unwrap().is_issued());
        assert_eq!(
            service.issue(RequesterId(1), ITEM).unwrap(),
            IssueOutcome::AlreadyIssued,
            "{}",
            kind
        );
        assert_eq!(
            service.issue(RequesterId(2), ITEM).unwrap(),
            IssueOutcome::OutOfStock,
            "{}",
            kind
        );
    }
}

#[test]
fn test_same_requester_racing_itself() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 100);
        let requests = vec![RequesterId(42); 12];
        let tally = Tally::of(&harness.run(requests, 12));

        assert_eq!(tally.issued, 1, "{}", kind);
        assert_eq!(tally.already_issued, 11, "{}", kind);
        assert_eq!(harness.remaining(), 99, "{}", kind);
        assert_eq!(
            harness.store.issued_requesters(ITEM).unwrap(),
            vec![RequesterId(42)],
            "{}",
            kind
        );
    }
}

#[test]
fn test_issuance_is_per_item() {
    for kind in StrategyKind::ALL {
        let harness = Harness::new(kind, 5);
        harness.store.create_item(ItemId(2), 5).unwrap();
        let service = &harness.service;

        assert!(service.issue(RequesterId(1), ITEM).unwrap().is_issued());
        assert!(service.issue(RequesterId(1), ItemId(2)).unwrap().is_issued());
        assert_eq!(harness.store.issuance_count(ITEM).unwrap(), 1);
        assert_eq!(harness.store.issuance_count(ItemId(2)).unwrap(), 1);
    }
}
