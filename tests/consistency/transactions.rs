//! Transaction lifecycle and conflict detection.

use crate::*;

// =============================================================================
// COMMIT
// =============================================================================

#[test]
fn test_uncontended_commit_applies() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("dev-1")).unwrap();
        assert_eq!(txn.status(), TransactionStatus::Open);
        txn.put_if_absent(key("dev-1"), Some(device("dev-1", 3))).unwrap();
        assert!(txn.commit().unwrap());
        assert_eq!(txn.status(), TransactionStatus::Committed);
        assert_eq!(
            cache.get(&key("dev-1")).unwrap(),
            CacheLookup::Present(device("dev-1", 3))
        );
    });
}

#[test]
fn test_commit_can_cache_empty() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("gone")).unwrap();
        txn.put_if_absent(key("gone"), None).unwrap();
        assert!(txn.commit().unwrap());
        assert_eq!(cache.get(&key("gone")).unwrap(), CacheLookup::Empty);
    });
}

#[test]
fn test_commit_with_nothing_buffered() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("k")).unwrap();
        assert!(txn.commit().unwrap());
        assert_eq!(cache.get(&key("k")).unwrap(), CacheLookup::Absent);
    });
}

#[test]
fn test_multi_key_commit() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let keys = [key("a"), key("b")];
        let mut txn = cache.new_transaction_for_keys(&keys).unwrap();
        txn.put_if_absent(key("a"), Some(device("a", 1))).unwrap();
        txn.put_if_absent(key("b"), Some(device("b", 1))).unwrap();
        assert!(txn.commit().unwrap());
        assert!(cache.get(&key("a")).unwrap().is_cached());
        assert!(cache.get(&key("b")).unwrap().is_cached());
    });
}

// =============================================================================
// CONFLICTS
// =============================================================================

#[test]
fn test_concurrent_put_aborts_transaction() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("dev-1")).unwrap();
        txn.put_if_absent(key("dev-1"), Some(device("dev-1", 1))).unwrap();

        cache.put(key("dev-1"), Some(device("dev-1", 2))).unwrap();

        assert!(!txn.commit().unwrap());
        assert_eq!(txn.status(), TransactionStatus::Aborted);
        assert_eq!(
            cache.get(&key("dev-1")).unwrap(),
            CacheLookup::Present(device("dev-1", 2))
        );
    });
}

#[test]
fn test_evict_of_cached_key_aborts_transaction() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        cache.put(key("dev-1"), Some(device("dev-1", 1))).unwrap();

        let mut txn = cache.new_transaction_for_key(&key("dev-1")).unwrap();
        cache.evict(&key("dev-1")).unwrap();
        txn.put_if_absent(key("dev-1"), Some(device("dev-1", 1))).unwrap();

        assert!(!txn.commit().unwrap());
        assert_eq!(cache.get(&key("dev-1")).unwrap(), CacheLookup::Absent);
    });
}

#[test]
fn test_evict_or_put_during_read_through_aborts_it() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        // Miss, then the source changes before the fetched value is committed
        let mut txn = cache.new_transaction_for_key(&key("dev-1")).unwrap();
        cache.evict_or_put(key("dev-1"), None).unwrap();
        txn.put_if_absent(key("dev-1"), Some(device("dev-1", 1))).unwrap();

        assert!(!txn.commit().unwrap());
        assert!(cache.get(&key("dev-1")).unwrap().value().is_none());
    });
}

#[test]
fn test_write_to_unwatched_key_does_not_abort() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("a")).unwrap();
        cache.put(key("b"), Some(device("b", 1))).unwrap();
        txn.put_if_absent(key("a"), Some(device("a", 1))).unwrap();
        assert!(txn.commit().unwrap());
    });
}

#[test]
fn test_conflict_on_any_watched_key_aborts() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_keys(&[key("a"), key("b")]).unwrap();
        cache.put(key("b"), Some(device("b", 9))).unwrap();
        txn.put_if_absent(key("a"), Some(device("a", 1))).unwrap();

        assert!(!txn.commit().unwrap());
        assert_eq!(cache.get(&key("a")).unwrap(), CacheLookup::Absent);
    });
}

#[test]
fn test_write_to_key_buffered_outside_watch_set_aborts() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("a")).unwrap();
        txn.put_if_absent(key("b"), Some(device("b", 1))).unwrap();

        // Direct write to a key the transaction only buffered
        cache.put(key("b"), Some(device("b", 2))).unwrap();

        assert!(!txn.commit().unwrap());
        assert_eq!(
            cache.get(&key("b")).unwrap(),
            CacheLookup::Present(device("b", 2))
        );
    });
}

#[test]
fn test_buffering_same_unwatched_key_twice() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("a")).unwrap();
        txn.put_if_absent(key("b"), Some(device("b", 1))).unwrap();
        txn.put_if_absent(key("b"), Some(device("b", 2))).unwrap();
        assert!(txn.commit().unwrap());
        assert_eq!(
            cache.get(&key("b")).unwrap(),
            CacheLookup::Present(device("b", 1))
        );
    });
}

#[test]
fn test_first_committer_wins() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut first = cache.new_transaction_for_key(&key("k")).unwrap();
        let mut second = cache.new_transaction_for_key(&key("k")).unwrap();
        first.put_if_absent(key("k"), Some(device("k", 1))).unwrap();
        second.put_if_absent(key("k"), Some(device("k", 2))).unwrap();

        assert!(first.commit().unwrap());
        assert!(!second.commit().unwrap());
        assert_eq!(
            cache.get(&key("k")).unwrap(),
            CacheLookup::Present(device("k", 1))
        );
    });
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[test]
fn test_rollback_discards_buffered_writes() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("k")).unwrap();
        txn.put_if_absent(key("k"), Some(device("k", 1))).unwrap();
        txn.rollback().unwrap();
        assert_eq!(txn.status(), TransactionStatus::RolledBack);
        assert_eq!(cache.get(&key("k")).unwrap(), CacheLookup::Absent);
    });
}

#[test]
fn test_resolved_transaction_rejects_further_use() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let mut txn = cache.new_transaction_for_key(&key("k")).unwrap();
        assert!(txn.commit().unwrap());

        let err = txn.commit().unwrap_err();
        assert!(err.is_misuse());
        assert!(matches!(
            err,
            CacheError::TransactionNotActive {
                state: TransactionStatus::Committed,
                ..
            }
        ));
        assert!(txn
            .put_if_absent(key("k"), Some(device("k", 1)))
            .unwrap_err()
            .is_misuse());
        // Rolling back a resolved transaction is a no-op
        txn.rollback().unwrap();
        assert_eq!(txn.status(), TransactionStatus::Committed);
    });
}

#[test]
fn test_transaction_ids_are_distinct() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        let a = cache.new_transaction_for_key(&key("k")).unwrap();
        let b = cache.new_transaction_for_key(&key("k")).unwrap();
        assert_ne!(a.id(), b.id());
    });
}

#[test]
fn test_dropped_transaction_releases_key() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "txn");
        {
            let mut txn = cache.new_transaction_for_key(&key("k")).unwrap();
            txn.put_if_absent(key("k"), Some(device("k", 1))).unwrap();
        }
        assert_eq!(cache.get(&key("k")).unwrap(), CacheLookup::Absent);

        let mut txn = cache.new_transaction_for_key(&key("k")).unwrap();
        txn.put_if_absent(key("k"), Some(device("k", 2))).unwrap();
        assert!(txn.commit().unwrap());
    });
}

#[test]
fn test_resolved_transactions_return_connections() {
    test_across_backends(|manager| {
        if !manager.is_remote() {
            return;
        }
        let cache = fresh_cache::<Device>(manager, "txn");
        for outcome in 0..3 {
            let mut txn = cache.new_transaction_for_key(&key("k")).unwrap();
            match outcome {
                0 => assert!(txn.commit().unwrap()),
                1 => txn.rollback().unwrap(),
                _ => {
                    cache.put(key("k"), Some(device("k", 1))).unwrap();
                    assert!(!txn.commit().unwrap());
                }
            }
            drop(txn);
            assert!(manager.idle_connections() >= 1, "outcome {}", outcome);
        }
    });
}
