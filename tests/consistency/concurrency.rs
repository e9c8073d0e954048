//! Multi-threaded races.

use crate::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

const THREADS: usize = 8;

#[test]
fn test_racing_transactions_single_winner() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "race");
        let barrier = Barrier::new(THREADS);
        let winners = AtomicUsize::new(0);

        thread::scope(|s| {
            for i in 0..THREADS {
                let cache = cache.clone();
                let barrier = &barrier;
                let winners = &winners;
                s.spawn(move || {
                    let mut txn = cache.new_transaction_for_key(&key("k")).unwrap();
                    txn.put_if_absent(key("k"), Some(device("k", i as u32))).unwrap();
                    barrier.wait();
                    if txn.commit().unwrap() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        // Every transaction watched `k` before any commit ran
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(cache.get(&key("k")).unwrap().is_cached());
    });
}

#[test]
fn test_evict_racing_read_through_never_leaves_stale_value() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "race");
        for round in 0..50u32 {
            let id = key(&format!("dev-{}", round));
            let barrier = Barrier::new(2);
            thread::scope(|s| {
                let reader = cache.clone();
                let writer = cache.clone();
                let (rid, wid) = (id.clone(), id.clone());
                let (rb, wb) = (&barrier, &barrier);

                s.spawn(move || {
                    reader
                        .get_and_put_in_transaction(
                            &rid,
                            || {
                                rb.wait();
                                // Source read completes after the update
                                rb.wait();
                                Ok::<_, CacheError>(Some(device(&rid, round)))
                            },
                            false,
                        )
                        .unwrap();
                });
                s.spawn(move || {
                    wb.wait();
                    writer.evict_or_put(wid, None).unwrap();
                    wb.wait();
                });
            });

            // The stale fetch must not have been cached
            assert!(
                cache.get(&id).unwrap().value().is_none(),
                "round {} cached a stale value",
                round
            );
        }
    });
}

#[test]
fn test_parallel_direct_writes_on_distinct_keys() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<u64>(manager, "race");
        thread::scope(|s| {
            for t in 0..THREADS {
                let cache = cache.clone();
                s.spawn(move || {
                    for i in 0..25u64 {
                        let k = key(&format!("{}-{}", t, i));
                        cache.put(k.clone(), Some(i)).unwrap();
                        assert_eq!(cache.get(&k).unwrap(), CacheLookup::Present(i));
                    }
                });
            }
        });
    });
}
