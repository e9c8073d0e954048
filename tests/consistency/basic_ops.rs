//! Direct (non-transactional) operations.

use crate::*;

// =============================================================================
// PUT / GET
// =============================================================================

#[test]
fn test_put_last_write_wins() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        cache.put(key("dev-1"), Some(device("dev-1", 1))).unwrap();
        cache.put(key("dev-1"), Some(device("dev-1", 2))).unwrap();
        assert_eq!(
            cache.get(&key("dev-1")).unwrap(),
            CacheLookup::Present(device("dev-1", 2))
        );
    });
}

#[test]
fn test_put_if_absent_never_overwrites() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        cache.put(key("dev-1"), Some(device("dev-1", 1))).unwrap();
        assert!(!cache
            .put_if_absent(key("dev-1"), Some(device("dev-1", 2)))
            .unwrap());
        assert_eq!(
            cache.get(&key("dev-1")).unwrap(),
            CacheLookup::Present(device("dev-1", 1))
        );
    });
}

#[test]
fn test_put_if_absent_on_missing_key() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        assert!(cache
            .put_if_absent(key("dev-1"), Some(device("dev-1", 1)))
            .unwrap());
        assert!(cache.get(&key("dev-1")).unwrap().is_cached());
    });
}

#[test]
fn test_get_missing_is_absent() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        assert_eq!(cache.get(&key("nope")).unwrap(), CacheLookup::Absent);
    });
}

// =============================================================================
// NEGATIVE CACHING
// =============================================================================

#[test]
fn test_explicit_empty_is_distinct_from_absent() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        cache.put(key("deleted"), None).unwrap();
        assert_eq!(cache.get(&key("deleted")).unwrap(), CacheLookup::Empty);
        assert_eq!(cache.get(&key("untouched")).unwrap(), CacheLookup::Absent);
    });
}

#[test]
fn test_put_if_absent_respects_empty_marker() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        cache.put(key("deleted"), None).unwrap();
        assert!(!cache
            .put_if_absent(key("deleted"), Some(device("deleted", 1)))
            .unwrap());
        assert_eq!(cache.get(&key("deleted")).unwrap(), CacheLookup::Empty);
    });
}

#[test]
fn test_evict_or_put_on_absent_key() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        cache.evict_or_put(key("k"), None).unwrap();
        let expected = if manager.is_remote() {
            // Placeholder closes the miss-before-evict window
            CacheLookup::Empty
        } else {
            CacheLookup::Absent
        };
        assert_eq!(cache.get(&key("k")).unwrap(), expected);
        assert_eq!(cache.get(&key("m")).unwrap(), CacheLookup::Absent);
    });
}

#[test]
fn test_evict_or_put_on_present_key_only_evicts() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        cache.put(key("k"), Some(device("k", 1))).unwrap();
        cache.evict_or_put(key("k"), None).unwrap();
        assert_eq!(cache.get(&key("k")).unwrap(), CacheLookup::Absent);
    });
}

// =============================================================================
// EVICTION
// =============================================================================

#[test]
fn test_evict_and_evict_many() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        for id in ["a", "b", "c", "d"] {
            cache.put(key(id), Some(device(id, 1))).unwrap();
        }
        cache.evict(&key("a")).unwrap();
        cache.evict_many(&[key("b"), key("c")]).unwrap();

        for id in ["a", "b", "c"] {
            assert_eq!(cache.get(&key(id)).unwrap(), CacheLookup::Absent, "{}", id);
        }
        assert!(cache.get(&key("d")).unwrap().is_cached());
    });
}

#[test]
fn test_evict_many_with_no_keys() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Device>(manager, "basic");
        cache.evict_many(&[]).unwrap();
    });
}

// =============================================================================
// VALUE SHAPES
// =============================================================================

#[test]
fn test_collection_values() {
    test_across_backends(|manager| {
        let cache = fresh_cache::<Vec<String>>(manager, "collections");
        let ids = vec![key("dev-1"), key("dev-2")];
        cache.put(key("tenant-1"), Some(ids.clone())).unwrap();
        assert_eq!(cache.get(&key("tenant-1")).unwrap(), CacheLookup::Present(ids));

        // An empty collection is a real value, not the empty marker
        cache.put(key("tenant-2"), Some(Vec::new())).unwrap();
        assert_eq!(
            cache.get(&key("tenant-2")).unwrap(),
            CacheLookup::Present(Vec::new())
        );
    });
}

#[test]
fn test_stats_when_enabled() {
    let manager = CacheManager::new(
        CacheConfig::local().with_specs("counted", CacheSpecs::new(100, 1).with_stats(true)),
    )
    .unwrap();
    let cache: Cache<String, u64> = manager.build_cache("counted").unwrap();
    cache.put(key("k"), Some(1)).unwrap();
    cache.get(&key("k")).unwrap();
    cache.get(&key("missing")).unwrap();

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.puts, 1);
}

#[test]
fn test_stats_off_by_default() {
    let cache: Cache<String, u64> = CacheManager::local().build_cache("uncounted").unwrap();
    cache.get(&key("k")).unwrap();
    assert_eq!(cache.stats().misses, 0);
}
