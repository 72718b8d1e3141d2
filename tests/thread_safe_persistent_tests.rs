//! Integration tests for thread-safe persistent collections.
//!
//! These tests verify that the collections work correctly with the `arc`
//! feature enabled: versions can be shared across threads, updated
//! independently, and traversed in parallel through split iterators.

#![cfg(feature = "arc")]
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use persistent_hamt::persistent::{OrderedKeyHashSet, PersistentHashMap, PersistentHashSet};
use rstest::rstest;
use std::sync::Arc;
use std::thread;

// =============================================================================
// PersistentHashMap Integration Tests
// =============================================================================

#[rstest]
fn test_hashmap_cross_thread_structural_sharing() {
    let original: Arc<PersistentHashMap<i32, i32>> =
        Arc::new((0..1000).map(|key| (key, key)).collect());

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let map_clone = Arc::clone(&original);
            thread::spawn(move || {
                // Each thread derives its own version
                let updated = map_clone.insert(index, -index).remove(&(500 + index));
                assert_eq!(updated.get(&index), Some(&-index));
                assert_eq!(updated.len(), 999);
                // The shared version is unchanged
                assert_eq!(map_clone.get(&index), Some(&index));
                updated
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect();

    for (index, map) in results.iter().enumerate() {
        let index = index as i32;
        assert_eq!(map.get(&index), Some(&-index));
        assert!(!map.contains_key(&(500 + index)));
        assert!(map.check_invariants().is_ok());
    }
    assert_eq!(original.len(), 1000);
}

#[rstest]
fn test_hashmap_moved_into_thread() {
    let map: PersistentHashMap<String, usize> = (0..100).map(|index| (index.to_string(), index)).collect();
    let handle = thread::spawn(move || map.iter().map(|(_, value)| *value).sum::<usize>());
    assert_eq!(handle.join().expect("Thread panicked"), 4950);
}

// =============================================================================
// PersistentHashSet Integration Tests
// =============================================================================

#[rstest]
fn test_hashset_concurrent_readers() {
    let set: Arc<OrderedKeyHashSet<u64>> = Arc::new((0..10_000).collect());

    let handles: Vec<_> = (0..8u64)
        .map(|offset| {
            let set_clone = Arc::clone(&set);
            thread::spawn(move || (0..10_000).filter(|element| element % 8 == offset).all(|element| set_clone.contains(&element)))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("Thread panicked"));
    }
}

#[rstest]
fn test_split_halves_consumed_on_two_threads() {
    let set: PersistentHashSet<u64> = (0..100_000).collect();
    let mut lower = set.split_iter();
    let upper = lower.split().expect("large set splits");

    let (lower_sum, upper_sum, lower_count, upper_count) = thread::scope(|scope| {
        let upper_handle = scope.spawn(move || {
            let elements: Vec<u64> = upper.copied().collect();
            (elements.iter().sum::<u64>(), elements.len())
        });
        let elements: Vec<u64> = lower.copied().collect();
        let (upper_sum, upper_count) = upper_handle.join().expect("Thread panicked");
        (elements.iter().sum::<u64>(), upper_sum, elements.len(), upper_count)
    });

    assert!(lower_count > 0);
    assert!(upper_count > 0);
    assert_eq!(lower_count + upper_count, 100_000);
    assert_eq!(lower_sum + upper_sum, (0..100_000u64).sum());
}

#[rstest]
fn test_recursive_split_across_many_threads() {
    let map: PersistentHashMap<u32, u32> = (0..50_000).map(|key| (key, key % 7)).collect();

    let mut pieces = vec![map.split_iter()];
    while pieces.len() < 16 {
        let Some(mut piece) = pieces.pop() else {
            break;
        };
        match piece.split() {
            Some(other) => {
                pieces.insert(0, other);
                pieces.insert(0, piece);
            }
            None => {
                pieces.push(piece);
                break;
            }
        }
    }

    let total: u64 = thread::scope(|scope| {
        let handles: Vec<_> = pieces
            .into_iter()
            .map(|piece| scope.spawn(move || piece.map(|(_, value)| u64::from(*value)).sum::<u64>()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("Thread panicked"))
            .sum()
    });

    let expected: u64 = (0..50_000u64).map(|key| key % 7).sum();
    assert_eq!(total, expected);
}
