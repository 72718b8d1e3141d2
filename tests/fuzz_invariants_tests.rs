//! Randomized stress tests.
//!
//! A seeded generator drives long sequences of inserts and removes against
//! a `BTreeMap` model. After every step the containers are checked for
//! structural invariants and for the identity rules of no-op updates.

use persistent_hamt::persistent::{
    CollisionResolver, OrderedKeyHashMap, PersistentHashMap, PersistentHashSet, ResolverLookup,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

const STEPS: usize = 20_000;

/// Key with a configurable number of distinct hash codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    value: u32,
    hash_space: u32,
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.value % self.hash_space).hash(state);
    }
}

fn run<R>(seed: u64, key_space: u32, hash_space: u32, mut map: PersistentHashMap<Key, u8, R>)
where
    R: ResolverLookup<Key, u8, Key>,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model: BTreeMap<Key, u8> = BTreeMap::new();
    let mut history: Vec<(PersistentHashMap<Key, u8, R>, usize)> = Vec::new();

    for step in 0..STEPS {
        let key = Key {
            value: rng.random_range(0..key_space),
            hash_space,
        };

        let next = if rng.random_bool(0.6) {
            let value: u8 = rng.random_range(0..4);
            let unchanged = model.get(&key) == Some(&value);
            model.insert(key, value);
            let next = map.insert(key, value);
            assert_eq!(next.ptr_eq(&map), unchanged, "insert identity at step {step}");
            next
        } else {
            let absent = model.remove(&key).is_none();
            let next = map.remove(&key);
            assert_eq!(next.ptr_eq(&map), absent, "remove identity at step {step}");
            next
        };

        assert_eq!(next.len(), model.len(), "length at step {step}");
        if let Err(violation) = next.check_invariants() {
            panic!("invariant violated at step {step}: {violation}");
        }
        if model.is_empty() {
            assert!(next.ptr_eq(&PersistentHashMap::empty()), "canonical empty at step {step}");
        }

        if step % 1000 == 0 {
            history.push((map.clone(), map.len()));
        }
        map = next;
    }

    for (key, value) in &model {
        assert_eq!(map.get(key), Some(value));
    }
    assert_eq!(map.iter().count(), model.len());

    // Earlier versions are unaffected by later updates.
    for (version, length) in history {
        assert_eq!(version.len(), length);
        assert_eq!(version.iter().count(), length);
        assert!(version.check_invariants().is_ok());
    }
}

fn empty<R: CollisionResolver<Key, u8>>() -> PersistentHashMap<Key, u8, R> {
    PersistentHashMap::empty()
}

#[rstest]
#[case::sparse(1, 1 << 20, u32::MAX)]
#[case::dense(2, 3000, u32::MAX)]
#[case::crowded(3, 3000, 64)]
#[case::single_hash(4, 200, 1)]
fn test_list_resolver_fuzz(
    #[case] seed: u64,
    #[case] key_space: u32,
    #[case] hash_space: u32,
) {
    let map: PersistentHashMap<Key, u8> = empty();
    run(seed, key_space, hash_space, map);
}

#[rstest]
#[case::sparse(5, 1 << 20, u32::MAX)]
#[case::dense(6, 3000, u32::MAX)]
#[case::crowded(7, 3000, 64)]
#[case::single_hash(8, 200, 1)]
fn test_tree_resolver_fuzz(
    #[case] seed: u64,
    #[case] key_space: u32,
    #[case] hash_space: u32,
) {
    let map: OrderedKeyHashMap<Key, u8> = empty();
    run(seed, key_space, hash_space, map);
}

#[rstest]
fn test_set_drain_in_random_order() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut elements: Vec<u32> = (0..10_000).collect();
    let full: PersistentHashSet<u32> = elements.iter().copied().collect();

    for index in (1..elements.len()).rev() {
        let other = rng.random_range(0..=index);
        elements.swap(index, other);
    }

    let mut set = full.clone();
    for (removed, element) in elements.iter().enumerate() {
        set = set.remove(element);
        assert_eq!(set.len(), full.len() - removed - 1);
        if removed % 997 == 0 {
            assert!(set.check_invariants().is_ok());
        }
    }

    assert!(set.ptr_eq(&PersistentHashSet::new()));
    assert_eq!(full.len(), 10_000);
}
