//! Property-based tests for PersistentHashMap laws.
//!
//! These tests verify the map laws (get after insert, get after remove,
//! insert idempotence) against a `BTreeMap` model, for both collision
//! resolvers.

use persistent_hamt::persistent::{OrderedKeyHashMap, PersistentHashMap};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// A key with a deliberately tiny hash space.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Narrow(u16);

impl std::hash::Hash for Narrow {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.0 % 5).hash(state);
    }
}

#[derive(Clone, Debug)]
enum Operation {
    Insert(u16, i32),
    Remove(u16),
}

fn operations() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(
        prop_oneof![
            (any::<u16>(), any::<i32>()).prop_map(|(key, value)| Operation::Insert(key % 256, value)),
            any::<u16>().prop_map(|key| Operation::Remove(key % 256)),
        ],
        0..200,
    )
}

// =============================================================================
// Get-Insert Law
// Description: get(insert(m, k, v), k) == Some(v)
// =============================================================================

proptest! {
    #[test]
    fn prop_get_insert_law(
        entries in prop::collection::vec((any::<i32>(), any::<i32>()), 0..50),
        key: i32,
        value: i32
    ) {
        let map: PersistentHashMap<i32, i32> = entries.into_iter().collect();
        let updated = map.insert(key, value);

        prop_assert_eq!(updated.get(&key), Some(&value));
    }
}

// =============================================================================
// Get-Insert-Other Law
// Description: get(insert(m, k1, v), k2) == get(m, k2) for k1 != k2
// =============================================================================

proptest! {
    #[test]
    fn prop_get_insert_other_law(
        entries in prop::collection::vec((any::<i32>(), any::<i32>()), 0..50),
        key1: i32,
        key2: i32,
        value: i32
    ) {
        prop_assume!(key1 != key2);
        let map: PersistentHashMap<i32, i32> = entries.into_iter().collect();
        let updated = map.insert(key1, value);

        prop_assert_eq!(updated.get(&key2), map.get(&key2));
    }
}

// =============================================================================
// Get-Remove Law
// Description: get(remove(m, k), k) == None
// =============================================================================

proptest! {
    #[test]
    fn prop_get_remove_law(
        entries in prop::collection::vec((any::<i32>(), any::<i32>()), 0..50),
        key: i32
    ) {
        let map: PersistentHashMap<i32, i32> = entries.into_iter().collect();
        let removed = map.remove(&key);

        prop_assert_eq!(removed.get(&key), None);
        prop_assert_eq!(removed.len(), map.len() - usize::from(map.contains_key(&key)));
    }
}

// =============================================================================
// Insert Idempotence Law
// Description: insert(insert(m, k, v), k, v) is the same map as insert(m, k, v)
// =============================================================================

proptest! {
    #[test]
    fn prop_insert_idempotence_law(
        entries in prop::collection::vec((any::<i32>(), any::<i32>()), 0..50),
        key: i32,
        value: i32
    ) {
        let map: PersistentHashMap<i32, i32> = entries.into_iter().collect();
        let once = map.insert(key, value);
        let twice = once.insert(key, value);

        prop_assert!(twice.ptr_eq(&once));
    }
}

// =============================================================================
// Model Laws
// Description: Any sequence of updates agrees with BTreeMap and keeps the
// trie well formed
// =============================================================================

proptest! {
    #[test]
    fn prop_operations_match_model(operations in operations()) {
        let mut model = BTreeMap::new();
        let mut list: PersistentHashMap<Narrow, i32> = PersistentHashMap::new();
        let mut tree: OrderedKeyHashMap<Narrow, i32> = OrderedKeyHashMap::new_ordered();

        for operation in operations {
            match operation {
                Operation::Insert(key, value) => {
                    model.insert(key, value);
                    list = list.insert(Narrow(key), value);
                    tree = tree.insert(Narrow(key), value);
                }
                Operation::Remove(key) => {
                    model.remove(&key);
                    list = list.remove(&Narrow(key));
                    tree = tree.remove(&Narrow(key));
                }
            }
        }

        prop_assert_eq!(list.len(), model.len());
        prop_assert_eq!(tree.len(), model.len());
        for (key, value) in &model {
            prop_assert_eq!(list.get(&Narrow(*key)), Some(value));
            prop_assert_eq!(tree.get(&Narrow(*key)), Some(value));
        }
        prop_assert!(list.check_invariants().is_ok());
        prop_assert!(tree.check_invariants().is_ok());
        prop_assert_eq!(&list, &tree);
    }

    #[test]
    fn prop_old_versions_are_unaffected(
        entries in prop::collection::vec((0..500i32, any::<i32>()), 0..100),
        updates in prop::collection::vec((0..500i32, any::<i32>()), 0..100)
    ) {
        let base: PersistentHashMap<i32, i32> = entries.into_iter().collect();
        let snapshot: BTreeMap<i32, i32> = base.iter().map(|(key, value)| (*key, *value)).collect();

        let _updated = updates
            .into_iter()
            .fold(base.clone(), |map, (key, value)| map.insert(key, value).remove(&(key + 1)));

        let after: BTreeMap<i32, i32> = base.iter().map(|(key, value)| (*key, *value)).collect();
        prop_assert_eq!(snapshot, after);
        prop_assert!(base.check_invariants().is_ok());
    }
}

// =============================================================================
// Merge Laws
// Description: merge agrees with extending a model; merging with self is a
// no-op
// =============================================================================

proptest! {
    #[test]
    fn prop_merge_law(
        left in prop::collection::vec((0..200i32, any::<i32>()), 0..60),
        right in prop::collection::vec((0..200i32, any::<i32>()), 0..60)
    ) {
        let left_map: PersistentHashMap<i32, i32> = left.iter().copied().collect();
        let right_map: OrderedKeyHashMap<i32, i32> = right.iter().copied().collect();

        let mut model: BTreeMap<i32, i32> = left.into_iter().collect();
        model.extend(right_map.iter().map(|(key, value)| (*key, *value)));

        let merged = left_map.merge(&right_map);
        let actual: BTreeMap<i32, i32> = merged.iter().map(|(key, value)| (*key, *value)).collect();

        prop_assert_eq!(actual, model);
        prop_assert!(left_map.merge(&left_map).ptr_eq(&left_map));
    }
}
