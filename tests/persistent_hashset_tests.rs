//! Unit tests for PersistentHashSet.
//!
//! These tests exercise the public API of the set, including identity
//! preservation, collision handling and the membership-based operations.

use persistent_hamt::persistent::{
    InvariantViolation, Membership, OrderedKeyHashSet, PersistentHashSet,
};
use rstest::rstest;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// A key whose hash code is controlled by the test.
///
/// Keys with the same `bucket` always collide, so a handful of them is
/// enough to build multi-entry buckets.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Colliding {
    bucket: u8,
    tag: u32,
}

impl Colliding {
    const fn new(bucket: u8, tag: u32) -> Self {
        Self { bucket, tag }
    }
}

impl Hash for Colliding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bucket.hash(state);
    }
}

// =============================================================================
// Empty Sets
// =============================================================================

#[rstest]
fn test_new_creates_empty_set() {
    let set: PersistentHashSet<i32> = PersistentHashSet::new();
    assert!(set.is_empty());
    assert_eq!(set.len(), 0);
    assert_eq!(set.iter().next(), None);
}

#[rstest]
fn test_default_creates_empty_set() {
    let set: PersistentHashSet<i32> = PersistentHashSet::default();
    assert!(set.is_empty());
    assert!(set.check_invariants().is_ok());
}

#[rstest]
fn test_empty_set_operations() {
    let empty: PersistentHashSet<i32> = PersistentHashSet::new();
    assert!(!empty.contains(&1));
    assert!(empty.remove(&1).ptr_eq(&empty));
    assert!(empty.union(&empty).ptr_eq(&empty));
    assert!(empty.intersection(&empty).ptr_eq(&empty));
}

// =============================================================================
// Insert / Remove
// =============================================================================

#[rstest]
fn test_insert_multiple_elements() {
    let set = PersistentHashSet::new().insert(1).insert(2).insert(3);

    assert_eq!(set.len(), 3);
    assert!(set.contains(&1));
    assert!(set.contains(&2));
    assert!(set.contains(&3));
    assert!(!set.contains(&4));
}

#[rstest]
fn test_insert_does_not_modify_original() {
    let set1 = PersistentHashSet::new().insert(1);
    let set2 = set1.insert(2);

    assert_eq!(set1.len(), 1);
    assert!(!set1.contains(&2));
    assert_eq!(set2.len(), 2);
}

#[rstest]
fn test_insert_existing_returns_same_set() {
    let set: PersistentHashSet<String> = (0..100).map(|index| index.to_string()).collect();
    assert!(set.insert("42".to_string()).ptr_eq(&set));
}

#[rstest]
fn test_remove_last_element_returns_canonical_empty() {
    let empty: PersistentHashSet<i32> = PersistentHashSet::new();
    let set = empty.insert(7).insert(8);
    let drained = set.remove(&7).remove(&8);

    assert!(drained.is_empty());
    assert!(drained.ptr_eq(&empty));
}

#[rstest]
fn test_remove_does_not_modify_original() {
    let set: PersistentHashSet<i32> = (0..10).collect();
    let removed = set.remove(&3);

    assert!(set.contains(&3));
    assert!(!removed.contains(&3));
    assert_eq!(removed.len(), 9);
}

#[rstest]
fn test_contains_with_borrowed_form() {
    let set = PersistentHashSet::new().insert("hello".to_string());
    assert!(set.contains("hello"));
    assert!(!set.contains("world"));
}

#[rstest]
#[case(10)]
#[case(1_000)]
#[case(100_000)]
fn test_insert_then_remove_everything(#[case] count: u64) {
    let full: PersistentHashSet<u64> = (0..count).collect();
    assert_eq!(full.len() as u64, count);
    assert_eq!(full.check_invariants(), Ok(()));

    let drained = (0..count).fold(full, |set, element| set.remove(&element));
    assert!(drained.is_empty());
    assert!(drained.ptr_eq(&PersistentHashSet::new()));
}

// =============================================================================
// Collisions
// =============================================================================

#[rstest]
fn test_colliding_elements_are_kept_apart() {
    let set: PersistentHashSet<Colliding> = (0..20).map(|tag| Colliding::new(1, tag)).collect();

    assert_eq!(set.len(), 20);
    assert!((0..20).all(|tag| set.contains(&Colliding::new(1, tag))));
    assert!(!set.contains(&Colliding::new(1, 20)));
    assert_eq!(set.check_invariants(), Ok(()));
}

#[rstest]
fn test_colliding_elements_removal_collapses_bucket() {
    let set: PersistentHashSet<Colliding> = (0..3).map(|tag| Colliding::new(9, tag)).collect();
    let reduced = set.remove(&Colliding::new(9, 0)).remove(&Colliding::new(9, 1));

    assert_eq!(reduced.len(), 1);
    assert!(reduced.contains(&Colliding::new(9, 2)));
    assert_eq!(reduced.check_invariants(), Ok(()));
}

#[rstest]
fn test_ordered_resolver_with_many_collisions() {
    let set: OrderedKeyHashSet<Colliding> = (0..500)
        .map(|tag| Colliding::new((tag % 4) as u8, tag))
        .collect();

    assert_eq!(set.len(), 500);
    assert_eq!(set.check_invariants(), Ok(()));

    let evens_removed = (0..500)
        .step_by(2)
        .fold(set.clone(), |set, tag| set.remove(&Colliding::new((tag % 4) as u8, tag)));
    assert_eq!(evens_removed.len(), 250);
    assert!(evens_removed.contains(&Colliding::new(3, 3)));
    assert!(!evens_removed.contains(&Colliding::new(2, 2)));
    assert_eq!(evens_removed.check_invariants(), Ok(()));
}

#[rstest]
fn test_colliding_reinsert_preserves_identity() {
    let set: OrderedKeyHashSet<Colliding> = (0..10).map(|tag| Colliding::new(0, tag)).collect();
    assert!(set.insert(Colliding::new(0, 5)).ptr_eq(&set));
    assert!(set.remove(&Colliding::new(0, 50)).ptr_eq(&set));
}

// =============================================================================
// Set Operations
// =============================================================================

#[rstest]
fn test_union_adds_missing_elements() {
    let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    let set_b: PersistentHashSet<i32> = [3, 4, 5].into_iter().collect();

    let union = set_a.union(&set_b);
    assert_eq!(union, (1..=5).collect::<PersistentHashSet<i32>>());
}

#[rstest]
fn test_union_with_owned_vector() {
    let set: PersistentHashSet<String> = PersistentHashSet::singleton("a".to_string());
    let union = set.union(vec!["b".to_string(), "a".to_string()]);
    assert_eq!(union.len(), 2);
}

#[rstest]
fn test_intersection_with_each_membership_source() {
    let set: PersistentHashSet<i32> = (0..10).collect();
    let expected: PersistentHashSet<i32> = [2, 4].into_iter().collect();

    let hash_set: HashSet<i32> = [2, 4, 20].into_iter().collect();
    let btree_set: BTreeSet<i32> = [2, 4, 20].into_iter().collect();
    let hash_map: HashMap<i32, ()> = [(2, ()), (4, ()), (20, ())].into_iter().collect();
    let persistent: PersistentHashSet<i32> = [2, 4, 20].into_iter().collect();

    assert_eq!(set.intersection(&hash_set), expected);
    assert_eq!(set.intersection(&btree_set), expected);
    assert_eq!(set.intersection(&hash_map), expected);
    assert_eq!(set.intersection(&persistent), expected);
}

#[rstest]
fn test_intersection_with_superset_preserves_identity() {
    let set: PersistentHashSet<i32> = (0..50).collect();
    let superset: BTreeSet<i32> = (0..100).collect();
    assert!(set.intersection(&superset).ptr_eq(&set));
}

#[rstest]
fn test_intersection_with_disjoint_is_empty() {
    let set: PersistentHashSet<i32> = (0..50).collect();
    let disjoint: HashSet<i32> = (100..200).collect();
    let intersection = set.intersection(&disjoint);
    assert!(intersection.ptr_eq(&PersistentHashSet::new()));
}

#[rstest]
fn test_intersection_with_iterator_source() {
    let set: PersistentHashSet<i32> = (0..100).collect();
    let multiples = set.intersection_with((0..1000).filter(|value| value % 10 == 0));
    assert_eq!(multiples.len(), 10);
    assert!(multiples.iter().all(|value| value % 10 == 0));
}

#[rstest]
fn test_remove_all_ignores_absent_elements() {
    let set: PersistentHashSet<i32> = (0..10).collect();
    let trimmed = set.remove_all([1, 3, 5, 100]);
    assert_eq!(trimmed, [0, 2, 4, 6, 7, 8, 9].into_iter().collect::<PersistentHashSet<i32>>());
    assert!(set.remove_all([100, 200]).ptr_eq(&set));
}

#[rstest]
fn test_difference_and_subset() {
    let set_a: PersistentHashSet<i32> = (0..10).collect();
    let set_b: PersistentHashSet<i32> = (5..15).collect();

    let difference = set_a.difference(&set_b);
    assert_eq!(difference, (0..5).collect::<PersistentHashSet<i32>>());
    assert!(difference.is_subset(&set_a));
    assert!(difference.is_disjoint(&set_b));
}

#[rstest]
fn test_membership_trait_on_persistent_set() {
    fn count_members<M: Membership<i32>>(source: &M) -> usize {
        (0..10).filter(|candidate| source.contains(candidate)).count()
    }

    let set: PersistentHashSet<i32> = [1, 3, 30].into_iter().collect();
    assert_eq!(count_members(&set), 2);
}

// =============================================================================
// Equality
// =============================================================================

#[rstest]
fn test_equality_ignores_insertion_order() {
    let forward: PersistentHashSet<i32> = (0..1000).collect();
    let backward: PersistentHashSet<i32> = (0..1000).rev().collect();
    assert_eq!(forward, backward);
}

#[rstest]
fn test_equality_across_resolvers() {
    let list: PersistentHashSet<String> = ["x", "y", "z"].into_iter().map(String::from).collect();
    let tree: OrderedKeyHashSet<String> = ["z", "y", "x"].into_iter().map(String::from).collect();
    assert_eq!(list, tree);
    assert_ne!(list.remove("x"), tree);
}

// =============================================================================
// Iteration
// =============================================================================

#[rstest]
fn test_iteration_order_is_stable_across_builds() {
    let first: PersistentHashSet<i32> = (0..500).collect();
    let second: PersistentHashSet<i32> = (0..500).rev().collect();
    let first_order: Vec<i32> = first.iter().copied().collect();
    let second_order: Vec<i32> = second.iter().copied().collect();
    assert_eq!(first_order, second_order);
}

#[rstest]
fn test_owned_and_borrowed_iteration_agree() {
    let set: PersistentHashSet<i32> = (0..300).collect();
    let borrowed: Vec<i32> = (&set).into_iter().copied().collect();
    let owned: Vec<i32> = set.into_iter().collect();
    assert_eq!(borrowed, owned);
}

#[rstest]
fn test_split_iterator_recursive_pieces_cover_set() {
    let set: PersistentHashSet<u32> = (0..10_000).collect();
    let mut pieces = vec![set.split_iter()];

    for _ in 0..4 {
        let mut next = Vec::new();
        for mut piece in pieces {
            if let Some(other) = piece.split() {
                next.push(other);
            }
            next.push(piece);
        }
        pieces = next;
    }

    assert!(pieces.len() > 1);
    let mut elements: Vec<u32> = pieces.into_iter().flatten().copied().collect();
    elements.sort_unstable();
    assert_eq!(elements, (0..10_000).collect::<Vec<_>>());
}

// =============================================================================
// Invariants
// =============================================================================

#[rstest]
fn test_invariant_violation_displays_context() {
    let violation = InvariantViolation::SizeMismatch {
        recorded: 3,
        counted: 2,
    };
    assert!(violation.to_string().contains('3'));
}
