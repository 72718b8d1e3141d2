//! Collision resolution strategies for keys that share a full hash code.
//!
//! Two keys whose 32-bit hash codes are identical land in the same trie
//! bucket. A bucket holding one entry stores it inline; from the second entry
//! on, the bucket delegates to a [`CollisionResolver`]:
//!
//! - [`ListResolver`]: a flat array scanned linearly. Works for any `Eq` key.
//! - [`TreeResolver`]: a height-balanced binary search tree. Requires `Ord`
//!   keys and keeps lookups logarithmic even under adversarial collisions.
//!
//! The resolver is a type parameter of the containers, so the choice is made
//! once at construction (`new` vs `new_ordered`) and fixed for the lifetime
//! of every version derived from it.
//!
//! Every operation is pure: the input entries are never modified, and an
//! insertion that would not change anything reports [`Insertion::Unchanged`]
//! so callers can keep their original handles.

use std::borrow::Borrow;
use std::cmp::Ordering;

use super::ReferenceCounter;
use super::invariant::InvariantViolation;

// =============================================================================
// Resolver Protocol
// =============================================================================

/// Outcome of inserting into a collision structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion<E> {
    /// The key was already present with an equal value.
    Unchanged,
    /// The key was present; its value was replaced.
    Replaced(E),
    /// The key was absent and has been added.
    Added(E),
}

/// Outcome of deleting from a collision structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion<E, K, V> {
    /// The key was not present.
    Absent,
    /// The key was removed and at least two entries remain.
    Remaining(E),
    /// The key was removed and exactly one entry remains.
    Last(K, V),
}

/// Strategy for storing two or more entries whose keys hash identically.
///
/// The trie never inspects `Entries`; it only moves it around and asks the
/// resolver to operate on it. Implementations must keep `Entries` immutable
/// and return fresh structures from every modifying operation.
pub trait CollisionResolver<K, V> {
    /// Structure holding the colliding entries. Always holds at least two.
    type Entries: Clone;

    /// Builds the structure for the first collision in a bucket.
    fn pair(first: (K, V), second: (K, V)) -> Self::Entries;

    /// Inserts or replaces an entry.
    fn insert(entries: &Self::Entries, key: K, value: V) -> Insertion<Self::Entries>
    where
        V: PartialEq;

    /// Number of entries.
    fn len(entries: &Self::Entries) -> usize;

    /// Entry at `index` in the resolver's iteration order.
    fn entry_at(entries: &Self::Entries, index: usize) -> Option<(&K, &V)>;

    /// Verifies the structure's own invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    fn check(entries: &Self::Entries) -> Result<(), InvariantViolation>;
}

/// Key lookup for a resolver, by any borrowed form `Q` of the key.
///
/// Split from [`CollisionResolver`] because the bounds on `Q` depend on the
/// strategy: a list needs `Q: Eq`, a tree needs `Q: Ord`.
pub trait ResolverLookup<K, V, Q: ?Sized>: CollisionResolver<K, V> {
    /// Finds the entry for `key`.
    fn find<'a>(entries: &'a Self::Entries, key: &Q) -> Option<(&'a K, &'a V)>;

    /// Removes the entry for `key`.
    fn remove(entries: &Self::Entries, key: &Q) -> Deletion<Self::Entries, K, V>;
}

// =============================================================================
// ListResolver
// =============================================================================

/// Linear-scan collision resolution for keys without a total order.
///
/// This is the default resolver of [`PersistentHashMap`](super::PersistentHashMap)
/// and [`PersistentHashSet`](super::PersistentHashSet).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListResolver;

impl<K: Eq + Clone, V: Clone> CollisionResolver<K, V> for ListResolver {
    type Entries = ReferenceCounter<[(K, V)]>;

    fn pair(first: (K, V), second: (K, V)) -> Self::Entries {
        ReferenceCounter::from(vec![first, second])
    }

    fn insert(entries: &Self::Entries, key: K, value: V) -> Insertion<Self::Entries>
    where
        V: PartialEq,
    {
        match entries.iter().position(|(entry_key, _)| *entry_key == key) {
            Some(position) if entries[position].1 == value => Insertion::Unchanged,
            Some(position) => {
                let mut new_entries = entries.to_vec();
                new_entries[position] = (key, value);
                Insertion::Replaced(ReferenceCounter::from(new_entries))
            }
            None => {
                let mut new_entries = Vec::with_capacity(entries.len() + 1);
                new_entries.extend_from_slice(entries);
                new_entries.push((key, value));
                Insertion::Added(ReferenceCounter::from(new_entries))
            }
        }
    }

    fn len(entries: &Self::Entries) -> usize {
        entries.len()
    }

    fn entry_at(entries: &Self::Entries, index: usize) -> Option<(&K, &V)> {
        entries.get(index).map(|(key, value)| (key, value))
    }

    fn check(entries: &Self::Entries) -> Result<(), InvariantViolation> {
        if entries.len() < 2 {
            return Err(InvariantViolation::UnderfilledBucket {
                entries: entries.len(),
            });
        }

        for (position, (key, _)) in entries.iter().enumerate() {
            if entries[position + 1..]
                .iter()
                .any(|(other_key, _)| other_key == key)
            {
                return Err(InvariantViolation::DuplicateKey);
            }
        }

        Ok(())
    }
}

impl<K, V, Q> ResolverLookup<K, V, Q> for ListResolver
where
    K: Eq + Clone + Borrow<Q>,
    V: Clone,
    Q: Eq + ?Sized,
{
    fn find<'a>(entries: &'a Self::Entries, key: &Q) -> Option<(&'a K, &'a V)> {
        entries
            .iter()
            .find(|(entry_key, _)| entry_key.borrow() == key)
            .map(|(entry_key, value)| (entry_key, value))
    }

    fn remove(entries: &Self::Entries, key: &Q) -> Deletion<Self::Entries, K, V> {
        let Some(position) = entries
            .iter()
            .position(|(entry_key, _)| entry_key.borrow() == key)
        else {
            return Deletion::Absent;
        };

        if entries.len() == 2 {
            let (remaining_key, remaining_value) = entries[1 - position].clone();
            return Deletion::Last(remaining_key, remaining_value);
        }

        let mut new_entries = entries.to_vec();
        new_entries.remove(position);
        Deletion::Remaining(ReferenceCounter::from(new_entries))
    }
}

// =============================================================================
// TreeResolver
// =============================================================================

/// Balanced-tree collision resolution for keys with a total order.
///
/// Selected by the `new_ordered` constructors. Colliding entries are kept in
/// a persistent AVL tree, so a bucket with `k` entries costs O(log k) per
/// operation instead of O(k).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TreeResolver;

type Link<K, V> = Option<ReferenceCounter<TreeNode<K, V>>>;

/// Internal node of a collision tree.
struct TreeNode<K, V> {
    key: K,
    value: V,
    height: u8,
    size: usize,
    left: Link<K, V>,
    right: Link<K, V>,
}

fn height<K, V>(link: Option<&ReferenceCounter<TreeNode<K, V>>>) -> u8 {
    link.map_or(0, |node| node.height)
}

fn size<K, V>(link: Option<&ReferenceCounter<TreeNode<K, V>>>) -> usize {
    link.map_or(0, |node| node.size)
}

impl<K, V> TreeNode<K, V> {
    /// Creates a node, deriving height and size from the children.
    fn with_children(key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> ReferenceCounter<Self> {
        ReferenceCounter::new(Self {
            height: 1 + height(left.as_ref()).max(height(right.as_ref())),
            size: 1 + size(left.as_ref()) + size(right.as_ref()),
            key,
            value,
            left,
            right,
        })
    }

    fn leaf(key: K, value: V) -> ReferenceCounter<Self> {
        Self::with_children(key, value, None, None)
    }

    fn balance_factor(&self) -> i16 {
        i16::from(height(self.left.as_ref())) - i16::from(height(self.right.as_ref()))
    }
}

impl<K: Clone, V: Clone> TreeNode<K, V> {
    /// Rebuilds a node from parts, rotating when the children differ in
    /// height by more than one.
    fn balance(key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> ReferenceCounter<Self> {
        let left_height = height(left.as_ref());
        let right_height = height(right.as_ref());

        if left_height > right_height + 1
            && let Some(left_node) = &left
        {
            if left_node.balance_factor() >= 0 {
                // Left-Left: single right rotation
                let new_right =
                    Self::with_children(key, value, left_node.right.clone(), right);
                return Self::with_children(
                    left_node.key.clone(),
                    left_node.value.clone(),
                    left_node.left.clone(),
                    Some(new_right),
                );
            }
            if let Some(pivot) = &left_node.right {
                // Left-Right: rotate the left child left, then the node right
                let new_left = Self::with_children(
                    left_node.key.clone(),
                    left_node.value.clone(),
                    left_node.left.clone(),
                    pivot.left.clone(),
                );
                let new_right = Self::with_children(key, value, pivot.right.clone(), right);
                return Self::with_children(
                    pivot.key.clone(),
                    pivot.value.clone(),
                    Some(new_left),
                    Some(new_right),
                );
            }
        }

        if right_height > left_height + 1
            && let Some(right_node) = &right
        {
            if right_node.balance_factor() <= 0 {
                // Right-Right: single left rotation
                let new_left = Self::with_children(key, value, left, right_node.left.clone());
                return Self::with_children(
                    right_node.key.clone(),
                    right_node.value.clone(),
                    Some(new_left),
                    right_node.right.clone(),
                );
            }
            if let Some(pivot) = &right_node.left {
                // Right-Left: rotate the right child right, then the node left
                let new_left = Self::with_children(key, value, left, pivot.left.clone());
                let new_right = Self::with_children(
                    right_node.key.clone(),
                    right_node.value.clone(),
                    pivot.right.clone(),
                    right_node.right.clone(),
                );
                return Self::with_children(
                    pivot.key.clone(),
                    pivot.value.clone(),
                    Some(new_left),
                    Some(new_right),
                );
            }
        }

        Self::with_children(key, value, left, right)
    }

    /// Removes the minimum entry, returning it with the remaining subtree.
    fn remove_min(node: &ReferenceCounter<Self>) -> (K, V, Link<K, V>) {
        match &node.left {
            None => (node.key.clone(), node.value.clone(), node.right.clone()),
            Some(left) => {
                let (key, value, new_left) = Self::remove_min(left);
                let rebuilt = Self::balance(
                    node.key.clone(),
                    node.value.clone(),
                    new_left,
                    node.right.clone(),
                );
                (key, value, Some(rebuilt))
            }
        }
    }
}

impl<K: Ord + Clone, V: Clone> TreeNode<K, V> {
    fn insert(link: Option<&ReferenceCounter<Self>>, key: K, value: V) -> Insertion<ReferenceCounter<Self>>
    where
        V: PartialEq,
    {
        let Some(node) = link else {
            return Insertion::Added(Self::leaf(key, value));
        };

        match key.cmp(&node.key) {
            Ordering::Less => match Self::insert(node.left.as_ref(), key, value) {
                Insertion::Unchanged => Insertion::Unchanged,
                Insertion::Replaced(new_left) => Insertion::Replaced(Self::with_children(
                    node.key.clone(),
                    node.value.clone(),
                    Some(new_left),
                    node.right.clone(),
                )),
                Insertion::Added(new_left) => Insertion::Added(Self::balance(
                    node.key.clone(),
                    node.value.clone(),
                    Some(new_left),
                    node.right.clone(),
                )),
            },
            Ordering::Greater => match Self::insert(node.right.as_ref(), key, value) {
                Insertion::Unchanged => Insertion::Unchanged,
                Insertion::Replaced(new_right) => Insertion::Replaced(Self::with_children(
                    node.key.clone(),
                    node.value.clone(),
                    node.left.clone(),
                    Some(new_right),
                )),
                Insertion::Added(new_right) => Insertion::Added(Self::balance(
                    node.key.clone(),
                    node.value.clone(),
                    node.left.clone(),
                    Some(new_right),
                )),
            },
            Ordering::Equal if node.value == value => Insertion::Unchanged,
            Ordering::Equal => Insertion::Replaced(Self::with_children(
                key,
                value,
                node.left.clone(),
                node.right.clone(),
            )),
        }
    }

    /// Removes `key`. `None` means the key was absent.
    fn remove<Q>(node: &ReferenceCounter<Self>, key: &Q) -> Option<Link<K, V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match key.cmp(node.key.borrow()) {
            Ordering::Less => {
                let new_left = Self::remove(node.left.as_ref()?, key)?;
                Some(Some(Self::balance(
                    node.key.clone(),
                    node.value.clone(),
                    new_left,
                    node.right.clone(),
                )))
            }
            Ordering::Greater => {
                let new_right = Self::remove(node.right.as_ref()?, key)?;
                Some(Some(Self::balance(
                    node.key.clone(),
                    node.value.clone(),
                    node.left.clone(),
                    new_right,
                )))
            }
            Ordering::Equal => Some(match (&node.left, &node.right) {
                (None, None) => None,
                (Some(left), None) => Some(left.clone()),
                (None, Some(right)) => Some(right.clone()),
                (Some(left), Some(right)) => {
                    let (successor_key, successor_value, new_right) = Self::remove_min(right);
                    Some(Self::balance(
                        successor_key,
                        successor_value,
                        Some(left.clone()),
                        new_right,
                    ))
                }
            }),
        }
    }

    /// Verifies ordering, balance and size bookkeeping; returns the subtree
    /// size.
    fn check<'a>(node: &'a Self, lower: &mut Option<&'a K>) -> Result<usize, InvariantViolation> {
        let left_size = match &node.left {
            Some(left) => Self::check(left, lower)?,
            None => 0,
        };

        if lower.is_some_and(|previous| *previous >= node.key) {
            return Err(InvariantViolation::UnorderedCollisionTree);
        }
        *lower = Some(&node.key);

        let right_size = match &node.right {
            Some(right) => Self::check(right, lower)?,
            None => 0,
        };

        let computed = 1 + height(node.left.as_ref()).max(height(node.right.as_ref()));
        if node.height != computed || node.balance_factor().abs() > 1 {
            return Err(InvariantViolation::UnbalancedCollisionTree {
                recorded: node.height,
                computed,
            });
        }

        let counted = 1 + left_size + right_size;
        if node.size != counted {
            return Err(InvariantViolation::CollisionCountMismatch {
                recorded: node.size,
                counted,
            });
        }

        Ok(counted)
    }
}

/// Colliding entries of a tree-resolved bucket.
pub struct CollisionTree<K, V> {
    root: ReferenceCounter<TreeNode<K, V>>,
}

impl<K, V> Clone for CollisionTree<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> CollisionResolver<K, V> for TreeResolver {
    type Entries = CollisionTree<K, V>;

    fn pair(first: (K, V), second: (K, V)) -> Self::Entries {
        let (low, high) = if first.0 < second.0 {
            (first, second)
        } else {
            (second, first)
        };
        CollisionTree {
            root: TreeNode::with_children(low.0, low.1, None, Some(TreeNode::leaf(high.0, high.1))),
        }
    }

    fn insert(entries: &Self::Entries, key: K, value: V) -> Insertion<Self::Entries>
    where
        V: PartialEq,
    {
        match TreeNode::insert(Some(&entries.root), key, value) {
            Insertion::Unchanged => Insertion::Unchanged,
            Insertion::Replaced(root) => Insertion::Replaced(CollisionTree { root }),
            Insertion::Added(root) => Insertion::Added(CollisionTree { root }),
        }
    }

    fn len(entries: &Self::Entries) -> usize {
        entries.root.size
    }

    fn entry_at(entries: &Self::Entries, mut index: usize) -> Option<(&K, &V)> {
        let mut node = &entries.root;
        loop {
            let left_size = size(node.left.as_ref());
            match index.cmp(&left_size) {
                Ordering::Less => node = node.left.as_ref()?,
                Ordering::Equal => return Some((&node.key, &node.value)),
                Ordering::Greater => {
                    index -= left_size + 1;
                    node = node.right.as_ref()?;
                }
            }
        }
    }

    fn check(entries: &Self::Entries) -> Result<(), InvariantViolation> {
        let counted = TreeNode::check(&entries.root, &mut None)?;
        if counted < 2 {
            return Err(InvariantViolation::UnderfilledBucket { entries: counted });
        }
        Ok(())
    }
}

impl<K, V, Q> ResolverLookup<K, V, Q> for TreeResolver
where
    K: Ord + Clone + Borrow<Q>,
    V: Clone,
    Q: Ord + ?Sized,
{
    fn find<'a>(entries: &'a Self::Entries, key: &Q) -> Option<(&'a K, &'a V)> {
        let mut node = &entries.root;
        loop {
            match key.cmp(node.key.borrow()) {
                Ordering::Less => node = node.left.as_ref()?,
                Ordering::Greater => node = node.right.as_ref()?,
                Ordering::Equal => return Some((&node.key, &node.value)),
            }
        }
    }

    fn remove(entries: &Self::Entries, key: &Q) -> Deletion<Self::Entries, K, V> {
        match TreeNode::remove(&entries.root, key) {
            None => Deletion::Absent,
            Some(Some(root)) if root.size >= 2 => Deletion::Remaining(CollisionTree { root }),
            Some(Some(root)) => Deletion::Last(root.key.clone(), root.value.clone()),
            // A collision tree always holds two entries, so one survives.
            Some(None) => unreachable!("collision tree emptied by a single removal"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
