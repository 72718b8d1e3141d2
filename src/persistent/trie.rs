//! The 32-way hash array mapped trie shared by the set and map containers.
//!
//! A trie is seven levels deep. The node at depth `d` selects a child with
//! bits `5(d-1)..5d` of the hash code, so the root (depth 7) sees the top two
//! bits and depth-1 nodes pick one of 32 buckets with the lowest five bits.
//!
//! Nodes come in four shapes:
//!
//! - `Empty`: the root of an empty container. Never stored below the root.
//! - `Single`: one occupied slot, no child array.
//! - `Branch`: an occupancy bitmap plus a compacted child array.
//! - `Full`: all 32 slots occupied by full children; no bitmap.
//!
//! Every operation is a pure function from an old node to a new one. An
//! operation that changes nothing reports so (`None` or [`Removal::Absent`])
//! and the caller keeps its original handle, which is what makes repeated
//! inserts and absent removals identity-preserving.

use std::borrow::Borrow;

use super::ReferenceCounter;
use super::bucket::{Bucket, Removal};
use super::hashing::{BITS_PER_LEVEL, BRANCHING_FACTOR, ROOT_DEPTH, capacity_at_depth, slot_index};
use super::invariant::InvariantViolation;
use super::resolver::{CollisionResolver, Insertion, ResolverLookup};

// =============================================================================
// Node Definition
// =============================================================================

pub(crate) enum TrieNode<K, V, R: CollisionResolver<K, V>> {
    Empty,
    Single {
        depth: u8,
        index: u8,
        child: Child<K, V, R>,
    },
    Branch {
        depth: u8,
        bitmap: u32,
        children: ReferenceCounter<[Child<K, V, R>]>,
    },
    Full {
        depth: u8,
        children: ReferenceCounter<[Child<K, V, R>]>,
    },
}

/// Occupant of a trie slot: a bucket below depth 1, a subtrie elsewhere.
pub(crate) enum Child<K, V, R: CollisionResolver<K, V>> {
    Bucket(Bucket<K, V, R>),
    Node(ReferenceCounter<TrieNode<K, V, R>>),
}

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> Clone for TrieNode<K, V, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Single {
                depth,
                index,
                child,
            } => Self::Single {
                depth: *depth,
                index: *index,
                child: child.clone(),
            },
            Self::Branch {
                depth,
                bitmap,
                children,
            } => Self::Branch {
                depth: *depth,
                bitmap: *bitmap,
                children: children.clone(),
            },
            Self::Full { depth, children } => Self::Full {
                depth: *depth,
                children: children.clone(),
            },
        }
    }
}

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> Clone for Child<K, V, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Bucket(bucket) => Self::Bucket(bucket.clone()),
            Self::Node(node) => Self::Node(node.clone()),
        }
    }
}

/// Position of `bit` in a compacted child array.
#[inline]
fn compact_position(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

// =============================================================================
// Read-only operations
// =============================================================================

impl<K, V, R: CollisionResolver<K, V>> TrieNode<K, V, R> {
    /// Children in ascending slot order.
    pub(crate) fn children(&self) -> &[Child<K, V, R>] {
        match self {
            Self::Empty => &[],
            Self::Single { child, .. } => std::slice::from_ref(child),
            Self::Branch { children, .. } | Self::Full { children, .. } => children,
        }
    }

    /// The child occupying the slot `hash` selects at this node.
    fn child_for(&self, hash: u32) -> Option<&Child<K, V, R>> {
        match self {
            Self::Empty => None,
            Self::Single {
                depth,
                index,
                child,
            } => (slot_index(hash, *depth) == usize::from(*index)).then_some(child),
            Self::Branch {
                depth,
                bitmap,
                children,
            } => {
                let bit = 1u32 << slot_index(hash, *depth);
                if bitmap & bit == 0 {
                    None
                } else {
                    Some(&children[compact_position(*bitmap, bit)])
                }
            }
            Self::Full { depth, children } => Some(&children[slot_index(hash, *depth)]),
        }
    }

    /// Identity comparison of two roots.
    ///
    /// Two roots are identical when they share their child storage. Empty
    /// roots are always identical.
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (
                Self::Single {
                    index: left_index,
                    child: left_child,
                    ..
                },
                Self::Single {
                    index: right_index,
                    child: right_child,
                    ..
                },
            ) => left_index == right_index && left_child.ptr_eq(right_child),
            (
                Self::Branch {
                    children: left, ..
                },
                Self::Branch {
                    children: right, ..
                },
            )
            | (
                Self::Full {
                    children: left, ..
                },
                Self::Full {
                    children: right, ..
                },
            ) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Counts entries by traversal.
    pub(crate) fn count(&self) -> usize {
        self.children().iter().map(Child::count).sum()
    }

    /// Verifies the structure below this root and returns its entry count.
    ///
    /// `hash_of` computes the hash code a key is expected to be stored under.
    pub(crate) fn check_invariants(
        &self,
        hash_of: &impl Fn(&K) -> u32,
    ) -> Result<usize, InvariantViolation> {
        match self {
            Self::Empty => Ok(0),
            _ => self
                .check_node(ROOT_DEPTH, 0, hash_of)
                .map(|(entries, _)| entries),
        }
    }

    /// Returns `(entries, occupied bucket slots)` below this node.
    fn check_node(
        &self,
        expected_depth: u8,
        prefix: u32,
        hash_of: &impl Fn(&K) -> u32,
    ) -> Result<(usize, u64), InvariantViolation> {
        let (depth, slots) = match self {
            Self::Empty => {
                return Err(InvariantViolation::NestedEmpty {
                    depth: expected_depth + 1,
                });
            }
            Self::Single { depth, index, .. } => (*depth, vec![u32::from(*index)]),
            Self::Branch {
                depth,
                bitmap,
                children,
            } => {
                if bitmap.count_ones() as usize != children.len() {
                    return Err(InvariantViolation::BitmapMismatch {
                        depth: *depth,
                        bits: bitmap.count_ones(),
                        children: children.len(),
                    });
                }
                if children.len() < 2 {
                    return Err(InvariantViolation::UnderfilledBranch {
                        depth: *depth,
                        children: children.len(),
                    });
                }
                if children.len() == BRANCHING_FACTOR && children.iter().all(Child::is_full) {
                    return Err(InvariantViolation::MissedPromotion { depth: *depth });
                }
                let slots = (0..u32::BITS).filter(|slot| bitmap & (1u32 << slot) != 0).collect();
                (*depth, slots)
            }
            Self::Full { depth, children } => {
                if children.len() != BRANCHING_FACTOR {
                    return Err(InvariantViolation::BitmapMismatch {
                        depth: *depth,
                        bits: u32::BITS,
                        children: children.len(),
                    });
                }
                (*depth, (0..u32::BITS).collect())
            }
        };

        if depth != expected_depth {
            return Err(InvariantViolation::DepthMismatch {
                expected: expected_depth,
                found: depth,
            });
        }

        let shift = BITS_PER_LEVEL * u32::from(depth - 1);
        let mut entries = 0;
        let mut buckets = 0;
        for (slot, child) in slots.into_iter().zip(self.children()) {
            let child_prefix = prefix | (slot << shift);
            match child {
                Child::Bucket(bucket) if depth == 1 => {
                    entries += bucket.check(child_prefix, hash_of)?;
                    buckets += 1;
                }
                Child::Node(node) if depth > 1 => {
                    let (child_entries, child_buckets) =
                        node.check_node(depth - 1, child_prefix, hash_of)?;
                    entries += child_entries;
                    buckets += child_buckets;
                }
                _ => return Err(InvariantViolation::MisplacedChild { depth }),
            }
        }

        if matches!(self, Self::Full { .. }) && buckets != capacity_at_depth(depth) {
            return Err(InvariantViolation::FalseFull {
                depth,
                buckets,
                capacity: capacity_at_depth(depth),
            });
        }

        Ok((entries, buckets))
    }
}

impl<K, V, R: CollisionResolver<K, V>> Child<K, V, R> {
    /// A child is full when every bucket slot below it is occupied.
    fn is_full(&self) -> bool {
        match self {
            Self::Bucket(_) => true,
            Self::Node(node) => matches!(**node, TrieNode::Full { .. }),
        }
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Node(left), Self::Node(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    fn count(&self) -> usize {
        match self {
            Self::Bucket(bucket) => bucket.len(),
            Self::Node(node) => node.count(),
        }
    }
}

impl<K: Eq + Clone, V: Clone, R: CollisionResolver<K, V>> TrieNode<K, V, R> {
    pub(crate) fn find<Q>(&self, hash: u32, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        let mut node = self;
        loop {
            match node.child_for(hash)? {
                Child::Bucket(bucket) => return bucket.find(key),
                Child::Node(child) => node = child,
            }
        }
    }
}

// =============================================================================
// Construction and normalization
// =============================================================================

impl<K: Eq + Clone, V: Clone, R: CollisionResolver<K, V>> TrieNode<K, V, R> {
    /// Builds the canonical node for a set of children at `depth`.
    ///
    /// One child becomes `Single`, 32 full children become `Full`, anything
    /// else is a `Branch`. Every mutation funnels through here, so promotion
    /// and demotion happen in one place.
    #[allow(clippy::cast_possible_truncation)]
    fn from_children(depth: u8, bitmap: u32, children: Vec<Child<K, V, R>>) -> Self {
        match <[Child<K, V, R>; 1]>::try_from(children) {
            Ok([child]) => Self::Single {
                depth,
                index: bitmap.trailing_zeros() as u8,
                child,
            },
            Err(children)
                if children.len() == BRANCHING_FACTOR && children.iter().all(Child::is_full) =>
            {
                Self::Full {
                    depth,
                    children: ReferenceCounter::from(children),
                }
            }
            Err(children) => Self::Branch {
                depth,
                bitmap,
                children: ReferenceCounter::from(children),
            },
        }
    }

    /// A chain of `Single` nodes from `depth` down to one new bucket.
    #[allow(clippy::cast_possible_truncation)]
    fn chain(depth: u8, hash: u32, key: K, value: V) -> Self {
        Self::Single {
            depth,
            index: slot_index(hash, depth) as u8,
            child: Child::fresh(depth, hash, key, value),
        }
    }

    // =========================================================================
    // Assign
    // =========================================================================

    /// Inserts or replaces an entry.
    ///
    /// Returns `None` when the entry was already present with an equal
    /// value. `delta` is incremented when a new entry is added.
    pub(crate) fn assign(&self, hash: u32, key: K, value: V, delta: &mut isize) -> Option<Self>
    where
        V: PartialEq,
    {
        match self {
            Self::Empty => {
                *delta += 1;
                Some(Self::chain(ROOT_DEPTH, hash, key, value))
            }
            Self::Single {
                depth,
                index,
                child,
            } => {
                let slot = slot_index(hash, *depth);
                let existing = usize::from(*index);
                if slot == existing {
                    let new_child = child.assign(*depth, hash, key, value, delta)?;
                    return Some(Self::Single {
                        depth: *depth,
                        index: *index,
                        child: new_child,
                    });
                }

                *delta += 1;
                let fresh = Child::fresh(*depth, hash, key, value);
                let children = if slot < existing {
                    vec![fresh, child.clone()]
                } else {
                    vec![child.clone(), fresh]
                };
                let bitmap = (1u32 << slot) | (1u32 << existing);
                Some(Self::from_children(*depth, bitmap, children))
            }
            Self::Branch {
                depth,
                bitmap,
                children,
            } => {
                let bit = 1u32 << slot_index(hash, *depth);
                let position = compact_position(*bitmap, bit);
                if bitmap & bit == 0 {
                    *delta += 1;
                    let mut new_children = Vec::with_capacity(children.len() + 1);
                    new_children.extend_from_slice(&children[..position]);
                    new_children.push(Child::fresh(*depth, hash, key, value));
                    new_children.extend_from_slice(&children[position..]);
                    return Some(Self::from_children(*depth, bitmap | bit, new_children));
                }

                let new_child = children[position].assign(*depth, hash, key, value, delta)?;
                let mut new_children = children.to_vec();
                new_children[position] = new_child;
                Some(Self::from_children(*depth, *bitmap, new_children))
            }
            Self::Full { depth, children } => {
                let slot = slot_index(hash, *depth);
                let new_child = children[slot].assign(*depth, hash, key, value, delta)?;
                let mut new_children = children.to_vec();
                new_children[slot] = new_child;
                Some(Self::from_children(*depth, u32::MAX, new_children))
            }
        }
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Removes the entry for `key`. `delta` is decremented when one is found.
    pub(crate) fn remove<Q>(&self, hash: u32, key: &Q, delta: &mut isize) -> Removal<Self>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        match self {
            Self::Empty => Removal::Absent,
            Self::Single {
                depth,
                index,
                child,
            } => {
                if slot_index(hash, *depth) != usize::from(*index) {
                    return Removal::Absent;
                }
                match child.remove(hash, key, delta) {
                    Removal::Absent => Removal::Absent,
                    Removal::Emptied => Removal::Emptied,
                    Removal::Replaced(new_child) => Removal::Replaced(Self::Single {
                        depth: *depth,
                        index: *index,
                        child: new_child,
                    }),
                }
            }
            Self::Branch {
                depth,
                bitmap,
                children,
            } => {
                let bit = 1u32 << slot_index(hash, *depth);
                if bitmap & bit == 0 {
                    return Removal::Absent;
                }
                let position = compact_position(*bitmap, bit);
                Self::remove_at(*depth, *bitmap, children, position, bit, hash, key, delta)
            }
            Self::Full { depth, children } => {
                let slot = slot_index(hash, *depth);
                Self::remove_at(*depth, u32::MAX, children, slot, 1u32 << slot, hash, key, delta)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn remove_at<Q>(
        depth: u8,
        bitmap: u32,
        children: &[Child<K, V, R>],
        position: usize,
        bit: u32,
        hash: u32,
        key: &Q,
        delta: &mut isize,
    ) -> Removal<Self>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        match children[position].remove(hash, key, delta) {
            Removal::Absent => Removal::Absent,
            Removal::Emptied => {
                let mut new_children = children.to_vec();
                new_children.remove(position);
                Removal::Replaced(Self::from_children(depth, bitmap & !bit, new_children))
            }
            Removal::Replaced(new_child) => {
                let mut new_children = children.to_vec();
                new_children[position] = new_child;
                Removal::Replaced(Self::from_children(depth, bitmap, new_children))
            }
        }
    }
}

impl<K: Eq + Clone, V: Clone, R: CollisionResolver<K, V>> Child<K, V, R> {
    /// The child placed in an empty slot of a node at `parent_depth`.
    fn fresh(parent_depth: u8, hash: u32, key: K, value: V) -> Self {
        if parent_depth == 1 {
            Self::Bucket(Bucket::Single(key, value))
        } else {
            Self::Node(ReferenceCounter::new(TrieNode::chain(
                parent_depth - 1,
                hash,
                key,
                value,
            )))
        }
    }

    fn assign(
        &self,
        parent_depth: u8,
        hash: u32,
        key: K,
        value: V,
        delta: &mut isize,
    ) -> Option<Self>
    where
        V: PartialEq,
    {
        match self {
            Self::Bucket(bucket) => match bucket.insert(key, value) {
                Insertion::Unchanged => None,
                Insertion::Replaced(bucket) => Some(Self::Bucket(bucket)),
                Insertion::Added(bucket) => {
                    *delta += 1;
                    Some(Self::Bucket(bucket))
                }
            },
            Self::Node(node) => {
                debug_assert!(parent_depth > 1);
                node.assign(hash, key, value, delta)
                    .map(|node| Self::Node(ReferenceCounter::new(node)))
            }
        }
    }

    fn remove<Q>(&self, hash: u32, key: &Q, delta: &mut isize) -> Removal<Self>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        match self {
            Self::Bucket(bucket) => match bucket.remove(key) {
                Removal::Absent => Removal::Absent,
                Removal::Emptied => {
                    *delta -= 1;
                    Removal::Emptied
                }
                Removal::Replaced(bucket) => {
                    *delta -= 1;
                    Removal::Replaced(Self::Bucket(bucket))
                }
            },
            Self::Node(node) => match node.remove(hash, key, delta) {
                Removal::Absent => Removal::Absent,
                Removal::Emptied => Removal::Emptied,
                Removal::Replaced(node) => Removal::Replaced(Self::Node(ReferenceCounter::new(node))),
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
