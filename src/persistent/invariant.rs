//! Structural invariant violations reported by `check_invariants`.

use std::fmt;

/// A broken structural invariant found by `check_invariants`.
///
/// These are never produced by correct code; they exist for test and fuzz
/// harnesses that want to validate a container after every step.
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::persistent::PersistentHashSet;
///
/// let set: PersistentHashSet<i32> = (0..100).collect();
/// assert!(set.check_invariants().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvariantViolation {
    /// A node sits at a different depth than its position in the trie implies.
    DepthMismatch {
        /// Depth implied by the path from the root.
        expected: u8,
        /// Depth recorded in the node.
        found: u8,
    },
    /// An `Empty` node appears somewhere other than the root.
    NestedEmpty {
        /// Depth of the parent slot holding the empty node.
        depth: u8,
    },
    /// A branch bitmap does not agree with its child array.
    BitmapMismatch {
        /// Depth of the offending node.
        depth: u8,
        /// Number of bits set in the bitmap.
        bits: u32,
        /// Number of children stored.
        children: usize,
    },
    /// A branch holds fewer than two children and should be a single node.
    UnderfilledBranch {
        /// Depth of the offending node.
        depth: u8,
        /// Number of children stored.
        children: usize,
    },
    /// A branch whose 32 children are all full was not promoted.
    MissedPromotion {
        /// Depth of the offending node.
        depth: u8,
    },
    /// A node classified as full does not occupy all of its bucket slots.
    FalseFull {
        /// Depth of the offending node.
        depth: u8,
        /// Occupied bucket slots below the node.
        buckets: u64,
        /// Bucket slots available at this depth.
        capacity: u64,
    },
    /// A node's children are placed at the wrong depth for their kind.
    MisplacedChild {
        /// Depth of the parent node.
        depth: u8,
    },
    /// A key is stored in a bucket its hash does not lead to.
    MisplacedKey {
        /// Hash code implied by the bucket's path.
        expected: u32,
        /// Hash code of the stored key.
        found: u32,
    },
    /// A multi-value bucket holds fewer than two entries.
    UnderfilledBucket {
        /// Number of entries in the bucket.
        entries: usize,
    },
    /// The same key appears twice in one bucket.
    DuplicateKey,
    /// A tree-resolved bucket is not in strictly ascending key order.
    UnorderedCollisionTree,
    /// A tree-resolved bucket violates its height balance.
    UnbalancedCollisionTree {
        /// Height recorded in the offending node.
        recorded: u8,
        /// Height computed from its children.
        computed: u8,
    },
    /// The recorded entry count of a collision structure is wrong.
    CollisionCountMismatch {
        /// Count stored in the structure.
        recorded: usize,
        /// Entries actually reachable.
        counted: usize,
    },
    /// The container's cached size differs from the number of entries.
    SizeMismatch {
        /// Size cached in the container.
        recorded: usize,
        /// Entries counted by traversal.
        counted: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepthMismatch { expected, found } => {
                write!(formatter, "node at depth {found}, expected depth {expected}")
            }
            Self::NestedEmpty { depth } => {
                write!(formatter, "empty node below depth {depth}")
            }
            Self::BitmapMismatch {
                depth,
                bits,
                children,
            } => write!(
                formatter,
                "branch at depth {depth} has {bits} bitmap bits but {children} children"
            ),
            Self::UnderfilledBranch { depth, children } => write!(
                formatter,
                "branch at depth {depth} has only {children} children"
            ),
            Self::MissedPromotion { depth } => write!(
                formatter,
                "branch at depth {depth} has 32 full children but is not full"
            ),
            Self::FalseFull {
                depth,
                buckets,
                capacity,
            } => write!(
                formatter,
                "full node at depth {depth} occupies {buckets} of {capacity} bucket slots"
            ),
            Self::MisplacedChild { depth } => {
                write!(formatter, "node at depth {depth} holds a child of the wrong kind")
            }
            Self::MisplacedKey { expected, found } => write!(
                formatter,
                "key with hash {found:#010x} stored under hash {expected:#010x}"
            ),
            Self::UnderfilledBucket { entries } => {
                write!(formatter, "collision bucket holds only {entries} entries")
            }
            Self::DuplicateKey => write!(formatter, "key stored twice in one bucket"),
            Self::UnorderedCollisionTree => {
                write!(formatter, "collision tree keys are not strictly ascending")
            }
            Self::UnbalancedCollisionTree { recorded, computed } => write!(
                formatter,
                "collision tree node records height {recorded}, computed {computed}"
            ),
            Self::CollisionCountMismatch { recorded, counted } => write!(
                formatter,
                "collision structure records {recorded} entries but holds {counted}"
            ),
            Self::SizeMismatch { recorded, counted } => write!(
                formatter,
                "container records size {recorded} but holds {counted} entries"
            ),
        }
    }
}

impl std::error::Error for InvariantViolation {}
