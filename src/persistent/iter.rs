//! Lazy traversal of a trie.
//!
//! Iteration walks the frozen tree directly with an explicit stack of frames,
//! one per node on the current path. A frame is a slice of child slots plus a
//! `[position, limit)` window, so the unvisited part of the trie is always
//! described by the stack alone. That makes the traversal splittable: cutting
//! the outermost window in two divides the remaining entries into a prefix
//! and a suffix without touching the tree.

use std::iter::FusedIterator;

use super::bucket::Bucket;
use super::resolver::CollisionResolver;
use super::trie::{Child, TrieNode};

// =============================================================================
// Traversal
// =============================================================================

struct Frame<'a, K, V, R: CollisionResolver<K, V>> {
    children: &'a [Child<K, V, R>],
    position: usize,
    limit: usize,
}

impl<'a, K, V, R: CollisionResolver<K, V>> Frame<'a, K, V, R> {
    const fn whole(children: &'a [Child<K, V, R>]) -> Self {
        Self {
            children,
            position: 0,
            limit: children.len(),
        }
    }

    const fn rest(&self) -> Self {
        Self {
            children: self.children,
            position: self.position,
            limit: self.limit,
        }
    }

    const fn remaining(&self) -> usize {
        self.limit - self.position
    }
}

/// Cursor over the `[position, limit)` window of one bucket's entries.
struct BucketCursor<'a, K, V, R: CollisionResolver<K, V>> {
    bucket: &'a Bucket<K, V, R>,
    position: usize,
    limit: usize,
}

impl<'a, K, V, R: CollisionResolver<K, V>> BucketCursor<'a, K, V, R> {
    fn whole(bucket: &'a Bucket<K, V, R>) -> Self {
        Self {
            bucket,
            position: 0,
            limit: bucket.len(),
        }
    }

    const fn remaining(&self) -> usize {
        self.limit - self.position
    }
}

pub(crate) struct Traversal<'a, K, V, R: CollisionResolver<K, V>> {
    stack: Vec<Frame<'a, K, V, R>>,
    bucket: Option<BucketCursor<'a, K, V, R>>,
}

impl<'a, K, V, R: CollisionResolver<K, V>> Traversal<'a, K, V, R> {
    pub(crate) fn new(root: &'a TrieNode<K, V, R>) -> Self {
        Self {
            stack: vec![Frame::whole(root.children())],
            bucket: None,
        }
    }

    /// Moves the upper part of the unvisited entries into a new traversal.
    ///
    /// The outermost frame with at least two unvisited slots is cut in the
    /// middle. The new traversal takes the upper half of that frame together
    /// with whatever is left in the frames around it, so `self` keeps a
    /// prefix of the remaining order and the result the matching suffix.
    /// While every frame has at most one slot left, the outermost single
    /// subtrie is opened in place so its children can be cut instead. Once
    /// only buckets remain, the next bucket becomes the active cursor and
    /// the cut falls either after the cursor or inside its entry window.
    /// Returns `None` when at most one entry is left.
    pub(crate) fn split(&mut self) -> Option<Self> {
        loop {
            if let Some(level) = self.stack.iter().position(|frame| frame.remaining() >= 2) {
                let mut stack: Vec<Frame<'a, K, V, R>> =
                    self.stack[..level].iter().map(Frame::rest).collect();
                for frame in &mut self.stack[..level] {
                    frame.limit = frame.position;
                }

                let frame = &mut self.stack[level];
                let middle = frame.position + frame.remaining() / 2;
                stack.push(Frame {
                    children: frame.children,
                    position: middle,
                    limit: frame.limit,
                });
                frame.limit = middle;
                return Some(Self {
                    stack,
                    bucket: None,
                });
            }

            let single_node = self.stack.iter().enumerate().find_map(|(level, frame)| {
                let children = frame.children;
                match children.get(frame.position) {
                    Some(Child::Node(node)) if frame.remaining() == 1 => Some((level, node)),
                    _ => None,
                }
            });
            if let Some((level, node)) = single_node {
                self.stack[level].position += 1;
                self.stack.insert(level + 1, Frame::whole(node.children()));
                continue;
            }

            // Every frame now holds at most one bucket slot.
            let pending = self.bucket.as_ref().map_or(0, |cursor| cursor.remaining());
            let next_slot = self.stack.iter().rposition(|frame| frame.remaining() == 1);
            match (pending, next_slot) {
                (0, Some(level)) => {
                    let frame = &mut self.stack[level];
                    let children = frame.children;
                    let child = &children[frame.position];
                    frame.position += 1;
                    match child {
                        Child::Bucket(bucket) => self.bucket = Some(BucketCursor::whole(bucket)),
                        Child::Node(node) => {
                            self.stack.insert(level + 1, Frame::whole(node.children()));
                        }
                    }
                }
                (0 | 1, None) => return None,
                (_, Some(_)) => {
                    let stack = self.stack.iter().map(Frame::rest).collect();
                    for frame in &mut self.stack {
                        frame.limit = frame.position;
                    }
                    return Some(Self {
                        stack,
                        bucket: None,
                    });
                }
                (_, None) => {
                    let cursor = self.bucket.as_mut()?;
                    let middle = cursor.position + cursor.remaining() / 2;
                    let upper = BucketCursor {
                        bucket: cursor.bucket,
                        position: middle,
                        limit: cursor.limit,
                    };
                    cursor.limit = middle;
                    return Some(Self {
                        stack: Vec::new(),
                        bucket: Some(upper),
                    });
                }
            }
        }
    }
}

impl<'a, K, V, R: CollisionResolver<K, V>> Iterator for Traversal<'a, K, V, R> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cursor) = &mut self.bucket {
                if cursor.position < cursor.limit
                    && let Some(entry) = cursor.bucket.entry_at(cursor.position)
                {
                    cursor.position += 1;
                    return Some(entry);
                }
                self.bucket = None;
            }

            let frame = self.stack.last_mut()?;
            if frame.position == frame.limit {
                self.stack.pop();
                continue;
            }

            let children = frame.children;
            let child = &children[frame.position];
            frame.position += 1;
            match child {
                Child::Bucket(bucket) => {
                    self.bucket = Some(BucketCursor::whole(bucket));
                }
                Child::Node(node) => self.stack.push(Frame::whole(node.children())),
            }
        }
    }
}

// =============================================================================
// PersistentHashMapIterator
// =============================================================================

/// Iterator over the entries of a container, in trie order.
///
/// Created by `iter` on [`PersistentHashMap`](super::PersistentHashMap).
/// Knows its exact length.
pub struct PersistentHashMapIterator<'a, K, V, R: CollisionResolver<K, V>> {
    traversal: Traversal<'a, K, V, R>,
    remaining: usize,
}

impl<'a, K, V, R: CollisionResolver<K, V>> PersistentHashMapIterator<'a, K, V, R> {
    pub(crate) fn new(root: &'a TrieNode<K, V, R>, length: usize) -> Self {
        Self {
            traversal: Traversal::new(root),
            remaining: length,
        }
    }
}

impl<'a, K, V, R: CollisionResolver<K, V>> Iterator for PersistentHashMapIterator<'a, K, V, R> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.traversal.next()?;
        self.remaining -= 1;
        Some(entry)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, R: CollisionResolver<K, V>> ExactSizeIterator for PersistentHashMapIterator<'_, K, V, R> {
    #[inline]
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V, R: CollisionResolver<K, V>> FusedIterator for PersistentHashMapIterator<'_, K, V, R> {}

// =============================================================================
// PersistentHashMapSplitIterator
// =============================================================================

/// Iterator that can divide its remaining entries between two owners.
///
/// Each half is itself splittable and can be consumed independently, for
/// example on another thread. Splitting never visits an entry twice and
/// never drops one.
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::persistent::PersistentHashMap;
///
/// let map: PersistentHashMap<i32, i32> = (0..1000).map(|key| (key, key * 2)).collect();
/// let mut first = map.split_iter();
/// let second = first.split().expect("a large map splits");
///
/// let mut seen: Vec<i32> = first.chain(second).map(|(key, _)| *key).collect();
/// seen.sort_unstable();
/// assert_eq!(seen, (0..1000).collect::<Vec<_>>());
/// ```
pub struct PersistentHashMapSplitIterator<'a, K, V, R: CollisionResolver<K, V>> {
    traversal: Traversal<'a, K, V, R>,
    upper_bound: usize,
}

impl<'a, K, V, R: CollisionResolver<K, V>> PersistentHashMapSplitIterator<'a, K, V, R> {
    pub(crate) fn new(root: &'a TrieNode<K, V, R>, length: usize) -> Self {
        Self {
            traversal: Traversal::new(root),
            upper_bound: length,
        }
    }

    /// Splits off roughly half of the unvisited entries.
    ///
    /// After the call `self` covers the entries before the cut and the
    /// returned iterator the entries after it. Returns `None` when at most
    /// one entry is left.
    pub fn split(&mut self) -> Option<Self> {
        let traversal = self.traversal.split()?;
        Some(Self {
            traversal,
            upper_bound: self.upper_bound,
        })
    }
}

impl<'a, K, V, R: CollisionResolver<K, V>> Iterator for PersistentHashMapSplitIterator<'a, K, V, R> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.traversal.next()?;
        self.upper_bound = self.upper_bound.saturating_sub(1);
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.upper_bound))
    }
}

impl<K, V, R: CollisionResolver<K, V>> FusedIterator for PersistentHashMapSplitIterator<'_, K, V, R> {}

// =============================================================================
// PersistentHashMapIntoIterator
// =============================================================================

/// Owning iterator over the entries of a container.
///
/// Holds reference-counted handles to the unvisited subtries and clones
/// entries out of the shared tree as it goes.
pub struct PersistentHashMapIntoIterator<K, V, R: CollisionResolver<K, V>> {
    pending: Vec<Child<K, V, R>>,
    buffer: Vec<(K, V)>,
    remaining: usize,
}

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> PersistentHashMapIntoIterator<K, V, R> {
    pub(crate) fn new(root: &TrieNode<K, V, R>, length: usize) -> Self {
        Self {
            pending: root.children().iter().rev().cloned().collect(),
            buffer: Vec::new(),
            remaining: length,
        }
    }
}

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> Iterator for PersistentHashMapIntoIterator<K, V, R> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop() {
                self.remaining -= 1;
                return Some(entry);
            }

            match self.pending.pop()? {
                Child::Bucket(Bucket::Single(key, value)) => {
                    self.remaining -= 1;
                    return Some((key, value));
                }
                Child::Bucket(bucket) => {
                    self.buffer.extend(
                        (0..bucket.len())
                            .rev()
                            .filter_map(|index| bucket.entry_at(index))
                            .map(|(key, value)| (key.clone(), value.clone())),
                    );
                }
                Child::Node(node) => {
                    self.pending.extend(node.children().iter().rev().cloned());
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> ExactSizeIterator for PersistentHashMapIntoIterator<K, V, R> {}

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> FusedIterator for PersistentHashMapIntoIterator<K, V, R> {}

// =============================================================================
// Tests
// =============================================================================
