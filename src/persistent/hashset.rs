//! Persistent (immutable) hash set.
//!
//! This module provides [`PersistentHashSet`], an immutable hash set
//! that uses [`PersistentHashMap`] internally for efficient operations.
//!
//! # Overview
//!
//! `PersistentHashSet` is a wrapper around `PersistentHashMap<T, (), R>` that
//! provides set operations like union, intersection and difference. Like the
//! map, it is generic over the [`CollisionResolver`] used for elements whose
//! hash codes collide.
//!
//! - O(log32 N) contains (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! All operations return new sets without modifying the original,
//! and structural sharing ensures memory efficiency.
//!
//! # Examples
//!
//! ```rust
//! use persistent_hamt::persistent::PersistentHashSet;
//!
//! let set = PersistentHashSet::new()
//!     .insert(1)
//!     .insert(2)
//!     .insert(3);
//!
//! assert!(set.contains(&1));
//! assert!(set.contains(&2));
//! assert!(!set.contains(&4));
//!
//! // Structural sharing: the original set is preserved
//! let updated = set.insert(4);
//! assert_eq!(set.len(), 3);      // Original unchanged
//! assert_eq!(updated.len(), 4);  // New version
//! ```
//!
//! # Set Operations
//!
//! ```rust
//! use persistent_hamt::persistent::PersistentHashSet;
//!
//! let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
//! let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
//!
//! let union = set_a.union(&set_b);               // {1, 2, 3, 4}
//! let intersection = set_a.intersection(&set_b); // {2, 3}
//! let difference = set_a.difference(&set_b);     // {1}
//!
//! assert_eq!(union.len(), 4);
//! assert_eq!(intersection.len(), 2);
//! assert_eq!(difference.len(), 1);
//! ```

use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::{FromIterator, FusedIterator};

use super::hashmap::PersistentHashMap;
use super::invariant::InvariantViolation;
use super::iter::{
    PersistentHashMapIntoIterator, PersistentHashMapIterator, PersistentHashMapSplitIterator,
};
use super::resolver::{CollisionResolver, ListResolver, ResolverLookup, TreeResolver};

// =============================================================================
// Membership
// =============================================================================

/// A structure that can answer membership queries directly.
///
/// Set operations such as [`PersistentHashSet::intersection`] accept any
/// `Membership` source and query it in place instead of copying it.
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::persistent::{Membership, PersistentHashSet};
/// use std::collections::HashSet;
///
/// fn count_members<M: Membership<i32>>(source: &M, candidates: &[i32]) -> usize {
///     candidates.iter().filter(|candidate| source.contains(candidate)).count()
/// }
///
/// let persistent: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
/// let standard: HashSet<i32> = [1, 2, 3].into_iter().collect();
/// assert_eq!(count_members(&persistent, &[1, 5, 3]), 2);
/// assert_eq!(count_members(&standard, &[1, 5, 3]), 2);
/// ```
pub trait Membership<T: ?Sized> {
    /// Returns `true` if `element` is a member.
    fn contains(&self, element: &T) -> bool;
}

impl<T: Hash + Eq, S: BuildHasher> Membership<T> for HashSet<T, S> {
    fn contains(&self, element: &T) -> bool {
        Self::contains(self, element)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Membership<K> for HashMap<K, V, S> {
    fn contains(&self, element: &K) -> bool {
        self.contains_key(element)
    }
}

impl<T: Ord> Membership<T> for BTreeSet<T> {
    fn contains(&self, element: &T) -> bool {
        Self::contains(self, element)
    }
}

// =============================================================================
// PersistentHashSet Definition
// =============================================================================

/// A persistent (immutable) hash set based on [`PersistentHashMap`].
///
/// `PersistentHashSet` is an immutable data structure that uses structural
/// sharing to efficiently support functional programming patterns.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `contains`     | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::persistent::PersistentHashSet;
///
/// let s0: PersistentHashSet<&str> = PersistentHashSet::new();
/// let s1 = s0.insert("fred");
/// let s2 = s1.insert("fred");
/// let s3 = s2.remove("fred");
///
/// assert!(s1.contains("fred"));
/// assert!(s2.ptr_eq(&s1)); // Re-inserting changes nothing
/// assert!(s3.ptr_eq(&s0)); // Back to the canonical empty set
/// ```
pub struct PersistentHashSet<T, R: CollisionResolver<T, ()> = ListResolver> {
    inner: PersistentHashMap<T, (), R>,
}

/// A [`PersistentHashSet`] whose colliding elements are kept in balanced
/// trees.
pub type OrderedKeyHashSet<T> = PersistentHashSet<T, TreeResolver>;

impl<T: Clone, R: CollisionResolver<T, ()>> Clone for PersistentHashSet<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Hash + Eq + Clone> PersistentHashSet<T> {
    /// Creates a new empty set with list-based collision resolution.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set: PersistentHashSet<i32> = PersistentHashSet::new();
    /// assert!(set.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::empty()
    }

    /// Creates a set containing a single element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::singleton(42);
    /// assert_eq!(set.len(), 1);
    /// assert!(set.contains(&42));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::empty().insert(element)
    }
}

impl<T: Hash + Ord + Clone> PersistentHashSet<T, TreeResolver> {
    /// Creates a new empty set whose colliding elements are kept in
    /// balanced trees.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::new_ordered().insert("b").insert("a");
    /// assert_eq!(set.len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn new_ordered() -> Self {
        Self::empty()
    }
}

impl<T, R: CollisionResolver<T, ()>> PersistentHashSet<T, R> {
    /// Returns the empty set for this resolver.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            inner: PersistentHashMap::empty(),
        }
    }

    /// Returns the number of elements in the set.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if both sets are the same instance.
    ///
    /// See [`PersistentHashMap::ptr_eq`].
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// Returns an iterator over the elements.
    ///
    /// The iteration order follows the hash codes of the elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set: PersistentHashSet<i32> = [3, 1, 2].into_iter().collect();
    /// let mut elements: Vec<_> = set.iter().copied().collect();
    /// elements.sort_unstable();
    /// assert_eq!(elements, vec![1, 2, 3]);
    /// ```
    #[inline]
    #[must_use]
    pub fn iter(&self) -> PersistentHashSetIterator<'_, T, R> {
        PersistentHashSetIterator {
            inner: self.inner.iter(),
        }
    }

    /// Returns an iterator that can be split into independent halves.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set: PersistentHashSet<u32> = (0..10_000).collect();
    /// let mut lower = set.split_iter();
    /// let upper = lower.split().expect("a large set splits");
    ///
    /// let lower_sum: u64 = lower.map(|value| u64::from(*value)).sum();
    /// let upper_sum: u64 = upper.map(|value| u64::from(*value)).sum();
    /// assert_eq!(lower_sum + upper_sum, (0..10_000u64).sum());
    /// ```
    #[inline]
    #[must_use]
    pub fn split_iter(&self) -> PersistentHashSetSplitIterator<'_, T, R> {
        PersistentHashSetSplitIterator {
            inner: self.inner.split_iter(),
        }
    }

    /// Calls `action` on every element.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&T),
    {
        self.inner.for_each(|element, ()| action(element));
    }
}

impl<T, R> PersistentHashSet<T, R>
where
    T: Hash + Eq + Clone,
    R: CollisionResolver<T, ()>,
{
    /// Returns `true` if the set contains the element.
    ///
    /// The element may be any borrowed form of the set's element type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set = PersistentHashSet::new().insert("hello".to_string());
    /// assert!(set.contains("hello"));
    /// assert!(!set.contains("world"));
    /// ```
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: ResolverLookup<T, (), Q>,
    {
        self.inner.contains_key(element)
    }

    /// Returns the stored element equal to `element`.
    #[must_use]
    pub fn get<Q>(&self, element: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: ResolverLookup<T, (), Q>,
    {
        self.inner.get_key_value(element).map(|(stored, ())| stored)
    }

    /// Adds an element.
    ///
    /// Returns `self` unchanged if the element is already present.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set1 = PersistentHashSet::new().insert(1);
    /// let set2 = set1.insert(2);
    ///
    /// assert_eq!(set1.len(), 1); // Original unchanged
    /// assert_eq!(set2.len(), 2); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Removes an element.
    ///
    /// Returns `self` unchanged if the element is absent, and the empty set
    /// if the last element was removed.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: ResolverLookup<T, (), Q>,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }

    /// Adds every element of `elements`.
    ///
    /// Elements already present are skipped without being cloned, so
    /// `set.union(&other)` copies only what is new.
    ///
    /// # Arguments
    ///
    /// * `elements` - Owned or borrowed elements to add
    ///
    /// # Complexity
    ///
    /// O(m * log32(n + m)) for m incoming elements
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let union = set_a.union(&set_b);
    /// assert_eq!(union.len(), 3);
    ///
    /// let extended = set_a.union(vec![7, 8]);
    /// assert_eq!(extended.len(), 4);
    /// ```
    #[must_use]
    pub fn union<I>(&self, elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
        R: ResolverLookup<T, (), T>,
    {
        elements.into_iter().fold(self.clone(), |set, element| {
            let element: &T = element.borrow();
            if set.contains(element) {
                set
            } else {
                set.insert(element.clone())
            }
        })
    }

    /// Keeps only the elements that are members of `source`.
    ///
    /// `source` is queried in place; use
    /// [`intersection_with`](Self::intersection_with) for one-shot
    /// iterators.
    ///
    /// # Complexity
    ///
    /// O(n) membership queries on `source`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    /// use std::collections::BTreeSet;
    ///
    /// let set: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let filter: BTreeSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let intersection = set.intersection(&filter);
    /// assert_eq!(intersection.len(), 2);
    /// assert!(intersection.contains(&2));
    /// assert!(intersection.contains(&3));
    /// ```
    #[must_use]
    pub fn intersection<M>(&self, source: &M) -> Self
    where
        M: Membership<T> + ?Sized,
        R: ResolverLookup<T, (), T>,
    {
        Self {
            inner: self.inner.intersection(source),
        }
    }

    /// Keeps only the elements that occur in `elements`.
    ///
    /// The iterator is collected into a scratch set before filtering.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set: PersistentHashSet<i32> = (0..10).collect();
    /// let evens = set.intersection_with((0..100).step_by(2));
    /// assert_eq!(evens.len(), 5);
    /// ```
    #[must_use]
    pub fn intersection_with<I>(&self, elements: I) -> Self
    where
        I: IntoIterator<Item = T>,
        R: ResolverLookup<T, (), T>,
    {
        Self {
            inner: self.inner.intersection_with(elements),
        }
    }

    /// Removes every element of `elements`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set: PersistentHashSet<i32> = (0..10).collect();
    /// let trimmed = set.remove_all([0, 1, 2, 99]);
    /// assert_eq!(trimmed.len(), 7);
    /// ```
    #[must_use]
    pub fn remove_all<I>(&self, elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
        R: ResolverLookup<T, (), T>,
    {
        Self {
            inner: self.inner.remove_all(elements),
        }
    }

    /// Removes every element that is a member of `source`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let set_a: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let set_b: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let difference = set_a.difference(&set_b);
    /// assert_eq!(difference.len(), 1);
    /// assert!(difference.contains(&1));
    /// ```
    #[must_use]
    pub fn difference<M>(&self, source: &M) -> Self
    where
        M: Membership<T> + ?Sized,
        R: ResolverLookup<T, (), T>,
    {
        self.iter()
            .filter(|element| source.contains(element))
            .fold(self.clone(), |set, element| set.remove(element))
    }

    /// Returns `true` if every element is a member of `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashSet;
    ///
    /// let small: PersistentHashSet<i32> = [1, 2].into_iter().collect();
    /// let large: PersistentHashSet<i32> = [1, 2, 3].into_iter().collect();
    /// assert!(small.is_subset(&large));
    /// assert!(!large.is_subset(&small));
    /// ```
    #[must_use]
    pub fn is_subset<M>(&self, other: &M) -> bool
    where
        M: Membership<T> + ?Sized,
    {
        self.iter().all(|element| other.contains(element))
    }

    /// Returns `true` if no element is a member of `other`.
    #[must_use]
    pub fn is_disjoint<M>(&self, other: &M) -> bool
    where
        M: Membership<T> + ?Sized,
    {
        !self.iter().any(|element| other.contains(element))
    }

    /// Verifies the internal structure of the set.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.inner.check_invariants()
    }
}

#[cfg(feature = "rayon")]
impl<T, R> PersistentHashSet<T, R>
where
    T: Send + Sync,
    R: CollisionResolver<T, ()>,
    R::Entries: Send + Sync,
{
    /// Returns a parallel iterator over the elements.
    #[must_use]
    pub fn par_iter(&self) -> super::parallel::PersistentHashSetParallelRefIterator<'_, T, R> {
        super::parallel::PersistentHashSetParallelRefIterator::new(self.inner.par_iter())
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIterator<'a, T, R: CollisionResolver<T, ()>> {
    inner: PersistentHashMapIterator<'a, T, (), R>,
}

impl<'a, T, R: CollisionResolver<T, ()>> Iterator for PersistentHashSetIterator<'a, T, R> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, R: CollisionResolver<T, ()>> ExactSizeIterator for PersistentHashSetIterator<'_, T, R> {}

impl<T, R: CollisionResolver<T, ()>> FusedIterator for PersistentHashSetIterator<'_, T, R> {}

/// Splittable iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetSplitIterator<'a, T, R: CollisionResolver<T, ()>> {
    inner: PersistentHashMapSplitIterator<'a, T, (), R>,
}

impl<T, R: CollisionResolver<T, ()>> PersistentHashSetSplitIterator<'_, T, R> {
    /// Splits off roughly half of the unvisited elements.
    ///
    /// See [`PersistentHashMapSplitIterator::split`].
    pub fn split(&mut self) -> Option<Self> {
        self.inner.split().map(|inner| Self { inner })
    }
}

impl<'a, T, R: CollisionResolver<T, ()>> Iterator for PersistentHashSetSplitIterator<'a, T, R> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, R: CollisionResolver<T, ()>> FusedIterator for PersistentHashSetSplitIterator<'_, T, R> {}

/// Owning iterator over the elements of a [`PersistentHashSet`].
pub struct PersistentHashSetIntoIterator<T, R: CollisionResolver<T, ()>> {
    inner: PersistentHashMapIntoIterator<T, (), R>,
}

impl<T: Clone, R: CollisionResolver<T, ()>> Iterator for PersistentHashSetIntoIterator<T, R> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, ())| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Clone, R: CollisionResolver<T, ()>> ExactSizeIterator for PersistentHashSetIntoIterator<T, R> {}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T, R: CollisionResolver<T, ()>> Default for PersistentHashSet<T, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, R> FromIterator<T> for PersistentHashSet<T, R>
where
    T: Hash + Eq + Clone,
    R: CollisionResolver<T, ()>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, element| set.insert(element))
    }
}

impl<T: Clone, R: CollisionResolver<T, ()>> IntoIterator for PersistentHashSet<T, R> {
    type Item = T;
    type IntoIter = PersistentHashSetIntoIterator<T, R>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashSetIntoIterator {
            inner: self.inner.into_iter(),
        }
    }
}

impl<'a, T, R: CollisionResolver<T, ()>> IntoIterator for &'a PersistentHashSet<T, R> {
    type Item = &'a T;
    type IntoIter = PersistentHashSetIterator<'a, T, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, R, S> PartialEq<PersistentHashSet<T, S>> for PersistentHashSet<T, R>
where
    T: Hash + Eq + Clone,
    R: CollisionResolver<T, ()>,
    S: ResolverLookup<T, (), T>,
{
    fn eq(&self, other: &PersistentHashSet<T, S>) -> bool {
        self.inner == other.inner
    }
}

impl<T, R> Eq for PersistentHashSet<T, R>
where
    T: Hash + Eq + Clone,
    R: ResolverLookup<T, (), T>,
{
}

impl<T: fmt::Debug, R: CollisionResolver<T, ()>> fmt::Debug for PersistentHashSet<T, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display, R: CollisionResolver<T, ()>> fmt::Display for PersistentHashSet<T, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for element in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "}}")
    }
}

impl<T, R> Membership<T> for PersistentHashSet<T, R>
where
    T: Hash + Eq + Clone,
    R: ResolverLookup<T, (), T>,
{
    fn contains(&self, element: &T) -> bool {
        self.inner.contains_key(element)
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize, R: CollisionResolver<T, ()>> serde::Serialize for PersistentHashSet<T, R> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentHashSetVisitor<T, R> {
    marker: std::marker::PhantomData<fn() -> (T, R)>,
}

#[cfg(feature = "serde")]
impl<T, R> PersistentHashSetVisitor<T, R> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T, R> serde::de::Visitor<'de> for PersistentHashSetVisitor<T, R>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
    R: CollisionResolver<T, ()>,
{
    type Value = PersistentHashSet<T, R>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut set = PersistentHashSet::empty();
        while let Some(element) = seq.next_element()? {
            set = set.insert(element);
        }
        tracing::trace!(length = set.len(), "rebuilt set from serialized form");
        Ok(set)
    }
}

#[cfg(feature = "serde")]
impl<'de, T, R> serde::Deserialize<'de> for PersistentHashSet<T, R>
where
    T: serde::Deserialize<'de> + Clone + Hash + Eq,
    R: CollisionResolver<T, ()>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentHashSetVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================


// =============================================================================
// Send + Sync Tests (arc feature only)
// =============================================================================


// =============================================================================
// Multithread Tests (arc feature only)
// =============================================================================
