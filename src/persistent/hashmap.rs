//! Persistent (immutable) hash map based on HAMT.
//!
//! This module provides [`PersistentHashMap`], an immutable hash map
//! that uses structural sharing for efficient operations.
//!
//! # Overview
//!
//! `PersistentHashMap` is a Hash Array Mapped Trie (HAMT): a 32-way trie
//! navigated by 5-bit slices of each key's 32-bit hash code. Keys whose hash
//! codes collide completely share a bucket, and the bucket's layout is chosen
//! by a [`CollisionResolver`] type parameter:
//!
//! - [`ListResolver`] (the default, [`PersistentHashMap::new`]): any `Eq` key.
//! - [`TreeResolver`] ([`PersistentHashMap::new_ordered`]): `Ord` keys, with
//!   logarithmic lookups inside a bucket.
//!
//! - O(log32 N) get (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! All operations return new maps without modifying the original,
//! and structural sharing ensures memory efficiency. An operation that does
//! not change the content returns the very same map, see
//! [`PersistentHashMap::ptr_eq`].
//!
//! # Examples
//!
//! ```rust
//! use persistent_hamt::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2)
//!     .insert("three".to_string(), 3);
//!
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(map.get("two"), Some(&2));
//! assert_eq!(map.get("three"), Some(&3));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;

use super::bucket::Removal;
use super::hashing::hash_code;
use super::hashset::Membership;
use super::invariant::InvariantViolation;
use super::iter::{
    PersistentHashMapIntoIterator, PersistentHashMapIterator, PersistentHashMapSplitIterator,
};
use super::resolver::{CollisionResolver, ListResolver, ResolverLookup, TreeResolver};
use super::trie::TrieNode;

// =============================================================================
// PersistentHashMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on HAMT.
///
/// `PersistentHashMap` is an immutable data structure that uses structural
/// sharing to efficiently support functional programming patterns.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `get`          | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `contains_key` | O(log32 N)        |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
///
/// Lookups inside a bucket of `k` colliding keys add O(k) with
/// [`ListResolver`] and O(log k) with [`TreeResolver`].
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::persistent::PersistentHashMap;
///
/// let map = PersistentHashMap::singleton("key".to_string(), 42);
/// assert_eq!(map.get("key"), Some(&42));
/// ```
pub struct PersistentHashMap<K, V, R: CollisionResolver<K, V> = ListResolver> {
    /// Root node of the trie
    root: TrieNode<K, V, R>,
    /// Number of entries
    length: usize,
}

/// A [`PersistentHashMap`] whose colliding keys are kept in balanced trees.
pub type OrderedKeyHashMap<K, V> = PersistentHashMap<K, V, TreeResolver>;

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> Clone for PersistentHashMap<K, V, R> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> PersistentHashMap<K, V> {
    /// Creates a new empty map with list-based collision resolution.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::empty()
    }

    /// Creates a map containing a single key-value pair.
    ///
    /// # Arguments
    ///
    /// * `key` - The key
    /// * `value` - The value
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::singleton("key".to_string(), 42);
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.get("key"), Some(&42));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self
    where
        V: PartialEq,
    {
        Self::empty().insert(key, value)
    }
}

impl<K: Hash + Ord + Clone, V: Clone> PersistentHashMap<K, V, TreeResolver> {
    /// Creates a new empty map whose colliding keys are kept in balanced
    /// trees.
    ///
    /// Use this for keys with a total order when many keys may share a hash
    /// code, for example hashes derived from untrusted input.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new_ordered().insert(3, "three");
    /// assert_eq!(map.get(&3), Some(&"three"));
    /// ```
    #[inline]
    #[must_use]
    pub const fn new_ordered() -> Self {
        Self::empty()
    }
}

impl<K, V, R: CollisionResolver<K, V>> PersistentHashMap<K, V, R> {
    /// Returns the empty map for this resolver.
    ///
    /// Empty maps own no nodes, so every empty map is
    /// [`ptr_eq`](Self::ptr_eq) to every other.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            root: TrieNode::Empty,
            length: 0,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// assert_eq!(map.len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let empty: PersistentHashMap<String, i32> = PersistentHashMap::new();
    /// assert!(empty.is_empty());
    ///
    /// let non_empty = empty.insert("key".to_string(), 42);
    /// assert!(!non_empty.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `true` if both maps are the same instance.
    ///
    /// Operations that leave the content unchanged (inserting an equal value
    /// under an existing key, removing an absent key) return a map that is
    /// `ptr_eq` to their input. Maps that merely hold equal content are
    /// usually not `ptr_eq`; compare those with `==`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("fred", 1);
    /// assert!(map.insert("fred", 1).ptr_eq(&map));
    /// assert!(!map.insert("fred", 2).ptr_eq(&map));
    /// ```
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.length == other.length && self.root.ptr_eq(&other.root)
    }

    /// Returns an iterator over key-value pairs.
    ///
    /// The iteration order follows the hash codes of the keys, not insertion
    /// order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert(1, "one")
    ///     .insert(2, "two");
    ///
    /// let mut entries: Vec<_> = map.iter().collect();
    /// entries.sort();
    /// assert_eq!(entries, vec![(&1, &"one"), (&2, &"two")]);
    /// ```
    #[inline]
    #[must_use]
    pub fn iter(&self) -> PersistentHashMapIterator<'_, K, V, R> {
        PersistentHashMapIterator::new(&self.root, self.length)
    }

    /// Returns an iterator that can be split into independent halves.
    ///
    /// See [`PersistentHashMapSplitIterator::split`].
    #[inline]
    #[must_use]
    pub fn split_iter(&self) -> PersistentHashMapSplitIterator<'_, K, V, R> {
        PersistentHashMapSplitIterator::new(&self.root, self.length)
    }

    /// Returns an iterator over keys.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("a", 1).insert("b", 2);
    /// let mut keys: Vec<_> = map.keys().copied().collect();
    /// keys.sort_unstable();
    /// assert_eq!(keys, vec!["a", "b"]);
    /// ```
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Calls `action` on every entry.
    pub fn for_each<F>(&self, mut action: F)
    where
        F: FnMut(&K, &V),
    {
        for (key, value) in self {
            action(key, value);
        }
    }
}

impl<K, V, R> PersistentHashMap<K, V, R>
where
    K: Hash + Eq + Clone,
    V: Clone,
    R: CollisionResolver<K, V>,
{
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and
    /// `Eq` on the borrowed form must match those for the key type.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and its value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("hello".to_string(), 42);
    /// assert_eq!(map.get_key_value("hello"), Some((&"hello".to_string(), &42)));
    /// ```
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        self.root.find(hash_code(key), key)
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to check
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("key".to_string(), 42);
    ///
    /// assert!(map.contains_key("key"));
    /// assert!(!map.contains_key("other"));
    /// ```
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        self.get_key_value(key).is_some()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contains the key, the value is replaced. If it
    /// already maps the key to an equal value, `self` is returned unchanged
    /// and no node is allocated.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to insert
    /// * `value` - The value to insert
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self
    where
        V: PartialEq,
    {
        let mut delta = 0;
        match self.root.assign(hash_code(&key), key, value, &mut delta) {
            Some(root) => Self {
                root,
                length: self.length.saturating_add_signed(delta),
            },
            None => self.clone(),
        }
    }

    /// Removes a key from the map.
    ///
    /// Returns `self` unchanged if the key is absent, and the empty map if
    /// the last entry was removed.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to remove
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert_eq!(removed.get("a"), None);
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        let mut delta = 0;
        match self.root.remove(hash_code(key), key, &mut delta) {
            Removal::Absent => self.clone(),
            Removal::Emptied => Self::empty(),
            Removal::Replaced(root) => Self {
                root,
                length: self.length.saturating_add_signed(delta),
            },
        }
    }

    /// Inserts every entry of `entries`, later entries winning.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map = PersistentHashMap::new().insert("a", 1);
    /// let merged = map.union([("a", 10), ("b", 2)]);
    /// assert_eq!(merged.get("a"), Some(&10));
    /// assert_eq!(merged.get("b"), Some(&2));
    /// ```
    #[must_use]
    pub fn union<I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        V: PartialEq,
    {
        entries
            .into_iter()
            .fold(self.clone(), |map, (key, value)| map.insert(key, value))
    }

    /// Merges another map into this one; entries of `other` win.
    #[must_use]
    pub fn merge<S>(&self, other: &PersistentHashMap<K, V, S>) -> Self
    where
        V: PartialEq,
        S: CollisionResolver<K, V>,
    {
        self.union(other.iter().map(|(key, value)| (key.clone(), value.clone())))
    }

    /// Removes every key in `keys`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
    /// let trimmed = map.remove_all([1, 3, 5, 42]);
    /// assert_eq!(trimmed.len(), 7);
    /// ```
    #[must_use]
    pub fn remove_all<I>(&self, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Borrow<K>,
        R: ResolverLookup<K, V, K>,
    {
        keys.into_iter()
            .fold(self.clone(), |map, key| map.remove::<K>(key.borrow()))
    }

    /// Keeps only the entries whose key is a member of `source`.
    ///
    /// `source` is queried directly, so any structure with fast membership
    /// tests can be used without copying it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    /// use std::collections::BTreeSet;
    ///
    /// let map: PersistentHashMap<i32, &str> = [(1, "a"), (2, "b"), (3, "c")].into_iter().collect();
    /// let wanted: BTreeSet<i32> = [2, 3, 4].into_iter().collect();
    /// let kept = map.intersection(&wanted);
    /// assert_eq!(kept.len(), 2);
    /// assert!(!kept.contains_key(&1));
    /// ```
    #[must_use]
    pub fn intersection<M>(&self, source: &M) -> Self
    where
        M: Membership<K> + ?Sized,
        R: ResolverLookup<K, V, K>,
    {
        self.iter()
            .filter(|(key, _)| !source.contains(key))
            .fold(self.clone(), |map, (key, _)| map.remove(key))
    }

    /// Keeps only the entries whose key occurs in `keys`.
    ///
    /// `keys` is collected into a scratch set first, so any one-shot
    /// iterator works.
    #[must_use]
    pub fn intersection_with<I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        R: ResolverLookup<K, V, K>,
    {
        let scratch: HashSet<K> = keys.into_iter().collect();
        tracing::trace!(
            scratch_len = scratch.len(),
            "materialized intersection source"
        );
        self.intersection(&scratch)
    }

    /// Verifies the internal structure of the map.
    ///
    /// Checks node depths and shapes, bucket contents, that every key sits
    /// where its hash code leads, and that the cached length is exact.
    /// Intended for tests and fuzzing; no other operation calls it.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::persistent::PersistentHashMap;
    ///
    /// let map: PersistentHashMap<i32, i32> = (0..1000).map(|key| (key, key)).collect();
    /// assert!(map.check_invariants().is_ok());
    /// ```
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let result = self
            .root
            .check_invariants(&|key: &K| hash_code(key))
            .and_then(|counted| {
                if counted == self.length {
                    Ok(())
                } else {
                    Err(InvariantViolation::SizeMismatch {
                        recorded: self.length,
                        counted,
                    })
                }
            });
        if let Err(violation) = &result {
            tracing::debug!(%violation, length = self.length, "invariant check failed");
        }
        result
    }
}

#[cfg(feature = "rayon")]
impl<K, V, R> PersistentHashMap<K, V, R>
where
    K: Send + Sync,
    V: Send + Sync,
    R: CollisionResolver<K, V>,
    R::Entries: Send + Sync,
{
    /// Returns a parallel iterator over key-value pairs.
    ///
    /// Work is divided by splitting the trie traversal; the map is never
    /// copied into an intermediate buffer.
    #[must_use]
    pub fn par_iter(&self) -> super::parallel::PersistentHashMapParallelRefIterator<'_, K, V, R> {
        super::parallel::PersistentHashMapParallelRefIterator::new(self.split_iter())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<K, V, R: CollisionResolver<K, V>> Default for PersistentHashMap<K, V, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K, V, R> FromIterator<(K, V)> for PersistentHashMap<K, V, R>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    R: CollisionResolver<K, V>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::empty().union(iter)
    }
}

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> IntoIterator for PersistentHashMap<K, V, R> {
    type Item = (K, V);
    type IntoIter = PersistentHashMapIntoIterator<K, V, R>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentHashMapIntoIterator::new(&self.root, self.length)
    }
}

impl<'a, K, V, R: CollisionResolver<K, V>> IntoIterator for &'a PersistentHashMap<K, V, R> {
    type Item = (&'a K, &'a V);
    type IntoIter = PersistentHashMapIterator<'a, K, V, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Content equality, independent of resolver and trie shape.
impl<K, V, R, S> PartialEq<PersistentHashMap<K, V, S>> for PersistentHashMap<K, V, R>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    R: CollisionResolver<K, V>,
    S: ResolverLookup<K, V, K>,
{
    fn eq(&self, other: &PersistentHashMap<K, V, S>) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|other_value| value == other_value))
    }
}

impl<K, V, R> Eq for PersistentHashMap<K, V, R>
where
    K: Hash + Eq + Clone,
    V: Clone + Eq,
    R: ResolverLookup<K, V, K>,
{
}

impl<K: fmt::Debug, V: fmt::Debug, R: CollisionResolver<K, V>> fmt::Debug
    for PersistentHashMap<K, V, R>
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, R> Membership<K> for PersistentHashMap<K, V, R>
where
    K: Hash + Eq + Clone,
    V: Clone,
    R: ResolverLookup<K, V, K>,
{
    fn contains(&self, element: &K) -> bool {
        self.contains_key(element)
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V, R> serde::Serialize for PersistentHashMap<K, V, R>
where
    K: serde::Serialize,
    V: serde::Serialize,
    R: CollisionResolver<K, V>,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentHashMapVisitor<K, V, R> {
    marker: std::marker::PhantomData<fn() -> (K, V, R)>,
}

#[cfg(feature = "serde")]
impl<K, V, R> PersistentHashMapVisitor<K, V, R> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, R> serde::de::Visitor<'de> for PersistentHashMapVisitor<K, V, R>
where
    K: serde::Deserialize<'de> + Hash + Eq + Clone,
    V: serde::Deserialize<'de> + Clone + PartialEq,
    R: CollisionResolver<K, V>,
{
    type Value = PersistentHashMap<K, V, R>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = PersistentHashMap::empty();
        while let Some((key, value)) = access.next_entry()? {
            map = map.insert(key, value);
        }
        tracing::trace!(length = map.len(), "rebuilt map from serialized form");
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, R> serde::Deserialize<'de> for PersistentHashMap<K, V, R>
where
    K: serde::Deserialize<'de> + Hash + Eq + Clone,
    V: serde::Deserialize<'de> + Clone + PartialEq,
    R: CollisionResolver<K, V>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentHashMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeSet;

    #[rstest]
    fn test_new_creates_empty() {
        let map: PersistentHashMap<String, i32> = PersistentHashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert!(map.check_invariants().is_ok());
    }

    #[rstest]
    fn test_singleton() {
        let map = PersistentHashMap::singleton("key".to_string(), 42);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("key"), Some(&42));
    }

    #[rstest]
    fn test_insert_and_get() {
        let map = PersistentHashMap::new()
            .insert("one".to_string(), 1)
            .insert("two".to_string(), 2)
            .insert("three".to_string(), 3);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("one"), Some(&1));
        assert_eq!(map.get("two"), Some(&2));
        assert_eq!(map.get("three"), Some(&3));
        assert_eq!(map.get("four"), None);
    }

    #[rstest]
    fn test_insert_overwrite() {
        let map1 = PersistentHashMap::new().insert("key".to_string(), 1);
        let map2 = map1.insert("key".to_string(), 2);

        assert_eq!(map1.get("key"), Some(&1));
        assert_eq!(map2.get("key"), Some(&2));
        assert_eq!(map2.len(), 1);
        assert!(!map1.ptr_eq(&map2));
    }

    #[rstest]
    fn test_insert_equal_value_preserves_identity() {
        let map: PersistentHashMap<i32, i32> = (0..500).map(|key| (key, key)).collect();
        let same = map.insert(250, 250);
        assert!(same.ptr_eq(&map));
    }

    #[rstest]
    fn test_remove() {
        let map = PersistentHashMap::new()
            .insert("a".to_string(), 1)
            .insert("b".to_string(), 2);
        let removed = map.remove("a");

        assert_eq!(map.len(), 2);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed.get("a"), None);
        assert_eq!(removed.get("b"), Some(&2));
    }

    #[rstest]
    fn test_remove_absent_preserves_identity() {
        let map: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key)).collect();
        assert!(map.remove(&1000).ptr_eq(&map));
    }

    #[rstest]
    fn test_remove_last_returns_canonical_empty() {
        let map = PersistentHashMap::singleton(1, 1);
        let empty = map.remove(&1);
        assert!(empty.ptr_eq(&PersistentHashMap::new()));
        assert!(empty.check_invariants().is_ok());
    }

    #[rstest]
    fn test_contains_key() {
        let map = PersistentHashMap::new().insert("key".to_string(), 42);
        assert!(map.contains_key("key"));
        assert!(!map.contains_key("other"));
    }

    #[rstest]
    fn test_iter() {
        let map: PersistentHashMap<i32, i32> = (0..100).map(|key| (key, key * 2)).collect();
        let mut entries: Vec<(i32, i32)> = map.iter().map(|(key, value)| (*key, *value)).collect();
        entries.sort_unstable();
        assert_eq!(entries, (0..100).map(|key| (key, key * 2)).collect::<Vec<_>>());
        assert_eq!(map.iter().len(), 100);
    }

    #[rstest]
    fn test_into_iter_owned() {
        let map: PersistentHashMap<String, usize> = ["x", "y", "z"]
            .into_iter()
            .map(|name| (name.to_string(), name.len()))
            .collect();
        let mut owned: Vec<(String, usize)> = map.clone().into_iter().collect();
        owned.sort();
        assert_eq!(
            owned,
            vec![
                ("x".to_string(), 1),
                ("y".to_string(), 1),
                ("z".to_string(), 1)
            ]
        );
        assert_eq!(map.len(), 3);
    }

    #[rstest]
    fn test_keys_and_values() {
        let map = PersistentHashMap::new().insert(1, 10).insert(2, 20);
        let mut keys: Vec<i32> = map.keys().copied().collect();
        let mut values: Vec<i32> = map.values().copied().collect();
        keys.sort_unstable();
        values.sort_unstable();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(values, vec![10, 20]);
    }

    #[rstest]
    fn test_for_each_visits_every_entry() {
        let map: PersistentHashMap<i32, i32> = (1..=10).map(|key| (key, key)).collect();
        let mut total = 0;
        map.for_each(|_, value| total += value);
        assert_eq!(total, 55);
    }

    #[rstest]
    fn test_eq_ignores_resolver_and_history() {
        let list: PersistentHashMap<i32, i32> = (0..50).map(|key| (key, key)).collect();
        let tree: OrderedKeyHashMap<i32, i32> = (0..60)
            .rev()
            .map(|key| (key, key))
            .collect::<OrderedKeyHashMap<_, _>>()
            .remove_all(50..60);
        assert_eq!(list, tree);
        assert_eq!(tree, list);
        assert_ne!(list, list.insert(0, -1));
    }

    #[rstest]
    fn test_union_later_values_win() {
        let map = PersistentHashMap::new().insert("a", 1);
        let merged = map.union([("a", 2), ("a", 3), ("b", 4)]);
        assert_eq!(merged.get("a"), Some(&3));
        assert_eq!(merged.len(), 2);
    }

    #[rstest]
    fn test_merge_other_wins() {
        let left = PersistentHashMap::new().insert(1, "left").insert(2, "left");
        let right = PersistentHashMap::new_ordered().insert(2, "right");
        let merged = left.merge(&right);
        assert_eq!(merged.get(&1), Some(&"left"));
        assert_eq!(merged.get(&2), Some(&"right"));
    }

    #[rstest]
    fn test_intersection_with_btree_set() {
        let map: PersistentHashMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
        let keep: BTreeSet<i32> = [2, 4, 6, 99].into_iter().collect();
        let kept = map.intersection(&keep);
        let mut keys: Vec<i32> = kept.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![2, 4, 6]);
        assert!(kept.check_invariants().is_ok());
    }

    #[rstest]
    fn test_intersection_with_iterator() {
        let map: PersistentHashMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
        let kept = map.intersection_with((5..20).filter(|key| key % 2 == 1));
        assert_eq!(kept.len(), 3);
    }

    #[rstest]
    fn test_intersection_with_everything_preserves_identity() {
        let map: PersistentHashMap<i32, i32> = (0..10).map(|key| (key, key)).collect();
        assert!(map.intersection(&map).ptr_eq(&map));
    }

    #[rstest]
    fn test_debug_format() {
        let map = PersistentHashMap::singleton("key", 1);
        assert_eq!(format!("{map:?}"), "{\"key\": 1}");
    }

    #[rstest]
    fn test_ordered_map_handles_string_keys() {
        let map = PersistentHashMap::new_ordered()
            .insert("b".to_string(), 2)
            .insert("a".to_string(), 1);
        assert_eq!(map.get("a"), Some(&1));
        assert!(map.check_invariants().is_ok());
    }
}

// =============================================================================
// Send + Sync Tests (arc feature only)
// =============================================================================


#[cfg(all(test, not(feature = "arc")))]
mod rc_tests {
    use super::*;

    static_assertions::assert_not_impl_any!(PersistentHashMap<i32, i32>: Send, Sync);
}
