//! Leaf buckets of the trie.
//!
//! A bucket holds every entry whose key has one particular 32-bit hash code.
//! The common case of a single entry is stored inline; collisions are handed
//! to the container's [`CollisionResolver`].

use std::borrow::Borrow;

use super::invariant::InvariantViolation;
use super::resolver::{CollisionResolver, Deletion, Insertion, ResolverLookup};

/// Outcome of removing a key from a bucket or subtree.
pub(crate) enum Removal<T> {
    /// The key was not present; the caller keeps its original handle.
    Absent,
    /// The last entry was removed; the caller prunes the slot.
    Emptied,
    /// The key was removed and something remains.
    Replaced(T),
}

/// Entries sharing one complete hash code.
pub(crate) enum Bucket<K, V, R: CollisionResolver<K, V>> {
    Single(K, V),
    /// Two or more entries, owned by the resolver.
    Multi(R::Entries),
}

impl<K: Clone, V: Clone, R: CollisionResolver<K, V>> Clone for Bucket<K, V, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Single(key, value) => Self::Single(key.clone(), value.clone()),
            Self::Multi(entries) => Self::Multi(entries.clone()),
        }
    }
}

impl<K, V, R: CollisionResolver<K, V>> Bucket<K, V, R> {
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Single(..) => 1,
            Self::Multi(entries) => R::len(entries),
        }
    }

    /// Entry at `index` in bucket order.
    pub(crate) fn entry_at(&self, index: usize) -> Option<(&K, &V)> {
        match self {
            Self::Single(key, value) => (index == 0).then_some((key, value)),
            Self::Multi(entries) => R::entry_at(entries, index),
        }
    }

    /// Checks the bucket's structure and that every key hashes to `expected`.
    ///
    /// Returns the number of entries.
    pub(crate) fn check(
        &self,
        expected: u32,
        hash_of: &impl Fn(&K) -> u32,
    ) -> Result<usize, InvariantViolation> {
        if let Self::Multi(entries) = self {
            R::check(entries)?;
        }

        let entries = self.len();
        for index in 0..entries {
            if let Some((key, _)) = self.entry_at(index) {
                let found = hash_of(key);
                if found != expected {
                    return Err(InvariantViolation::MisplacedKey { expected, found });
                }
            }
        }
        Ok(entries)
    }
}

impl<K: Eq + Clone, V: Clone, R: CollisionResolver<K, V>> Bucket<K, V, R> {
    /// Inserts an entry whose key has this bucket's hash.
    pub(crate) fn insert(&self, key: K, value: V) -> Insertion<Self>
    where
        V: PartialEq,
    {
        match self {
            Self::Single(existing_key, existing_value) if *existing_key == key => {
                if *existing_value == value {
                    Insertion::Unchanged
                } else {
                    Insertion::Replaced(Self::Single(key, value))
                }
            }
            Self::Single(existing_key, existing_value) => Insertion::Added(Self::Multi(R::pair(
                (existing_key.clone(), existing_value.clone()),
                (key, value),
            ))),
            Self::Multi(entries) => match R::insert(entries, key, value) {
                Insertion::Unchanged => Insertion::Unchanged,
                Insertion::Replaced(entries) => Insertion::Replaced(Self::Multi(entries)),
                Insertion::Added(entries) => Insertion::Added(Self::Multi(entries)),
            },
        }
    }

    pub(crate) fn find<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        match self {
            Self::Single(existing_key, value) => {
                (existing_key.borrow() == key).then_some((existing_key, value))
            }
            Self::Multi(entries) => R::find(entries, key),
        }
    }

    pub(crate) fn remove<Q>(&self, key: &Q) -> Removal<Self>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        R: ResolverLookup<K, V, Q>,
    {
        match self {
            Self::Single(existing_key, _) if existing_key.borrow() == key => Removal::Emptied,
            Self::Single(..) => Removal::Absent,
            Self::Multi(entries) => match R::remove(entries, key) {
                Deletion::Absent => Removal::Absent,
                Deletion::Remaining(entries) => Removal::Replaced(Self::Multi(entries)),
                Deletion::Last(key, value) => Removal::Replaced(Self::Single(key, value)),
            },
        }
    }
}
