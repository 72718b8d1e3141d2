//! Persistent (immutable) hash collections.
//!
//! This module provides hash collections built on a 32-way hash array
//! mapped trie (HAMT). Every update returns a new version and shares all
//! untouched nodes with the previous one:
//!
//! - [`PersistentHashMap`]: Persistent hash map
//! - [`PersistentHashSet`]: Persistent hash set (based on the map)
//!
//! # Collision Resolution
//!
//! Keys whose hash codes are equal share a bucket. How such a bucket stores
//! its entries is chosen by a [`CollisionResolver`] type parameter:
//!
//! - [`ListResolver`] (default): a flat array searched linearly, requires
//!   only `Eq`
//! - [`TreeResolver`]: a balanced tree, requires `Ord`; see
//!   [`OrderedKeyHashMap`] and [`OrderedKeyHashSet`]
//!
//! # Identity
//!
//! Operations that change nothing return the receiver itself, and removing
//! the last entry returns the canonical empty collection. Use `ptr_eq` to
//! observe this.
//!
//! # Examples
//!
//! ## `PersistentHashMap`
//!
//! ```rust
//! use persistent_hamt::persistent::PersistentHashMap;
//!
//! let map = PersistentHashMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//! assert_eq!(map.get("one"), Some(&1));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//!
//! // Re-inserting an identical entry returns the same map
//! assert!(map.insert("two".to_string(), 2).ptr_eq(&map));
//! ```
//!
//! ## `PersistentHashSet`
//!
//! ```rust
//! use persistent_hamt::persistent::PersistentHashSet;
//!
//! let set = PersistentHashSet::new()
//!     .insert(1)
//!     .insert(2)
//!     .insert(3);
//! assert!(set.contains(&1));
//!
//! // Set operations
//! let other: PersistentHashSet<i32> = [2, 3, 4].into_iter().collect();
//! let union = set.union(&other);
//! let intersection = set.intersection(&other);
//!
//! assert_eq!(union.len(), 4);        // {1, 2, 3, 4}
//! assert_eq!(intersection.len(), 2); // {2, 3}
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type used for trie nodes.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`, which makes
/// the collections `Send + Sync`.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod bucket;
mod hashing;
mod hashmap;
mod hashset;
mod invariant;
mod iter;
#[cfg(feature = "rayon")]
mod parallel;
pub mod resolver;
mod trie;

pub use hashmap::OrderedKeyHashMap;
pub use hashmap::PersistentHashMap;
pub use hashset::Membership;
pub use hashset::OrderedKeyHashSet;
pub use hashset::PersistentHashSet;
pub use hashset::PersistentHashSetIntoIterator;
pub use hashset::PersistentHashSetIterator;
pub use hashset::PersistentHashSetSplitIterator;
pub use invariant::InvariantViolation;
pub use iter::PersistentHashMapIntoIterator;
pub use iter::PersistentHashMapIterator;
pub use iter::PersistentHashMapSplitIterator;
pub use resolver::CollisionResolver;
pub use resolver::ListResolver;
pub use resolver::ResolverLookup;
pub use resolver::TreeResolver;

// Rayon parallel iterator re-exports
#[cfg(feature = "rayon")]
pub use parallel::PersistentHashMapParallelRefIterator;
#[cfg(feature = "rayon")]
pub use parallel::PersistentHashSetParallelRefIterator;

// =============================================================================
// Tests
// =============================================================================
