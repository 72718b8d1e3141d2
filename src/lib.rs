//! # persistent-hamt
//!
//! Persistent hash maps and hash sets for Rust, built on a 32-way hash
//! array mapped trie.
//!
//! ## Overview
//!
//! - **Persistent collections**: every update returns a new version that
//!   shares structure with the old one
//! - **Pluggable collision resolution**: flat lists for `Eq` keys, balanced
//!   trees for `Ord` keys
//! - **Identity preservation**: no-op updates return the receiver itself
//! - **Splittable iteration**: iterators divide their remaining work for
//!   parallel consumers
//!
//! ## Feature Flags
//!
//! - `arc`: Use `Arc` instead of `Rc`, making the collections thread-safe
//! - `rayon`: Parallel iterators (implies `arc`)
//! - `serde`: Serialization support
//! - `fxhash`: Hash keys with `rustc-hash`
//! - `ahash`: Hash keys with `ahash`
//! - `full`: Enable `arc`, `rayon` and `serde`
//!
//! ## Example
//!
//! ```rust
//! use persistent_hamt::prelude::*;
//!
//! let empty: PersistentHashSet<&str> = PersistentHashSet::new();
//! let names = empty.insert("fred").insert("wilma");
//!
//! assert_eq!(names.len(), 2);
//! assert!(empty.is_empty());
//! assert!(names.remove("fred").remove("wilma").ptr_eq(&empty));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports the collection types, resolvers and the [`Membership`]
/// trait.
///
/// # Usage
///
/// ```rust
/// use persistent_hamt::prelude::*;
/// ```
///
/// [`Membership`]: crate::persistent::Membership
pub mod prelude {
    pub use crate::persistent::*;
}

pub mod persistent;
