//! Hash codes for trie navigation.
//!
//! The trie is keyed by 32-bit hash codes. The 64-bit output of the selected
//! hasher is folded to 32 bits so that both halves contribute to the path.
//!
//! The hasher is chosen at compile time:
//!
//! - `fxhash` feature: `rustc_hash::FxHasher`
//! - `ahash` feature: `ahash::AHasher` with fixed seeds
//! - otherwise: `std::collections::hash_map::DefaultHasher`
//!
//! Every hasher used here is deterministic, so two containers built from the
//! same keys always have the same shape.

use std::hash::{Hash, Hasher};

// =============================================================================
// Constants
// =============================================================================

/// Bits of the hash code consumed per trie level.
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Branching factor (2^5 = 32).
pub(crate) const BRANCHING_FACTOR: usize = 1 << BITS_PER_LEVEL;

/// Mask for extracting one level's slot index.
const MASK: u32 = (BRANCHING_FACTOR - 1) as u32;

/// Depth of the root node. Depth 1 nodes hold buckets.
///
/// Seven levels cover 32 bits: six full levels of 5 bits below the root, and
/// the root itself which only sees the top two bits.
pub(crate) const ROOT_DEPTH: u8 = 7;

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
const AHASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

// =============================================================================
// Hash computation
// =============================================================================

#[cfg(feature = "fxhash")]
fn new_hasher() -> rustc_hash::FxHasher {
    rustc_hash::FxHasher::default()
}

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
fn new_hasher() -> ahash::AHasher {
    use std::hash::BuildHasher;

    let [k0, k1, k2, k3] = AHASH_SEEDS;
    ahash::RandomState::with_seeds(k0, k1, k2, k3).build_hasher()
}

#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
fn new_hasher() -> std::collections::hash_map::DefaultHasher {
    std::collections::hash_map::DefaultHasher::new()
}

/// Computes the 32-bit hash code of a key.
#[inline]
pub(crate) fn hash_code<Q: Hash + ?Sized>(key: &Q) -> u32 {
    let mut hasher = new_hasher();
    key.hash(&mut hasher);
    fold(hasher.finish())
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn fold(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// Extracts the slot index a node at `depth` uses for `hash`.
///
/// Depth 1 reads the lowest five bits, depth 7 (the root) the highest two.
#[inline]
pub(crate) const fn slot_index(hash: u32, depth: u8) -> usize {
    ((hash >> (BITS_PER_LEVEL * (depth as u32 - 1))) & MASK) as usize
}

/// Number of bucket slots a subtree rooted at `depth` can hold (32^depth).
#[inline]
pub(crate) const fn capacity_at_depth(depth: u8) -> u64 {
    1u64 << (BITS_PER_LEVEL * depth as u32)
}

// =============================================================================
// Tests
// =============================================================================
