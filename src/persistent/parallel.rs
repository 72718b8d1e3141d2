//! Rayon support for parallel traversal.
//!
//! [`PersistentHashMapSplitIterator`] already divides its remaining entries
//! on demand, which is the contract of rayon's unindexed producers. The
//! producer here forwards `split` to the iterator and folds each piece
//! serially.

use rayon::iter::ParallelIterator;
use rayon::iter::plumbing::{Folder, UnindexedConsumer, UnindexedProducer, bridge_unindexed};

use super::iter::PersistentHashMapSplitIterator;
use super::resolver::CollisionResolver;

struct SplitProducer<'a, K, V, R: CollisionResolver<K, V>> {
    iter: PersistentHashMapSplitIterator<'a, K, V, R>,
}

impl<'a, K, V, R> UnindexedProducer for SplitProducer<'a, K, V, R>
where
    K: Send + Sync,
    V: Send + Sync,
    R: CollisionResolver<K, V>,
    R::Entries: Send + Sync,
{
    type Item = (&'a K, &'a V);

    fn split(mut self) -> (Self, Option<Self>) {
        let upper = self.iter.split().map(|iter| Self { iter });
        (self, upper)
    }

    fn fold_with<F>(self, folder: F) -> F
    where
        F: Folder<Self::Item>,
    {
        folder.consume_iter(self.iter)
    }
}

/// Parallel iterator over the entries of a map.
///
/// Created by `par_iter` on [`PersistentHashMap`](super::PersistentHashMap).
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::persistent::PersistentHashMap;
/// use rayon::prelude::*;
///
/// let map: PersistentHashMap<u64, u64> = (0..10_000).map(|key| (key, key * 2)).collect();
/// let total: u64 = map.par_iter().map(|(_, value)| *value).sum();
/// assert_eq!(total, 2 * (0..10_000).sum::<u64>());
/// ```
pub struct PersistentHashMapParallelRefIterator<'a, K, V, R: CollisionResolver<K, V>> {
    iter: PersistentHashMapSplitIterator<'a, K, V, R>,
}

impl<'a, K, V, R: CollisionResolver<K, V>> PersistentHashMapParallelRefIterator<'a, K, V, R> {
    pub(crate) const fn new(iter: PersistentHashMapSplitIterator<'a, K, V, R>) -> Self {
        Self { iter }
    }
}

impl<'a, K, V, R> ParallelIterator for PersistentHashMapParallelRefIterator<'a, K, V, R>
where
    K: Send + Sync,
    V: Send + Sync,
    R: CollisionResolver<K, V>,
    R::Entries: Send + Sync,
{
    type Item = (&'a K, &'a V);

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: UnindexedConsumer<Self::Item>,
    {
        bridge_unindexed(SplitProducer { iter: self.iter }, consumer)
    }
}

/// Parallel iterator over the elements of a set.
///
/// Created by `par_iter` on [`PersistentHashSet`](super::PersistentHashSet).
pub struct PersistentHashSetParallelRefIterator<'a, T, R: CollisionResolver<T, ()>> {
    inner: PersistentHashMapParallelRefIterator<'a, T, (), R>,
}

impl<'a, T, R: CollisionResolver<T, ()>> PersistentHashSetParallelRefIterator<'a, T, R> {
    pub(crate) const fn new(inner: PersistentHashMapParallelRefIterator<'a, T, (), R>) -> Self {
        Self { inner }
    }
}

impl<'a, T, R> ParallelIterator for PersistentHashSetParallelRefIterator<'a, T, R>
where
    T: Send + Sync,
    R: CollisionResolver<T, ()>,
    R::Entries: Send + Sync,
{
    type Item = &'a T;

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: UnindexedConsumer<Self::Item>,
    {
        self.inner.map(|(element, ())| element).drive_unindexed(consumer)
    }
}
