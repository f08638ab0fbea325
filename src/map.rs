//! Map facade over the core table.

use std::borrow::Borrow;
use std::ops::Index;

use crate::aob::AobMapStorage;
use crate::aos::AosMapStorage;
use crate::error::Error;
use crate::hash::{DoubleHash, SplitHasher};
use crate::iter::{Iter, IterMut, Keys, Values, ValuesMut};
use crate::soa::SoaMapStorage;
use crate::store::Storage;
use crate::table::RawTable;

/// A key-value cuckoo breeding ground table.
///
/// Generic over the storage layout and the double hasher; the [`SoaMap`],
/// [`AosMap`] and [`AobMap`] aliases pick a layout. Unlike the standard
/// maps, inserting an existing key keeps the stored value; use
/// [`CbgMap::get_mut`] to update in place.
pub struct CbgMap<S, H = SplitHasher, const B: usize = 3> {
    pub(crate) raw: RawTable<B, S, H>,
}

/// Map over parallel arrays with wide metadata. Fastest negative lookups.
pub type SoaMap<K, V, H = SplitHasher, const B: usize = 3> = CbgMap<SoaMapStorage<K, V>, H, B>;

/// Map over interleaved records. Fastest positive lookups.
pub type AosMap<K, V, H = SplitHasher, const B: usize = 3> = CbgMap<AosMapStorage<K, V>, H, B>;

/// Map over block-interleaved records. Co-located like [`AosMap`] with the
/// padding amortised over `A`-cell blocks.
pub type AobMap<K, V, H = SplitHasher, const B: usize = 3, const A: usize = 8> =
    CbgMap<AobMapStorage<K, V, A>, H, B>;

impl<K, V, S, H, const B: usize> CbgMap<S, H, B>
where
    S: Storage<Entry = (K, V), Key = K, Value = V>,
    H: Default,
{
    pub fn new() -> Self {
        Self::with_hasher(H::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, H::default())
    }
}

impl<K, V, S, H, const B: usize> Default for CbgMap<S, H, B>
where
    S: Storage<Entry = (K, V), Key = K, Value = V>,
    H: Default,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, H, const B: usize> CbgMap<S, H, B>
where
    S: Storage<Entry = (K, V), Key = K, Value = V>,
{
    pub fn with_hasher(hasher: H) -> Self {
        Self {
            raw: RawTable::with_hasher(hasher),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        Self {
            raw: RawTable::with_capacity_and_hasher(capacity, hasher),
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Number of cells. One cell holds at most one entry.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Fill fraction in `[0, 1]`.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.raw.load_factor()
    }

    #[inline]
    pub fn max_load_factor(&self) -> f64 {
        self.raw.max_load_factor()
    }

    /// See [`RawTable::set_max_load_factor`].
    #[inline]
    pub fn set_max_load_factor(&mut self, value: f64) {
        self.raw.set_max_load_factor(value);
    }

    #[inline]
    pub fn grow_factor(&self) -> f64 {
        self.raw.grow_factor()
    }

    /// See [`RawTable::set_grow_factor`].
    #[inline]
    pub fn set_grow_factor(&mut self, value: f64) {
        self.raw.set_grow_factor(value);
    }

    /// Drop every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Drop every entry and release the backing storage.
    pub fn reset(&mut self) {
        self.raw.reset();
    }

    /// Iterate over all entries in unspecified order.
    pub fn iter(&self) -> Iter<'_, S, H, B> {
        Iter::new(&self.raw)
    }

    /// Iterate over all entries with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, S, H, B> {
        IterMut::new(&mut self.raw)
    }

    pub fn keys(&self) -> Keys<'_, S, H, B> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, S, H, B> {
        Values::new(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, S, H, B> {
        ValuesMut::new(self.iter_mut())
    }
}

impl<K, V, S, H, const B: usize> CbgMap<S, H, B>
where
    S: Storage<Entry = (K, V), Key = K, Value = V>,
    K: Eq,
{
    /// Reference to the value stored under `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        let pos = self.raw.find_pos(key)?;
        // Safety: find_pos only returns occupied cells.
        Some(unsafe { self.raw.value_at(pos) })
    }

    /// Mutable reference to the value stored under `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        let pos = self.raw.find_pos(key)?;
        // Safety: find_pos only returns occupied cells.
        Some(unsafe { self.raw.value_at_mut(pos) })
    }

    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        self.raw.find_pos(key).is_some()
    }

    /// Reference to the value stored under `key`, or
    /// [`Error::KeyNotFound`].
    #[inline]
    pub fn at<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Mutable reference to the value stored under `key`, or
    /// [`Error::KeyNotFound`].
    #[inline]
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, Error>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    /// Remove `key`'s entry, reporting whether one existed. See
    /// [`RawTable::erase`] for the lookup-precision caveat under
    /// erase-heavy workloads.
    #[inline]
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        self.raw.erase(key)
    }

    /// Insert `value` under `key` if the key is absent. Returns whether the
    /// entry was inserted; an existing key keeps its stored value.
    pub fn insert(&mut self, key: K, value: V) -> bool
    where
        H: DoubleHash<K>,
    {
        if self.raw.find_pos(&key).is_some() {
            return false;
        }
        self.raw.insert((key, value));
        true
    }

    /// Mutable reference to the value under `key`, inserting the default
    /// value first when the key is absent.
    pub fn get_or_default(&mut self, key: K) -> &mut V
    where
        K: Clone,
        V: Default,
        H: DoubleHash<K>,
    {
        if self.raw.find_pos(&key).is_none() {
            self.raw.insert((key.clone(), V::default()));
        }
        let pos = self
            .raw
            .find_pos(&key)
            .expect("freshly inserted key must be present");
        // Safety: find_pos only returns occupied cells.
        unsafe { self.raw.value_at_mut(pos) }
    }

    /// Grow to at least `bins` cells. Does nothing when already as large.
    pub fn reserve(&mut self, bins: usize)
    where
        H: DoubleHash<K>,
    {
        self.raw.reserve(bins);
    }
}

impl<K, V, S, H, Q, const B: usize> Index<&Q> for CbgMap<S, H, B>
where
    S: Storage<Entry = (K, V), Key = K, Value = V>,
    K: Eq + Borrow<Q>,
    Q: Eq + ?Sized,
    H: DoubleHash<Q>,
{
    type Output = V;

    /// # Panics
    /// Panics if the key is not present. Use [`CbgMap::get_or_default`] for
    /// insert-on-miss indexing.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}
