//! Set facade over the core table.

use std::borrow::Borrow;

use crate::aob::AobSetStorage;
use crate::aos::AosSetStorage;
use crate::hash::{DoubleHash, SplitHasher};
use crate::iter::{Iter, SetIter};
use crate::soa::SoaSetStorage;
use crate::store::Storage;
use crate::table::RawTable;

/// A cuckoo breeding ground set.
///
/// The same engine as [`crate::CbgMap`] with the key as the whole payload.
pub struct CbgSet<S, H = SplitHasher, const B: usize = 3> {
    pub(crate) raw: RawTable<B, S, H>,
}

/// Set over parallel arrays with wide metadata. Fastest negative lookups.
pub type SoaSet<T, H = SplitHasher, const B: usize = 3> = CbgSet<SoaSetStorage<T>, H, B>;

/// Set over interleaved records. Fastest positive lookups.
pub type AosSet<T, H = SplitHasher, const B: usize = 3> = CbgSet<AosSetStorage<T>, H, B>;

/// Set over block-interleaved records.
pub type AobSet<T, H = SplitHasher, const B: usize = 3, const A: usize = 8> =
    CbgSet<AobSetStorage<T, A>, H, B>;

impl<T, S, H, const B: usize> CbgSet<S, H, B>
where
    S: Storage<Entry = T, Key = T, Value = T>,
    H: Default,
{
    pub fn new() -> Self {
        Self::with_hasher(H::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, H::default())
    }
}

impl<T, S, H, const B: usize> Default for CbgSet<S, H, B>
where
    S: Storage<Entry = T, Key = T, Value = T>,
    H: Default,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, H, const B: usize> CbgSet<S, H, B>
where
    S: Storage<Entry = T, Key = T, Value = T>,
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

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Number of cells. One cell holds at most one element.
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

    /// Drop every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Drop every element and release the backing storage.
    pub fn reset(&mut self) {
        self.raw.reset();
    }

    /// Iterate over all elements in unspecified order.
    pub fn iter(&self) -> SetIter<'_, S, H, B> {
        SetIter::new(Iter::new(&self.raw))
    }
}

impl<T, S, H, const B: usize> CbgSet<S, H, B>
where
    S: Storage<Entry = T, Key = T, Value = T>,
    T: Eq,
{
    #[inline]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        self.raw.find_pos(value).is_some()
    }

    /// Reference to the stored element equal to `value`.
    #[inline]
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        let pos = self.raw.find_pos(value)?;
        // Safety: find_pos only returns occupied cells.
        Some(unsafe { self.raw.key_at(pos) })
    }

    /// Insert `value` if absent. Returns whether the set changed; inserting
    /// a present value keeps the stored element.
    pub fn insert(&mut self, value: T) -> bool
    where
        H: DoubleHash<T>,
    {
        if self.raw.find_pos(&value).is_some() {
            return false;
        }
        self.raw.insert(value);
        true
    }

    /// Remove `value`, reporting whether it was present. See
    /// [`RawTable::erase`] for the lookup-precision caveat under
    /// erase-heavy workloads.
    #[inline]
    pub fn erase<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        self.raw.erase(value)
    }

    /// Grow to at least `bins` cells. Does nothing when already as large.
    pub fn reserve(&mut self, bins: usize)
    where
        H: DoubleHash<T>,
    {
        self.raw.reserve(bins);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_new() {
        let set: SoaSet<u64> = SoaSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(!set.contains(&1));
    }

    #[test]
    fn test_insert_contains_erase() {
        let mut set: SoaSet<u64> = SoaSet::new();
        assert!(set.insert(7u64));
        assert!(!set.insert(7u64), "duplicate insert must be a no-op");
        assert_eq!(set.len(), 1);
        assert!(set.contains(&7));
        assert_eq!(set.get(&7), Some(&7));
        assert!(set.erase(&7));
        assert!(!set.erase(&7));
        assert!(set.is_empty());
    }

    #[test]
    fn test_string_elements() {
        let mut set: SoaSet<String> = SoaSet::new();
        set.insert("hello".to_string());
        set.insert("world".to_string());
        // Borrowed lookups work with &str.
        assert!(set.contains("hello"));
        assert!(set.contains("world"));
        assert!(!set.contains("foo"));
        assert_eq!(set.get("hello").map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_many_elements() {
        let mut set: SoaSet<u64> = SoaSet::new();
        for i in 0u64..10_000 {
            set.insert(i);
        }
        assert_eq!(set.len(), 10_000);
        for i in 0u64..10_000 {
            assert!(set.contains(&i), "missing element {}", i);
        }
        assert!(!set.contains(&10_001));
        set.raw.check_invariants();
    }

    #[test]
    fn test_iter() {
        let mut set: SoaSet<u64> = SoaSet::new();
        for i in 0u64..100 {
            set.insert(i);
        }
        let mut seen: Vec<u64> = set.iter().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..100u64).collect::<Vec<_>>());
        let mut sum = 0u64;
        for v in &set {
            sum += v;
        }
        assert_eq!(sum, 4950);
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut set: SoaSet<u64> = SoaSet::new();
        for i in 0u64..100 {
            set.insert(i);
        }
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(&5));
        assert!(set.insert(5));
        assert!(set.contains(&5));
    }

    #[test]
    fn test_aos_and_aob_layouts() {
        let mut aos: AosSet<String> = AosSet::new();
        let mut aob: AobSet<u64> = AobSet::new();
        for i in 0..500u64 {
            aos.insert(format!("e{}", i));
            aob.insert(i);
        }
        for i in 0..500u64 {
            assert!(aos.contains(format!("e{}", i).as_str()));
            assert!(aob.contains(&i));
        }
        aos.raw.check_invariants();
        aob.raw.check_invariants();
    }

    #[test]
    fn test_random_ops_match_reference() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut set: SoaSet<u32> = SoaSet::new();
        let mut reference: HashSet<u32> = HashSet::new();

        for round in 0..20_000 {
            let value = rng.gen_range(0..256u32);
            if rng.gen_ratio(60, 100) {
                assert_eq!(
                    set.insert(value),
                    reference.insert(value),
                    "insert disagreed at {}",
                    round
                );
            } else {
                assert_eq!(
                    set.erase(&value),
                    reference.remove(&value),
                    "erase disagreed at {}",
                    round
                );
            }
            assert_eq!(set.len(), reference.len());
        }
        for value in &reference {
            assert!(set.contains(value));
        }
        set.raw.check_invariants();
    }
}
