//! Core table engine.
//!
//! The table is one flat array of cells. A bucket is a window of `B`
//! consecutive cells anchored at the position a hash reduces to, and
//! neighbouring buckets overlap, so cells are shared between them. Every
//! element has two candidate buckets from its two hash values. Insertion
//! keeps the table dense with four escalating moves:
//!
//! 1. take a free cell in either candidate window,
//! 2. flip a crowded bucket to grow downward over free cells below it
//!    (bucket reversal), for its own bucket or a neighbour's,
//! 3. walk a free cell leftward into the window by shifting elements within
//!    their own windows (hopscotch),
//! 4. kick out the resident with the smallest label and re-insert it
//!    (cuckoo eviction).
//!
//! Labels bias evictions toward elements whose alternate bucket was empty
//! when they were placed. Each eviction writes a label strictly larger than
//! the one it displaces, so a chain either finds room or saturates at
//! [`MAX_LABEL`] quickly, and saturation simply grows the table.

use std::borrow::Borrow;

use crate::error::Error;
use crate::hash::{fastrange, fingerprint, DoubleHash};
use crate::meta::{Meta, MAX_LABEL};
use crate::store::Storage;

const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.9001;
const DEFAULT_GROW_FACTOR: f64 = 1.1;

/// Label for a newly placed element: one more than the smallest label in its
/// alternate bucket, saturating.
#[inline]
fn bump(other_min: u8) -> u8 {
    (other_min + 1).min(MAX_LABEL)
}

/// Low-level cuckoo breeding ground table over a storage layout.
///
/// `B` is the bucket width (2, 3 or 4 cells). Prefer the [`crate::CbgMap`]
/// and [`crate::CbgSet`] wrappers unless you are building your own facade;
/// this type hands out raw cell positions that are only meaningful until the
/// next mutation.
pub struct RawTable<const B: usize, S, H> {
    store: S,
    hasher: H,
    num_bins: usize,
    num_elems: usize,
    max_load_factor: f64,
    grow_factor: f64,
    evictions: u64,
    rehashes: u64,
}

impl<const B: usize, S, H> RawTable<B, S, H>
where
    S: Storage,
{
    const WIDTH_OK: () = assert!(B >= 2 && B <= 4, "bucket width must be 2, 3 or 4");

    /// Smallest useful growth step; also the smallest non-empty table, so
    /// the born-reversed tail buckets never reach below cell zero.
    const MIN_BINS: usize = 2 * B - 2;

    pub fn with_hasher(hasher: H) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Pre-allocate at least `capacity` cells (the table may still grow
    /// before `capacity` elements are stored, once the load factor bites).
    pub fn with_capacity_and_hasher(capacity: usize, hasher: H) -> Self {
        let () = Self::WIDTH_OK;
        let bins = if capacity == 0 {
            0
        } else {
            capacity.max(Self::MIN_BINS)
        };
        let mut table = Self {
            store: S::with_capacity(bins),
            hasher,
            num_bins: bins,
            num_elems: 0,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            grow_factor: DEFAULT_GROW_FACTOR,
            evictions: 0,
            rehashes: 0,
        };
        if bins > 0 {
            table.mark_tail_reversed();
        }
        table
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.num_elems
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_elems == 0
    }

    /// Number of cells.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.num_bins
    }

    /// Fill fraction in `[0, 1]`.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        if self.num_bins == 0 {
            0.0
        } else {
            self.num_elems as f64 / self.num_bins as f64
        }
    }

    #[inline]
    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Load threshold that triggers growth. Setting a value below the
    /// current load does not rehash; the next insert will.
    #[inline]
    pub fn set_max_load_factor(&mut self, value: f64) {
        debug_assert!(value > 0.0 && value <= 1.0);
        self.max_load_factor = value;
    }

    #[inline]
    pub fn grow_factor(&self) -> f64 {
        self.grow_factor
    }

    /// Capacity multiplier applied on growth. Growth never adds fewer than
    /// `2B - 2` cells regardless of this setting.
    #[inline]
    pub fn set_grow_factor(&mut self, value: f64) {
        debug_assert!(value >= 1.0);
        self.grow_factor = value;
    }

    /// Cuckoo displacements performed over the table's lifetime.
    /// Diagnostic only.
    #[inline]
    pub fn eviction_count(&self) -> u64 {
        self.evictions
    }

    /// Times the table has been rebuilt. Diagnostic only.
    #[inline]
    pub fn rehash_count(&self) -> u64 {
        self.rehashes
    }

    /// Drop every element, keeping the allocation.
    pub fn clear(&mut self) {
        for pos in 0..self.num_bins {
            if !self.store.meta(pos).is_empty() {
                // Safety: a nonzero label means the slot holds a live payload.
                unsafe { self.store.drop_entry(pos) };
            }
        }
        self.store.clear_meta(0, self.num_bins);
        self.num_elems = 0;
        if self.num_bins > 0 {
            self.mark_tail_reversed();
        }
    }

    /// Drop every element and release the backing storage.
    pub fn reset(&mut self) {
        self.store = S::with_capacity(0);
        self.num_bins = 0;
        self.num_elems = 0;
    }

    #[inline]
    pub(crate) fn occupied(&self, pos: usize) -> bool {
        !self.store.meta(pos).is_empty()
    }

    /// # Safety
    /// `pos` must be an occupied cell index (as returned by
    /// [`Self::find_pos`]) with no mutating call in between.
    #[inline]
    pub unsafe fn key_at(&self, pos: usize) -> &S::Key {
        self.store.key_at(pos)
    }

    /// # Safety
    /// Same contract as [`Self::key_at`].
    #[inline]
    pub unsafe fn value_at(&self, pos: usize) -> &S::Value {
        self.store.value_at(pos)
    }

    /// # Safety
    /// Same contract as [`Self::key_at`].
    #[inline]
    pub unsafe fn value_at_mut(&mut self, pos: usize) -> &mut S::Value {
        self.store.value_at_mut(pos)
    }

    /// First cell of the window belonging to the bucket anchored at `anchor`.
    #[inline]
    fn window_start(&self, anchor: usize) -> usize {
        if self.store.meta(anchor).is_bucket_reversed() {
            anchor + 1 - B
        } else {
            anchor
        }
    }

    /// Smallest label in the window starting at `window`, with the first
    /// cell achieving it. Zero means the window has a free cell.
    fn min_label_in(&self, window: usize) -> (u8, usize) {
        let mut min = self.store.meta(window).label();
        let mut pos = window;
        for i in 1..B {
            if min == 0 {
                break;
            }
            let label = self.store.meta(window + i).label();
            if label < min {
                min = label;
                pos = window + i;
            }
        }
        (min, pos)
    }

    /// Anchor of the bucket owning the element at `pos`, if occupied.
    #[inline]
    fn anchor_of(&self, pos: usize) -> Option<usize> {
        let m = self.store.meta(pos);
        if m.is_empty() {
            return None;
        }
        let d = m.distance() as usize;
        Some(if m.is_reversed_item() { pos + d } else { pos - d })
    }

    /// How far right the element described by `m` may still move while
    /// staying inside its bucket's window.
    #[inline]
    fn slack(&self, m: Meta) -> usize {
        let d = m.distance() as usize;
        if m.is_reversed_item() {
            d
        } else {
            B - 1 - d
        }
    }

    fn count_empty(&self, start: usize) -> usize {
        (start..start + B)
            .filter(|&pos| self.store.meta(pos).is_empty())
            .count()
    }

    /// Elements in the forward window of `anchor` that the bucket itself
    /// owns and that have not been reversed yet.
    fn forward_members(&self, anchor: usize) -> usize {
        let mut count = 0;
        for i in 0..B {
            let m = self.store.meta(anchor + i);
            if !m.is_empty() && !m.is_reversed_item() && m.distance() as usize == i {
                count += 1;
            }
        }
        count
    }

    /// Write element metadata at `pos` for the bucket anchored at `anchor`,
    /// deriving distance and direction from the anchor's current state.
    fn occupy_cell(&mut self, pos: usize, anchor: usize, label: u8, fp: u8) {
        let reversed = self.store.meta(anchor).is_bucket_reversed();
        let distance = (if reversed { anchor - pos } else { pos - anchor }) as u8;
        self.store.set_occupied(pos, distance, reversed, label, fp);
    }

    fn place(&mut self, pos: usize, anchor: usize, label: u8, fp: u8, entry: S::Entry) {
        self.occupy_cell(pos, anchor, label, fp);
        self.store.write_entry(pos, entry);
        self.num_elems += 1;
    }

    fn mark_tail_reversed(&mut self) {
        // The last windows would otherwise run off the end of the array.
        for i in 0..(B - 1) {
            self.store.set_bucket_reversed(self.num_bins - 1 - i);
        }
    }

    /// Flip the bucket at `anchor` if enough of the cells below it are free
    /// to hold its current members. `strict` demands one spare cell beyond
    /// the members; the relaxed form accepts an exact fit.
    fn try_reverse(&mut self, anchor: usize, strict: bool) -> bool {
        if anchor < B || self.store.meta(anchor).is_bucket_reversed() {
            return false;
        }
        let mut empties = self.count_empty(anchor + 1 - B);
        if empties == 0 {
            return false;
        }
        let members = self.forward_members(anchor);
        // The anchor cell is part of the flipped window, so an own element
        // parked on it vacates one more cell when the members move.
        if self.anchor_of(anchor) == Some(anchor) {
            empties += 1;
        }
        let enough = if strict {
            empties > members
        } else {
            empties >= members
        };
        if !enough {
            return false;
        }
        self.reverse_bucket(anchor);
        true
    }

    /// Flip the bucket at `anchor` to grow downward, relocating its members
    /// into the free cells of the new window. Callers must have verified the
    /// free cells exist.
    fn reverse_bucket(&mut self, anchor: usize) {
        self.store.set_bucket_reversed(anchor);

        let mut j = B - 1;
        for i in 0..B {
            let src = anchor + i;
            if self.anchor_of(src) != Some(anchor) {
                continue;
            }
            while !self.store.meta(anchor - j).is_empty() {
                j -= 1;
            }
            let dst = anchor - j;
            let m = self.store.meta(src);
            let fp = self.store.stored_fingerprint(src);
            // Safety: `src` is occupied, `dst` is empty.
            unsafe { self.store.move_entry(dst, src) };
            self.store.set_occupied(dst, j as u8, true, m.label(), fp);
            self.store.set_empty(src);
        }
    }

    /// Try to expose a free cell inside the window of the bucket at
    /// `anchor`, by bucket reversal, neighbour reversal, or hopscotch
    /// displacement. Returns a cell ready to be written, or `None` when the
    /// region is too packed to make room.
    fn find_empty_pos(&mut self, anchor: usize, window: usize) -> Option<usize> {
        let mut window = window;

        if self.try_reverse(anchor, true) {
            window = self.window_start(anchor);
            let (min, pos) = self.min_label_in(window);
            if min == 0 {
                return Some(pos);
            }
        }

        // A cell of this window owned by another bucket may be freed by
        // reversing that bucket instead.
        if window >= 2 * B {
            for i in 0..B {
                let pos = window + i;
                let m = self.store.meta(pos);
                if m.is_empty() || m.is_reversed_item() {
                    continue;
                }
                let neighbour = pos - m.distance() as usize;
                if neighbour == anchor {
                    continue;
                }
                if self.try_reverse(neighbour, false) {
                    let (min, pos) = self.min_label_in(window);
                    if min == 0 {
                        return Some(pos);
                    }
                    break;
                }
            }
        }

        // Hopscotch: scan rightward for a free cell, widening the horizon
        // past cells that still have room to shift right themselves.
        let mut max_reach = B - 1;
        let mut i = 0;
        while i <= max_reach && window + i < self.num_bins {
            let pos = window + i;
            let m = self.store.meta(pos);
            if m.is_empty() {
                return self.walk_blank_left(window, pos);
            }
            max_reach = max_reach.max(i + self.slack(m));
            i += 1;
        }
        None
    }

    /// Move the free cell at `blank` leftward until it lies inside the
    /// window, repeatedly swapping in the leftmost element that may legally
    /// reach it. Fails when no element in range can move.
    fn walk_blank_left(&mut self, window: usize, mut blank: usize) -> Option<usize> {
        while blank - window >= B {
            let mut swap = blank + 1 - B;
            loop {
                if swap == blank {
                    return None;
                }
                let m = self.store.meta(swap);
                debug_assert!(!m.is_empty(), "hopscotch scan skipped a free cell");
                if blank - swap <= self.slack(m) {
                    break;
                }
                swap += 1;
            }
            let m = self.store.meta(swap);
            let fp = self.store.stored_fingerprint(swap);
            let delta = (blank - swap) as u8;
            let distance = if m.is_reversed_item() {
                m.distance() - delta
            } else {
                m.distance() + delta
            };
            // Safety: `swap` is occupied, `blank` is empty.
            unsafe { self.store.move_entry(blank, swap) };
            self.store
                .set_occupied(blank, distance, m.is_reversed_item(), m.label(), fp);
            self.store.set_empty(swap);
            blank = swap;
        }
        Some(blank)
    }

    fn grow_size(&self) -> usize {
        let scaled = (self.num_bins as f64 * self.grow_factor) as usize;
        self.num_bins.saturating_add(Self::MIN_BINS).max(scaled)
    }

    /// Probe one bucket window, walking from the anchor in the bucket's
    /// growth direction.
    fn probe_bucket<Q>(&self, anchor: usize, other_fp: u8, key: &Q) -> Option<usize>
    where
        S::Key: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let reversed = self.store.meta(anchor).is_bucket_reversed();
        let mut pos = anchor;
        for i in 0..B {
            let m = self.store.meta(pos);
            if !m.is_empty() && self.store.fingerprint_matches(pos, other_fp) {
                // Safety: the cell is occupied.
                if unsafe { self.store.key_at(pos) }.borrow() == key {
                    return Some(pos);
                }
            }
            if i + 1 < B {
                pos = if reversed { pos - 1 } else { pos + 1 };
            }
        }
        None
    }

    /// Cell index of `key`, if present. Most misses finish after the first
    /// window: the second is only probed when the primary anchor has lost an
    /// element to its secondary bucket before.
    pub fn find_pos<Q>(&self, key: &Q) -> Option<usize>
    where
        S::Key: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        if self.num_bins == 0 {
            return None;
        }
        let (h0, h1) = self.hasher.hash_pair(key);
        let p0 = fastrange(h0, self.num_bins);
        if let Some(pos) = self.probe_bucket(p0, fingerprint(h1), key) {
            return Some(pos);
        }
        if !self.store.meta(p0).is_unlucky_bucket() {
            return None;
        }
        let p1 = fastrange(h1, self.num_bins);
        self.probe_bucket(p1, fingerprint(h0), key)
    }

    /// Remove `key`'s element. Only the element metadata is cleared; the
    /// cell's bucket flags stay, so a long run of erasures leaves stale
    /// unlucky hints behind and lookups gradually probe the second bucket
    /// more often than necessary. A rehash rebuilds the hints exactly.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        S::Key: Borrow<Q>,
        Q: Eq + ?Sized,
        H: DoubleHash<Q>,
    {
        match self.find_pos(key) {
            Some(pos) => {
                // Safety: find_pos only returns occupied cells.
                unsafe { self.store.drop_entry(pos) };
                self.store.set_empty(pos);
                self.num_elems -= 1;
                true
            }
            None => false,
        }
    }
}

impl<const B: usize, S, H> RawTable<B, S, H>
where
    S: Storage,
    H: Default,
{
    pub fn new() -> Self {
        Self::with_hasher(H::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, H::default())
    }
}

impl<const B: usize, S, H> Default for RawTable<B, S, H>
where
    S: Storage,
    H: Default,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<const B: usize, S, H> RawTable<B, S, H>
where
    S: Storage,
    H: DoubleHash<S::Key>,
{
    /// Insert without any duplicate check, growing as needed. The facades
    /// look the key up first to keep one cell per key.
    pub fn insert(&mut self, entry: S::Entry) {
        if (self.num_elems + 1) as f64 > self.max_load_factor * self.num_bins as f64 {
            // Enough cells that the load bound holds again afterwards, even
            // when the threshold was lowered far below the current load.
            let needed = ((self.num_elems + 1) as f64 / self.max_load_factor).ceil() as usize;
            self.rehash(self.grow_size().max(needed));
        }
        let mut entry = entry;
        loop {
            match self.try_insert(entry) {
                Ok(()) => return,
                Err(back) => {
                    if self.num_bins == usize::MAX {
                        panic!("{}", Error::CapacityOverflow);
                    }
                    entry = back;
                    self.rehash(self.grow_size());
                }
            }
        }
    }

    /// Grow to at least `bins` cells. Does nothing when already as large.
    pub fn reserve(&mut self, bins: usize) {
        self.rehash(bins);
    }

    /// One full insertion attempt at the current capacity. On failure the
    /// returned entry is the element left homeless by the eviction chain,
    /// which is not necessarily the one passed in.
    fn try_insert(&mut self, mut elem: S::Entry) -> Result<(), S::Entry> {
        debug_assert!(self.num_bins >= Self::MIN_BINS);
        loop {
            let (h0, h1) = self.hasher.hash_pair(S::key_of(&elem));
            let p1 = fastrange(h0, self.num_bins);
            let p2 = fastrange(h1, self.num_bins);
            let win1 = self.window_start(p1);
            let win2 = self.window_start(p2);

            let (min1, pos1) = self.min_label_in(win1);
            let (min2, _) = self.min_label_in(win2);

            // Free cell in the primary bucket.
            if min1 == 0 {
                self.place(pos1, p1, bump(min2), fingerprint(h1), elem);
                return Ok(());
            }

            // Make room in the primary bucket.
            if let Some(empty) = self.find_empty_pos(p1, win1) {
                // Reversals during the search may have consumed second-window
                // cells; refresh the label source.
                let (min2, _) = self.min_label_in(self.window_start(p2));
                self.place(empty, p1, bump(min2), fingerprint(h1), elem);
                return Ok(());
            }

            // The failed search can still have reshuffled cells around the
            // second window, so its minimum is read fresh. The first window
            // is unchanged on failure: it had no free cell going in, and any
            // cell vacated by a reversal would have been found.
            let win2 = self.window_start(p2);
            let (min2, pos2) = self.min_label_in(win2);

            // Free cell in the secondary bucket; the primary anchor must
            // remember that one of its elements lives elsewhere now.
            if min2 == 0 {
                self.store.set_unlucky_bucket(p1);
                self.place(pos2, p2, bump(min1), fingerprint(h0), elem);
                return Ok(());
            }

            // Shuffling the secondary bucket only pays off near capacity.
            if self.num_elems * 10 > self.num_bins * 9 {
                if let Some(empty) = self.find_empty_pos(p2, win2) {
                    self.store.set_unlucky_bucket(p1);
                    self.place(empty, p2, bump(min1), fingerprint(h0), elem);
                    return Ok(());
                }
            }

            // The searches above may have reversed buckets in or near either
            // window; take the minima from the current state before picking
            // a victim.
            let win1 = self.window_start(p1);
            let win2 = self.window_start(p2);
            let (min1, pos1) = self.min_label_in(win1);
            let (min2, pos2) = self.min_label_in(win2);
            if min1 == 0 {
                self.place(pos1, p1, bump(min2), fingerprint(h1), elem);
                return Ok(());
            }
            if min2 == 0 {
                self.store.set_unlucky_bucket(p1);
                self.place(pos2, p2, bump(min1), fingerprint(h0), elem);
                return Ok(());
            }

            if min1.min(min2) >= MAX_LABEL {
                return Err(elem);
            }

            // Evict the cheaper of the two minima. The incoming label
            // strictly exceeds the evicted one, so the label total rises
            // with every round and the chain terminates.
            self.evictions += 1;
            let (victim_pos, anchor, label, fp) = if min1 <= min2 {
                (pos1, p1, bump(min2), fingerprint(h1))
            } else {
                self.store.set_unlucky_bucket(p1);
                (pos2, p2, bump(min1), fingerprint(h0))
            };
            // Safety: a nonzero minimum label means the cell is occupied.
            let victim = unsafe { self.store.take_entry(victim_pos) };
            self.occupy_cell(victim_pos, anchor, label, fp);
            self.store.write_entry(victim_pos, elem);
            elem = victim;
        }
    }

    /// Rebuild at `new_bins` cells, retrying with ~0.8% more on every
    /// failed attempt.
    ///
    /// The old cells are swept from the top down. An element whose new
    /// primary window lies entirely above the sweep cursor can land there
    /// directly with a fresh label; everything else goes through a defer
    /// list and regular insertion once the sweep finishes. The defer list
    /// survives restarts, so work already done is not repeated.
    fn rehash(&mut self, new_bins: usize) {
        if new_bins <= self.num_bins {
            return;
        }
        self.rehashes += 1;
        let mut deferred: Vec<S::Entry> = Vec::with_capacity((self.num_elems / 8).max(1));
        let mut target = new_bins;

        loop {
            let old_bins = self.num_bins;
            self.num_bins = target;
            target = target.saturating_add((target / 128).max(1));

            self.store.resize(old_bins, self.num_bins);
            self.num_elems = 0;
            self.mark_tail_reversed();

            for i in (0..old_bins).rev() {
                if !self.store.meta(i).is_empty() {
                    // Safety: the cell is occupied.
                    let (h0, h1) = self.hasher.hash_pair(unsafe { self.store.key_at(i) });
                    let p = fastrange(h0, self.num_bins);
                    let window = self.window_start(p);
                    let mut moved = false;
                    if window > i {
                        let (min, pos) = self.min_label_in(window);
                        if min == 0 {
                            // Safety: `i` is occupied and `pos` is free.
                            unsafe { self.store.move_entry(pos, i) };
                            self.occupy_cell(pos, p, 1, fingerprint(h1));
                            self.num_elems += 1;
                            moved = true;
                        }
                    }
                    if !moved {
                        // Safety: `i` is occupied; its metadata is cleared
                        // just below.
                        deferred.push(unsafe { self.store.take_entry(i) });
                    }
                }
                self.store.clear_meta(i, 1);
            }

            let mut retry = false;
            while let Some(entry) = deferred.pop() {
                if let Err(homeless) = self.try_insert(entry) {
                    deferred.push(homeless);
                    retry = true;
                    break;
                }
            }
            if !retry {
                return;
            }
        }
    }
}

#[cfg(test)]
impl<const B: usize, S, H> RawTable<B, S, H>
where
    S: Storage,
{
    /// Walk every cell and assert the metadata invariants hold.
    pub(crate) fn check_invariants(&self) {
        let mut occupied = 0;
        for pos in 0..self.num_bins {
            let m = self.store.meta(pos);
            if m.is_empty() {
                continue;
            }
            occupied += 1;
            assert!(
                (1..=MAX_LABEL).contains(&m.label()),
                "label out of range at {}",
                pos
            );
            let d = m.distance() as usize;
            assert!(d < B, "distance out of range at {}", pos);
            if m.is_reversed_item() {
                let anchor = pos + d;
                assert!(anchor < self.num_bins, "reversed anchor past end at {}", pos);
                assert!(
                    self.store.meta(anchor).is_bucket_reversed(),
                    "reversed item in forward bucket at {}",
                    pos
                );
            } else {
                assert!(pos >= d, "forward anchor below zero at {}", pos);
                assert!(
                    !self.store.meta(pos - d).is_bucket_reversed(),
                    "forward item in reversed bucket at {}",
                    pos
                );
            }
        }
        assert_eq!(occupied, self.num_elems, "element count drifted");
    }

    pub(crate) fn meta_at(&self, pos: usize) -> Meta {
        self.store.meta(pos)
    }
}
