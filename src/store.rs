//! Storage backend contract.
//!
//! The core engine is polymorphic over how cells are laid out in memory.
//! A backend owns two things per cell: the metadata byte (see [`crate::meta`])
//! and the payload (a key, or a key-value pair). Payload slots are
//! uninitialized storage; whether a slot holds a live payload is tracked
//! solely by its metadata label, so backends must only be asked to read,
//! move, or drop payloads at positions the engine knows are occupied.

use crate::meta::Meta;

/// A flat array of cells with bit-packed metadata and inline payloads.
///
/// Implementations: [`crate::soa`] (parallel arrays, wide metadata with a
/// fingerprint byte), [`crate::aos`] (one interleaved record per cell) and
/// [`crate::aob`] (block-interleaved records).
pub trait Storage {
    /// What `insert` consumes and eviction shuffles: `K` for sets,
    /// `(K, V)` for maps.
    type Entry;
    type Key;
    type Value;

    /// Allocate `bins` cells with zeroed metadata.
    fn with_capacity(bins: usize) -> Self;

    /// Grow to `new_bins` cells. Cells in `[0, old_bins)` keep their
    /// metadata and payloads; metadata above is zeroed.
    fn resize(&mut self, old_bins: usize, new_bins: usize);

    /// Zero the metadata of `len` cells starting at `from`, bucket bits
    /// included.
    fn clear_meta(&mut self, from: usize, len: usize);

    fn meta(&self, pos: usize) -> Meta;

    /// Mark `pos` occupied with the given element fields, preserving the
    /// cell's bucket bits. Wide layouts also record `fp`.
    fn set_occupied(&mut self, pos: usize, distance: u8, reversed_item: bool, label: u8, fp: u8);

    /// Mark `pos` empty, preserving the cell's bucket bits. Does not touch
    /// the payload slot.
    fn set_empty(&mut self, pos: usize);

    fn set_bucket_reversed(&mut self, pos: usize);

    fn set_unlucky_bucket(&mut self, pos: usize);

    /// Fingerprint recorded at `pos`, or 0 for narrow layouts.
    #[inline]
    fn stored_fingerprint(&self, _pos: usize) -> u8 {
        0
    }

    /// Whether the element at `pos` could have fingerprint `fp`. Narrow
    /// layouts cannot reject anything and always answer yes.
    #[inline]
    fn fingerprint_matches(&self, _pos: usize, _fp: u8) -> bool {
        true
    }

    /// The key an entry will be stored under.
    fn key_of(entry: &Self::Entry) -> &Self::Key;

    /// Store a payload at `pos`. The slot must not hold a live payload.
    fn write_entry(&mut self, pos: usize, entry: Self::Entry);

    /// Copy the payload (not the metadata) from `src` to `dst`.
    ///
    /// # Safety
    /// `src` must be occupied and `dst` must not hold a live payload. After
    /// the call the payload lives at `dst`; the caller must mark `src` empty
    /// or overwrite it before it is read again.
    unsafe fn move_entry(&mut self, dst: usize, src: usize);

    /// Move the payload at `pos` out of the table.
    ///
    /// # Safety
    /// `pos` must be occupied. The caller must mark `pos` empty or overwrite
    /// it before it is read again.
    unsafe fn take_entry(&mut self, pos: usize) -> Self::Entry;

    /// Drop the payload at `pos` in place.
    ///
    /// # Safety
    /// `pos` must be occupied, and must be marked empty afterwards.
    unsafe fn drop_entry(&mut self, pos: usize);

    /// # Safety
    /// `pos` must be occupied.
    unsafe fn key_at(&self, pos: usize) -> &Self::Key;

    /// # Safety
    /// `pos` must be occupied.
    unsafe fn value_at(&self, pos: usize) -> &Self::Value;

    /// # Safety
    /// `pos` must be occupied.
    unsafe fn value_at_mut(&mut self, pos: usize) -> &mut Self::Value;
}
