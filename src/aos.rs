//! Interleaved-records layout.
//!
//! Each cell is one record holding its metadata byte next to its payload, so
//! a positive lookup touches a single cache line per probed cell. There is no
//! fingerprint byte; misses fall through to the key compare. The record is
//! laid out with the payload at its natural alignment (references into the
//! table must be aligned, so the one-byte-overhead packed variant of this
//! layout is not expressible; the block-interleaved layout in [`crate::aob`]
//! amortises the padding instead).

use std::mem::MaybeUninit;

use crate::meta::Meta;
use crate::store::Storage;

#[repr(C)]
struct Cell<E> {
    meta: u8,
    entry: MaybeUninit<E>,
}

impl<E> Cell<E> {
    #[inline]
    fn empty() -> Self {
        Self {
            meta: 0,
            entry: MaybeUninit::uninit(),
        }
    }
}

/// Key-value storage as a single array of interleaved records.
pub struct AosMapStorage<K, V> {
    cells: Vec<Cell<(K, V)>>,
}

/// Key-only storage as a single array of interleaved records.
pub struct AosSetStorage<T> {
    cells: Vec<Cell<T>>,
}

macro_rules! aos_storage_common {
    () => {
        fn with_capacity(bins: usize) -> Self {
            let mut cells = Vec::new();
            cells.resize_with(bins, Cell::empty);
            Self { cells }
        }

        fn resize(&mut self, old_bins: usize, new_bins: usize) {
            debug_assert!(new_bins >= old_bins);
            self.cells.resize_with(new_bins, Cell::empty);
        }

        fn clear_meta(&mut self, from: usize, len: usize) {
            for cell in &mut self.cells[from..from + len] {
                cell.meta = 0;
            }
        }

        #[inline]
        fn meta(&self, pos: usize) -> Meta {
            Meta::from_bits(self.cells[pos].meta)
        }

        #[inline]
        fn set_occupied(
            &mut self,
            pos: usize,
            distance: u8,
            reversed_item: bool,
            label: u8,
            _fp: u8,
        ) {
            let m = Meta::from_bits(self.cells[pos].meta);
            self.cells[pos].meta = m.occupy(distance, reversed_item, label).bits();
        }

        #[inline]
        fn set_empty(&mut self, pos: usize) {
            let m = Meta::from_bits(self.cells[pos].meta);
            self.cells[pos].meta = m.vacate().bits();
        }

        #[inline]
        fn set_bucket_reversed(&mut self, pos: usize) {
            let m = Meta::from_bits(self.cells[pos].meta);
            self.cells[pos].meta = m.with_bucket_reversed().bits();
        }

        #[inline]
        fn set_unlucky_bucket(&mut self, pos: usize) {
            let m = Meta::from_bits(self.cells[pos].meta);
            self.cells[pos].meta = m.with_unlucky_bucket().bits();
        }

        #[inline]
        fn write_entry(&mut self, pos: usize, entry: Self::Entry) {
            self.cells[pos].entry.write(entry);
        }

        #[inline]
        unsafe fn move_entry(&mut self, dst: usize, src: usize) {
            let e = self.cells[src].entry.assume_init_read();
            self.cells[dst].entry.write(e);
        }

        #[inline]
        unsafe fn take_entry(&mut self, pos: usize) -> Self::Entry {
            self.cells[pos].entry.assume_init_read()
        }

        #[inline]
        unsafe fn drop_entry(&mut self, pos: usize) {
            self.cells[pos].entry.assume_init_drop();
        }
    };
}

impl<K, V> Storage for AosMapStorage<K, V> {
    type Entry = (K, V);
    type Key = K;
    type Value = V;

    aos_storage_common!();

    #[inline]
    fn key_of(entry: &(K, V)) -> &K {
        &entry.0
    }

    #[inline]
    unsafe fn key_at(&self, pos: usize) -> &K {
        &self.cells[pos].entry.assume_init_ref().0
    }

    #[inline]
    unsafe fn value_at(&self, pos: usize) -> &V {
        &self.cells[pos].entry.assume_init_ref().1
    }

    #[inline]
    unsafe fn value_at_mut(&mut self, pos: usize) -> &mut V {
        &mut self.cells[pos].entry.assume_init_mut().1
    }
}

impl<T> Storage for AosSetStorage<T> {
    type Entry = T;
    type Key = T;
    type Value = T;

    aos_storage_common!();

    #[inline]
    fn key_of(entry: &T) -> &T {
        entry
    }

    #[inline]
    unsafe fn key_at(&self, pos: usize) -> &T {
        self.cells[pos].entry.assume_init_ref()
    }

    #[inline]
    unsafe fn value_at(&self, pos: usize) -> &T {
        self.cells[pos].entry.assume_init_ref()
    }

    #[inline]
    unsafe fn value_at_mut(&mut self, pos: usize) -> &mut T {
        self.cells[pos].entry.assume_init_mut()
    }
}

impl<K, V> Drop for AosMapStorage<K, V> {
    fn drop(&mut self) {
        for cell in &mut self.cells {
            if !Meta::from_bits(cell.meta).is_empty() {
                // Safety: a nonzero label means the slot holds a live payload.
                unsafe { cell.entry.assume_init_drop() };
            }
        }
    }
}

impl<T> Drop for AosSetStorage<T> {
    fn drop(&mut self) {
        for cell in &mut self.cells {
            if !Meta::from_bits(cell.meta).is_empty() {
                // Safety: a nonzero label means the slot holds a live payload.
                unsafe { cell.entry.assume_init_drop() };
            }
        }
    }
}
