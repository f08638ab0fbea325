//! Block-interleaved layout.
//!
//! Cells are grouped into fixed-size blocks of `A` cells: `A` metadata bytes,
//! then `A` keys, then `A` values. Metadata and payloads stay co-located like
//! the interleaved layout, but fields keep their natural alignment and the
//! per-cell overhead stays at one byte plus block padding. Pick `A` as the
//! larger of the key and value alignments to eliminate the padding entirely;
//! the default of 8 does that for most word-sized payloads.

use std::mem::MaybeUninit;

use crate::meta::Meta;
use crate::store::Storage;

#[repr(C)]
struct MapBlock<K, V, const A: usize> {
    meta: [u8; A],
    keys: [MaybeUninit<K>; A],
    values: [MaybeUninit<V>; A],
}

impl<K, V, const A: usize> MapBlock<K, V, A> {
    fn empty() -> Self {
        Self {
            meta: [0; A],
            // Safety: an array of MaybeUninit does not require initialization
            keys: unsafe { MaybeUninit::uninit().assume_init() },
            values: unsafe { MaybeUninit::uninit().assume_init() },
        }
    }
}

#[repr(C)]
struct SetBlock<T, const A: usize> {
    meta: [u8; A],
    keys: [MaybeUninit<T>; A],
}

impl<T, const A: usize> SetBlock<T, A> {
    fn empty() -> Self {
        Self {
            meta: [0; A],
            // Safety: an array of MaybeUninit does not require initialization
            keys: unsafe { MaybeUninit::uninit().assume_init() },
        }
    }
}

#[inline]
const fn blocks_for(bins: usize, block: usize) -> usize {
    bins.div_ceil(block)
}

/// Key-value storage as an array of interleaved blocks.
pub struct AobMapStorage<K, V, const A: usize = 8> {
    blocks: Vec<MapBlock<K, V, A>>,
}

/// Key-only storage as an array of interleaved blocks.
pub struct AobSetStorage<T, const A: usize = 8> {
    blocks: Vec<SetBlock<T, A>>,
}

macro_rules! aob_storage_common {
    ($block:ident) => {
        fn with_capacity(bins: usize) -> Self {
            let mut blocks = Vec::new();
            blocks.resize_with(blocks_for(bins, A), $block::empty);
            Self { blocks }
        }

        fn resize(&mut self, old_bins: usize, new_bins: usize) {
            debug_assert!(new_bins >= old_bins);
            // Cells past the old bin count inside the last block were never
            // written, so only whole new blocks need creating.
            self.blocks.resize_with(blocks_for(new_bins, A), $block::empty);
        }

        fn clear_meta(&mut self, from: usize, len: usize) {
            for pos in from..from + len {
                self.blocks[pos / A].meta[pos % A] = 0;
            }
        }

        #[inline]
        fn meta(&self, pos: usize) -> Meta {
            Meta::from_bits(self.blocks[pos / A].meta[pos % A])
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
            let m = self.meta(pos);
            self.blocks[pos / A].meta[pos % A] =
                m.occupy(distance, reversed_item, label).bits();
        }

        #[inline]
        fn set_empty(&mut self, pos: usize) {
            let m = self.meta(pos);
            self.blocks[pos / A].meta[pos % A] = m.vacate().bits();
        }

        #[inline]
        fn set_bucket_reversed(&mut self, pos: usize) {
            let m = self.meta(pos);
            self.blocks[pos / A].meta[pos % A] = m.with_bucket_reversed().bits();
        }

        #[inline]
        fn set_unlucky_bucket(&mut self, pos: usize) {
            let m = self.meta(pos);
            self.blocks[pos / A].meta[pos % A] = m.with_unlucky_bucket().bits();
        }
    };
}

impl<K, V, const A: usize> Storage for AobMapStorage<K, V, A> {
    type Entry = (K, V);
    type Key = K;
    type Value = V;

    aob_storage_common!(MapBlock);

    #[inline]
    fn key_of(entry: &(K, V)) -> &K {
        &entry.0
    }

    #[inline]
    fn write_entry(&mut self, pos: usize, entry: (K, V)) {
        let block = &mut self.blocks[pos / A];
        block.keys[pos % A].write(entry.0);
        block.values[pos % A].write(entry.1);
    }

    #[inline]
    unsafe fn move_entry(&mut self, dst: usize, src: usize) {
        let k = self.blocks[src / A].keys[src % A].assume_init_read();
        let v = self.blocks[src / A].values[src % A].assume_init_read();
        self.blocks[dst / A].keys[dst % A].write(k);
        self.blocks[dst / A].values[dst % A].write(v);
    }

    #[inline]
    unsafe fn take_entry(&mut self, pos: usize) -> (K, V) {
        let block = &mut self.blocks[pos / A];
        (
            block.keys[pos % A].assume_init_read(),
            block.values[pos % A].assume_init_read(),
        )
    }

    #[inline]
    unsafe fn drop_entry(&mut self, pos: usize) {
        let block = &mut self.blocks[pos / A];
        block.keys[pos % A].assume_init_drop();
        block.values[pos % A].assume_init_drop();
    }

    #[inline]
    unsafe fn key_at(&self, pos: usize) -> &K {
        self.blocks[pos / A].keys[pos % A].assume_init_ref()
    }

    #[inline]
    unsafe fn value_at(&self, pos: usize) -> &V {
        self.blocks[pos / A].values[pos % A].assume_init_ref()
    }

    #[inline]
    unsafe fn value_at_mut(&mut self, pos: usize) -> &mut V {
        self.blocks[pos / A].values[pos % A].assume_init_mut()
    }
}

impl<T, const A: usize> Storage for AobSetStorage<T, A> {
    type Entry = T;
    type Key = T;
    type Value = T;

    aob_storage_common!(SetBlock);

    #[inline]
    fn key_of(entry: &T) -> &T {
        entry
    }

    #[inline]
    fn write_entry(&mut self, pos: usize, entry: T) {
        self.blocks[pos / A].keys[pos % A].write(entry);
    }

    #[inline]
    unsafe fn move_entry(&mut self, dst: usize, src: usize) {
        let k = self.blocks[src / A].keys[src % A].assume_init_read();
        self.blocks[dst / A].keys[dst % A].write(k);
    }

    #[inline]
    unsafe fn take_entry(&mut self, pos: usize) -> T {
        self.blocks[pos / A].keys[pos % A].assume_init_read()
    }

    #[inline]
    unsafe fn drop_entry(&mut self, pos: usize) {
        self.blocks[pos / A].keys[pos % A].assume_init_drop();
    }

    #[inline]
    unsafe fn key_at(&self, pos: usize) -> &T {
        self.blocks[pos / A].keys[pos % A].assume_init_ref()
    }

    #[inline]
    unsafe fn value_at(&self, pos: usize) -> &T {
        self.blocks[pos / A].keys[pos % A].assume_init_ref()
    }

    #[inline]
    unsafe fn value_at_mut(&mut self, pos: usize) -> &mut T {
        self.blocks[pos / A].keys[pos % A].assume_init_mut()
    }
}

impl<K, V, const A: usize> Drop for AobMapStorage<K, V, A> {
    fn drop(&mut self) {
        for block in &mut self.blocks {
            for i in 0..A {
                if !Meta::from_bits(block.meta[i]).is_empty() {
                    // Safety: a nonzero label means the slot holds a live payload.
                    unsafe {
                        block.keys[i].assume_init_drop();
                        block.values[i].assume_init_drop();
                    }
                }
            }
        }
    }
}

impl<T, const A: usize> Drop for AobSetStorage<T, A> {
    fn drop(&mut self) {
        for block in &mut self.blocks {
            for i in 0..A {
                if !Meta::from_bits(block.meta[i]).is_empty() {
                    // Safety: a nonzero label means the slot holds a live payload.
                    unsafe { block.keys[i].assume_init_drop() };
                }
            }
        }
    }
}
