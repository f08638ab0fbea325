//! Cuckoo breeding ground hash tables.
//!
//! An open-addressed map and set built on a cuckoo variant where buckets are
//! overlapping windows of neighbouring cells instead of disjoint slots.
//! Every cell carries a small metadata byte: a 3-bit *label* that steers
//! evictions toward elements whose alternate bucket is cheap, a direction
//! bit that lets a crowded bucket flip and grow downward over free
//! neighbours, and an *unlucky* bit that lets most negative lookups stop
//! after a single bucket probe.
//!
//! ## Storage layouts
//!
//! Three interchangeable cell layouts are provided; each map and set type
//! comes in all three flavours:
//!
//! - [`SoaMap`] / [`SoaSet`]: metadata, keys and values in separate arrays,
//!   with a second metadata byte holding a hash fingerprint. Two bytes of
//!   overhead per cell, and the fastest option for negative queries.
//! - [`AosMap`] / [`AosSet`]: one record per cell with metadata and payload
//!   side by side. The fastest option for positive queries.
//! - [`AobMap`] / [`AobSet`]: records grouped into fixed-size blocks, keeping
//!   metadata and payload co-located while amortising alignment padding.
//!
//! ## Bucket width
//!
//! The `B` const parameter sets how many cells a bucket spans:
//!
//! - `B = 2`: fastest, best below 50% load
//! - `B = 3`: balanced default, good up to ~95% load
//! - `B = 4`: densest, keeps working above 95% load
//!
//! ## Example
//!
//! ```
//! use cbg::SoaMap;
//!
//! let mut map: SoaMap<String, u32> = SoaMap::new();
//! map.insert("alpha".to_string(), 1);
//! map.insert("beta".to_string(), 2);
//! assert_eq!(map.get("alpha"), Some(&1));
//! assert!(map.erase("beta"));
//! assert_eq!(map.len(), 1);
//! ```
//!
//! Tables are single-threaded: lookups may not race with writers because an
//! insert can relocate elements and flip bucket directions anywhere in the
//! array. References handed out by accessors are valid only until the next
//! mutating call.

pub mod aob;
pub mod aos;
pub mod error;
pub mod hash;
pub mod iter;
pub mod map;
pub mod meta;
pub mod set;
pub mod soa;
pub mod store;
pub mod table;

pub use error::Error;
pub use hash::{DoubleHash, SplitHasher};
pub use map::{AobMap, AosMap, CbgMap, SoaMap};
pub use set::{AobSet, AosSet, CbgSet, SoaSet};
pub use store::Storage;
pub use table::RawTable;
