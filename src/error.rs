//! Error types for the `cbg` crate.

/// Errors surfaced by the strict accessors and the capacity guard.
///
/// Everything else that can go wrong inside the table (label saturation,
/// eviction cycles, hopscotch dead ends) is handled internally by growing
/// the table and never reaches the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested key is not in the table.
    #[error("key not found in table")]
    KeyNotFound,

    /// The table already spans the addressable maximum and still cannot
    /// place the element.
    #[error("table cannot grow past the addressable maximum")]
    CapacityOverflow,
}
