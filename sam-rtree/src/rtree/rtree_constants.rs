//! Constants for the in-memory R-Tree.

/// Default maximum number of branches per node
pub const DEFAULT_MAX_NODES: usize = 8;

/// Smallest node capacity that can still be split into two non-empty halves
pub const MIN_MAX_NODES: usize = 2;

/// Hilbert curve order used to sort entries during bulk loading
pub const BULK_LOAD_HILBERT_ORDER: u32 = 16;
