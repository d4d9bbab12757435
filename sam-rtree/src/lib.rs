//! # SAM R-Tree - In-Memory Spatial Access Method
//!
//! This crate provides a memory-resident R-Tree for indexing arbitrary values
//! by their 2D bounding box, following Guttman's 1984 design.
//!
//! ## Features
//!
//! - **Generic Values**: Any `Clone + PartialEq` value can be indexed
//! - **Quadratic Split**: Nodes overflow into two groups that both keep a minimum fill
//! - **Deferred Reinsertion**: Underfull nodes left by removals are reinserted, not merged
//! - **Queries**: Intersection, containment and k-nearest-neighbour search
//! - **Bulk Loading**: Hilbert-ordered loading and in-place rebuild
//! - **Thread Safe Handle**: [`SyncRTree`] shares one tree behind a read/write lock
//!
//! ## Quick Start
//!
//! ```rust
//! use sam_rtree::{BoundingBox, RTree, RTreeConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tree = RTree::with_config(RTreeConfig::new(4))?;
//!
//! for i in 0..10u32 {
//!     let x = i as f64 * 10.0;
//!     tree.insert(BoundingBox::new(x, 0.0, x + 5.0, 5.0), i);
//! }
//!
//! let mut found = Vec::new();
//! let count = tree.search(&BoundingBox::new(12.0, 1.0, 31.0, 2.0), &mut found);
//! assert_eq!(count, 3);
//!
//! let nearest = tree.find_nearest(0.0, 0.0, 1, None);
//! assert_eq!(nearest, vec![(0, 0.0)]);
//!
//! assert!(tree.remove(&BoundingBox::new(0.0, 0.0, 5.0, 5.0), &0));
//! assert_eq!(tree.entry_count(), 9);
//! # Ok(())
//! # }
//! ```

pub mod bounding_box;
pub mod hilbert;
pub mod rtree;
pub mod spatial_index;
pub mod sync_rtree;

// Re-export R-Tree types
pub use bounding_box::BoundingBox;
pub use rtree::{
    IntegrityReport, RTree, RTreeConfig, RTreeStats, RebuildStats, SpatialError, SpatialResult,
};
pub use spatial_index::SpatialIndex;
pub use sync_rtree::SyncRTree;
