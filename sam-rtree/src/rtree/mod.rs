//! In-memory R-Tree implementation.
//!
//! This module provides a Guttman R-Tree over 2D bounding boxes with:
//! - Least-enlargement descent for insertion
//! - Quadratic-cost node splitting with a guaranteed minimum fill
//! - Deferred reinsertion of underfull nodes on removal
//! - Range, containment and nearest-neighbour queries
//! - Hilbert-ordered bulk loading and rebuild

pub mod rtree_types;
pub mod rtree_constants;
pub mod rtree_config;
mod partition;
mod rtree_impl;

pub use rtree_types::{IntegrityReport, RTreeStats, RebuildStats, SpatialError, SpatialResult};
pub use rtree_constants::{DEFAULT_MAX_NODES, MIN_MAX_NODES};
pub use rtree_config::RTreeConfig;
pub use rtree_impl::{Iter, RTree};
