//! SpatialIndex trait definition for shared spatial indexing.

use crate::bounding_box::BoundingBox;
use crate::rtree::SpatialResult;

/// A spatial index that can be shared between threads.
///
/// Unlike [`RTree`](crate::RTree), every method takes `&self`; implementors
/// do their own locking.
pub trait SpatialIndex<V>: Send + Sync {
    /// Adds a value covering `key` to the index.
    fn add(&self, key: &BoundingBox, value: V) -> SpatialResult<()>;

    /// Removes one occurrence of `value` found under `key`.
    fn remove(&self, key: &BoundingBox, value: &V) -> SpatialResult<bool>;

    /// Finds the values whose rectangle intersects `key`.
    fn find_intersecting_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<V>>;

    /// Finds the values whose rectangle lies inside `key`.
    fn find_contained_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<V>>;

    /// Finds the K nearest values to a point using branch-and-bound search.
    fn find_nearest(
        &self,
        center_x: f64,
        center_y: f64,
        k: usize,
        max_distance: Option<f64>,
    ) -> SpatialResult<Vec<(V, f64)>>;

    /// Finds values within a specific distance of a point (range query).
    fn find_within_distance(
        &self,
        center_x: f64,
        center_y: f64,
        distance: f64,
    ) -> SpatialResult<Vec<(V, f64)>> {
        self.find_nearest(center_x, center_y, usize::MAX, Some(distance))
    }

    /// Gets the number of allocated nodes.
    fn size(&self) -> usize;

    /// Gets the number of stored values.
    fn entry_count(&self) -> usize;

    /// Returns true if nothing is stored.
    fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Clears all data from the index.
    fn clear(&self) -> SpatialResult<()>;

    /// Tracked bounding box of everything added.
    fn bounds(&self) -> BoundingBox;
}
