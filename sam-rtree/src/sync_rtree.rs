//! Thread-safe handle around an in-memory [`RTree`].

use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::bounding_box::BoundingBox;
use crate::rtree::{RTree, RTreeConfig, RTreeStats, RebuildStats, SpatialError, SpatialResult};
use crate::spatial_index::SpatialIndex;

/// A cloneable, thread-safe R-Tree.
///
/// Queries take a shared read lock, so any number of them run in parallel;
/// mutations take the write lock. Clones share the same tree.
///
/// # Example
///
/// ```rust
/// use sam_rtree::{BoundingBox, SpatialIndex, SyncRTree};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let index: SyncRTree<u64> = SyncRTree::new();
/// index.add(&BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1)?;
///
/// let reader = index.clone();
/// let handle = std::thread::spawn(move || {
///     reader.find_intersecting_keys(&BoundingBox::new(5.0, 5.0, 15.0, 15.0))
/// });
/// assert_eq!(handle.join().unwrap()?, vec![1]);
/// # Ok(())
/// # }
/// ```
pub struct SyncRTree<V> {
    inner: Arc<RwLock<RTree<V>>>,
}

impl<V> Clone for SyncRTree<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + PartialEq> Default for SyncRTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq> SyncRTree<V> {
    /// Create a new empty index with default node capacities.
    pub fn new() -> Self {
        Self::from_tree(RTree::new())
    }

    /// Create a new empty index with custom node capacities.
    pub fn with_config(config: RTreeConfig) -> SpatialResult<Self> {
        Ok(Self::from_tree(RTree::with_config(config)?))
    }

    /// Wraps an existing tree.
    pub fn from_tree(tree: RTree<V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    /// Height of the underlying tree.
    pub fn height(&self) -> u32 {
        self.inner.read().height()
    }

    /// Shape statistics of the underlying tree.
    pub fn stats(&self) -> RTreeStats {
        self.inner.read().stats()
    }

    /// Rebuilds the underlying tree while holding the write lock.
    pub fn rebuild(&self) -> RebuildStats {
        self.inner.write().rebuild()
    }

    /// Runs `f` with shared access to the tree.
    pub fn read<R>(&self, f: impl FnOnce(&RTree<V>) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Runs `f` with exclusive access to the tree.
    pub fn write<R>(&self, f: impl FnOnce(&mut RTree<V>) -> R) -> R {
        f(&mut *self.inner.write())
    }
}

fn check_key(key: &BoundingBox) -> SpatialResult<()> {
    if key.is_valid() {
        Ok(())
    } else {
        Err(SpatialError::InvalidOperation(format!(
            "cannot index malformed bounding box {}",
            key
        )))
    }
}

impl<V: Clone + PartialEq + Send + Sync> SpatialIndex<V> for SyncRTree<V> {
    fn add(&self, key: &BoundingBox, value: V) -> SpatialResult<()> {
        check_key(key)?;
        self.inner.write().insert(*key, value);
        Ok(())
    }

    fn remove(&self, key: &BoundingBox, value: &V) -> SpatialResult<bool> {
        Ok(self.inner.write().remove(key, value))
    }

    fn find_intersecting_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<V>> {
        Ok(self.inner.read().find_intersecting(key))
    }

    fn find_contained_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<V>> {
        Ok(self.inner.read().find_contained(key))
    }

    fn find_nearest(
        &self,
        center_x: f64,
        center_y: f64,
        k: usize,
        max_distance: Option<f64>,
    ) -> SpatialResult<Vec<(V, f64)>> {
        if center_x.is_nan() || center_y.is_nan() {
            return Err(SpatialError::InvalidOperation(
                "nearest neighbour query point has a NaN coordinate".into(),
            ));
        }
        Ok(self
            .inner
            .read()
            .find_nearest(center_x, center_y, k, max_distance))
    }

    fn size(&self) -> usize {
        self.inner.read().size()
    }

    fn entry_count(&self) -> usize {
        self.inner.read().entry_count()
    }

    fn clear(&self) -> SpatialResult<()> {
        self.inner.write().clear();
        debug!("Cleared shared R-Tree");
        Ok(())
    }

    fn bounds(&self) -> BoundingBox {
        *self.inner.read().mbr()
    }
}
