//! Node capacity configuration.

use super::rtree_constants::{DEFAULT_MAX_NODES, MIN_MAX_NODES};
use super::rtree_types::{SpatialError, SpatialResult};

/// Capacity bounds for every node of an [`RTree`](super::RTree).
///
/// `max_nodes` is the most branches a node holds before it is split.
/// `min_nodes` is the fewest a non-root node may keep after a removal
/// before its remaining branches are reinserted; it defaults to half of
/// `max_nodes`.
///
/// # Examples
///
/// ```rust
/// use sam_rtree::RTreeConfig;
///
/// let config = RTreeConfig::new(16);
/// assert_eq!(config.min_nodes(), 8);
///
/// let config = RTreeConfig::new(16).with_min_nodes(4);
/// assert!(config.validate().is_ok());
///
/// assert!(RTreeConfig::new(8).with_min_nodes(5).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RTreeConfig {
    max_nodes: usize,
    min_nodes: usize,
}

impl Default for RTreeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NODES)
    }
}

impl RTreeConfig {
    /// Creates a configuration with `min_nodes = max_nodes / 2`.
    pub fn new(max_nodes: usize) -> Self {
        Self {
            max_nodes,
            min_nodes: max_nodes / 2,
        }
    }

    /// Overrides the minimum fill.
    pub fn with_min_nodes(mut self, min_nodes: usize) -> Self {
        self.min_nodes = min_nodes;
        self
    }

    /// Maximum branches per node.
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Minimum branches per non-root node.
    pub fn min_nodes(&self) -> usize {
        self.min_nodes
    }

    /// Checks the capacity bounds.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidConfig`] if `max_nodes < 2`,
    /// `min_nodes == 0` or `min_nodes > max_nodes / 2`. Any of these would
    /// let a split produce a group that is empty or already underfull.
    pub fn validate(&self) -> SpatialResult<()> {
        if self.max_nodes < MIN_MAX_NODES {
            return Err(SpatialError::InvalidConfig(format!(
                "max_nodes must be at least {}, got {}",
                MIN_MAX_NODES, self.max_nodes
            )));
        }
        if self.min_nodes == 0 {
            return Err(SpatialError::InvalidConfig(
                "min_nodes must be at least 1".into(),
            ));
        }
        if self.min_nodes > self.max_nodes / 2 {
            return Err(SpatialError::InvalidConfig(format!(
                "min_nodes ({}) must not exceed max_nodes / 2 ({})",
                self.min_nodes,
                self.max_nodes / 2
            )));
        }
        Ok(())
    }
}
