//! Core types and data structures for the in-memory R-Tree.
//!
//! This module defines the fundamental types used throughout the R-Tree:
//! - Error types and result types
//! - Node and branch types
//! - Statistics and integrity report structures

use crate::bounding_box::BoundingBox;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in spatial indexing operations.
///
/// A value that is not found by `remove` is not an error; it is reported
/// as `false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpatialError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about the shape of an R-Tree
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RTreeStats {
    /// Number of allocated nodes (same as [`RTree::size`](super::RTree::size))
    pub node_count: usize,
    /// Number of leaf nodes
    pub leaf_count: usize,
    /// Number of stored values
    pub total_entries: usize,
    /// Number of levels, a lone leaf root counts as 1
    pub tree_height: u32,
    /// Average number of branches per leaf divided by the node capacity (0-1)
    pub leaf_fill_factor: f64,
}

/// Statistics about a rebuild operation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebuildStats {
    /// Total entries reindexed
    pub entries_reindexed: usize,
    /// Number of nodes before rebuild
    pub nodes_before: usize,
    /// Number of nodes after rebuild
    pub nodes_after: usize,
    /// Tree height before rebuild
    pub height_before: u32,
    /// Tree height after rebuild
    pub height_after: u32,
}

/// Result of a structural verification of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityReport {
    /// Total nodes visited
    pub nodes_checked: usize,
    /// Total leaf values visited
    pub entries_checked: usize,
    /// Summary of findings
    pub is_valid: bool,
    /// Detailed error messages
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn new() -> Self {
        Self {
            nodes_checked: 0,
            entries_checked: 0,
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub(crate) fn violation(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

impl Default for IntegrityReport {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Node Types
// ============================================================================

/// What a branch points at: a child node in internal nodes, a caller value in leaves.
#[derive(Debug, Clone)]
pub(crate) enum BranchPayload<V> {
    Child(Box<Node<V>>),
    Value(V),
}

/// A bounding rectangle plus the subtree or value it covers
#[derive(Debug, Clone)]
pub(crate) struct Branch<V> {
    pub(crate) mbr: BoundingBox,
    pub(crate) payload: BranchPayload<V>,
}

impl<V> Branch<V> {
    pub(crate) fn value(mbr: BoundingBox, value: V) -> Self {
        Self {
            mbr,
            payload: BranchPayload::Value(value),
        }
    }

    /// Wraps a whole node, covering it with its exact bounding box.
    pub(crate) fn child(node: Box<Node<V>>) -> Self {
        Self {
            mbr: node.cover(),
            payload: BranchPayload::Child(node),
        }
    }
}

/// A fixed-capacity container of branches.
///
/// `level == 0` is a leaf. An internal node's level is the height of the
/// subtree below it, and each of its children sits at `level - 1`.
#[derive(Debug, Clone)]
pub(crate) struct Node<V> {
    pub(crate) branches: Vec<Branch<V>>,
    pub(crate) level: u32,
}

impl<V> Node<V> {
    pub(crate) fn new(level: u32, capacity: usize) -> Self {
        Self {
            branches: Vec::with_capacity(capacity),
            level,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.level == 0
    }

    pub(crate) fn is_internal(&self) -> bool {
        self.level > 0
    }

    pub(crate) fn count(&self) -> usize {
        self.branches.len()
    }

    /// Drops every branch, keeping the level and the allocation.
    pub(crate) fn init(&mut self) {
        self.branches.clear();
    }

    /// Smallest rectangle enclosing every branch. Empty nodes cover
    /// [`BoundingBox::empty`].
    pub(crate) fn cover(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for b in &self.branches {
            bbox.expand(&b.mbr);
        }
        bbox
    }
}
