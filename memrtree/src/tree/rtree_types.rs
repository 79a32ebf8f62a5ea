//! Core types shared by the in-memory R-Tree and its queries.
//!
//! This module defines:
//! - Error types and result types
//! - Statistics structures

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in spatial indexing operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpatialError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Traversal exceeded the maximum depth of {0} levels")]
    DepthExceeded(usize),
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about the shape of an R-Tree.
///
/// Everything except `total_objects` is computed by walking the tree, so
/// building a snapshot costs O(n).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    pub total_objects: u64,
    pub node_count: u64,
    pub entry_count: u64,
    pub tree_height: u32,
    pub dimensions: usize,
    pub node_capacity: usize,
}

impl RTreeStats {
    /// Average number of entries per node, 0 for an empty tree.
    pub fn fill_ratio(&self) -> f64 {
        if self.node_count == 0 || self.node_capacity == 0 {
            return 0.0;
        }
        self.entry_count as f64 / (self.node_count as f64 * self.node_capacity as f64)
    }
}
