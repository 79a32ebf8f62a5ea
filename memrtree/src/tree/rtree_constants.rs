//! Constants for the in-memory R-Tree implementation.

/// Default number of dimensions of a tree
pub const DEFAULT_DIMENSIONS: usize = 2;

/// Maximum number of entries per node before a split
pub const DEFAULT_NODE_CAPACITY: usize = 16;

/// Smallest capacity that still allows a split into two non-empty nodes
pub const MIN_NODE_CAPACITY: usize = 2;

/// Maximum depth of the explicit traversal stack used by queries
pub const MAX_TRAVERSAL_DEPTH: usize = 40;

/// Minimum fill percentage kept by the split strategy (stored, not enforced)
pub const DEFAULT_MINIMUM_FILL: u32 = 40;

/// Percentage of entries reordered by `sort_for_reinsert`
pub const DEFAULT_REINSERT_FACTOR: u32 = 0;

/// Initial search radius of a nearest neighbour query
pub const DEFAULT_NEAREST_TOLERANCE: f64 = 100.0;
