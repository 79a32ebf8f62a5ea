//! In-memory R-Tree: nodes, split strategy and the tree facade.
//!
//! The tree keeps every node box equal to the exact union of its entries
//! and grows only at the top, so all leaves stay at the same depth.
//! Deleting never merges or drops nodes; a leaf emptied by removals stays
//! in place.

pub mod config;
pub mod node;
pub mod rtree_constants;
pub mod rtree_types;
pub mod strategy;
mod rtree_impl;

pub use config::{RTreeConfig, RTreeConfigBuilder};
pub use node::{Entry, Node, SpatialNode};
pub use rtree_impl::MemoryRTree;
pub use rtree_types::{RTreeStats, SpatialError, SpatialResult};
pub use strategy::{Distribution, RTreeStrategy, SimpleRTreeStrategy, StrategyParameters};
