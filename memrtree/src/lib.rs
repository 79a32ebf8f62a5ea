//! # memrtree - In-Memory R-Tree
//!
//! This crate provides an n-dimensional R-Tree over integer bounding boxes
//! together with the queries that search it.
//!
//! ## Features
//!
//! - **N-Dimensional**: boxes of any fixed dimension, integer coordinates
//! - **Exact Boxes**: every node box is the exact union of its entries
//! - **Pluggable Splits**: placement and split policy behind [`RTreeStrategy`]
//! - **Resumable Queries**: [`RegionQuery`] suspends after every match and
//!   can remove, update or relocate matches while walking
//! - **Predicates**: window, exact match, containment, within, layer, scale
//!   and point-pick filters
//! - **Nearest Neighbour**: [`NearestNeighborQuery`] with a growing radius
//!
//! ## Quick Start
//!
//! ```rust
//! use memrtree::{Mbr, MemoryRTree, SpatialEntry, SpatialObject, SpatialSearchTree};
//! use std::sync::Arc;
//!
//! struct Parcel {
//!     bounds: Mbr,
//! }
//!
//! impl SpatialEntry for Parcel {
//!     fn mbr(&self) -> &Mbr {
//!         &self.bounds
//!     }
//! }
//!
//! impl SpatialObject for Parcel {}
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tree = MemoryRTree::new(2, 16)?;
//! let parcel = Arc::new(Parcel { bounds: Mbr::rect(0, 0, 10, 10) });
//! tree.insert(parcel.clone())?;
//!
//! let hits = tree.find_intersecting(&Mbr::rect(5, 5, 10, 10), 0)?;
//! assert_eq!(hits.len(), 1);
//!
//! assert!(tree.remove(&parcel)?);
//! assert_eq!(tree.total_objects(), 0);
//! # Ok(())
//! # }
//! ```

pub mod mbr;
pub mod object;
pub mod query;
pub mod spatial_tree;
pub mod tree;

#[cfg(test)]
mod test_support;

pub use mbr::{Coords, Mbr};
pub use object::{Layered, Measurable, SpatialEntry, SpatialObject, TypeComparable, Visualized};
pub use query::{
    AllPredicate, ExactMatchPredicate, IsContainedPredicate, LayerAllPredicate, LayerPredicate,
    LayerQuery, LayerScaleWindowPredicate, LayerWindowPredicate, NearestNeighborQuery, Operation,
    QueryCounters, RegionQuery, RegionQueryIter, Relocation, ScaleFilter, SelectPredicate,
    SpatialPredicate, WindowPredicate, WithinPredicate,
};
pub use spatial_tree::SpatialSearchTree;
pub use tree::rtree_constants::{DEFAULT_DIMENSIONS, DEFAULT_NODE_CAPACITY, MAX_TRAVERSAL_DEPTH};
pub use tree::{
    Entry, MemoryRTree, Node, RTreeConfig, RTreeConfigBuilder, RTreeStats, RTreeStrategy,
    SimpleRTreeStrategy, SpatialError, SpatialNode, SpatialResult, StrategyParameters,
};
