//! Queries over a [`MemoryRTree`](crate::MemoryRTree).
//!
//! - [`RegionQuery`]: resumable walk driven by a [`SpatialPredicate`], able
//!   to remove or update what it finds
//! - [`NearestNeighborQuery`]: closest object to a point

pub mod counters;
pub mod nearest;
pub(crate) mod path;
pub mod predicate;
pub mod region;

pub use counters::QueryCounters;
pub use nearest::NearestNeighborQuery;
pub use predicate::{
    AllPredicate, ExactMatchPredicate, IsContainedPredicate, LayerAllPredicate, LayerPredicate,
    LayerQuery, LayerScaleWindowPredicate, LayerWindowPredicate, ScaleFilter, SelectPredicate,
    SpatialPredicate, WindowPredicate, WithinPredicate,
};
pub use region::{Operation, RegionQuery, RegionQueryIter, Relocation};
