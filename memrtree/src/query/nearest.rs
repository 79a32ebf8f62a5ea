//! Nearest neighbour search with a growing search radius.
//!
//! The search walks the tree with the same explicit path as the region
//! query, pruning children whose box lies farther than the current
//! tolerance from the query point:
//!
//! 1. Starting from an initial tolerance, scan and double the tolerance
//!    until some object is found.
//! 2. If the best distance found exceeds the tolerance used, scan once more
//!    with the tolerance set to that distance. Any closer object must lie
//!    within it, so one corrective pass is enough.

use super::counters::QueryCounters;
use super::path::{node_at, TraversalPath};
use crate::mbr::{Coords, Mbr};
use crate::object::{Measurable, TypeComparable};
use crate::spatial_tree::SpatialSearchTree;
use crate::tree::node::Node;
use crate::tree::rtree_constants::DEFAULT_NEAREST_TOLERANCE;
use crate::tree::MemoryRTree;
use crate::tree::rtree_types::{SpatialError, SpatialResult};
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;

type TypeCheck<T> = fn(&T, &T) -> bool;

/// Finds the stored object closest to a point.
///
/// An object can be excluded from the search, typically the one being
/// moved, and the search can be restricted to objects of the same type as a
/// reference object.
pub struct NearestNeighborQuery<T: ?Sized> {
    point: Option<Coords>,
    exclude: Option<Arc<T>>,
    same_type: Option<(Arc<T>, TypeCheck<T>)>,
    initial_tolerance: f64,
    path: TraversalPath,
    best_distance: Option<f64>,
    counters: QueryCounters,
}

impl<T: ?Sized> Default for NearestNeighborQuery<T> {
    fn default() -> Self {
        NearestNeighborQuery {
            point: None,
            exclude: None,
            same_type: None,
            initial_tolerance: DEFAULT_NEAREST_TOLERANCE,
            path: TraversalPath::new(),
            best_distance: None,
            counters: QueryCounters::default(),
        }
    }
}

impl<T: Measurable + ?Sized> NearestNeighborQuery<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Searches around `point` with no excluded object.
    pub fn init_with_point(&mut self, tree: &MemoryRTree<T>, point: &[i32]) -> SpatialResult<()> {
        self.configure(tree, point, None)
    }

    /// Searches around `point`, skipping `exclude`. The initial tolerance
    /// becomes the largest extent of the excluded object's box.
    pub fn init_with_point_excluding(
        &mut self,
        tree: &MemoryRTree<T>,
        point: &[i32],
        exclude: Arc<T>,
    ) -> SpatialResult<()> {
        self.configure(tree, point, Some(exclude))
    }

    /// Only objects of the same type as `reference` are considered.
    pub fn restrict_to_type_of(&mut self, reference: Arc<T>)
    where
        T: TypeComparable,
    {
        self.same_type = Some((reference, <T as TypeComparable>::is_of_same_type));
    }

    pub fn clear_type_restriction(&mut self) {
        self.same_type = None;
    }

    /// Distance of the last object returned by
    /// [`nearest_object`](Self::nearest_object).
    pub fn best_distance(&self) -> Option<f64> {
        self.best_distance
    }

    /// Tolerance the first scan starts with.
    pub fn initial_tolerance(&self) -> f64 {
        self.initial_tolerance
    }

    pub fn counters(&self) -> QueryCounters {
        self.counters
    }

    pub fn set_counters(&mut self, counters: QueryCounters) {
        self.counters = counters;
    }

    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    fn configure(
        &mut self,
        tree: &MemoryRTree<T>,
        point: &[i32],
        exclude: Option<Arc<T>>,
    ) -> SpatialResult<()> {
        if point.len() < tree.dimensions() {
            return Err(SpatialError::DimensionMismatch {
                expected: tree.dimensions(),
                found: point.len(),
            });
        }
        self.initial_tolerance = match &exclude {
            Some(object) => object.mbr().max_extension() as f64,
            None => DEFAULT_NEAREST_TOLERANCE,
        };
        self.point = Some(SmallVec::from_slice(&point[..tree.dimensions()]));
        self.exclude = exclude;
        self.best_distance = None;
        self.path.clear();
        self.counters.query_count += 1;
        Ok(())
    }

    /// Returns the object closest to the configured point. Ties keep the
    /// object met first in tree order.
    pub fn nearest_object(&mut self, tree: &MemoryRTree<T>) -> SpatialResult<Option<Arc<T>>> {
        let Some(point) = self.point.clone() else {
            return Err(SpatialError::InvalidOperation(
                "nearest neighbour query used before it was initialised".into(),
            ));
        };
        let started = Instant::now();
        let result = self.search(tree.root(), &point);
        self.counters.elapsed += started.elapsed();

        let found = result?;
        self.best_distance = found.as_ref().map(|(_, distance)| *distance);
        if found.is_some() {
            self.counters.result_count += 1;
        }
        Ok(found.map(|(object, _)| object))
    }

    fn search(&mut self, root: &Node<T>, point: &[i32]) -> SpatialResult<Option<(Arc<T>, f64)>> {
        if root.is_empty() {
            return Ok(None);
        }

        let mut tolerance = self.initial_tolerance.max(0.0);
        let best = loop {
            let radius = to_radius(tolerance);
            if let Some(best) = self.scan(root, point, radius)? {
                break best;
            }
            if covers(point, radius, root.mbr()) {
                return Ok(None);
            }
            tolerance = if tolerance < 1.0 { 1.0 } else { tolerance * 2.0 };
            log::trace!("Nearest neighbour search widened to tolerance {}", tolerance);
        };

        if best.1 <= tolerance {
            return Ok(Some(best));
        }

        match self.scan(root, point, to_radius(best.1))? {
            Some(refined) => Ok(Some(refined)),
            None => {
                log::warn!(
                    "Nearest neighbour refinement at distance {} found nothing, keeping first result",
                    best.1
                );
                Ok(Some(best))
            }
        }
    }

    /// One full walk with children pruned to `radius` around `point`.
    fn scan(
        &mut self,
        root: &Node<T>,
        point: &[i32],
        radius: i32,
    ) -> SpatialResult<Option<(Arc<T>, f64)>> {
        let mut best: Option<(Arc<T>, f64)> = None;
        self.path.reset();

        while let Some(start) = self.path.current() {
            let Some(node) = node_at(root, self.path.parents()) else {
                self.path.ascend(root);
                continue;
            };

            if node.is_leaf() {
                for index in start..node.len() {
                    let Some(object) = node.object(index) else {
                        continue;
                    };
                    if !self.is_candidate(object) {
                        continue;
                    }
                    let distance = object.distance_to(point);
                    if best.as_ref().map_or(true, |(_, d)| distance < *d) {
                        best = Some((object.clone(), distance));
                    }
                }
            } else {
                let mut next = None;
                for index in start..node.len() {
                    if let Some(mbr) = node.entry_mbr(index) {
                        if mbr.contains_point(point, radius)? {
                            next = Some(index);
                            break;
                        }
                    }
                }
                if let Some(index) = next {
                    self.path.set_current(index);
                    self.path.descend()?;
                    continue;
                }
            }
            self.path.ascend(root);
        }
        Ok(best)
    }

    fn is_candidate(&self, object: &Arc<T>) -> bool {
        if self
            .exclude
            .as_ref()
            .is_some_and(|exclude| Arc::ptr_eq(exclude, object))
        {
            return false;
        }
        match &self.same_type {
            Some((reference, same_type)) => same_type(object, reference),
            None => true,
        }
    }
}

/// Integer pruning radius for a tolerance, rounded up.
fn to_radius(tolerance: f64) -> i32 {
    let radius = tolerance.ceil();
    if radius >= i32::MAX as f64 {
        i32::MAX
    } else {
        radius.max(0.0) as i32
    }
}

/// Whether every box inside `bounds` is within `radius` of `point` on every
/// axis, so no wider scan can reach more of the tree.
fn covers(point: &[i32], radius: i32, bounds: &Mbr) -> bool {
    if radius == i32::MAX {
        return true;
    }
    let radius = radius as i64;
    (0..bounds.dimensions()).all(|axis| {
        match (bounds.min(axis), bounds.max(axis), point.get(axis)) {
            (Some(lo), Some(hi), Some(p)) => {
                let p = *p as i64;
                p - radius <= lo as i64 && hi as i64 <= p + radius
            }
            _ => true,
        }
    })
}
