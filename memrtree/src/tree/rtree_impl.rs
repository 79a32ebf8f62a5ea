//! MemoryRTree implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::mbr::Mbr;
use crate::object::{Measurable, SpatialObject};
use crate::query::nearest::NearestNeighborQuery;
use crate::query::predicate::{IsContainedPredicate, WindowPredicate};
use crate::query::region::{Operation, RegionQuery, Relocation};
use crate::spatial_tree::SpatialSearchTree;

use super::config::RTreeConfig;
use super::node::{InsertContext, InsertOutcome, Node};
use super::rtree_types::{RTreeStats, SpatialError, SpatialResult};
use super::strategy::{RTreeStrategy, SimpleRTreeStrategy};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// An in-memory R-Tree over objects with integer bounding boxes.
///
/// The tree owns a root [`Node`] and a split [`RTreeStrategy`]. Dimension
/// and node capacity are fixed at construction. Objects are shared through
/// `Arc`, and removal goes by identity: the tree removes the stored `Arc`
/// that points to the same object.
///
/// The tree does no locking. Mutation needs `&mut`, so a region query
/// driven against the tree is the only thing that can change it mid-walk.
pub struct MemoryRTree<T: ?Sized> {
    id: u64,
    dimensions: usize,
    node_capacity: usize,
    strategy: Box<dyn RTreeStrategy>,
    root: Node<T>,
    total_objects: usize,
    root_generation: u64,
}

impl<T: SpatialObject + ?Sized> Default for MemoryRTree<T> {
    fn default() -> Self {
        Self::with_config(RTreeConfig::default())
    }
}

impl<T: SpatialObject + ?Sized> MemoryRTree<T> {
    /// Creates an empty tree with the default strategy.
    pub fn new(dimensions: usize, node_capacity: usize) -> SpatialResult<Self> {
        let config = RTreeConfig::builder()
            .dimensions(dimensions)
            .node_capacity(node_capacity)
            .build()?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: RTreeConfig) -> Self {
        let dimensions = config.dimensions();
        let node_capacity = config.node_capacity();
        let id = NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "Created R-Tree {} with {} dimensions and node capacity {}",
            id,
            dimensions,
            node_capacity
        );

        MemoryRTree {
            id,
            dimensions,
            node_capacity,
            strategy: Box::new(SimpleRTreeStrategy::with_parameters(
                config.strategy_parameters(),
            )),
            root: Node::new(dimensions, node_capacity, true, true),
            total_objects: 0,
            root_generation: 0,
        }
    }

    pub fn root(&self) -> &Node<T> {
        &self.root
    }

    pub fn node_capacity(&self) -> usize {
        self.node_capacity
    }

    pub fn strategy(&self) -> &dyn RTreeStrategy {
        self.strategy.as_ref()
    }

    /// Replaces the split strategy. Existing nodes keep their layout.
    pub fn set_split_strategy(&mut self, strategy: Box<dyn RTreeStrategy>) {
        self.strategy = strategy;
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Bumped whenever the root node is replaced.
    pub(crate) fn root_generation(&self) -> u64 {
        self.root_generation
    }

    pub(crate) fn root_and_counter_mut(&mut self) -> (&mut Node<T>, &mut usize) {
        (&mut self.root, &mut self.total_objects)
    }

    /// Snapshot of the tree shape. Walks the whole tree.
    pub fn stats(&self) -> RTreeStats {
        RTreeStats {
            total_objects: self.total_objects as u64,
            node_count: self.root.count_nodes() as u64,
            entry_count: self.root.count_entries() as u64,
            tree_height: self.root.height() as u32,
            dimensions: self.dimensions,
            node_capacity: self.node_capacity,
        }
    }

    /// Verifies that every node box is the exact union of its entries, that
    /// all leaves share one depth, that no node exceeds the capacity and
    /// that the object counter matches the stored objects.
    pub fn check_invariants(&self) -> SpatialResult<()> {
        if !self.root.is_root() {
            return Err(SpatialError::InvariantViolation(
                "root node is not flagged as root".into(),
            ));
        }
        self.root.verify(self.dimensions)?;

        let stored = self.root.count_objects();
        if stored != self.total_objects {
            return Err(SpatialError::InvariantViolation(format!(
                "object counter is {} but leaves hold {} objects",
                self.total_objects, stored
            )));
        }
        Ok(())
    }

    /// Logs the tree structure at debug level.
    pub fn debug_print(&self) {
        log::debug!(
            "R-Tree {}: {} objects, height {}",
            self.id,
            self.total_objects,
            self.root.height()
        );
        self.root.dump(0);
    }

    /// Moves `object` to the box of `moved`, the same object at its new
    /// location. Identity follows `moved` from then on.
    ///
    /// A move that stays inside the old leaf swaps the entry in place; any
    /// other move removes the old entry and inserts `moved` from the root.
    pub fn move_object(&mut self, object: &Arc<T>, moved: Arc<T>) -> SpatialResult<Relocation> {
        let mut query = RegionQuery::new(IsContainedPredicate);
        query.init_with_object(self, object.clone(), Operation::RemoveExact);
        query.relocate(self, moved)
    }

    fn collect(
        &self,
        mut query: RegionQuery<T>,
        rect: &Mbr,
    ) -> SpatialResult<Vec<Arc<T>>> {
        query.init_with_rect(self, rect.clone(), Operation::Query);
        let mut results = Vec::new();
        while let Some(object) = query.find_next(self)? {
            results.push(object);
        }
        Ok(results)
    }
}

impl<T: Measurable + ?Sized> MemoryRTree<T> {
    /// Returns the object closest to `point`, skipping `exclude`.
    pub fn nearest(&self, point: &[i32], exclude: Option<Arc<T>>) -> SpatialResult<Option<Arc<T>>> {
        let mut query = NearestNeighborQuery::new();
        match exclude {
            Some(object) => query.init_with_point_excluding(self, point, object)?,
            None => query.init_with_point(self, point)?,
        }
        query.nearest_object(self)
    }
}

// ============================================================================
// SpatialSearchTree implementation
// ============================================================================

impl<T: SpatialObject + ?Sized> SpatialSearchTree<T> for MemoryRTree<T> {
    fn insert(&mut self, object: Arc<T>) -> SpatialResult<()> {
        let found = object.num_of_dimensions();
        if found != self.dimensions {
            return Err(SpatialError::DimensionMismatch {
                expected: self.dimensions,
                found,
            });
        }

        let mut ctx = InsertContext {
            strategy: self.strategy.as_ref(),
            total_objects: &mut self.total_objects,
        };
        if let InsertOutcome::RootGrown = self.root.insert(object, &mut ctx)? {
            self.root_generation += 1;
        }
        Ok(())
    }

    fn remove(&mut self, object: &Arc<T>) -> SpatialResult<bool> {
        let mut query = RegionQuery::new(IsContainedPredicate);
        query.init_with_object(self, object.clone(), Operation::RemoveExact);
        Ok(query.next_object(self)?.is_some())
    }

    fn find_intersecting(&self, rect: &Mbr, tolerance: i32) -> SpatialResult<Vec<Arc<T>>> {
        self.collect(RegionQuery::new(WindowPredicate::new(tolerance)), rect)
    }

    fn find_containing(&self, rect: &Mbr) -> SpatialResult<Vec<Arc<T>>> {
        self.collect(RegionQuery::new(IsContainedPredicate), rect)
    }

    fn height(&self) -> usize {
        self.root.height()
    }

    fn node_count(&self) -> usize {
        self.root.count_nodes()
    }

    fn entry_count(&self) -> usize {
        self.root.count_entries()
    }

    fn total_objects(&self) -> usize {
        self.total_objects
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn clear(&mut self) {
        self.root = Node::new(self.dimensions, self.node_capacity, true, true);
        self.total_objects = 0;
        self.root_generation += 1;
    }
}

// ============================================================================
// Tests
// ============================================================================
