//! SpatialSearchTree trait definition.

use crate::mbr::Mbr;
use crate::tree::rtree_types::SpatialResult;
use std::sync::Arc;

/// Operations every spatial search tree offers to its callers.
///
/// Renderers, routers and viewers only need this surface plus the query
/// cursors in [`query`](crate::query).
pub trait SpatialSearchTree<T: ?Sized> {
    /// Adds an object. Its dimension must match the tree's.
    fn insert(&mut self, object: Arc<T>) -> SpatialResult<()>;

    /// Removes the first stored occurrence of `object`. Returns whether
    /// anything was removed.
    fn remove(&mut self, object: &Arc<T>) -> SpatialResult<bool>;

    /// Finds the objects overlapping `rect` expanded by `tolerance`.
    fn find_intersecting(&self, rect: &Mbr, tolerance: i32) -> SpatialResult<Vec<Arc<T>>>;

    /// Finds the objects that contain `rect`.
    fn find_containing(&self, rect: &Mbr) -> SpatialResult<Vec<Arc<T>>>;

    /// Number of levels of the tree. O(height).
    fn height(&self) -> usize;

    /// Number of nodes. Walks the whole tree.
    fn node_count(&self) -> usize;

    /// Number of entries over all nodes, internal ones included. Walks the
    /// whole tree.
    fn entry_count(&self) -> usize;

    /// Number of stored objects. O(1).
    fn total_objects(&self) -> usize;

    fn dimensions(&self) -> usize;

    /// Removes all objects.
    fn clear(&mut self);
}
