//! Explicit traversal stack shared by the region and nearest neighbour
//! queries.
//!
//! The path holds one index per level, root first. The node at level `k`
//! is reached from the root by following the indices of levels `0..k`, and
//! the index at level `k` is the next entry to look at in that node. A
//! suspended depth-first walk is fully described by this list, so a query
//! can stop after any object and resume on the next call.

use crate::tree::node::Node;
use crate::tree::rtree_constants::MAX_TRAVERSAL_DEPTH;
use crate::tree::rtree_types::{SpatialError, SpatialResult};
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TraversalPath {
    indices: SmallVec<[usize; 8]>,
}

impl TraversalPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions the walk at the first entry of the root.
    pub fn reset(&mut self) {
        self.indices.clear();
        self.indices.push(0);
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// An empty path means the walk is exhausted.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.indices.len()
    }

    /// Next index to look at in the deepest node.
    pub fn current(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    pub fn set_current(&mut self, index: usize) {
        if let Some(last) = self.indices.last_mut() {
            *last = index;
        }
    }

    /// Indices leading from the root to the deepest node.
    pub fn parents(&self) -> &[usize] {
        match self.indices.split_last() {
            Some((_, parents)) => parents,
            None => &[],
        }
    }

    /// Enters the child at the current index of the deepest node.
    pub fn descend(&mut self) -> SpatialResult<()> {
        if self.indices.len() >= MAX_TRAVERSAL_DEPTH {
            return Err(SpatialError::DepthExceeded(MAX_TRAVERSAL_DEPTH));
        }
        self.indices.push(0);
        Ok(())
    }

    /// Leaves the deepest node and moves its parent past it. The departing
    /// node's lock is released unless it is the root.
    pub fn ascend<T: ?Sized>(&mut self, root: &Node<T>) {
        if let Some(node) = node_at(root, self.parents()) {
            if !node.is_root() {
                node.reset_lock();
            }
        }
        self.indices.pop();
        if let Some(parent) = self.indices.last_mut() {
            *parent += 1;
        }
    }

    /// Releases the locks of every non-root node on the path.
    pub fn release_locks<T: ?Sized>(&self, root: &Node<T>) {
        let mut node = root;
        for index in self.parents() {
            match node.child_node(*index) {
                Some(child) => {
                    child.reset_lock();
                    node = child;
                }
                None => break,
            }
        }
    }
}

/// Follows `path` from `root`. `None` when an index no longer leads to a
/// child, e.g. after entries were removed under a suspended walk.
pub(crate) fn node_at<'a, T: ?Sized>(root: &'a Node<T>, path: &[usize]) -> Option<&'a Node<T>> {
    path.iter()
        .try_fold(root, |node, index| node.child_node(*index))
}

pub(crate) fn node_at_mut<'a, T: ?Sized>(
    root: &'a mut Node<T>,
    path: &[usize],
) -> Option<&'a mut Node<T>> {
    let mut node = root;
    for index in path {
        node = node.child_node_mut(*index)?;
    }
    Some(node)
}
