//! Fixed-capacity tree nodes.
//!
//! A [`Node`] is either a leaf holding objects or an internal node holding
//! child nodes. Its box is the exact union of its entries' boxes once an
//! operation settles, and all leaves of a tree sit at the same depth.

use super::rtree_types::{SpatialError, SpatialResult};
use super::strategy::RTreeStrategy;
use crate::mbr::Mbr;
use crate::object::SpatialEntry;
use std::mem;
use std::sync::Arc;

/// Read-only view of a node plus entry reordering, as needed by a
/// [`RTreeStrategy`].
pub trait SpatialNode {
    fn mbr(&self) -> &Mbr;

    fn entry_count(&self) -> usize;

    /// Box of the entry at `index`, `None` when out of range.
    fn entry_mbr(&self, index: usize) -> Option<&Mbr>;

    /// Number of levels below and including this node.
    fn height(&self) -> usize;

    fn is_leaf(&self) -> bool;

    fn max_entries(&self) -> usize;

    fn swap_entries(&mut self, a: usize, b: usize);
}

/// A slot of a node.
pub enum Entry<T: ?Sized> {
    /// Child pointer of an internal node; its box is the child's box.
    Child(Box<Node<T>>),
    /// Stored object of a leaf.
    Object(Arc<T>),
}

impl<T: SpatialEntry + ?Sized> Entry<T> {
    pub fn mbr(&self) -> &Mbr {
        match self {
            Entry::Child(node) => &node.mbr,
            Entry::Object(object) => object.mbr(),
        }
    }
}

/// Tree-level state a node insert reads or updates.
pub(crate) struct InsertContext<'a> {
    pub strategy: &'a dyn RTreeStrategy,
    pub total_objects: &'a mut usize,
}

/// What happened to a node during an insert.
pub(crate) enum InsertOutcome<T: ?Sized> {
    /// The object fit without splitting this node.
    Absorbed,
    /// This node split; the sibling must be added to the parent.
    Split(Box<Node<T>>),
    /// This root split and was replaced in place by a new root one level up.
    RootGrown,
}

pub struct Node<T: ?Sized> {
    mbr: Mbr,
    entries: Vec<Entry<T>>,
    capacity: usize,
    is_leaf: bool,
    is_root: bool,
}

impl<T: ?Sized> Node<T> {
    pub(crate) fn new(dimensions: usize, capacity: usize, is_leaf: bool, is_root: bool) -> Self {
        Node {
            mbr: Mbr::zeroed(dimensions),
            entries: Vec::with_capacity(capacity + 1),
            capacity,
            is_leaf,
            is_root,
        }
    }

    pub fn mbr(&self) -> &Mbr {
        &self.mbr
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn max_entries(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    // ========================================================================
    // Bounds-checked accessors
    // ========================================================================

    pub fn entry(&self, index: usize) -> Option<&Entry<T>> {
        self.entries.get(index)
    }

    /// Child node at `index`; `None` when out of range or at a leaf.
    pub fn child_node(&self, index: usize) -> Option<&Node<T>> {
        match self.entries.get(index)? {
            Entry::Child(node) => Some(node),
            Entry::Object(_) => None,
        }
    }

    pub(crate) fn child_node_mut(&mut self, index: usize) -> Option<&mut Node<T>> {
        match self.entries.get_mut(index)? {
            Entry::Child(node) => Some(node),
            Entry::Object(_) => None,
        }
    }

    /// Stored object at `index`; `None` when out of range or not at a leaf.
    pub fn object(&self, index: usize) -> Option<&Arc<T>> {
        match self.entries.get(index)? {
            Entry::Object(object) => Some(object),
            Entry::Child(_) => None,
        }
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Called when an object at `index` changed in place. Nothing to do for
    /// memory resident nodes.
    pub fn update_object(&mut self, _index: usize) {}

    pub fn set_lock(&self) {}

    pub fn reset_lock(&self) {}

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Number of levels below and including this node, following the first
    /// child.
    pub fn height(&self) -> usize {
        match self.child_node(0) {
            Some(child) if !self.is_leaf => 1 + child.height(),
            _ => 1,
        }
    }

    /// Whether the children of this node are leaves.
    pub fn points_to_leaf(&self) -> bool {
        !self.is_leaf && self.child_node(0).is_some_and(|child| child.is_leaf)
    }

    /// Counts this node and all nodes below it. O(n).
    pub fn count_nodes(&self) -> usize {
        1 + self.children().map(Node::count_nodes).sum::<usize>()
    }

    /// Counts the entries of this node and of all nodes below it. O(n).
    pub fn count_entries(&self) -> usize {
        self.entries.len() + self.children().map(Node::count_entries).sum::<usize>()
    }

    /// Counts the objects stored in the leaves below this node. O(n).
    pub fn count_objects(&self) -> usize {
        if self.is_leaf {
            self.entries.len()
        } else {
            self.children().map(Node::count_objects).sum()
        }
    }

    fn children(&self) -> impl Iterator<Item = &Node<T>> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Child(node) => Some(node.as_ref()),
            Entry::Object(_) => None,
        })
    }
}

impl<T: SpatialEntry + ?Sized> Node<T> {
    pub fn entry_mbr(&self, index: usize) -> Option<&Mbr> {
        self.entries.get(index).map(Entry::mbr)
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Inserts `object` below this node.
    ///
    /// A non-root node that overflows hands its split-off sibling back to
    /// the caller. An overflowing root turns itself into a new root holding
    /// the old root and its sibling.
    pub(crate) fn insert(
        &mut self,
        object: Arc<T>,
        ctx: &mut InsertContext<'_>,
    ) -> SpatialResult<InsertOutcome<T>> {
        let object_mbr = object.mbr().clone();

        if self.is_leaf {
            self.ensure_room()?;
            self.include(&object_mbr)?;
            self.entries.push(Entry::Object(object));
            *ctx.total_objects += 1;
        } else {
            let index = ctx.strategy.choose_subtree(&*self, &object_mbr);
            let child = self.child_node_mut(index).ok_or_else(|| {
                SpatialError::InvariantViolation(format!(
                    "strategy chose subtree {} which is not a child node",
                    index
                ))
            })?;

            if let InsertOutcome::Split(sibling) = child.insert(object, ctx)? {
                self.ensure_room()?;
                if ctx.strategy.is_ordering() {
                    self.entries.insert(index + 1, Entry::Child(sibling));
                } else {
                    self.entries.push(Entry::Child(sibling));
                }
            }
            // a child emptied by removals drops its stale box on reuse
            self.adapt_mbr();
        }

        if self.entries.len() > self.capacity {
            let sibling = self.split(ctx.strategy)?;
            if self.is_root {
                self.grow_root(sibling)?;
                return Ok(InsertOutcome::RootGrown);
            }
            return Ok(InsertOutcome::Split(Box::new(sibling)));
        }
        Ok(InsertOutcome::Absorbed)
    }

    /// Splits an overflowing node and returns the new sibling.
    ///
    /// Entries marked by the strategy move to the sibling; the others are
    /// re-added to this node, which recomputes its box from scratch.
    pub(crate) fn split(&mut self, strategy: &dyn RTreeStrategy) -> SpatialResult<Node<T>> {
        let distribution = strategy.distribute(&*self, &self.mbr);
        let count = self.entries.len();
        if distribution.len() != count {
            return Err(SpatialError::InvariantViolation(format!(
                "distribution covers {} of {} entries",
                distribution.len(),
                count
            )));
        }

        let moving = distribution.iter().filter(|m| **m).count();
        if moving == 0 || moving == count || moving > self.capacity || count - moving > self.capacity
        {
            return Err(SpatialError::InvariantViolation(format!(
                "split of {} entries into {} and {} is not valid for capacity {}",
                count,
                count - moving,
                moving,
                self.capacity
            )));
        }

        let dimensions = self.mbr.dimensions();
        let mut sibling = Node::new(dimensions, self.capacity, self.is_leaf, false);
        let entries = mem::take(&mut self.entries);
        let mut staying = Vec::with_capacity(count - moving);
        for (entry, moves) in entries.into_iter().zip(distribution) {
            if moves {
                sibling.push_entry(entry)?;
            } else {
                staying.push(entry);
            }
        }
        for entry in staying {
            self.push_entry(entry)?;
        }

        log::debug!(
            "Split {} node into {} + {} entries, boxes {} and {}",
            if self.is_leaf { "leaf" } else { "internal" },
            self.entries.len(),
            sibling.entries.len(),
            self.mbr,
            sibling.mbr
        );
        Ok(sibling)
    }

    fn grow_root(&mut self, sibling: Node<T>) -> SpatialResult<()> {
        let dimensions = self.mbr.dimensions();
        let fresh = Node::new(dimensions, self.capacity, false, true);
        let mut old_root = mem::replace(self, fresh);
        old_root.is_root = false;

        self.push_entry(Entry::Child(Box::new(old_root)))?;
        self.push_entry(Entry::Child(Box::new(sibling)))?;
        log::debug!("Root split, tree grew to height {}", self.height());
        Ok(())
    }

    /// Appends an entry and grows the box to cover it.
    fn push_entry(&mut self, entry: Entry<T>) -> SpatialResult<()> {
        self.include(entry.mbr())?;
        self.entries.push(entry);
        Ok(())
    }

    fn include(&mut self, mbr: &Mbr) -> SpatialResult<()> {
        if self.entries.is_empty() {
            self.mbr.set_bounds(mbr)
        } else {
            self.mbr.add(mbr)
        }
    }

    fn ensure_room(&self) -> SpatialResult<()> {
        if self.entries.len() > self.capacity {
            return Err(SpatialError::InvariantViolation(format!(
                "node holds {} entries, capacity is {}",
                self.entries.len(),
                self.capacity
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Recomputes the box from the current entries. An empty node keeps its
    /// last box.
    pub fn adapt_mbr(&mut self) {
        let mut entries = self.entries.iter();
        if let Some(first) = entries.next() {
            let mut mbr = first.mbr().clone();
            for entry in entries {
                mbr = mbr.union(entry.mbr());
            }
            self.mbr = mbr;
        }
    }

    /// Removes the object at `index` of a leaf by swapping in the last
    /// entry, then shrinks the box. Returns `None` when out of range or
    /// called on an internal node.
    pub(crate) fn remove_object(
        &mut self,
        index: usize,
        total_objects: &mut usize,
    ) -> Option<Arc<T>> {
        if !self.is_leaf || index >= self.entries.len() {
            return None;
        }
        let removed = match self.entries.swap_remove(index) {
            Entry::Object(object) => object,
            Entry::Child(_) => return None,
        };
        *total_objects = total_objects.saturating_sub(1);
        self.adapt_mbr();
        Some(removed)
    }

    /// Swaps the object at `index` of a leaf for `moved`, its relocated
    /// version, when this leaf's box still contains the new box. The box is
    /// then recomputed, so it may shrink.
    ///
    /// Returns `false` and leaves the node untouched when the new box
    /// reaches outside the leaf; the caller then removes the entry and
    /// reinserts `moved` from the root.
    pub(crate) fn move_entry(&mut self, index: usize, moved: &Arc<T>) -> SpatialResult<bool> {
        if !self.is_leaf {
            return Err(SpatialError::InvalidOperation(
                "only leaf entries can be moved".into(),
            ));
        }
        if index >= self.entries.len() {
            return Err(SpatialError::InvalidArgument(format!(
                "no entry at index {} of a leaf holding {}",
                index,
                self.entries.len()
            )));
        }
        if !self.mbr.contains(moved.mbr(), 0) {
            return Ok(false);
        }
        self.entries[index] = Entry::Object(moved.clone());
        self.adapt_mbr();
        Ok(true)
    }

    /// Checks box exactness, capacity, entry kinds and leaf depth below this
    /// node. Returns the height of the subtree.
    pub(crate) fn verify(&self, dimensions: usize) -> SpatialResult<usize> {
        if self.entries.len() > self.capacity {
            return Err(SpatialError::InvariantViolation(format!(
                "node holds {} entries, capacity is {}",
                self.entries.len(),
                self.capacity
            )));
        }
        if self.mbr.dimensions() != dimensions {
            return Err(SpatialError::DimensionMismatch {
                expected: dimensions,
                found: self.mbr.dimensions(),
            });
        }

        let mut union: Option<Mbr> = None;
        let mut child_height = None;
        for entry in &self.entries {
            match (entry, self.is_leaf) {
                (Entry::Object(object), true) => {
                    if object.num_of_dimensions() != dimensions {
                        return Err(SpatialError::DimensionMismatch {
                            expected: dimensions,
                            found: object.num_of_dimensions(),
                        });
                    }
                }
                (Entry::Child(child), false) => {
                    if child.is_root {
                        return Err(SpatialError::InvariantViolation(
                            "child node is flagged as root".into(),
                        ));
                    }
                    let height = child.verify(dimensions)?;
                    match child_height {
                        None => child_height = Some(height),
                        Some(h) if h != height => {
                            return Err(SpatialError::InvariantViolation(format!(
                                "leaves at different depths: subtree heights {} and {}",
                                h, height
                            )));
                        }
                        Some(_) => {}
                    }
                }
                _ => {
                    return Err(SpatialError::InvariantViolation(
                        "entry kind does not match node kind".into(),
                    ));
                }
            }
            union = Some(match union {
                None => entry.mbr().clone(),
                Some(mbr) => mbr.union(entry.mbr()),
            });
        }

        if let Some(union) = union {
            if union != self.mbr {
                return Err(SpatialError::InvariantViolation(format!(
                    "node box {} differs from the union of its entries {}",
                    self.mbr, union
                )));
            }
        }
        Ok(1 + child_height.unwrap_or(0))
    }

    pub(crate) fn dump(&self, depth: usize) {
        log::debug!(
            "{:indent$}{} {} ({} entries)",
            "",
            if self.is_leaf { "Leaf" } else { "Node" },
            self.mbr,
            self.entries.len(),
            indent = depth * 2
        );
        for entry in &self.entries {
            match entry {
                Entry::Child(child) => child.dump(depth + 1),
                Entry::Object(object) => {
                    log::debug!("{:indent$}- {}", "", object.mbr(), indent = depth * 2 + 2)
                }
            }
        }
    }
}

impl<T: SpatialEntry + ?Sized> SpatialNode for Node<T> {
    fn mbr(&self) -> &Mbr {
        &self.mbr
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn entry_mbr(&self, index: usize) -> Option<&Mbr> {
        Node::entry_mbr(self, index)
    }

    fn height(&self) -> usize {
        Node::height(self)
    }

    fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    fn max_entries(&self) -> usize {
        self.capacity
    }

    fn swap_entries(&mut self, a: usize, b: usize) {
        if a < self.entries.len() && b < self.entries.len() {
            self.entries.swap(a, b);
        }
    }
}
