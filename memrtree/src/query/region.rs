//! Resumable region query.
//!
//! A [`RegionQuery`] walks the tree depth first and stops after every
//! matching object. The position lives in an explicit [`TraversalPath`], so
//! the next call picks up right after the last result. Besides plain
//! queries the cursor can remove or update what it finds, see
//! [`Operation`].

use super::counters::QueryCounters;
use super::path::{node_at, node_at_mut, TraversalPath};
use super::predicate::SpatialPredicate;
use crate::mbr::Mbr;
use crate::object::SpatialObject;
use crate::spatial_tree::SpatialSearchTree;
use crate::tree::node::Node;
use crate::tree::MemoryRTree;
use crate::tree::rtree_types::{SpatialError, SpatialResult};
use std::sync::Arc;
use std::time::Instant;

/// What a region query does with a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Return every match, one per call.
    #[default]
    Query,
    /// Remove and return the first match equal to the query object.
    RemoveExact,
    /// Remove every match in one call. The call returns `None`.
    RemoveAll,
    /// Mark the first match equal to the query object as updated and
    /// return it.
    UpdateExact,
    /// Mark every match as updated in one call. The call returns `None`.
    UpdateAll,
}

/// Where [`RegionQuery::relocate`] put a moved object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relocation {
    /// The query object is not stored in the tree.
    NotFound,
    /// The new box fits the old leaf; the object was swapped in place.
    InPlace,
    /// The object was removed and inserted again from the root.
    Reinserted,
}

impl Operation {
    fn needs_equality(self) -> bool {
        matches!(self, Operation::RemoveExact | Operation::UpdateExact)
    }
}

/// Identity of the root a query was configured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RootKey {
    tree_id: u64,
    generation: u64,
}

impl RootKey {
    fn of<T: SpatialObject + ?Sized>(tree: &MemoryRTree<T>) -> Self {
        RootKey {
            tree_id: tree.id(),
            generation: tree.root_generation(),
        }
    }
}

/// A resumable, stateful query over a [`MemoryRTree`].
///
/// The query does not own or borrow the tree between calls; every call
/// takes the tree it was configured with. Calling with another tree, or
/// after the root of the tree was replaced by a growing insert, fails with
/// `InvalidOperation` until the query is initialised again.
///
/// # Examples
///
/// ```rust
/// use memrtree::{Mbr, MemoryRTree, Operation, RegionQuery, SpatialSearchTree, WindowPredicate};
/// use memrtree::{SpatialEntry, SpatialObject};
/// use std::sync::Arc;
///
/// struct Marker(Mbr);
///
/// impl SpatialEntry for Marker {
///     fn mbr(&self) -> &Mbr {
///         &self.0
///     }
/// }
///
/// impl SpatialObject for Marker {}
///
/// let mut tree = MemoryRTree::new(2, 16).unwrap();
/// tree.insert(Arc::new(Marker(Mbr::rect(0, 0, 1, 1)))).unwrap();
/// tree.insert(Arc::new(Marker(Mbr::rect(10, 10, 1, 1)))).unwrap();
///
/// let mut query = RegionQuery::new(WindowPredicate::new(0));
/// query.init_with_rect(&tree, Mbr::rect(0, 0, 5, 5), Operation::Query);
///
/// let first = query.next_object(&mut tree).unwrap();
/// assert!(first.is_some());
/// assert!(query.next_object(&mut tree).unwrap().is_none());
/// ```
pub struct RegionQuery<T: ?Sized> {
    predicate: Box<dyn SpatialPredicate<T>>,
    query_object: Option<Arc<T>>,
    rect: Option<Mbr>,
    operation: Operation,
    root_key: Option<RootKey>,
    path: TraversalPath,
    counters: QueryCounters,
}

impl<T: SpatialObject + ?Sized> RegionQuery<T> {
    pub fn new<P>(predicate: P) -> Self
    where
        P: SpatialPredicate<T> + 'static,
    {
        RegionQuery {
            predicate: Box::new(predicate),
            query_object: None,
            rect: None,
            operation: Operation::Query,
            root_key: None,
            path: TraversalPath::new(),
            counters: QueryCounters::default(),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Targets a zero-sized box at the origin. Mostly useful with
    /// predicates that ignore the rectangle, such as
    /// [`AllPredicate`](super::predicate::AllPredicate).
    pub fn init(&mut self, tree: &MemoryRTree<T>, operation: Operation) {
        self.init_with_rect(tree, Mbr::zeroed(tree.dimensions()), operation);
    }

    /// Targets a zero-sized box at `point`.
    pub fn init_with_point(
        &mut self,
        tree: &MemoryRTree<T>,
        point: &[i32],
        operation: Operation,
    ) -> SpatialResult<()> {
        let rect = Mbr::from_point(point)?;
        self.init_with_rect(tree, rect, operation);
        Ok(())
    }

    /// Targets `rect`.
    ///
    /// When rectangle, operation and tree root are all unchanged since the
    /// last configuration this does nothing and the query keeps its
    /// position. Otherwise the walk restarts at the root.
    pub fn init_with_rect(&mut self, tree: &MemoryRTree<T>, rect: Mbr, operation: Operation) {
        let key = RootKey::of(tree);
        if self.root_key == Some(key)
            && self.operation == operation
            && self.rect.as_ref() == Some(&rect)
        {
            return;
        }

        log::debug!("Region query on tree {} set to {:?} of {}", key.tree_id, operation, rect);
        self.rect = Some(rect);
        self.operation = operation;
        self.root_key = Some(key);
        self.counters.query_count += 1;
        self.reset(tree);
    }

    /// Targets the box of `object` and remembers `object` for the exact
    /// operations. The object is replaced even when the rest of the
    /// configuration is unchanged.
    pub fn init_with_object(&mut self, tree: &MemoryRTree<T>, object: Arc<T>, operation: Operation) {
        let rect = object.mbr().clone();
        self.query_object = Some(object);
        self.init_with_rect(tree, rect, operation);
    }

    /// Restarts the walk at the root and releases the locks on the current
    /// path.
    pub fn reset(&mut self, tree: &MemoryRTree<T>) {
        self.path.release_locks(tree.root());
        self.path.reset();
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn rect(&self) -> Option<&Mbr> {
        self.rect.as_ref()
    }

    pub fn query_object(&self) -> Option<&Arc<T>> {
        self.query_object.as_ref()
    }

    /// Whether the walk has run off the end. Only a reset or a new
    /// configuration starts it again.
    pub fn is_exhausted(&self) -> bool {
        self.root_key.is_some() && self.path.is_empty()
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

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Resumes the walk and returns the next match.
    ///
    /// `Query` returns each match once. `RemoveExact` and `UpdateExact`
    /// return the first match the predicate considers equal to the query
    /// object. `RemoveAll` and `UpdateAll` process every remaining match
    /// and return `None`. An exhausted query keeps returning `None`.
    pub fn next_object(&mut self, tree: &mut MemoryRTree<T>) -> SpatialResult<Option<Arc<T>>> {
        self.check_tree(tree)?;
        let started = Instant::now();

        let result = match self.operation {
            Operation::Query => self.next_match(tree.root())?,
            Operation::RemoveExact => match self.seek(tree.root())? {
                Some(index) => Some(self.remove_at(tree, index)?),
                None => None,
            },
            Operation::UpdateExact => match self.seek(tree.root())? {
                Some(index) => Some(self.update_at(tree, index)?),
                None => None,
            },
            Operation::RemoveAll => {
                while let Some(index) = self.seek(tree.root())? {
                    self.remove_at(tree, index)?;
                }
                None
            }
            Operation::UpdateAll => {
                while let Some(index) = self.seek(tree.root())? {
                    self.update_at(tree, index)?;
                }
                None
            }
        };

        self.finish(started, result.is_some());
        Ok(result)
    }

    /// Moves the query object to the box of `moved`.
    ///
    /// The walk looks for the query object like `RemoveExact` does. When the
    /// old leaf still contains the new box, `moved` takes the old entry's
    /// place; otherwise the old entry is removed and `moved` is inserted from
    /// the root, after which the query is exhausted. An insert that grows
    /// the root invalidates the query like any other growing insert.
    pub fn relocate(&mut self, tree: &mut MemoryRTree<T>, moved: Arc<T>) -> SpatialResult<Relocation> {
        self.check_tree(tree)?;
        if !self.operation.needs_equality() {
            return Err(SpatialError::InvalidOperation(format!(
                "{:?} does not select a single object to move",
                self.operation
            )));
        }
        let found = moved.num_of_dimensions();
        if found != tree.dimensions() {
            return Err(SpatialError::DimensionMismatch {
                expected: tree.dimensions(),
                found,
            });
        }

        let started = Instant::now();
        let Some(index) = self.seek(tree.root())? else {
            self.finish(started, false);
            return Ok(Relocation::NotFound);
        };

        let (root, _) = tree.root_and_counter_mut();
        let parents = self.path.parents();
        let leaf = node_at_mut(root, parents).ok_or_else(|| lost_position(index))?;
        let relocation = if leaf.move_entry(index, &moved)? {
            adapt_along(root, parents);
            self.path.set_current(index + 1);
            Relocation::InPlace
        } else {
            self.remove_at(tree, index)?;
            self.path.clear();
            tree.insert(moved)?;
            Relocation::Reinserted
        };

        log::debug!("Relocated query object on tree {}: {:?}", tree.id(), relocation);
        self.finish(started, true);
        Ok(relocation)
    }

    /// Read-only variant of [`next_object`](Self::next_object) for the
    /// `Query` operation.
    pub fn find_next(&mut self, tree: &MemoryRTree<T>) -> SpatialResult<Option<Arc<T>>> {
        self.check_tree(tree)?;
        if self.operation != Operation::Query {
            return Err(SpatialError::InvalidOperation(format!(
                "{:?} modifies the tree and needs next_object",
                self.operation
            )));
        }
        let started = Instant::now();
        let result = self.next_match(tree.root())?;
        self.finish(started, result.is_some());
        Ok(result)
    }

    /// Iterator over the remaining results of [`next_object`](Self::next_object).
    pub fn iter<'a>(&'a mut self, tree: &'a mut MemoryRTree<T>) -> RegionQueryIter<'a, T> {
        RegionQueryIter {
            query: self,
            tree,
            done: false,
        }
    }

    fn finish(&mut self, started: Instant, found: bool) {
        if found {
            self.counters.result_count += 1;
        }
        self.counters.elapsed += started.elapsed();
    }

    fn check_tree(&self, tree: &MemoryRTree<T>) -> SpatialResult<()> {
        let Some(key) = self.root_key else {
            return Err(SpatialError::InvalidOperation(
                "region query used before it was initialised".into(),
            ));
        };
        if key.tree_id != tree.id() {
            return Err(SpatialError::InvalidOperation(format!(
                "region query was initialised for tree {}, not tree {}",
                key.tree_id,
                tree.id()
            )));
        }
        if key.generation != tree.root_generation() {
            return Err(SpatialError::InvalidOperation(
                "tree root changed since the region query was initialised".into(),
            ));
        }
        Ok(())
    }

    fn next_match(&mut self, root: &Node<T>) -> SpatialResult<Option<Arc<T>>> {
        let Some(index) = self.seek(root)? else {
            return Ok(None);
        };
        let object = node_at(root, self.path.parents())
            .and_then(|leaf| leaf.object(index))
            .cloned()
            .ok_or_else(|| lost_position(index))?;
        self.path.set_current(index + 1);
        Ok(Some(object))
    }

    /// Moves the walk to the next accepted leaf entry and returns its index.
    /// The path is left pointing at that entry.
    fn seek(&mut self, root: &Node<T>) -> SpatialResult<Option<usize>> {
        let Some(rect) = self.rect.as_ref() else {
            return Ok(None);
        };

        while let Some(start) = self.path.current() {
            let Some(node) = node_at(root, self.path.parents()) else {
                self.path.ascend(root);
                continue;
            };

            if node.is_leaf() {
                let hit = (start..node.len()).find(|i| {
                    node.object(*i).is_some_and(|object| {
                        self.predicate.accepts_entry(rect, object.mbr())
                            && self.predicate.accepts_object(rect, object)
                            && (!self.operation.needs_equality()
                                || self
                                    .predicate
                                    .are_equal(self.query_object.as_ref(), object))
                    })
                });
                if let Some(index) = hit {
                    self.path.set_current(index);
                    return Ok(Some(index));
                }
            } else {
                let next = (start..node.len()).find(|i| {
                    node.entry_mbr(*i)
                        .is_some_and(|mbr| self.predicate.accepts_node(rect, mbr))
                });
                if let Some(index) = next {
                    self.path.set_current(index);
                    self.path.descend()?;
                    continue;
                }
            }
            self.path.ascend(root);
        }
        Ok(None)
    }

    /// Removes the entry the path points at and shrinks the boxes above it.
    /// The position stays on the slot, which now holds the swapped-in entry.
    fn remove_at(&mut self, tree: &mut MemoryRTree<T>, index: usize) -> SpatialResult<Arc<T>> {
        let (root, total_objects) = tree.root_and_counter_mut();
        let parents = self.path.parents();
        let removed = node_at_mut(root, parents)
            .and_then(|leaf| leaf.remove_object(index, total_objects))
            .ok_or_else(|| lost_position(index))?;
        adapt_along(root, parents);
        Ok(removed)
    }

    /// Runs the update hook on the entry the path points at and moves past
    /// it.
    fn update_at(&mut self, tree: &mut MemoryRTree<T>, index: usize) -> SpatialResult<Arc<T>> {
        let (root, _) = tree.root_and_counter_mut();
        let leaf = node_at_mut(root, self.path.parents()).ok_or_else(|| lost_position(index))?;
        let object = leaf.object(index).cloned().ok_or_else(|| lost_position(index))?;
        leaf.update_object(index);
        self.path.set_current(index + 1);
        Ok(object)
    }
}

/// Recomputes the boxes of every node on `path`, deepest first.
fn adapt_along<T: SpatialObject + ?Sized>(node: &mut Node<T>, path: &[usize]) {
    if let Some((index, rest)) = path.split_first() {
        if let Some(child) = node.child_node_mut(*index) {
            adapt_along(child, rest);
        }
    }
    node.adapt_mbr();
}

fn lost_position(index: usize) -> SpatialError {
    SpatialError::InvariantViolation(format!(
        "region query lost its position at leaf entry {}",
        index
    ))
}

/// Iterator returned by [`RegionQuery::iter`]. Stops after the first error.
pub struct RegionQueryIter<'a, T: ?Sized> {
    query: &'a mut RegionQuery<T>,
    tree: &'a mut MemoryRTree<T>,
    done: bool,
}

impl<T: SpatialObject + ?Sized> Iterator for RegionQueryIter<'_, T> {
    type Item = SpatialResult<Arc<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.query.next_object(self.tree) {
            Ok(Some(object)) => Some(Ok(object)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
