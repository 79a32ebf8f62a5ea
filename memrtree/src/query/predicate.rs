//! Acceptance tests used while walking the tree.
//!
//! A predicate answers three questions for a query rectangle, one per
//! level of the walk:
//!
//! - [`accepts_node`](SpatialPredicate::accepts_node): may the subtree under
//!   a child box hold a match? Used for pruning, so it must never reject a
//!   subtree that contains an accepted object.
//! - [`accepts_entry`](SpatialPredicate::accepts_entry): cheap test of a
//!   leaf entry's own box.
//! - [`accepts_object`](SpatialPredicate::accepts_object): final test, free
//!   to use non-geometric properties of the object.
//!
//! The layer and scale variants wrap another predicate and add their test
//! at the object level.

use crate::mbr::Mbr;
use crate::object::{Layered, SpatialEntry, SpatialObject, Visualized};
use std::sync::Arc;

pub trait SpatialPredicate<T: ?Sized> {
    fn accepts_node(&self, rect: &Mbr, child: &Mbr) -> bool;

    fn accepts_entry(&self, rect: &Mbr, entry: &Mbr) -> bool;

    fn accepts_object(&self, rect: &Mbr, object: &T) -> bool;

    /// Whether `stored` is the object a query was made for. Identity by
    /// default.
    fn are_equal(&self, query: Option<&Arc<T>>, stored: &Arc<T>) -> bool {
        query.is_some_and(|query| Arc::ptr_eq(query, stored))
    }
}

/// Predicates that filter on a layer.
pub trait LayerQuery {
    fn query_layer(&self) -> i32;
}

// ============================================================================
// Geometric predicates
// ============================================================================

/// Accepts everything overlapping the query rectangle expanded by
/// `tolerance`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowPredicate {
    pub tolerance: i32,
}

impl WindowPredicate {
    pub fn new(tolerance: i32) -> Self {
        WindowPredicate { tolerance }
    }
}

impl<T: SpatialObject + ?Sized> SpatialPredicate<T> for WindowPredicate {
    fn accepts_node(&self, rect: &Mbr, child: &Mbr) -> bool {
        rect.intersects(child, self.tolerance)
    }

    fn accepts_entry(&self, rect: &Mbr, entry: &Mbr) -> bool {
        rect.intersects(entry, self.tolerance)
    }

    fn accepts_object(&self, rect: &Mbr, object: &T) -> bool {
        object.intersects(rect, self.tolerance)
    }
}

/// Accepts objects whose box equals the query rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactMatchPredicate;

impl<T: SpatialEntry + ?Sized> SpatialPredicate<T> for ExactMatchPredicate {
    fn accepts_node(&self, rect: &Mbr, child: &Mbr) -> bool {
        child.contains(rect, 0)
    }

    fn accepts_entry(&self, rect: &Mbr, entry: &Mbr) -> bool {
        entry == rect
    }

    fn accepts_object(&self, rect: &Mbr, object: &T) -> bool {
        object.mbr() == rect
    }
}

/// Accepts objects that contain the query rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsContainedPredicate;

impl<T: SpatialObject + ?Sized> SpatialPredicate<T> for IsContainedPredicate {
    fn accepts_node(&self, rect: &Mbr, child: &Mbr) -> bool {
        child.contains(rect, 0)
    }

    fn accepts_entry(&self, rect: &Mbr, entry: &Mbr) -> bool {
        entry.contains(rect, 0)
    }

    fn accepts_object(&self, rect: &Mbr, object: &T) -> bool {
        object.contains(rect)
    }
}

/// Accepts objects lying inside the query rectangle, borders included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WithinPredicate;

impl<T: SpatialObject + ?Sized> SpatialPredicate<T> for WithinPredicate {
    // touching subtrees may still hold zero-extent objects on the border
    fn accepts_node(&self, rect: &Mbr, child: &Mbr) -> bool {
        rect.intersection(child).is_some()
    }

    fn accepts_entry(&self, rect: &Mbr, entry: &Mbr) -> bool {
        rect.contains(entry, 0)
    }

    fn accepts_object(&self, rect: &Mbr, object: &T) -> bool {
        object.is_contained_by(rect)
    }
}

/// Accepts every object. Any stored object counts as the query object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllPredicate;

impl<T: ?Sized> SpatialPredicate<T> for AllPredicate {
    fn accepts_node(&self, _rect: &Mbr, _child: &Mbr) -> bool {
        true
    }

    fn accepts_entry(&self, _rect: &Mbr, _entry: &Mbr) -> bool {
        true
    }

    fn accepts_object(&self, _rect: &Mbr, _object: &T) -> bool {
        true
    }

    fn are_equal(&self, _query: Option<&Arc<T>>, _stored: &Arc<T>) -> bool {
        true
    }
}

/// Point pick: boxes must hold the query rectangle's min corner, objects
/// must report a screen hit there at `scale`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectPredicate {
    pub scale: i32,
    pub tolerance: i32,
}

impl SelectPredicate {
    pub fn new(scale: i32, tolerance: i32) -> Self {
        SelectPredicate { scale, tolerance }
    }

    fn holds_corner(&self, rect: &Mbr, mbr: &Mbr) -> bool {
        mbr.contains_point(rect.min_coords(), self.tolerance)
            .unwrap_or(false)
    }
}

impl<T: Visualized + ?Sized> SpatialPredicate<T> for SelectPredicate {
    fn accepts_node(&self, rect: &Mbr, child: &Mbr) -> bool {
        self.holds_corner(rect, child)
    }

    fn accepts_entry(&self, rect: &Mbr, entry: &Mbr) -> bool {
        self.holds_corner(rect, entry)
    }

    fn accepts_object(&self, rect: &Mbr, object: &T) -> bool {
        match (rect.min(0), rect.min(1)) {
            (Some(x), Some(y)) => object.interacts(x, y, self.scale),
            _ => false,
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Adds an exact layer test to an inner predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerPredicate<P> {
    pub inner: P,
    pub layer: i32,
}

/// Window query restricted to one layer.
pub type LayerWindowPredicate = LayerPredicate<WindowPredicate>;

/// Enumeration of one layer.
pub type LayerAllPredicate = LayerPredicate<AllPredicate>;

/// Window query restricted to one layer and to objects visible at a scale.
pub type LayerScaleWindowPredicate = ScaleFilter<LayerWindowPredicate>;

impl<P> LayerPredicate<P> {
    pub fn new(inner: P, layer: i32) -> Self {
        LayerPredicate { inner, layer }
    }
}

impl LayerPredicate<WindowPredicate> {
    pub fn window(layer: i32, tolerance: i32) -> Self {
        LayerPredicate::new(WindowPredicate::new(tolerance), layer)
    }
}

impl LayerPredicate<AllPredicate> {
    pub fn all(layer: i32) -> Self {
        LayerPredicate::new(AllPredicate, layer)
    }
}

impl<P> LayerQuery for LayerPredicate<P> {
    fn query_layer(&self) -> i32 {
        self.layer
    }
}

impl<T, P> SpatialPredicate<T> for LayerPredicate<P>
where
    T: Layered + ?Sized,
    P: SpatialPredicate<T>,
{
    fn accepts_node(&self, rect: &Mbr, child: &Mbr) -> bool {
        self.inner.accepts_node(rect, child)
    }

    fn accepts_entry(&self, rect: &Mbr, entry: &Mbr) -> bool {
        self.inner.accepts_entry(rect, entry)
    }

    fn accepts_object(&self, rect: &Mbr, object: &T) -> bool {
        self.inner.accepts_object(rect, object) && object.layer() == self.layer
    }

    fn are_equal(&self, query: Option<&Arc<T>>, stored: &Arc<T>) -> bool {
        self.inner.are_equal(query, stored)
    }
}

/// Rejects objects that are not visible at `scale` before running the inner
/// object test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaleFilter<P> {
    pub inner: P,
    pub scale: i32,
}

impl<P> ScaleFilter<P> {
    pub fn new(inner: P, scale: i32) -> Self {
        ScaleFilter { inner, scale }
    }
}

impl ScaleFilter<LayerWindowPredicate> {
    pub fn layer_window(layer: i32, scale: i32, tolerance: i32) -> Self {
        ScaleFilter::new(LayerPredicate::window(layer, tolerance), scale)
    }
}

impl<P: LayerQuery> LayerQuery for ScaleFilter<P> {
    fn query_layer(&self) -> i32 {
        self.inner.query_layer()
    }
}

impl<T, P> SpatialPredicate<T> for ScaleFilter<P>
where
    T: Visualized + ?Sized,
    P: SpatialPredicate<T>,
{
    fn accepts_node(&self, rect: &Mbr, child: &Mbr) -> bool {
        self.inner.accepts_node(rect, child)
    }

    fn accepts_entry(&self, rect: &Mbr, entry: &Mbr) -> bool {
        self.inner.accepts_entry(rect, entry)
    }

    fn accepts_object(&self, rect: &Mbr, object: &T) -> bool {
        object.is_visible(self.scale) && self.inner.accepts_object(rect, object)
    }

    fn are_equal(&self, query: Option<&Arc<T>>, stored: &Arc<T>) -> bool {
        self.inner.are_equal(query, stored)
    }
}
