//! Capabilities a stored object provides to the tree and its predicates.
//!
//! Every object stored in a [`MemoryRTree`](crate::MemoryRTree) implements
//! [`SpatialObject`]. The remaining traits are optional and only required by
//! the predicates and queries that use them, e.g. [`Layered`] for the layer
//! filters or [`Measurable`] for nearest neighbour search.

use crate::mbr::Mbr;

/// Anything that is stored in a node: it has a bounding box.
pub trait SpatialEntry {
    /// The bounding box of this entry.
    fn mbr(&self) -> &Mbr;

    /// Number of dimensions, which must equal the tree's.
    fn num_of_dimensions(&self) -> usize {
        self.mbr().dimensions()
    }
}

/// An object that can be stored in the tree.
///
/// The default geometric tests work on the bounding box. Objects with a
/// finer shape can override them.
pub trait SpatialObject: SpatialEntry {
    /// Whether the object covers `rect`.
    fn contains(&self, rect: &Mbr) -> bool {
        self.mbr().contains(rect, 0)
    }

    /// Whether the object overlaps `rect` expanded by `tolerance`.
    fn intersects(&self, rect: &Mbr, tolerance: i32) -> bool {
        self.mbr().intersects(rect, tolerance)
    }

    /// Whether the object lies inside `rect`.
    fn is_contained_by(&self, rect: &Mbr) -> bool {
        rect.contains(self.mbr(), 0)
    }
}

/// An object that belongs to an integer layer.
pub trait Layered: SpatialObject {
    fn layer(&self) -> i32;
}

/// An object that is drawn at some scales and can be picked on screen.
pub trait Visualized: Layered {
    /// Whether the object is drawn at `scale`.
    fn is_visible(&self, scale: i32) -> bool;

    /// Screen-space hit test of the point `(x, y)` against the object as
    /// drawn at `scale`.
    fn interacts(&self, x: i32, y: i32, scale: i32) -> bool;
}

/// An object that can measure its distance to a point.
pub trait Measurable: SpatialObject {
    fn distance_to(&self, point: &[i32]) -> f64;
}

/// An object that can tell whether another object is of the same kind.
pub trait TypeComparable {
    fn is_of_same_type(&self, other: &Self) -> bool;
}
