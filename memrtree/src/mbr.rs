use crate::tree::rtree_types::{SpatialError, SpatialResult};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Coordinate storage of a box. Up to four dimensions stay inline.
pub type Coords = SmallVec<[i32; 4]>;

/// An n-dimensional, axis-aligned minimum bounding rectangle.
///
/// `Mbr` stores a min corner and a non-negative extent per axis, using
/// integer coordinates. It is the geometry every node, entry and query in
/// the tree works with.
///
/// Operations on boxes of different dimensions behave differently per
/// method: [`union`](Mbr::union), [`intersection`](Mbr::intersection),
/// [`intersects`](Mbr::intersects) and [`contains`](Mbr::contains) degrade
/// to a conservative result, while the point and mutating operations reject
/// the input with an error.
///
/// # Examples
///
/// ```rust
/// use memrtree::Mbr;
///
/// let a = Mbr::rect(0, 0, 10, 10);
/// let b = Mbr::rect(5, 5, 10, 10);
///
/// assert!(a.intersects(&b, 0));
/// assert_eq!(a.union(&b), Mbr::rect(0, 0, 15, 15));
/// assert_eq!(a.intersection(&b), Some(Mbr::rect(5, 5, 5, 5)));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawMbr")]
pub struct Mbr {
    min: Coords,
    ext: Coords,
}

/// Unchecked wire form of an [`Mbr`].
#[derive(Deserialize)]
struct RawMbr {
    min: Coords,
    ext: Coords,
}

impl TryFrom<RawMbr> for Mbr {
    type Error = SpatialError;

    fn try_from(raw: RawMbr) -> SpatialResult<Mbr> {
        if raw.min.len() != raw.ext.len() {
            return Err(SpatialError::DimensionMismatch {
                expected: raw.min.len(),
                found: raw.ext.len(),
            });
        }
        Mbr::from_coords(&raw.min, &raw.ext)
    }
}

impl fmt::Display for Mbr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MBR[DIM={} coord[]=", self.dimensions())?;
        write_joined(f, &self.min)?;
        write!(f, " ext[]=")?;
        write_joined(f, &self.ext)?;
        write!(f, "]")
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, values: &[i32]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

/// Clamps a 64-bit intermediate back into the coordinate range.
fn clamp_coord(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl Mbr {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Creates a zero-sized box at the origin.
    ///
    /// Returns `InvalidArgument` when `dimensions` is 0.
    pub fn new(dimensions: usize) -> SpatialResult<Mbr> {
        if dimensions == 0 {
            return Err(SpatialError::InvalidArgument(
                "an MBR needs at least one dimension".into(),
            ));
        }
        Ok(Mbr::zeroed(dimensions))
    }

    /// Zero box for a dimension count that is already known to be valid.
    pub(crate) fn zeroed(dimensions: usize) -> Mbr {
        Mbr {
            min: SmallVec::from_elem(0, dimensions),
            ext: SmallVec::from_elem(0, dimensions),
        }
    }

    /// Creates a box from a min corner and extents.
    ///
    /// The dimension is the shorter of the two slices. Empty input and
    /// negative extents are rejected.
    pub fn from_coords(min: &[i32], ext: &[i32]) -> SpatialResult<Mbr> {
        let dimensions = min.len().min(ext.len());
        if dimensions == 0 {
            return Err(SpatialError::InvalidArgument(
                "an MBR needs at least one dimension".into(),
            ));
        }
        if let Some(axis) = ext[..dimensions].iter().position(|e| *e < 0) {
            return Err(SpatialError::InvalidArgument(format!(
                "negative extent {} on axis {}",
                ext[axis], axis
            )));
        }
        Ok(Mbr {
            min: SmallVec::from_slice(&min[..dimensions]),
            ext: SmallVec::from_slice(&ext[..dimensions]),
        })
    }

    /// Creates a zero-extent box located at `point`.
    pub fn from_point(point: &[i32]) -> SpatialResult<Mbr> {
        let ext = vec![0; point.len()];
        Mbr::from_coords(point, &ext)
    }

    /// Creates the box spanned by two opposite corners.
    pub fn from_points(a: &[i32], b: &[i32]) -> SpatialResult<Mbr> {
        if a.len() != b.len() {
            return Err(SpatialError::DimensionMismatch {
                expected: a.len(),
                found: b.len(),
            });
        }
        let mut mbr = Mbr::from_point(a)?;
        mbr.add_point(b)?;
        Ok(mbr)
    }

    /// One-dimensional interval. A negative width moves the start instead.
    pub fn interval(x: i32, width: i32) -> Mbr {
        let (x, width) = normalize(x, width);
        Mbr {
            min: SmallVec::from_slice(&[x]),
            ext: SmallVec::from_slice(&[width]),
        }
    }

    /// Two-dimensional rectangle. Negative sizes move the min corner instead.
    pub fn rect(x: i32, y: i32, width: i32, height: i32) -> Mbr {
        let (x, width) = normalize(x, width);
        let (y, height) = normalize(y, height);
        Mbr {
            min: SmallVec::from_slice(&[x, y]),
            ext: SmallVec::from_slice(&[width, height]),
        }
    }

    /// Three-dimensional cuboid. Negative sizes move the min corner instead.
    pub fn cuboid(x: i32, y: i32, z: i32, width: i32, height: i32, depth: i32) -> Mbr {
        let (x, width) = normalize(x, width);
        let (y, height) = normalize(y, height);
        let (z, depth) = normalize(z, depth);
        Mbr {
            min: SmallVec::from_slice(&[x, y, z]),
            ext: SmallVec::from_slice(&[width, height, depth]),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn dimensions(&self) -> usize {
        self.min.len()
    }

    pub fn min_coords(&self) -> &[i32] {
        &self.min
    }

    pub fn extensions(&self) -> &[i32] {
        &self.ext
    }

    pub fn min(&self, axis: usize) -> Option<i32> {
        self.min.get(axis).copied()
    }

    pub fn max(&self, axis: usize) -> Option<i32> {
        Some(clamp_coord(
            *self.min.get(axis)? as i64 + *self.ext.get(axis)? as i64,
        ))
    }

    pub fn extension(&self, axis: usize) -> Option<i32> {
        self.ext.get(axis).copied()
    }

    /// Center on `axis`, truncated towards the min corner.
    pub fn center(&self, axis: usize) -> Option<i32> {
        Some(clamp_coord(
            *self.min.get(axis)? as i64 + *self.ext.get(axis)? as i64 / 2,
        ))
    }

    pub fn center_coords(&self) -> Coords {
        (0..self.dimensions())
            .filter_map(|axis| self.center(axis))
            .collect()
    }

    pub fn max_coords(&self) -> Coords {
        (0..self.dimensions())
            .filter_map(|axis| self.max(axis))
            .collect()
    }

    /// Largest extent over all axes.
    pub fn max_extension(&self) -> i32 {
        self.ext.iter().copied().max().unwrap_or(0)
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// Returns the smallest box enclosing both boxes.
    ///
    /// A box of another dimension is ignored and a copy of `self` returned.
    pub fn union(&self, other: &Mbr) -> Mbr {
        if self.dimensions() != other.dimensions() {
            return self.clone();
        }
        let mut result = self.clone();
        for axis in 0..self.dimensions() {
            let lo = self.min[axis].min(other.min[axis]);
            let hi = self.upper(axis).max(other.upper(axis));
            result.min[axis] = lo;
            result.ext[axis] = clamp_coord(hi - lo as i64);
        }
        result
    }

    /// Returns the overlapping box, or `None` when the boxes are disjoint on
    /// any axis or have different dimensions. Touching boxes overlap in a
    /// zero-extent box.
    pub fn intersection(&self, other: &Mbr) -> Option<Mbr> {
        if self.dimensions() != other.dimensions() {
            return None;
        }
        let mut result = self.clone();
        for axis in 0..self.dimensions() {
            let lo = self.min[axis].max(other.min[axis]);
            let hi = self.upper(axis).min(other.upper(axis));
            if hi < lo as i64 {
                return None;
            }
            result.min[axis] = lo;
            result.ext[axis] = clamp_coord(hi - lo as i64);
        }
        Some(result)
    }

    /// Volume of the overlap with `other`, 0 when there is none.
    pub fn intersection_volume(&self, other: &Mbr) -> f64 {
        self.intersection(other)
            .map(|mbr| mbr.compute_volume())
            .unwrap_or(0.0)
    }

    /// Tests whether `self`, expanded by `tolerance` on every axis, overlaps
    /// `other`. Boxes that only touch do not overlap. Different dimensions
    /// never overlap.
    pub fn intersects(&self, other: &Mbr, tolerance: i32) -> bool {
        if self.dimensions() != other.dimensions() {
            return false;
        }
        let tolerance = tolerance as i64;
        (0..self.dimensions()).all(|axis| {
            self.upper(axis) + tolerance > other.min[axis] as i64
                && (self.min[axis] as i64) - tolerance < other.upper(axis)
        })
    }

    /// Tests whether both corners of `other` lie inside `self` expanded by
    /// `tolerance`. Different dimensions are never contained.
    pub fn contains(&self, other: &Mbr, tolerance: i32) -> bool {
        if self.dimensions() != other.dimensions() {
            return false;
        }
        let tolerance = tolerance as i64;
        (0..self.dimensions()).all(|axis| {
            other.min[axis] as i64 >= self.min[axis] as i64 - tolerance
                && other.upper(axis) <= self.upper(axis) + tolerance
        })
    }

    /// Tests whether `point` lies inside `self` expanded by `tolerance`,
    /// borders included. Extra point coordinates are ignored.
    ///
    /// Returns `InvalidArgument` when the point has fewer coordinates than
    /// the box has dimensions.
    pub fn contains_point(&self, point: &[i32], tolerance: i32) -> SpatialResult<bool> {
        self.check_point(point)?;
        let tolerance = tolerance as i64;
        Ok((0..self.dimensions()).all(|axis| {
            let p = point[axis] as i64;
            p + tolerance >= self.min[axis] as i64 && p - tolerance <= self.upper(axis)
        }))
    }

    /// Product of all extents.
    pub fn compute_volume(&self) -> f64 {
        self.ext.iter().map(|e| *e as f64).product()
    }

    /// Summed length of all edges: `2^(D-1)` times the sum of extents.
    pub fn compute_border(&self) -> f64 {
        let edges = 2f64.powi(self.dimensions() as i32 - 1);
        edges * self.ext.iter().map(|e| *e as f64).sum::<f64>()
    }

    /// Squared distance between the center of the box and `point`.
    pub fn quad_distance_from_center(&self, point: &[i32]) -> SpatialResult<i64> {
        self.check_point(point)?;
        let mut sum = 0i64;
        for (axis, p) in point.iter().enumerate().take(self.dimensions()) {
            let center = self.min[axis] as i64 + self.ext[axis] as i64 / 2;
            let diff = center - *p as i64;
            sum = sum.saturating_add(diff.saturating_mul(diff));
        }
        Ok(sum)
    }

    /// Projects the box onto two of its axes.
    pub fn extract_rectangle(&self, axis_x: usize, axis_y: usize) -> SpatialResult<Mbr> {
        let (Some(x), Some(y)) = (self.min(axis_x), self.min(axis_y)) else {
            return Err(SpatialError::InvalidArgument(format!(
                "axes ({}, {}) out of range for {} dimensions",
                axis_x,
                axis_y,
                self.dimensions()
            )));
        };
        Ok(Mbr {
            min: SmallVec::from_slice(&[x, y]),
            ext: SmallVec::from_slice(&[self.ext[axis_x], self.ext[axis_y]]),
        })
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Grows `self` to enclose `other`. Extra dimensions of `other` are
    /// ignored, missing ones are an error.
    pub fn add(&mut self, other: &Mbr) -> SpatialResult<()> {
        if other.dimensions() < self.dimensions() {
            return Err(SpatialError::DimensionMismatch {
                expected: self.dimensions(),
                found: other.dimensions(),
            });
        }
        for axis in 0..self.dimensions() {
            let hi = self.upper(axis).max(other.upper(axis));
            self.min[axis] = self.min[axis].min(other.min[axis]);
            self.ext[axis] = clamp_coord(hi - self.min[axis] as i64);
        }
        Ok(())
    }

    /// Grows `self` to enclose `point`.
    pub fn add_point(&mut self, point: &[i32]) -> SpatialResult<()> {
        self.check_point(point)?;
        for (axis, p) in point.iter().enumerate().take(self.dimensions()) {
            let hi = self.upper(axis).max(*p as i64);
            self.min[axis] = self.min[axis].min(*p);
            self.ext[axis] = clamp_coord(hi - self.min[axis] as i64);
        }
        Ok(())
    }

    /// Copies the bounds of a box with the same dimension.
    pub fn set_bounds(&mut self, other: &Mbr) -> SpatialResult<()> {
        if other.dimensions() != self.dimensions() {
            return Err(SpatialError::DimensionMismatch {
                expected: self.dimensions(),
                found: other.dimensions(),
            });
        }
        self.min.copy_from_slice(&other.min);
        self.ext.copy_from_slice(&other.ext);
        Ok(())
    }

    /// Sets the bounds from a min corner and extents.
    pub fn set_bounds_from(&mut self, min: &[i32], ext: &[i32]) -> SpatialResult<()> {
        let bounds = Mbr::from_coords(min, ext)?;
        self.set_bounds(&bounds)
    }

    /// Moves every min coordinate down by `delta` and grows every extent by
    /// twice `delta`. Shrinking below zero extent is rejected.
    pub fn grow(&mut self, deltas: &[i32]) -> SpatialResult<()> {
        self.check_point(deltas)?;
        let mut grown = self.clone();
        for (axis, delta) in deltas.iter().enumerate().take(self.dimensions()) {
            let ext = self.ext[axis] as i64 + 2 * *delta as i64;
            if ext < 0 {
                return Err(SpatialError::InvalidArgument(format!(
                    "growing by {} leaves a negative extent on axis {}",
                    delta, axis
                )));
            }
            grown.min[axis] = clamp_coord(self.min[axis] as i64 - *delta as i64);
            grown.ext[axis] = clamp_coord(ext);
        }
        *self = grown;
        Ok(())
    }

    /// Moves the box by `deltas`.
    pub fn translate(&mut self, deltas: &[i32]) -> SpatialResult<()> {
        self.check_point(deltas)?;
        for (axis, delta) in deltas.iter().enumerate().take(self.dimensions()) {
            self.min[axis] = clamp_coord(self.min[axis] as i64 + *delta as i64);
        }
        Ok(())
    }

    pub fn set_min(&mut self, axis: usize, value: i32) -> SpatialResult<()> {
        let slot = self.min.get_mut(axis).ok_or_else(|| axis_error(axis))?;
        *slot = value;
        Ok(())
    }

    pub fn set_extension(&mut self, axis: usize, value: i32) -> SpatialResult<()> {
        if value < 0 {
            return Err(SpatialError::InvalidArgument(format!(
                "negative extent {} on axis {}",
                value, axis
            )));
        }
        let slot = self.ext.get_mut(axis).ok_or_else(|| axis_error(axis))?;
        *slot = value;
        Ok(())
    }

    /// Moves the min corner to `min`, keeping the extents.
    pub fn set_location(&mut self, min: &[i32]) -> SpatialResult<()> {
        self.check_point(min)?;
        let dimensions = self.dimensions();
        self.min.copy_from_slice(&min[..dimensions]);
        Ok(())
    }

    /// Replaces the extents, keeping the min corner.
    pub fn set_size(&mut self, ext: &[i32]) -> SpatialResult<()> {
        self.check_point(ext)?;
        let dimensions = self.dimensions();
        if ext[..dimensions].iter().any(|e| *e < 0) {
            return Err(SpatialError::InvalidArgument(
                "extents must not be negative".into(),
            ));
        }
        self.ext.copy_from_slice(&ext[..dimensions]);
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn upper(&self, axis: usize) -> i64 {
        self.min[axis] as i64 + self.ext[axis] as i64
    }

    fn check_point(&self, point: &[i32]) -> SpatialResult<()> {
        if point.len() < self.dimensions() {
            return Err(SpatialError::InvalidArgument(format!(
                "expected at least {} coordinates, got {}",
                self.dimensions(),
                point.len()
            )));
        }
        Ok(())
    }
}

fn normalize(start: i32, size: i32) -> (i32, i32) {
    if size < 0 {
        (start.saturating_add(size), size.saturating_neg())
    } else {
        (start, size)
    }
}

fn axis_error(axis: usize) -> SpatialError {
    SpatialError::InvalidArgument(format!("axis {} out of range", axis))
}
