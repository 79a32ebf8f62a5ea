//! Shapes used by the unit tests.

use crate::mbr::Mbr;
use crate::object::{Layered, Measurable, SpatialEntry, SpatialObject, TypeComparable, Visualized};
use std::sync::Arc;

#[ctor::ctor]
fn init() {
    colog::init();
}

#[derive(Debug, Clone)]
pub(crate) struct Shape {
    pub name: String,
    mbr: Mbr,
    layer: i32,
    min_scale: i32,
    max_scale: i32,
    kind: &'static str,
}

impl Shape {
    pub fn new(name: &str, x: i32, y: i32, width: i32, height: i32) -> Self {
        Shape {
            name: name.to_string(),
            mbr: Mbr::rect(x, y, width, height),
            layer: 0,
            min_scale: 0,
            max_scale: i32::MAX,
            kind: "shape",
        }
    }

    pub fn arc(name: &str, x: i32, y: i32, width: i32, height: i32) -> Arc<Self> {
        Arc::new(Shape::new(name, x, y, width, height))
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_scale_range(mut self, min_scale: i32, max_scale: i32) -> Self {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
        self
    }

    pub fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }
}

impl SpatialEntry for Shape {
    fn mbr(&self) -> &Mbr {
        &self.mbr
    }
}

impl SpatialObject for Shape {}

impl Layered for Shape {
    fn layer(&self) -> i32 {
        self.layer
    }
}

impl Visualized for Shape {
    fn is_visible(&self, scale: i32) -> bool {
        (self.min_scale..=self.max_scale).contains(&scale)
    }

    // the pick radius is one unit per scale step
    fn interacts(&self, x: i32, y: i32, scale: i32) -> bool {
        self.mbr.contains_point(&[x, y], scale).unwrap_or(false)
    }
}

impl Measurable for Shape {
    /// Euclidean distance to the nearest point of the box.
    fn distance_to(&self, point: &[i32]) -> f64 {
        let mut sum = 0.0;
        for (axis, p) in point.iter().enumerate() {
            let (Some(lo), Some(hi)) = (self.mbr.min(axis), self.mbr.max(axis)) else {
                break;
            };
            let d = if *p < lo {
                (lo - p) as f64
            } else if *p > hi {
                (p - hi) as f64
            } else {
                0.0
            };
            sum += d * d;
        }
        sum.sqrt()
    }
}

impl TypeComparable for Shape {
    fn is_of_same_type(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

pub(crate) fn names(shapes: &[Arc<Shape>]) -> Vec<String> {
    shapes.iter().map(|s| s.name.clone()).collect()
}
