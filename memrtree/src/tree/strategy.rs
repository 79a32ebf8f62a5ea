//! Pluggable placement and split policy of the R-Tree.

use super::node::SpatialNode;
use super::rtree_constants::{DEFAULT_MINIMUM_FILL, DEFAULT_REINSERT_FACTOR};
use super::rtree_types::{SpatialError, SpatialResult};
use crate::mbr::Mbr;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Membership bitmap returned by [`RTreeStrategy::distribute`]. `true`
/// marks an entry that moves into the new sibling node.
pub type Distribution = SmallVec<[bool; 32]>;

/// Tunable parameters of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParameters {
    /// Minimum fill percentage of a node
    pub minimum: u32,
    /// Percentage of entries reordered for reinsertion
    pub reinsert_factor: u32,
}

impl Default for StrategyParameters {
    fn default() -> Self {
        StrategyParameters {
            minimum: DEFAULT_MINIMUM_FILL,
            reinsert_factor: DEFAULT_REINSERT_FACTOR,
        }
    }
}

/// Decides where new entries go and how an overflowing node is split.
pub trait RTreeStrategy: Send + Sync {
    /// Picks the child of a non-leaf `node` that receives `mbr`.
    fn choose_subtree(&self, node: &dyn SpatialNode, mbr: &Mbr) -> usize;

    /// Splits the entries of an overflowing `node` into two groups.
    ///
    /// The result must have one flag per entry and must mark at least one
    /// entry, but not all of them.
    fn distribute(&self, node: &dyn SpatialNode, parent_mbr: &Mbr) -> Distribution;

    /// Whether the entry of a new sibling must be placed right after the
    /// child it was split from.
    fn is_ordering(&self) -> bool;

    fn minimum(&self) -> u32;

    fn set_minimum(&mut self, minimum: u32);

    /// Percentage of entries reinserted at `height`.
    fn reinsert_factor(&self, height: usize) -> u32;

    fn set_reinsert_factor(&mut self, factor: u32);

    /// Moves the entries farthest from the node's center to the end of the
    /// node in descending distance, so the one to reinsert first sits last.
    fn sort_for_reinsert(&self, node: &mut dyn SpatialNode) -> SpatialResult<()>;

    fn parameters(&self) -> StrategyParameters {
        StrategyParameters {
            minimum: self.minimum(),
            reinsert_factor: self.reinsert_factor(0),
        }
    }

    fn apply_parameters(&mut self, parameters: StrategyParameters) {
        self.set_minimum(parameters.minimum);
        self.set_reinsert_factor(parameters.reinsert_factor);
    }
}

/// Default strategy: least volume enlargement for placement and a split on
/// the mean center of the widest axis.
///
/// The minimum fill is kept for callers that read it back, but neither
/// placement nor splitting consult it.
#[derive(Debug, Clone, Default)]
pub struct SimpleRTreeStrategy {
    parameters: StrategyParameters,
}

impl SimpleRTreeStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(parameters: StrategyParameters) -> Self {
        SimpleRTreeStrategy { parameters }
    }
}

impl RTreeStrategy for SimpleRTreeStrategy {
    fn choose_subtree(&self, node: &dyn SpatialNode, mbr: &Mbr) -> usize {
        let mut best_idx = 0;
        let mut best_enlargement = f64::INFINITY;
        let mut best_volume = f64::INFINITY;

        for i in 0..node.entry_count() {
            let Some(child) = node.entry_mbr(i) else {
                continue;
            };
            let volume = child.compute_volume();
            let enlargement = child.union(mbr).compute_volume() - volume;

            if enlargement < best_enlargement
                || (enlargement == best_enlargement && volume < best_volume)
            {
                best_enlargement = enlargement;
                best_volume = volume;
                best_idx = i;
            }
        }
        best_idx
    }

    fn distribute(&self, node: &dyn SpatialNode, parent_mbr: &Mbr) -> Distribution {
        let count = node.entry_count();

        let mut axis = 0;
        for candidate in 1..parent_mbr.dimensions() {
            if parent_mbr.extension(candidate) > parent_mbr.extension(axis) {
                axis = candidate;
            }
        }

        let centers: SmallVec<[i64; 32]> = (0..count)
            .map(|i| {
                node.entry_mbr(i)
                    .and_then(|mbr| mbr.center(axis))
                    .unwrap_or(0) as i64
            })
            .collect();
        let pivot = if count == 0 {
            0
        } else {
            centers.iter().sum::<i64>() / count as i64
        };

        let mut distribution: Distribution = centers.iter().map(|c| *c > pivot).collect();
        let moved = distribution.iter().filter(|m| **m).count();
        if moved == 0 || moved == count {
            for (i, flag) in distribution.iter_mut().enumerate() {
                *flag = i >= count / 2;
            }
        }
        distribution
    }

    fn is_ordering(&self) -> bool {
        false
    }

    fn minimum(&self) -> u32 {
        self.parameters.minimum
    }

    fn set_minimum(&mut self, minimum: u32) {
        self.parameters.minimum = minimum;
    }

    fn reinsert_factor(&self, _height: usize) -> u32 {
        self.parameters.reinsert_factor
    }

    fn set_reinsert_factor(&mut self, factor: u32) {
        self.parameters.reinsert_factor = factor;
    }

    fn sort_for_reinsert(&self, node: &mut dyn SpatialNode) -> SpatialResult<()> {
        let count = node.entry_count();
        let factor = self.reinsert_factor(node.height()) as usize;
        let reinsert = (count * factor / 100).min(count);
        if reinsert == 0 {
            return Ok(());
        }

        let center = node.mbr().center_coords();
        let mut distances = Vec::with_capacity(count);
        for i in 0..count {
            let mbr = node.entry_mbr(i).ok_or_else(|| {
                SpatialError::InvariantViolation(format!("entry {} vanished while sorting", i))
            })?;
            distances.push(mbr.quad_distance_from_center(&center)?);
        }

        let border = count - reinsert;
        quick_sort(node, &mut distances, 0, count - 1, border);

        let (mut lo, mut hi) = (border, count - 1);
        while lo < hi {
            node.swap_entries(lo, hi);
            lo += 1;
            hi -= 1;
        }
        Ok(())
    }
}

/// Median-of-three quicksort that only sorts partitions reaching `border`.
fn quick_sort(
    node: &mut dyn SpatialNode,
    distances: &mut [i64],
    lo: usize,
    hi: usize,
    border: usize,
) {
    if lo >= hi || hi < border {
        return;
    }

    let mut swap = |distances: &mut [i64], a: usize, b: usize| {
        if a != b {
            distances.swap(a, b);
            node.swap_entries(a, b);
        }
    };

    let mid = lo + (hi - lo) / 2;
    if distances[mid] < distances[lo] {
        swap(distances, lo, mid);
    }
    if distances[hi] < distances[lo] {
        swap(distances, lo, hi);
    }
    if distances[hi] < distances[mid] {
        swap(distances, mid, hi);
    }
    swap(distances, mid, hi);

    let pivot = distances[hi];
    let mut store = lo;
    for i in lo..hi {
        if distances[i] < pivot {
            swap(distances, i, store);
            store += 1;
        }
    }
    swap(distances, store, hi);

    if store > lo {
        quick_sort(node, distances, lo, store - 1, border);
    }
    quick_sort(node, distances, store + 1, hi, border);
}
