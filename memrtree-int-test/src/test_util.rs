use memrtree::{
    Layered, Mbr, Measurable, MemoryRTree, Relocation, SpatialEntry, SpatialObject,
    SpatialResult, SpatialSearchTree, TypeComparable, Visualized,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::backtrace::Backtrace;
use std::sync::Arc;
use std::time::Instant;

/// Runs a test between a setup and a teardown step.
///
/// The teardown runs even when the test fails. Errors and panics are
/// reported with the elapsed time before the test is failed.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    B: Fn() -> SpatialResult<TestContext>,
    T: Fn(&mut TestContext) -> SpatialResult<()>,
    A: Fn(&mut TestContext) -> SpatialResult<()>,
{
    let start_time = Instant::now();

    let mut ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| test(&mut ctx)));
    let after_result = after(&mut ctx);
    let elapsed = start_time.elapsed();

    match result {
        Ok(Ok(())) => log::debug!("Test passed in {:?}", elapsed),
        Ok(Err(e)) => {
            eprintln!("\n==================== TEST FAILED ====================");
            eprintln!("Error: {} (took {:?})", e, elapsed);
            let bt = Backtrace::capture().to_string();
            if !bt.is_empty() && !bt.contains("disabled") {
                eprintln!("\nBacktrace:\n{}", bt);
            }
            eprintln!("=====================================================\n");
            panic!("Test failed: {:?}", e);
        }
        Err(panic_err) => {
            let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            panic!("Test panicked after {:?}: {}", elapsed, err_msg);
        }
    }

    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// A tree plus every feature inserted into it, in insertion order.
pub struct TestContext {
    tree: MemoryRTree<Feature>,
    features: Vec<Arc<Feature>>,
}

impl TestContext {
    pub fn new(tree: MemoryRTree<Feature>) -> Self {
        Self {
            tree,
            features: Vec::new(),
        }
    }

    pub fn tree(&self) -> &MemoryRTree<Feature> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut MemoryRTree<Feature> {
        &mut self.tree
    }

    pub fn features(&self) -> &[Arc<Feature>] {
        &self.features
    }

    pub fn insert(&mut self, feature: Arc<Feature>) -> SpatialResult<()> {
        self.tree.insert(feature.clone())?;
        self.features.push(feature);
        Ok(())
    }

    /// Removes `feature` from the tree and, when that succeeded, from the
    /// bookkeeping.
    pub fn remove(&mut self, feature: &Arc<Feature>) -> SpatialResult<bool> {
        let removed = self.tree.remove(feature)?;
        if removed {
            self.features.retain(|f| !Arc::ptr_eq(f, feature));
        }
        Ok(removed)
    }

    /// Moves `feature` to the box of `moved` and swaps the bookkeeping
    /// handle when the tree found it.
    pub fn relocate(&mut self, feature: &Arc<Feature>, moved: Arc<Feature>) -> SpatialResult<Relocation> {
        let relocation = self.tree.move_object(feature, moved.clone())?;
        if relocation != Relocation::NotFound {
            if let Some(slot) = self.features.iter_mut().find(|f| Arc::ptr_eq(f, feature)) {
                *slot = moved;
            }
        }
        Ok(relocation)
    }
}

pub fn create_test_context(dimensions: usize, capacity: usize) -> SpatialResult<TestContext> {
    Ok(TestContext::new(MemoryRTree::new(dimensions, capacity)?))
}

/// Tree filled with `count` random 2-D features drawn from `seed`.
pub fn create_random_context(count: usize, capacity: usize, seed: u64) -> SpatialResult<TestContext> {
    let mut ctx = create_test_context(2, capacity)?;
    for feature in random_features(count, seed) {
        ctx.insert(feature)?;
    }
    Ok(ctx)
}

pub fn cleanup(ctx: &mut TestContext) -> SpatialResult<()> {
    ctx.tree_mut().check_invariants()?;
    ctx.tree_mut().clear();
    ctx.features.clear();
    Ok(())
}

/// A map feature with a box, a layer, a visible scale range and a kind.
#[derive(Debug, Clone)]
pub struct Feature {
    pub name: String,
    pub kind: String,
    mbr: Mbr,
    layer: i32,
    min_scale: i32,
    max_scale: i32,
}

impl Feature {
    pub fn new(name: &str, mbr: Mbr) -> Self {
        Feature {
            name: name.to_string(),
            kind: "feature".to_string(),
            mbr,
            layer: 0,
            min_scale: 0,
            max_scale: i32::MAX,
        }
    }

    pub fn rect(name: &str, x: i32, y: i32, width: i32, height: i32) -> Arc<Self> {
        Arc::new(Feature::new(name, Mbr::rect(x, y, width, height)))
    }

    /// Copy of this feature at `mbr`.
    pub fn relocated(&self, mbr: Mbr) -> Arc<Self> {
        Arc::new(Feature {
            mbr,
            ..self.clone()
        })
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

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }
}

impl SpatialEntry for Feature {
    fn mbr(&self) -> &Mbr {
        &self.mbr
    }
}

impl SpatialObject for Feature {}

impl Layered for Feature {
    fn layer(&self) -> i32 {
        self.layer
    }
}

impl Visualized for Feature {
    fn is_visible(&self, scale: i32) -> bool {
        (self.min_scale..=self.max_scale).contains(&scale)
    }

    fn interacts(&self, x: i32, y: i32, scale: i32) -> bool {
        self.mbr.contains_point(&[x, y], scale).unwrap_or(false)
    }
}

impl Measurable for Feature {
    fn distance_to(&self, point: &[i32]) -> f64 {
        box_distance(&self.mbr, point)
    }
}

impl TypeComparable for Feature {
    fn is_of_same_type(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// Euclidean distance from `point` to the closest point of `mbr`.
pub fn box_distance(mbr: &Mbr, point: &[i32]) -> f64 {
    let mut sum = 0.0;
    for (axis, p) in point.iter().enumerate().take(mbr.dimensions()) {
        let (Some(lo), Some(hi)) = (mbr.min(axis), mbr.max(axis)) else {
            break;
        };
        let d = if *p < lo {
            lo as f64 - *p as f64
        } else if *p > hi {
            *p as f64 - hi as f64
        } else {
            0.0
        };
        sum += d * d;
    }
    sum.sqrt()
}

pub fn random_features(count: usize, seed: u64) -> Vec<Arc<Feature>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let x = rng.gen_range(-1_000..1_000);
            let y = rng.gen_range(-1_000..1_000);
            let w = rng.gen_range(0..40);
            let h = rng.gen_range(0..40);
            Arc::new(
                Feature::new(&format!("f{}", i), Mbr::rect(x, y, w, h))
                    .with_layer(i as i32 % 3)
                    .with_kind(if i % 2 == 0 { "even" } else { "odd" }),
            )
        })
        .collect()
}

/// Sorted names of `features`.
pub fn sorted_names(features: &[Arc<Feature>]) -> Vec<String> {
    let mut names: Vec<String> = features.iter().map(|f| f.name.clone()).collect();
    names.sort();
    names
}

/// Linear scan over `features` keeping what `accept` says yes to.
pub fn brute_force<F>(features: &[Arc<Feature>], accept: F) -> Vec<Arc<Feature>>
where
    F: Fn(&Feature) -> bool,
{
    features.iter().filter(|f| accept(f)).cloned().collect()
}
