//! Construction parameters of a [`MemoryRTree`](crate::MemoryRTree).

use super::rtree_constants::{
    DEFAULT_DIMENSIONS, DEFAULT_MINIMUM_FILL, DEFAULT_NODE_CAPACITY, DEFAULT_REINSERT_FACTOR,
    MIN_NODE_CAPACITY,
};
use super::rtree_types::{SpatialError, SpatialResult};
use super::strategy::StrategyParameters;

/// Validated tree configuration.
///
/// Values can only be set through [`RTreeConfigBuilder`], so a config in
/// hand is always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTreeConfig {
    dimensions: usize,
    node_capacity: usize,
    strategy_parameters: StrategyParameters,
}

impl Default for RTreeConfig {
    fn default() -> Self {
        RTreeConfig {
            dimensions: DEFAULT_DIMENSIONS,
            node_capacity: DEFAULT_NODE_CAPACITY,
            strategy_parameters: StrategyParameters {
                minimum: DEFAULT_MINIMUM_FILL,
                reinsert_factor: DEFAULT_REINSERT_FACTOR,
            },
        }
    }
}

impl RTreeConfig {
    pub fn builder() -> RTreeConfigBuilder {
        RTreeConfigBuilder::new()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn node_capacity(&self) -> usize {
        self.node_capacity
    }

    pub fn strategy_parameters(&self) -> StrategyParameters {
        self.strategy_parameters
    }
}

/// Builder for [`RTreeConfig`].
///
/// The first invalid value is captured and returned by
/// [`build`](RTreeConfigBuilder::build); later setters are ignored.
///
/// # Examples
///
/// ```rust
/// use memrtree::RTreeConfig;
///
/// let config = RTreeConfig::builder()
///     .dimensions(3)
///     .node_capacity(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.node_capacity(), 8);
///
/// assert!(RTreeConfig::builder().dimensions(0).build().is_err());
/// ```
#[derive(Debug, Default)]
pub struct RTreeConfigBuilder {
    error: Option<SpatialError>,
    config: RTreeConfig,
}

impl RTreeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dimensions of every stored box. Must be at least 1.
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        if dimensions == 0 {
            self.fail("a tree needs at least one dimension".into());
        } else {
            self.config.dimensions = dimensions;
        }
        self
    }

    /// Maximum entries per node. Must be at least 2 so a split yields two
    /// non-empty nodes.
    pub fn node_capacity(mut self, capacity: usize) -> Self {
        if capacity < MIN_NODE_CAPACITY {
            self.fail(format!(
                "node capacity must be at least {}, got {}",
                MIN_NODE_CAPACITY, capacity
            ));
        } else {
            self.config.node_capacity = capacity;
        }
        self
    }

    /// Minimum fill percentage handed to the split strategy.
    pub fn minimum_fill(mut self, percent: u32) -> Self {
        if percent > 100 {
            self.fail(format!("minimum fill must be a percentage, got {}", percent));
        } else {
            self.config.strategy_parameters.minimum = percent;
        }
        self
    }

    /// Percentage of entries the strategy reorders for reinsertion.
    pub fn reinsert_factor(mut self, percent: u32) -> Self {
        if percent > 100 {
            self.fail(format!(
                "reinsert factor must be a percentage, got {}",
                percent
            ));
        } else {
            self.config.strategy_parameters.reinsert_factor = percent;
        }
        self
    }

    pub fn build(self) -> SpatialResult<RTreeConfig> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.config),
        }
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            log::error!("Invalid R-Tree configuration: {}", message);
            self.error = Some(SpatialError::InvalidArgument(message));
        }
    }
}
