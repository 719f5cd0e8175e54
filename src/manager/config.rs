//! Manager limits.

use crate::unit::UnitConfig;

pub const DEFAULT_MAX_UNITS: usize = 10;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Live units allowed at once; creation beyond this fails immediately.
    pub max_units: usize,
    /// Units of one batch allowed to run at the same time.
    pub max_concurrency: usize,
    /// Config handed to units created by top-level requests.
    pub unit: UnitConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_units: DEFAULT_MAX_UNITS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            unit: UnitConfig::default(),
        }
    }
}

impl ManagerConfig {
    pub fn with_max_units(mut self, max: usize) -> Self {
        self.max_units = max;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_unit(mut self, unit: UnitConfig) -> Self {
        self.unit = unit;
        self
    }
}
