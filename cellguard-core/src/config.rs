//! Runtime configuration of the redundancy core
//!
//! Table sizes are compile-time constants (see [`crate::constants::battery`]);
//! timeouts and the invalid-cell allowance can be tuned per deployment.

use crate::constants::timing::{
    AFE_MEASUREMENT_TIMEOUT_MS, CURRENT_MEASUREMENT_TIMEOUT_MS,
    CURRENT_SENSOR_MEASUREMENT_TIMEOUT_MS,
};
use crate::time::Tick;

/// Invalid cell voltages a string may have before its estimated voltage is
/// flagged invalid.
pub const DEFAULT_ALLOWED_INVALID_CELL_VOLTAGES: usize = 0;

/// Timeouts and allowances used by the orchestrator and pack validators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RedundancyConfig {
    /// Maximum age of base and redundant cell tables (ticks)
    pub afe_measurement_timeout: Tick,
    /// Maximum age of a string current reading (ticks)
    pub current_measurement_timeout: Tick,
    /// Maximum age of current sensor voltage and power readings (ticks)
    pub current_sensor_measurement_timeout: Tick,
    /// Invalid cells tolerated in an estimated string voltage
    pub allowed_invalid_cell_voltages: usize,
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        Self {
            afe_measurement_timeout: AFE_MEASUREMENT_TIMEOUT_MS,
            current_measurement_timeout: CURRENT_MEASUREMENT_TIMEOUT_MS,
            current_sensor_measurement_timeout: CURRENT_SENSOR_MEASUREMENT_TIMEOUT_MS,
            allowed_invalid_cell_voltages: DEFAULT_ALLOWED_INVALID_CELL_VOLTAGES,
        }
    }
}

impl RedundancyConfig {
    /// Override the AFE table timeout
    pub fn with_afe_timeout(mut self, ticks: Tick) -> Self {
        self.afe_measurement_timeout = ticks;
        self
    }

    /// Override the string current timeout
    pub fn with_current_timeout(mut self, ticks: Tick) -> Self {
        self.current_measurement_timeout = ticks;
        self
    }

    /// Override the current sensor voltage/power timeout
    pub fn with_current_sensor_timeout(mut self, ticks: Tick) -> Self {
        self.current_sensor_measurement_timeout = ticks;
        self
    }

    /// Override the invalid-cell allowance
    pub fn with_allowed_invalid_cell_voltages(mut self, count: usize) -> Self {
        self.allowed_invalid_cell_voltages = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_constants() {
        let config = RedundancyConfig::default();
        assert_eq!(config.afe_measurement_timeout, AFE_MEASUREMENT_TIMEOUT_MS);
        assert_eq!(config.allowed_invalid_cell_voltages, 0);
    }

    #[test]
    fn builder_overrides() {
        let config = RedundancyConfig::default()
            .with_afe_timeout(1000)
            .with_current_timeout(50)
            .with_current_sensor_timeout(60)
            .with_allowed_invalid_cell_voltages(2);

        assert_eq!(config.afe_measurement_timeout, 1000);
        assert_eq!(config.current_measurement_timeout, 50);
        assert_eq!(config.current_sensor_measurement_timeout, 60);
        assert_eq!(config.allowed_invalid_cell_voltages, 2);
    }
}
