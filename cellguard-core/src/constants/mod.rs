//! Constants for CellGuard Core
//!
//! Centralized compile-time values used throughout the redundancy core.
//! Everything that sizes a table or bounds a timeout lives here, with the
//! unit in the name.
//!
//! ## Organization
//!
//! - **Battery**: pack layout (strings, modules, cell blocks, sensors)
//! - **Timing**: measurement timeouts in ticks (1 tick = 1 ms)
//! - **Plausibility**: tolerances for the default plausibility checks
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Layout constants size static arrays; changing them changes every table
//! 3. Timeouts and tolerances are defaults - runtime overrides go through
//!    [`crate::config::RedundancyConfig`]

/// Pack layout: number of strings, modules and measurement points.
pub mod battery;

/// Measurement timeouts.
pub mod timing;

/// Default plausibility tolerances.
pub mod plausibility;

// Re-export commonly used constants for convenience
pub use battery::{
    NR_OF_CELL_BLOCKS_PER_MODULE, NR_OF_CELL_BLOCKS_PER_STRING, NR_OF_HIGH_VOLTAGE_INPUTS,
    NR_OF_MODULES_PER_STRING, NR_OF_STRINGS, NR_OF_TEMP_SENSORS_PER_MODULE,
    NR_OF_TEMP_SENSORS_PER_STRING,
};

pub use timing::{
    AFE_MEASUREMENT_TIMEOUT_MS, CURRENT_MEASUREMENT_TIMEOUT_MS,
    CURRENT_SENSOR_MEASUREMENT_TIMEOUT_MS,
};
