//! Measurement redundancy core for CellGuard
//!
//! Cross-checks a base (AFE) and a redundant measurement source for cell
//! voltages and cell temperatures, and validates pack-level values (string
//! currents, string voltages, battery voltage, bus voltage, power) into one
//! staleness-checked data set for safety decisions.
//!
//! Key constraints:
//! - No heap allocation: every table is a fixed-size array
//! - Wrap-safe tick arithmetic for all timeouts
//! - Stale or implausible data degrades to an invalid flag, never a panic
//!
//! ```
//! use cellguard_core::{
//!     diagnostics::NoDiagnostics,
//!     plausibility::TolerancePlausibility,
//!     store::MemoryStore,
//!     time::FixedClock,
//!     topology::FixedTopology,
//!     RedundancyConfig, RedundancyManager,
//! };
//!
//! let clock = FixedClock::new(0);
//! let mut manager = RedundancyManager::new(
//!     RedundancyConfig::default(),
//!     MemoryStore::new(&clock),
//!     TolerancePlausibility::default(),
//!     FixedTopology::all_open(),
//!     NoDiagnostics,
//!     &clock,
//! );
//!
//! // Called once per scheduling tick
//! clock.advance(200);
//! manager.run_cycle()?;
//! assert!(manager.pack_values().invalid_battery_voltage);
//! # Ok::<(), cellguard_core::RedundancyError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod logging;

pub mod aggregate;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod errors;
pub mod orchestrator;
pub mod pack;
pub mod plausibility;
pub mod reconcile;
pub mod store;
pub mod tables;
pub mod time;
pub mod topology;

// Public API
pub use config::RedundancyConfig;
pub use errors::{RedundancyError, RedundancyResult};
pub use orchestrator::{OrchestratorState, RedundancyManager};
pub use tables::{
    CellPosition, CellTemperatureTable, CellVoltageTable, CurrentSensorTable,
    MeasurementHeader, MinMaxTable, PackValuesTable, StringMask, TableId,
};
pub use time::{Clock, Tick};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
