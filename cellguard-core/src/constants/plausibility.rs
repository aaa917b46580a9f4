//! Default Plausibility Tolerances
//!
//! Used by [`crate::plausibility::TolerancePlausibility`]. Two readings of
//! the same quantity are plausible when they differ by at most the
//! tolerance (inclusive).

/// Maximum base/redundant difference of one cell voltage (mV).
pub const CELL_VOLTAGE_TOLERANCE_MV: i16 = 100;

/// Maximum base/redundant difference of one cell temperature (deci-°C).
pub const CELL_TEMPERATURE_TOLERANCE_DDEGC: i16 = 50;

/// Maximum difference between AFE string sum and current sensor reading (mV).
pub const STRING_VOLTAGE_TOLERANCE_MV: i32 = 5000;

/// Maximum distance of a cell voltage from its string average (mV).
pub const CELL_VOLTAGE_SPREAD_TOLERANCE_MV: i16 = 500;

/// Maximum distance of a cell temperature from its string average (deci-°C).
pub const CELL_TEMPERATURE_SPREAD_TOLERANCE_DDEGC: i16 = 100;
