//! Battery System Layout
//!
//! The pack is `NR_OF_STRINGS` parallel strings. Each string is a series
//! chain of `NR_OF_MODULES_PER_STRING` modules; each module has
//! `NR_OF_CELL_BLOCKS_PER_MODULE` voltage measurement points (cell blocks)
//! and `NR_OF_TEMP_SENSORS_PER_MODULE` temperature sensors.
//!
//! ```text
//! string 0 ─ module 0 [cb0 cb1 .. cb5] ─ module 1 [..] ─ .. ─ module 3 [..]
//! string 1 ─ ...
//! string 2 ─ ...
//! ```

/// Number of parallel strings in the pack.
pub const NR_OF_STRINGS: usize = 3;

/// Number of modules connected in series per string.
pub const NR_OF_MODULES_PER_STRING: usize = 4;

/// Number of cell blocks (voltage measurement points) per module.
pub const NR_OF_CELL_BLOCKS_PER_MODULE: usize = 6;

/// Number of temperature sensors per module.
pub const NR_OF_TEMP_SENSORS_PER_MODULE: usize = 4;

/// Number of cell blocks per string.
pub const NR_OF_CELL_BLOCKS_PER_STRING: usize =
    NR_OF_MODULES_PER_STRING * NR_OF_CELL_BLOCKS_PER_MODULE;

/// Number of temperature sensors per string.
pub const NR_OF_TEMP_SENSORS_PER_STRING: usize =
    NR_OF_MODULES_PER_STRING * NR_OF_TEMP_SENSORS_PER_MODULE;

/// High-voltage inputs on the current sensor of each string.
///
/// Slot 0 measures the string voltage, slot 2 the high-voltage bus.
pub const NR_OF_HIGH_VOLTAGE_INPUTS: usize = 3;

/// High-voltage input that measures the string voltage.
pub const STRING_VOLTAGE_INPUT: usize = 0;

/// High-voltage input that measures the high-voltage bus.
pub const BUS_VOLTAGE_INPUT: usize = 2;

// Strings are tracked in a u8 bit mask.
const _: () = assert!(NR_OF_STRINGS <= 8);
