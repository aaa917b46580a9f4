//! Measurement Tables
//!
//! Every value exchanged through the store is a fixed-size table indexed by
//! string, module and measurement point. There are no pointers between
//! tables; whoever needs data gets a copy.
//!
//! ## Header Lifecycle
//!
//! Each table embeds a [`MeasurementHeader`]. The store stamps it on every
//! write (`previous_timestamp := timestamp; timestamp := now`), so:
//!
//! ```text
//! timestamp == previous_timestamp == 0   never written since boot
//! anything else                          written at least once
//! ```
//!
//! ## Validity
//!
//! Values travel with an `invalid` flag instead of a sentinel. An invalid
//! value may still hold a numeric placeholder (the average of two invalid
//! readings, the last known current, ...) and must not be trusted.

use crate::constants::battery::{
    NR_OF_CELL_BLOCKS_PER_MODULE, NR_OF_HIGH_VOLTAGE_INPUTS, NR_OF_MODULES_PER_STRING,
    NR_OF_STRINGS, NR_OF_TEMP_SENSORS_PER_MODULE,
};
use crate::errors::RedundancyResult;
use crate::time::{self, Tick};

/// Unique identifier of a table in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TableId {
    /// Cell voltages from the base AFE
    CellVoltageBase = 0,
    /// Cell voltages from the redundant source
    CellVoltageRedundant = 1,
    /// Validated cell voltages
    CellVoltage = 2,
    /// Cell temperatures from the base AFE
    CellTemperatureBase = 3,
    /// Cell temperatures from the redundant source
    CellTemperatureRedundant = 4,
    /// Validated cell temperatures
    CellTemperature = 5,
    /// Per-string minimum, maximum and average
    MinMax = 6,
    /// Raw current sensor readings
    CurrentSensor = 7,
    /// Validated pack and string values
    PackValues = 8,
}

/// Header embedded in every table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementHeader {
    /// Store key
    pub id: TableId,
    /// Tick of the last write
    pub timestamp: Tick,
    /// Tick of the write before the last one
    pub previous_timestamp: Tick,
}

impl MeasurementHeader {
    /// Header of a table that was never written
    pub const fn new(id: TableId) -> Self {
        Self {
            id,
            timestamp: 0,
            previous_timestamp: 0,
        }
    }

    /// False until the first write since boot
    pub const fn has_ever_updated(&self) -> bool {
        time::has_ever_updated(self.timestamp, self.previous_timestamp)
    }

    /// Check that the table was written within `max_age` ticks
    pub fn check_freshness(&self, now: Tick, max_age: Tick) -> RedundancyResult<()> {
        time::check_freshness(self.timestamp, self.previous_timestamp, now, max_age)
    }

    /// Stamp a write at `now`
    pub fn stamp(&mut self, now: Tick) {
        self.previous_timestamp = self.timestamp;
        self.timestamp = now;
    }
}

/// Set of strings, one bit per string index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringMask(u8);

impl StringMask {
    /// No string
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every string of the pack
    pub const fn all() -> Self {
        Self(((1u16 << NR_OF_STRINGS) - 1) as u8)
    }

    /// Add string `s`
    pub fn insert(&mut self, s: usize) {
        debug_assert!(s < NR_OF_STRINGS);
        self.0 |= 1 << s;
    }

    /// Whether string `s` is in the set
    pub const fn contains(&self, s: usize) -> bool {
        s < NR_OF_STRINGS && (self.0 >> s) & 1 == 1
    }

    /// True if no string is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of strings in the set
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Merge another set into this one
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Position of a measurement point inside a string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellPosition {
    /// Module index, 0-based from the string's negative end
    pub module: u8,
    /// Cell block or sensor index inside the module
    pub cell: u8,
}

impl CellPosition {
    /// Position at (`module`, `cell`)
    pub const fn new(module: usize, cell: usize) -> Self {
        Self {
            module: module as u8,
            cell: cell as u8,
        }
    }
}

/// Cell voltages of the whole pack
#[derive(Debug, Clone, PartialEq)]
pub struct CellVoltageTable {
    /// Store header
    pub header: MeasurementHeader,
    /// Cell block voltage in mV
    pub cell_voltage_mv: [[[i16; NR_OF_CELL_BLOCKS_PER_MODULE]; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
    /// Invalid flag per cell block
    pub invalid_cell_voltage: [[[bool; NR_OF_CELL_BLOCKS_PER_MODULE]; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
    /// Number of valid cell voltages per string
    pub nr_valid_cell_voltages: [u16; NR_OF_STRINGS],
    /// Sum of valid cell voltages per string in mV
    pub string_voltage_mv: [i32; NR_OF_STRINGS],
    /// Sum of valid cell voltages per module in mV
    pub module_voltage_mv: [[i32; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
}

impl CellVoltageTable {
    /// All-invalid table, as at startup
    pub const fn new(id: TableId) -> Self {
        Self {
            header: MeasurementHeader::new(id),
            cell_voltage_mv: [[[0; NR_OF_CELL_BLOCKS_PER_MODULE]; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
            invalid_cell_voltage: [[[true; NR_OF_CELL_BLOCKS_PER_MODULE]; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
            nr_valid_cell_voltages: [0; NR_OF_STRINGS],
            string_voltage_mv: [0; NR_OF_STRINGS],
            module_voltage_mv: [[0; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
        }
    }

    /// Number of invalid cell voltages in string `s`
    pub fn nr_invalid_cell_voltages(&self, s: usize) -> usize {
        self.invalid_cell_voltage[s]
            .iter()
            .flatten()
            .filter(|invalid| **invalid)
            .count()
    }

    /// Recompute valid counts and voltage sums from the per-cell data
    pub fn recompute_sums(&mut self) {
        for s in 0..NR_OF_STRINGS {
            let mut nr_valid = 0u16;
            let mut string_sum = 0i32;
            for m in 0..NR_OF_MODULES_PER_STRING {
                let mut module_sum = 0i32;
                for cb in 0..NR_OF_CELL_BLOCKS_PER_MODULE {
                    if !self.invalid_cell_voltage[s][m][cb] {
                        module_sum += i32::from(self.cell_voltage_mv[s][m][cb]);
                        nr_valid += 1;
                    }
                }
                self.module_voltage_mv[s][m] = module_sum;
                string_sum += module_sum;
            }
            self.nr_valid_cell_voltages[s] = nr_valid;
            self.string_voltage_mv[s] = string_sum;
        }
    }

    /// Copy cell data from `other`, keeping this header
    ///
    /// Counts and sums are rebuilt from the copied cells; a producer only
    /// owns the per-cell values and flags.
    pub fn copy_values_from(&mut self, other: &Self) {
        self.cell_voltage_mv = other.cell_voltage_mv;
        self.invalid_cell_voltage = other.invalid_cell_voltage;
        self.recompute_sums();
    }
}

/// Cell temperatures of the whole pack
#[derive(Debug, Clone, PartialEq)]
pub struct CellTemperatureTable {
    /// Store header
    pub header: MeasurementHeader,
    /// Temperature in deci-°C
    pub cell_temperature_ddegc: [[[i16; NR_OF_TEMP_SENSORS_PER_MODULE]; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
    /// Invalid flag per sensor
    pub invalid_cell_temperature: [[[bool; NR_OF_TEMP_SENSORS_PER_MODULE]; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
    /// Number of valid temperatures per string
    pub nr_valid_temperatures: [u16; NR_OF_STRINGS],
}

impl CellTemperatureTable {
    /// All-invalid table, as at startup
    pub const fn new(id: TableId) -> Self {
        Self {
            header: MeasurementHeader::new(id),
            cell_temperature_ddegc: [[[0; NR_OF_TEMP_SENSORS_PER_MODULE]; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
            invalid_cell_temperature: [[[true; NR_OF_TEMP_SENSORS_PER_MODULE]; NR_OF_MODULES_PER_STRING]; NR_OF_STRINGS],
            nr_valid_temperatures: [0; NR_OF_STRINGS],
        }
    }

    /// Recompute valid counts from the per-sensor flags
    pub fn recompute_counts(&mut self) {
        for s in 0..NR_OF_STRINGS {
            self.nr_valid_temperatures[s] = self.invalid_cell_temperature[s]
                .iter()
                .flatten()
                .filter(|invalid| !**invalid)
                .count() as u16;
        }
    }

    /// Copy sensor data from `other`, keeping this header, and recount
    pub fn copy_values_from(&mut self, other: &Self) {
        self.cell_temperature_ddegc = other.cell_temperature_ddegc;
        self.invalid_cell_temperature = other.invalid_cell_temperature;
        self.recompute_counts();
    }
}

/// Aggregates of one string
///
/// Voltage and temperature fields are rebuilt independently by their own
/// aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringMinMax {
    /// Average of valid cell voltages in mV
    pub average_cell_voltage_mv: i16,
    /// Minimum valid cell voltage in mV
    pub minimum_cell_voltage_mv: i16,
    /// Maximum valid cell voltage in mV
    pub maximum_cell_voltage_mv: i16,
    /// Where the minimum voltage was first seen
    pub minimum_cell_voltage_position: CellPosition,
    /// Where the maximum voltage was first seen
    pub maximum_cell_voltage_position: CellPosition,
    /// Number of valid cell voltages
    pub nr_valid_cell_voltages: u16,
    /// Average of valid temperatures in deci-°C
    pub average_temperature_ddegc: f32,
    /// Minimum valid temperature in deci-°C
    pub minimum_temperature_ddegc: i16,
    /// Maximum valid temperature in deci-°C
    pub maximum_temperature_ddegc: i16,
    /// Where the minimum temperature was first seen
    pub minimum_temperature_position: CellPosition,
    /// Where the maximum temperature was first seen
    pub maximum_temperature_position: CellPosition,
    /// Number of valid temperatures
    pub nr_valid_temperatures: u16,
}

impl StringMinMax {
    /// Sentinel state: min at type maximum, max at type minimum
    pub const fn new() -> Self {
        Self {
            average_cell_voltage_mv: 0,
            minimum_cell_voltage_mv: i16::MAX,
            maximum_cell_voltage_mv: i16::MIN,
            minimum_cell_voltage_position: CellPosition { module: 0, cell: 0 },
            maximum_cell_voltage_position: CellPosition { module: 0, cell: 0 },
            nr_valid_cell_voltages: 0,
            average_temperature_ddegc: 0.0,
            minimum_temperature_ddegc: i16::MAX,
            maximum_temperature_ddegc: i16::MIN,
            minimum_temperature_position: CellPosition { module: 0, cell: 0 },
            maximum_temperature_position: CellPosition { module: 0, cell: 0 },
            nr_valid_temperatures: 0,
        }
    }

    /// Reset the voltage field set to its sentinels
    pub fn reset_voltages(&mut self) {
        let fresh = Self::new();
        self.average_cell_voltage_mv = fresh.average_cell_voltage_mv;
        self.minimum_cell_voltage_mv = fresh.minimum_cell_voltage_mv;
        self.maximum_cell_voltage_mv = fresh.maximum_cell_voltage_mv;
        self.minimum_cell_voltage_position = fresh.minimum_cell_voltage_position;
        self.maximum_cell_voltage_position = fresh.maximum_cell_voltage_position;
        self.nr_valid_cell_voltages = fresh.nr_valid_cell_voltages;
    }

    /// Reset the temperature field set to its sentinels
    pub fn reset_temperatures(&mut self) {
        let fresh = Self::new();
        self.average_temperature_ddegc = fresh.average_temperature_ddegc;
        self.minimum_temperature_ddegc = fresh.minimum_temperature_ddegc;
        self.maximum_temperature_ddegc = fresh.maximum_temperature_ddegc;
        self.minimum_temperature_position = fresh.minimum_temperature_position;
        self.maximum_temperature_position = fresh.maximum_temperature_position;
        self.nr_valid_temperatures = fresh.nr_valid_temperatures;
    }
}

impl Default for StringMinMax {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-string minimum, maximum and average of voltages and temperatures
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxTable {
    /// Store header
    pub header: MeasurementHeader,
    /// One entry per string
    pub strings: [StringMinMax; NR_OF_STRINGS],
}

impl MinMaxTable {
    /// Table with every string at its sentinels
    pub const fn new() -> Self {
        Self {
            header: MeasurementHeader::new(TableId::MinMax),
            strings: [StringMinMax::new(); NR_OF_STRINGS],
        }
    }
}

impl Default for MinMaxTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw readings of the per-string current sensors
///
/// Each quantity has its own timestamps because the sensor reports current,
/// power and high voltages in separate messages.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSensorTable {
    /// Store header
    pub header: MeasurementHeader,
    /// String current in mA
    pub current_ma: [i32; NR_OF_STRINGS],
    /// Sensor reported the current measurement as faulty
    pub invalid_current_measurement: [bool; NR_OF_STRINGS],
    /// Tick of the last current update
    pub timestamp_current: [Tick; NR_OF_STRINGS],
    /// Tick of the update before the last one
    pub previous_timestamp_current: [Tick; NR_OF_STRINGS],
    /// String power in W
    pub power_w: [i32; NR_OF_STRINGS],
    /// Sensor reported the power measurement as faulty
    pub invalid_power_measurement: [bool; NR_OF_STRINGS],
    /// Tick of the last power update
    pub timestamp_power: [Tick; NR_OF_STRINGS],
    /// Tick of the power update before the last one
    pub previous_timestamp_power: [Tick; NR_OF_STRINGS],
    /// High-voltage inputs in mV
    pub high_voltage_mv: [[i32; NR_OF_HIGH_VOLTAGE_INPUTS]; NR_OF_STRINGS],
    /// Sensor reported the high-voltage input as faulty
    pub invalid_high_voltage_measurement: [[bool; NR_OF_HIGH_VOLTAGE_INPUTS]; NR_OF_STRINGS],
    /// Tick of the last high-voltage update
    pub timestamp_high_voltage: [[Tick; NR_OF_HIGH_VOLTAGE_INPUTS]; NR_OF_STRINGS],
    /// Tick of the high-voltage update before the last one
    pub previous_timestamp_high_voltage: [[Tick; NR_OF_HIGH_VOLTAGE_INPUTS]; NR_OF_STRINGS],
}

impl CurrentSensorTable {
    /// Table with nothing measured yet
    pub const fn new() -> Self {
        Self {
            header: MeasurementHeader::new(TableId::CurrentSensor),
            current_ma: [0; NR_OF_STRINGS],
            invalid_current_measurement: [true; NR_OF_STRINGS],
            timestamp_current: [0; NR_OF_STRINGS],
            previous_timestamp_current: [0; NR_OF_STRINGS],
            power_w: [0; NR_OF_STRINGS],
            invalid_power_measurement: [true; NR_OF_STRINGS],
            timestamp_power: [0; NR_OF_STRINGS],
            previous_timestamp_power: [0; NR_OF_STRINGS],
            high_voltage_mv: [[0; NR_OF_HIGH_VOLTAGE_INPUTS]; NR_OF_STRINGS],
            invalid_high_voltage_measurement: [[true; NR_OF_HIGH_VOLTAGE_INPUTS]; NR_OF_STRINGS],
            timestamp_high_voltage: [[0; NR_OF_HIGH_VOLTAGE_INPUTS]; NR_OF_STRINGS],
            previous_timestamp_high_voltage: [[0; NR_OF_HIGH_VOLTAGE_INPUTS]; NR_OF_STRINGS],
        }
    }
}

impl Default for CurrentSensorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated string and pack values
#[derive(Debug, Clone, PartialEq)]
pub struct PackValuesTable {
    /// Store header
    pub header: MeasurementHeader,
    /// String current in mA
    pub string_current_ma: [i32; NR_OF_STRINGS],
    /// String current must not be trusted
    pub invalid_string_current: [bool; NR_OF_STRINGS],
    /// String voltage in mV
    pub string_voltage_mv: [i32; NR_OF_STRINGS],
    /// String voltage must not be trusted
    pub invalid_string_voltage: [bool; NR_OF_STRINGS],
    /// String power in W
    pub string_power_w: [i32; NR_OF_STRINGS],
    /// String power must not be trusted
    pub invalid_string_power: [bool; NR_OF_STRINGS],
    /// Battery (pack) voltage in mV
    pub battery_voltage_mv: i32,
    /// Battery voltage must not be trusted
    pub invalid_battery_voltage: bool,
    /// High-voltage bus voltage in mV
    pub high_voltage_bus_voltage_mv: i32,
    /// Bus voltage must not be trusted
    pub invalid_high_voltage_bus_voltage: bool,
    /// Pack current in mA
    pub pack_current_ma: i32,
    /// Pack current must not be trusted
    pub invalid_pack_current: bool,
    /// Pack power in W
    pub pack_power_w: i32,
    /// Pack power must not be trusted
    pub invalid_pack_power: bool,
}

impl PackValuesTable {
    /// Table with every value invalid
    pub const fn new() -> Self {
        Self {
            header: MeasurementHeader::new(TableId::PackValues),
            string_current_ma: [0; NR_OF_STRINGS],
            invalid_string_current: [true; NR_OF_STRINGS],
            string_voltage_mv: [0; NR_OF_STRINGS],
            invalid_string_voltage: [true; NR_OF_STRINGS],
            string_power_w: [0; NR_OF_STRINGS],
            invalid_string_power: [true; NR_OF_STRINGS],
            battery_voltage_mv: 0,
            invalid_battery_voltage: true,
            high_voltage_bus_voltage_mv: 0,
            invalid_high_voltage_bus_voltage: true,
            pack_current_ma: 0,
            invalid_pack_current: true,
            pack_power_w: 0,
            invalid_pack_power: true,
        }
    }
}

impl Default for PackValuesTable {
    fn default() -> Self {
        Self::new()
    }
}
