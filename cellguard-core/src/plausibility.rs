//! Plausibility checks
//!
//! A plausibility check compares two readings of the same quantity and
//! decides whether they can be trusted. The redundancy core only relies on
//! the `Result` contract: `Ok` carries a usable value (or plain success),
//! `Err` means the readings disagree.
//!
//! [`TolerancePlausibility`] is the default policy: readings agree when
//! their absolute difference is within a fixed tolerance (inclusive).

use crate::constants::battery::{
    NR_OF_CELL_BLOCKS_PER_MODULE, NR_OF_MODULES_PER_STRING, NR_OF_STRINGS,
    NR_OF_TEMP_SENSORS_PER_MODULE,
};
use crate::constants::plausibility::{
    CELL_TEMPERATURE_SPREAD_TOLERANCE_DDEGC, CELL_TEMPERATURE_TOLERANCE_DDEGC,
    CELL_VOLTAGE_SPREAD_TOLERANCE_MV, CELL_VOLTAGE_TOLERANCE_MV, STRING_VOLTAGE_TOLERANCE_MV,
};
use crate::errors::{RedundancyError, RedundancyResult};
use crate::tables::{CellTemperatureTable, CellVoltageTable, MinMaxTable, StringMask};

/// Plausibility collaborator
pub trait Plausibility {
    /// Compare base and redundant cell voltage (mV), yielding the value to use
    fn check_cell_voltage(&self, base_mv: i16, redundant_mv: i16) -> RedundancyResult<i16>;

    /// Compare base and redundant cell temperature (deci-°C), yielding the value to use
    fn check_cell_temperature(&self, base_ddegc: i16, redundant_ddegc: i16) -> RedundancyResult<i16>;

    /// Compare the AFE string sum against the current sensor reading (mV)
    fn check_string_voltage(&self, afe_mv: i32, sensor_mv: i32) -> RedundancyResult<()>;

    /// Invalidate cell voltages too far from their string average
    ///
    /// Fails with the strings in which at least one cell was invalidated.
    fn check_voltage_spread(&self, table: &mut CellVoltageTable, min_max: &MinMaxTable) -> RedundancyResult<()>;

    /// Invalidate cell temperatures too far from their string average
    ///
    /// Fails with the strings in which at least one sensor was invalidated.
    fn check_temperature_spread(
        &self,
        table: &mut CellTemperatureTable,
        min_max: &MinMaxTable,
    ) -> RedundancyResult<()>;
}

/// Fixed-tolerance plausibility policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TolerancePlausibility {
    /// Allowed base/redundant cell voltage difference (mV)
    pub cell_voltage_tolerance_mv: i16,
    /// Allowed base/redundant temperature difference (deci-°C)
    pub cell_temperature_tolerance_ddegc: i16,
    /// Allowed AFE/current sensor string voltage difference (mV)
    pub string_voltage_tolerance_mv: i32,
    /// Allowed distance of a cell voltage from its string average (mV)
    pub cell_voltage_spread_tolerance_mv: i16,
    /// Allowed distance of a temperature from its string average (deci-°C)
    pub cell_temperature_spread_tolerance_ddegc: i16,
}

impl Default for TolerancePlausibility {
    fn default() -> Self {
        Self {
            cell_voltage_tolerance_mv: CELL_VOLTAGE_TOLERANCE_MV,
            cell_temperature_tolerance_ddegc: CELL_TEMPERATURE_TOLERANCE_DDEGC,
            string_voltage_tolerance_mv: STRING_VOLTAGE_TOLERANCE_MV,
            cell_voltage_spread_tolerance_mv: CELL_VOLTAGE_SPREAD_TOLERANCE_MV,
            cell_temperature_spread_tolerance_ddegc: CELL_TEMPERATURE_SPREAD_TOLERANCE_DDEGC,
        }
    }
}

fn within(a: i32, b: i32, tolerance: i32) -> bool {
    (a - b).abs() <= tolerance
}

fn implausible() -> RedundancyError {
    RedundancyError::PlausibilityFailed {
        strings: StringMask::empty(),
    }
}

impl Plausibility for TolerancePlausibility {
    fn check_cell_voltage(&self, base_mv: i16, redundant_mv: i16) -> RedundancyResult<i16> {
        if within(base_mv.into(), redundant_mv.into(), self.cell_voltage_tolerance_mv.into()) {
            Ok(base_mv)
        } else {
            Err(implausible())
        }
    }

    fn check_cell_temperature(&self, base_ddegc: i16, redundant_ddegc: i16) -> RedundancyResult<i16> {
        if within(
            base_ddegc.into(),
            redundant_ddegc.into(),
            self.cell_temperature_tolerance_ddegc.into(),
        ) {
            Ok(base_ddegc)
        } else {
            Err(implausible())
        }
    }

    fn check_string_voltage(&self, afe_mv: i32, sensor_mv: i32) -> RedundancyResult<()> {
        // i64 keeps extreme readings from overflowing the difference
        if (i64::from(afe_mv) - i64::from(sensor_mv)).abs() <= i64::from(self.string_voltage_tolerance_mv) {
            Ok(())
        } else {
            Err(implausible())
        }
    }

    fn check_voltage_spread(&self, table: &mut CellVoltageTable, min_max: &MinMaxTable) -> RedundancyResult<()> {
        let mut strings = StringMask::empty();

        for s in 0..NR_OF_STRINGS {
            let aggregate = &min_max.strings[s];
            if aggregate.nr_valid_cell_voltages == 0 {
                continue;
            }
            let average = i32::from(aggregate.average_cell_voltage_mv);

            for m in 0..NR_OF_MODULES_PER_STRING {
                for cb in 0..NR_OF_CELL_BLOCKS_PER_MODULE {
                    if table.invalid_cell_voltage[s][m][cb] {
                        continue;
                    }
                    let voltage = i32::from(table.cell_voltage_mv[s][m][cb]);
                    if !within(voltage, average, self.cell_voltage_spread_tolerance_mv.into()) {
                        table.invalid_cell_voltage[s][m][cb] = true;
                        strings.insert(s);
                    }
                }
            }
        }

        if strings.is_empty() {
            Ok(())
        } else {
            table.recompute_sums();
            Err(RedundancyError::PlausibilityFailed { strings })
        }
    }

    fn check_temperature_spread(
        &self,
        table: &mut CellTemperatureTable,
        min_max: &MinMaxTable,
    ) -> RedundancyResult<()> {
        let mut strings = StringMask::empty();
        let tolerance = f32::from(self.cell_temperature_spread_tolerance_ddegc);

        for s in 0..NR_OF_STRINGS {
            let aggregate = &min_max.strings[s];
            if aggregate.nr_valid_temperatures == 0 {
                continue;
            }
            let average = aggregate.average_temperature_ddegc;

            for m in 0..NR_OF_MODULES_PER_STRING {
                for ts in 0..NR_OF_TEMP_SENSORS_PER_MODULE {
                    if table.invalid_cell_temperature[s][m][ts] {
                        continue;
                    }
                    let deviation = f32::from(table.cell_temperature_ddegc[s][m][ts]) - average;
                    if deviation > tolerance || deviation < -tolerance {
                        table.invalid_cell_temperature[s][m][ts] = true;
                        strings.insert(s);
                    }
                }
            }
        }

        if strings.is_empty() {
            Ok(())
        } else {
            table.recompute_counts();
            Err(RedundancyError::PlausibilityFailed { strings })
        }
    }
}
