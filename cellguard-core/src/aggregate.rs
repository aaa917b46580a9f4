//! Minimum, maximum and average per string
//!
//! The aggregate of a string is rebuilt from scratch on every pass, never
//! updated incrementally, so an extreme that has since become invalid
//! cannot survive.
//!
//! ## Scan Order and Ties
//!
//! Cells are scanned module-major, cell-minor. Extremes are replaced only on
//! a strict `<` / `>`, so on a tie the earliest scanned position wins.
//!
//! ## Empty Strings
//!
//! A string without valid entries keeps its sentinels (minimum at the
//! type's maximum, maximum at the type's minimum), gets an average of 0,
//! and is reported in [`RedundancyError::NoValidContributors`]. The other
//! strings are still aggregated.

use crate::constants::battery::{
    NR_OF_CELL_BLOCKS_PER_MODULE, NR_OF_MODULES_PER_STRING, NR_OF_STRINGS,
    NR_OF_TEMP_SENSORS_PER_MODULE,
};
use crate::errors::{RedundancyError, RedundancyResult};
use crate::tables::{CellPosition, CellTemperatureTable, CellVoltageTable, MinMaxTable, StringMask};

/// Rebuild the voltage fields of `min_max` from `table`
///
/// The average is the integer-truncated mean in mV.
pub fn compute_voltage_min_max_average(
    table: &CellVoltageTable,
    min_max: &mut MinMaxTable,
) -> RedundancyResult<()> {
    let mut failed = StringMask::empty();

    for s in 0..NR_OF_STRINGS {
        let aggregate = &mut min_max.strings[s];
        aggregate.reset_voltages();

        let mut sum = 0i32;
        let mut count = 0u16;

        for m in 0..NR_OF_MODULES_PER_STRING {
            for cb in 0..NR_OF_CELL_BLOCKS_PER_MODULE {
                if table.invalid_cell_voltage[s][m][cb] {
                    continue;
                }
                let voltage = table.cell_voltage_mv[s][m][cb];
                sum += i32::from(voltage);
                count += 1;

                if voltage < aggregate.minimum_cell_voltage_mv {
                    aggregate.minimum_cell_voltage_mv = voltage;
                    aggregate.minimum_cell_voltage_position = CellPosition::new(m, cb);
                }
                if voltage > aggregate.maximum_cell_voltage_mv {
                    aggregate.maximum_cell_voltage_mv = voltage;
                    aggregate.maximum_cell_voltage_position = CellPosition::new(m, cb);
                }
            }
        }

        aggregate.nr_valid_cell_voltages = count;
        if count > 0 {
            aggregate.average_cell_voltage_mv = (sum / i32::from(count)) as i16;
        } else {
            aggregate.average_cell_voltage_mv = 0;
            failed.insert(s);
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        log_warn!("no valid cell voltages in strings {:#05b}", failed.bits());
        Err(RedundancyError::NoValidContributors { strings: failed })
    }
}

/// Rebuild the temperature fields of `min_max` from `table`
///
/// The average is accumulated and divided in floating point.
pub fn compute_temperature_min_max_average(
    table: &CellTemperatureTable,
    min_max: &mut MinMaxTable,
) -> RedundancyResult<()> {
    let mut failed = StringMask::empty();

    for s in 0..NR_OF_STRINGS {
        let aggregate = &mut min_max.strings[s];
        aggregate.reset_temperatures();

        let mut sum = 0.0f32;
        let mut count = 0u16;

        for m in 0..NR_OF_MODULES_PER_STRING {
            for ts in 0..NR_OF_TEMP_SENSORS_PER_MODULE {
                if table.invalid_cell_temperature[s][m][ts] {
                    continue;
                }
                let temperature = table.cell_temperature_ddegc[s][m][ts];
                sum += f32::from(temperature);
                count += 1;

                if temperature < aggregate.minimum_temperature_ddegc {
                    aggregate.minimum_temperature_ddegc = temperature;
                    aggregate.minimum_temperature_position = CellPosition::new(m, ts);
                }
                if temperature > aggregate.maximum_temperature_ddegc {
                    aggregate.maximum_temperature_ddegc = temperature;
                    aggregate.maximum_temperature_position = CellPosition::new(m, ts);
                }
            }
        }

        aggregate.nr_valid_temperatures = count;
        if count > 0 {
            aggregate.average_temperature_ddegc = sum / f32::from(count);
        } else {
            aggregate.average_temperature_ddegc = 0.0;
            failed.insert(s);
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        log_warn!("no valid cell temperatures in strings {:#05b}", failed.bits());
        Err(RedundancyError::NoValidContributors { strings: failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TableId;

    fn set_voltage(table: &mut CellVoltageTable, s: usize, m: usize, cb: usize, mv: i16) {
        table.cell_voltage_mv[s][m][cb] = mv;
        table.invalid_cell_voltage[s][m][cb] = false;
    }

    /// Every string gets one valid cell so only the string under test matters
    fn voltage_table_with_filler() -> CellVoltageTable {
        let mut table = CellVoltageTable::new(TableId::CellVoltage);
        for s in 0..NR_OF_STRINGS {
            set_voltage(&mut table, s, NR_OF_MODULES_PER_STRING - 1, NR_OF_CELL_BLOCKS_PER_MODULE - 1, 3500);
        }
        table
    }

    #[test]
    fn skips_invalid_entries() {
        let mut table = CellVoltageTable::new(TableId::CellVoltage);
        // [5, invalid, 3, 9, invalid] in string 0
        set_voltage(&mut table, 0, 0, 0, 5);
        table.cell_voltage_mv[0][0][1] = -100;
        set_voltage(&mut table, 0, 0, 2, 3);
        set_voltage(&mut table, 0, 0, 3, 9);
        table.cell_voltage_mv[0][0][4] = 20000;
        for s in 1..NR_OF_STRINGS {
            set_voltage(&mut table, s, 0, 0, 3700);
        }

        let mut min_max = MinMaxTable::new();
        assert_eq!(compute_voltage_min_max_average(&table, &mut min_max), Ok(()));

        let string = &min_max.strings[0];
        assert_eq!(string.minimum_cell_voltage_mv, 3);
        assert_eq!(string.minimum_cell_voltage_position, CellPosition::new(0, 2));
        assert_eq!(string.maximum_cell_voltage_mv, 9);
        assert_eq!(string.maximum_cell_voltage_position, CellPosition::new(0, 3));
        assert_eq!(string.average_cell_voltage_mv, 5);
        assert_eq!(string.nr_valid_cell_voltages, 3);
    }

    #[test]
    fn integer_average_truncates() {
        let mut table = CellVoltageTable::new(TableId::CellVoltage);
        for s in 0..NR_OF_STRINGS {
            set_voltage(&mut table, s, 0, 0, 3700);
            set_voltage(&mut table, s, 0, 1, 3701);
        }

        let mut min_max = MinMaxTable::new();
        compute_voltage_min_max_average(&table, &mut min_max).unwrap();
        assert_eq!(min_max.strings[0].average_cell_voltage_mv, 3700);
    }

    #[test]
    fn all_invalid_string_fails_but_others_complete() {
        let mut table = CellVoltageTable::new(TableId::CellVoltage);
        set_voltage(&mut table, 0, 1, 1, 3600);
        set_voltage(&mut table, 2, 0, 0, 3800);

        let mut min_max = MinMaxTable::new();
        let result = compute_voltage_min_max_average(&table, &mut min_max);

        let mut expected = StringMask::empty();
        expected.insert(1);
        assert_eq!(result, Err(RedundancyError::NoValidContributors { strings: expected }));

        let empty = &min_max.strings[1];
        assert_eq!(empty.average_cell_voltage_mv, 0);
        assert_eq!(empty.minimum_cell_voltage_mv, i16::MAX);
        assert_eq!(empty.maximum_cell_voltage_mv, i16::MIN);
        assert_eq!(empty.nr_valid_cell_voltages, 0);

        assert_eq!(min_max.strings[0].average_cell_voltage_mv, 3600);
        assert_eq!(min_max.strings[2].maximum_cell_voltage_mv, 3800);
    }

    #[test]
    fn ties_keep_earliest_position() {
        let mut table = voltage_table_with_filler();
        set_voltage(&mut table, 1, 0, 4, 3000);
        set_voltage(&mut table, 1, 2, 0, 3000);
        set_voltage(&mut table, 1, 0, 5, 4000);
        set_voltage(&mut table, 1, 1, 0, 4000);

        let mut min_max = MinMaxTable::new();
        compute_voltage_min_max_average(&table, &mut min_max).unwrap();

        assert_eq!(min_max.strings[1].minimum_cell_voltage_position, CellPosition::new(0, 4));
        assert_eq!(min_max.strings[1].maximum_cell_voltage_position, CellPosition::new(0, 5));
    }

    #[test]
    fn rebuild_drops_stale_extremes() {
        let mut table = voltage_table_with_filler();
        set_voltage(&mut table, 0, 0, 0, 4200);

        let mut min_max = MinMaxTable::new();
        compute_voltage_min_max_average(&table, &mut min_max).unwrap();
        assert_eq!(min_max.strings[0].maximum_cell_voltage_mv, 4200);

        table.invalid_cell_voltage[0][0][0] = true;
        compute_voltage_min_max_average(&table, &mut min_max).unwrap();
        assert_eq!(min_max.strings[0].maximum_cell_voltage_mv, 3500);
        assert_eq!(min_max.strings[0].nr_valid_cell_voltages, 1);
    }

    #[test]
    fn temperature_average_is_fractional() {
        let mut table = CellTemperatureTable::new(TableId::CellTemperature);
        for s in 0..NR_OF_STRINGS {
            table.cell_temperature_ddegc[s][0][0] = 250;
            table.invalid_cell_temperature[s][0][0] = false;
            table.cell_temperature_ddegc[s][3][2] = 251;
            table.invalid_cell_temperature[s][3][2] = false;
        }

        let mut min_max = MinMaxTable::new();
        // Voltage fields are left alone by the temperature pass
        min_max.strings[0].average_cell_voltage_mv = 3700;
        assert_eq!(compute_temperature_min_max_average(&table, &mut min_max), Ok(()));

        let string = &min_max.strings[0];
        assert_eq!(string.average_temperature_ddegc, 250.5);
        assert_eq!(string.minimum_temperature_position, CellPosition::new(0, 0));
        assert_eq!(string.maximum_temperature_position, CellPosition::new(3, 2));
        assert_eq!(string.nr_valid_temperatures, 2);
        assert_eq!(string.average_cell_voltage_mv, 3700);
    }

    #[test]
    fn temperature_without_valid_sensors() {
        let table = CellTemperatureTable::new(TableId::CellTemperature);
        let mut min_max = MinMaxTable::new();
        assert_eq!(
            compute_temperature_min_max_average(&table, &mut min_max),
            Err(RedundancyError::NoValidContributors { strings: StringMask::all() })
        );
        assert_eq!(min_max.strings[2].average_temperature_ddegc, 0.0);
    }
}
