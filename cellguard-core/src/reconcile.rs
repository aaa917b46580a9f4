//! Per-cell reconciliation of base and redundant measurements
//!
//! ## Policy
//!
//! For one cell, the validated value follows from which sources are valid:
//!
//! ```text
//! base   redundant   validated value               invalid
//! ────   ─────────   ───────────────────────────   ───────────────────
//! ok     ok          plausibility-corrected value   plausibility failed
//! ok     --          base                           no
//! --     ok          redundant                      no
//! --     --          (base + redundant) / 2         yes
//! ```
//!
//! When both sources are invalid the average is kept as a numeric
//! placeholder instead of a sentinel. When the plausibility check fails the
//! base value is kept as placeholder.
//!
//! Reconciliation is pure: same inputs, same outputs.

use crate::constants::battery::{
    NR_OF_CELL_BLOCKS_PER_MODULE, NR_OF_MODULES_PER_STRING, NR_OF_STRINGS,
    NR_OF_TEMP_SENSORS_PER_MODULE,
};
use crate::errors::RedundancyResult;
use crate::plausibility::Plausibility;
use crate::tables::{CellTemperatureTable, CellVoltageTable, StringMask};

/// One reading and its validity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellReading {
    /// Measured or placeholder value
    pub value: i16,
    /// Value must not be trusted
    pub invalid: bool,
}

impl CellReading {
    /// Valid reading
    pub const fn valid(value: i16) -> Self {
        Self { value, invalid: false }
    }

    /// Invalid reading carrying `value` as placeholder
    pub const fn invalid(value: i16) -> Self {
        Self { value, invalid: true }
    }
}

/// Combine a base and a redundant reading of one cell
pub fn reconcile_cell<F>(base: CellReading, redundant: CellReading, check: F) -> CellReading
where
    F: FnOnce(i16, i16) -> RedundancyResult<i16>,
{
    match (base.invalid, redundant.invalid) {
        (false, false) => match check(base.value, redundant.value) {
            Ok(corrected) => CellReading::valid(corrected),
            Err(_) => CellReading::invalid(base.value),
        },
        (false, true) => CellReading::valid(base.value),
        (true, false) => CellReading::valid(redundant.value),
        (true, true) => {
            let average = (i32::from(base.value) + i32::from(redundant.value)) / 2;
            CellReading::invalid(average as i16)
        }
    }
}

/// Reconcile every cell voltage of `base` and `redundant` into `validated`
///
/// Recomputes valid counts and voltage sums of `validated`. Returns the
/// strings in which at least one cell failed its plausibility check; the
/// caller reports them once per string.
pub fn reconcile_cell_voltages<P: Plausibility + ?Sized>(
    base: &CellVoltageTable,
    redundant: &CellVoltageTable,
    validated: &mut CellVoltageTable,
    plausibility: &P,
) -> StringMask {
    let mut implausible = StringMask::empty();

    for s in 0..NR_OF_STRINGS {
        for m in 0..NR_OF_MODULES_PER_STRING {
            for cb in 0..NR_OF_CELL_BLOCKS_PER_MODULE {
                let base_reading = CellReading {
                    value: base.cell_voltage_mv[s][m][cb],
                    invalid: base.invalid_cell_voltage[s][m][cb],
                };
                let redundant_reading = CellReading {
                    value: redundant.cell_voltage_mv[s][m][cb],
                    invalid: redundant.invalid_cell_voltage[s][m][cb],
                };

                let mut plausibility_failed = false;
                let result = reconcile_cell(base_reading, redundant_reading, |b, r| {
                    let checked = plausibility.check_cell_voltage(b, r);
                    plausibility_failed = checked.is_err();
                    checked
                });
                if plausibility_failed {
                    implausible.insert(s);
                }

                validated.cell_voltage_mv[s][m][cb] = result.value;
                validated.invalid_cell_voltage[s][m][cb] = result.invalid;
            }
        }
    }

    validated.recompute_sums();
    implausible
}

/// Reconcile every cell temperature of `base` and `redundant` into `validated`
///
/// Recomputes valid counts of `validated`. Returns the strings in which at
/// least one sensor failed its plausibility check.
pub fn reconcile_cell_temperatures<P: Plausibility + ?Sized>(
    base: &CellTemperatureTable,
    redundant: &CellTemperatureTable,
    validated: &mut CellTemperatureTable,
    plausibility: &P,
) -> StringMask {
    let mut implausible = StringMask::empty();

    for s in 0..NR_OF_STRINGS {
        for m in 0..NR_OF_MODULES_PER_STRING {
            for ts in 0..NR_OF_TEMP_SENSORS_PER_MODULE {
                let base_reading = CellReading {
                    value: base.cell_temperature_ddegc[s][m][ts],
                    invalid: base.invalid_cell_temperature[s][m][ts],
                };
                let redundant_reading = CellReading {
                    value: redundant.cell_temperature_ddegc[s][m][ts],
                    invalid: redundant.invalid_cell_temperature[s][m][ts],
                };

                let mut plausibility_failed = false;
                let result = reconcile_cell(base_reading, redundant_reading, |b, r| {
                    let checked = plausibility.check_cell_temperature(b, r);
                    plausibility_failed = checked.is_err();
                    checked
                });
                if plausibility_failed {
                    implausible.insert(s);
                }

                validated.cell_temperature_ddegc[s][m][ts] = result.value;
                validated.invalid_cell_temperature[s][m][ts] = result.invalid;
            }
        }
    }

    validated.recompute_counts();
    implausible
}
