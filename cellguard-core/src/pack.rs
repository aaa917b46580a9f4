//! Pack-level validators
//!
//! Validates string and pack values from the current sensors and the
//! validated cell voltages. The validators run once per cycle in a fixed
//! order, because later ones read flags written by earlier ones:
//!
//! ```text
//! current ─► string voltage ─► battery voltage ─► bus voltage ─► power
//!    │              │                                              ▲
//!    └──────────────┴─────── validity flags (same cycle) ──────────┘
//! ```
//!
//! ## Sums over strings
//!
//! Pack current and pack power add up every string's value, valid or not;
//! the pack flag is invalid as soon as one contributor is invalid. Under
//! that flag the sum is advisory only.

use crate::config::RedundancyConfig;
use crate::constants::battery::{
    BUS_VOLTAGE_INPUT, NR_OF_CELL_BLOCKS_PER_STRING, NR_OF_STRINGS, STRING_VOLTAGE_INPUT,
};
use crate::diagnostics::{DiagnosticEvent, DiagnosticId, DiagnosticScope, Diagnostics};
use crate::plausibility::Plausibility;
use crate::tables::{CellVoltageTable, CurrentSensorTable, MinMaxTable, PackValuesTable};
use crate::time::{check_freshness, is_fresh, Tick};
use crate::topology::Topology;

/// Battery voltage reported when no string contributes
pub const BATTERY_VOLTAGE_SENTINEL_MV: i32 = i32::MAX;

/// Last accepted current sensor timestamps
///
/// Used only to tell a new sample from one already consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackState {
    /// Timestamp of the last accepted string current
    pub current_timestamp: [Tick; NR_OF_STRINGS],
    /// Timestamp of the last accepted string power
    pub power_timestamp: [Tick; NR_OF_STRINGS],
}

impl PackState {
    /// Nothing accepted yet
    pub const fn new() -> Self {
        Self {
            current_timestamp: [0; NR_OF_STRINGS],
            power_timestamp: [0; NR_OF_STRINGS],
        }
    }
}

fn string_scope(s: usize) -> DiagnosticScope {
    DiagnosticScope::String(s as u8)
}

/// Validate string currents and sum them into the pack current
pub fn validate_current<D: Diagnostics + ?Sized>(
    config: &RedundancyConfig,
    now: Tick,
    sensor: &CurrentSensorTable,
    state: &mut PackState,
    pack: &mut PackValuesTable,
    diagnostics: &mut D,
) {
    for s in 0..NR_OF_STRINGS {
        let freshness = check_freshness(
            sensor.timestamp_current[s],
            sensor.previous_timestamp_current[s],
            now,
            config.current_measurement_timeout,
        );
        diagnostics.report(
            DiagnosticId::CurrentMeasurementTimeout,
            DiagnosticEvent::from_ok(freshness.is_ok()),
            string_scope(s),
        );

        if let Err(_err) = freshness {
            log_warn!("string {} current: {}", s, _err);
            pack.invalid_string_current[s] = true;
            continue;
        }

        diagnostics.report(
            DiagnosticId::CurrentMeasurementError,
            DiagnosticEvent::from_ok(!sensor.invalid_current_measurement[s]),
            string_scope(s),
        );
        if sensor.invalid_current_measurement[s] {
            pack.invalid_string_current[s] = true;
        } else if state.current_timestamp[s] != sensor.timestamp_current[s] {
            pack.string_current_ma[s] = sensor.current_ma[s];
            pack.invalid_string_current[s] = false;
            state.current_timestamp[s] = sensor.timestamp_current[s];
        }
    }

    pack.pack_current_ma = pack
        .string_current_ma
        .iter()
        .fold(0i32, |sum, current| sum.saturating_add(*current));
    pack.invalid_pack_current = pack.invalid_string_current.iter().any(|invalid| *invalid);
}

/// Validate string voltages
///
/// Per string, in priority order:
/// 1. fresh and valid current sensor reading
/// 2. AFE sum, if every cell voltage of the string is valid
/// 3. AFE sum of valid cells plus the string average for each invalid
///    cell; invalid if more cells are missing than the configured allowance
///
/// Whenever the sensor reading and an AFE-based value are both usable they
/// are cross-checked, whichever one is stored.
#[allow(clippy::too_many_arguments)]
pub fn validate_string_voltage<P, D>(
    config: &RedundancyConfig,
    now: Tick,
    sensor: &CurrentSensorTable,
    cell_voltages: &CellVoltageTable,
    min_max: &MinMaxTable,
    pack: &mut PackValuesTable,
    plausibility: &P,
    diagnostics: &mut D,
) where
    P: Plausibility + ?Sized,
    D: Diagnostics + ?Sized,
{
    for s in 0..NR_OF_STRINGS {
        let sensor_fresh = is_fresh(
            sensor.timestamp_high_voltage[s][STRING_VOLTAGE_INPUT],
            sensor.previous_timestamp_high_voltage[s][STRING_VOLTAGE_INPUT],
            now,
            config.current_sensor_measurement_timeout,
        );
        diagnostics.report(
            DiagnosticId::CurrentSensorVoltageTimeout,
            DiagnosticEvent::from_ok(sensor_fresh),
            string_scope(s),
        );
        let sensor_usable =
            sensor_fresh && !sensor.invalid_high_voltage_measurement[s][STRING_VOLTAGE_INPUT];
        let sensor_mv = sensor.high_voltage_mv[s][STRING_VOLTAGE_INPUT];

        let nr_valid = usize::from(cell_voltages.nr_valid_cell_voltages[s]);
        let nr_invalid = NR_OF_CELL_BLOCKS_PER_STRING.saturating_sub(nr_valid);
        let afe_complete = nr_invalid == 0;
        let afe_usable = nr_invalid <= config.allowed_invalid_cell_voltages;
        let afe_mv = if afe_complete {
            cell_voltages.string_voltage_mv[s]
        } else {
            let average = i32::from(min_max.strings[s].average_cell_voltage_mv);
            cell_voltages.string_voltage_mv[s] + nr_invalid as i32 * average
        };

        if sensor_usable && afe_usable {
            let check = plausibility.check_string_voltage(afe_mv, sensor_mv);
            if check.is_err() {
                log_warn!("string {} voltage: AFE {} mV vs sensor {} mV", s, afe_mv, sensor_mv);
            }
            diagnostics.report(
                DiagnosticId::PlausibilityPackVoltage,
                DiagnosticEvent::from_ok(check.is_ok()),
                string_scope(s),
            );
        }

        if sensor_usable {
            pack.string_voltage_mv[s] = sensor_mv;
            pack.invalid_string_voltage[s] = false;
        } else if afe_complete {
            pack.string_voltage_mv[s] = afe_mv;
            pack.invalid_string_voltage[s] = false;
        } else {
            log_debug!("string {} voltage estimated with {} invalid cells", s, nr_invalid);
            pack.string_voltage_mv[s] = afe_mv;
            pack.invalid_string_voltage[s] = !afe_usable;
        }
    }
}

/// Average the valid string voltages into the battery voltage
///
/// Only connected strings count; if no string is connected, every valid
/// string counts. Without any contributor the voltage is set to
/// [`BATTERY_VOLTAGE_SENTINEL_MV`] and flagged invalid.
pub fn validate_battery_voltage<T: Topology + ?Sized>(pack: &mut PackValuesTable, topology: &T) {
    let any_connected = topology.connected_strings() > 0;

    let mut sum = 0i64;
    let mut count = 0i64;
    for s in 0..NR_OF_STRINGS {
        let contributes = !any_connected || topology.is_string_closed(s);
        if contributes && !pack.invalid_string_voltage[s] {
            sum += i64::from(pack.string_voltage_mv[s]);
            count += 1;
        }
    }

    if count > 0 {
        pack.battery_voltage_mv = (sum / count) as i32;
        pack.invalid_battery_voltage = false;
    } else {
        pack.battery_voltage_mv = BATTERY_VOLTAGE_SENTINEL_MV;
        pack.invalid_battery_voltage = true;
    }
}

/// Average the bus voltage seen by closed or precharging strings
///
/// Without a qualifying string the previous value is kept and flagged
/// invalid.
pub fn validate_bus_voltage<T: Topology + ?Sized>(
    config: &RedundancyConfig,
    now: Tick,
    sensor: &CurrentSensorTable,
    pack: &mut PackValuesTable,
    topology: &T,
) {
    let mut sum = 0i64;
    let mut count = 0i64;
    for s in 0..NR_OF_STRINGS {
        let on_bus = topology.is_string_closed(s) || topology.is_string_precharging(s);
        let fresh = is_fresh(
            sensor.timestamp_high_voltage[s][BUS_VOLTAGE_INPUT],
            sensor.previous_timestamp_high_voltage[s][BUS_VOLTAGE_INPUT],
            now,
            config.current_sensor_measurement_timeout,
        );
        if on_bus && fresh && !sensor.invalid_high_voltage_measurement[s][BUS_VOLTAGE_INPUT] {
            sum += i64::from(sensor.high_voltage_mv[s][BUS_VOLTAGE_INPUT]);
            count += 1;
        }
    }

    if count > 0 {
        pack.high_voltage_bus_voltage_mv = (sum / count) as i32;
        pack.invalid_high_voltage_bus_voltage = false;
    } else {
        pack.invalid_high_voltage_bus_voltage = true;
    }
}

/// String power from validated current and voltage, in W
pub fn calculate_power_w(current_ma: i32, voltage_mv: i32) -> i32 {
    (i64::from(current_ma) * i64::from(voltage_mv) / 1_000_000) as i32
}

/// Validate string powers and sum them into the pack power
///
/// A fresh, valid, new sensor reading is taken as is. A stale or faulty
/// reading is replaced by current × voltage of the same cycle, provided both
/// are valid; otherwise the string power is invalid.
pub fn validate_power<D: Diagnostics + ?Sized>(
    config: &RedundancyConfig,
    now: Tick,
    sensor: &CurrentSensorTable,
    state: &mut PackState,
    pack: &mut PackValuesTable,
    diagnostics: &mut D,
) {
    for s in 0..NR_OF_STRINGS {
        let fresh = is_fresh(
            sensor.timestamp_power[s],
            sensor.previous_timestamp_power[s],
            now,
            config.current_sensor_measurement_timeout,
        );
        diagnostics.report(
            DiagnosticId::CurrentSensorPowerTimeout,
            DiagnosticEvent::from_ok(fresh),
            string_scope(s),
        );

        if fresh && !sensor.invalid_power_measurement[s] {
            if state.power_timestamp[s] != sensor.timestamp_power[s] {
                pack.string_power_w[s] = sensor.power_w[s];
                pack.invalid_string_power[s] = false;
                state.power_timestamp[s] = sensor.timestamp_power[s];
            }
        } else if !pack.invalid_string_current[s] && !pack.invalid_string_voltage[s] {
            pack.string_power_w[s] =
                calculate_power_w(pack.string_current_ma[s], pack.string_voltage_mv[s]);
            pack.invalid_string_power[s] = false;
        } else {
            pack.invalid_string_power[s] = true;
        }
    }

    pack.pack_power_w = pack
        .string_power_w
        .iter()
        .fold(0i32, |sum, power| sum.saturating_add(*power));
    pack.invalid_pack_power = pack.invalid_string_power.iter().any(|invalid| *invalid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticLog, NoDiagnostics};
    use crate::plausibility::TolerancePlausibility;
    use crate::tables::{StringMask, TableId};
    use crate::topology::FixedTopology;

    const NOW: Tick = 1000;

    fn sensor_with_currents(currents: [i32; NR_OF_STRINGS], timestamp: Tick) -> CurrentSensorTable {
        let mut sensor = CurrentSensorTable::new();
        for s in 0..NR_OF_STRINGS {
            sensor.current_ma[s] = currents[s];
            sensor.invalid_current_measurement[s] = false;
            sensor.timestamp_current[s] = timestamp;
            sensor.previous_timestamp_current[s] = timestamp - 100;
        }
        sensor
    }

    fn set_sensor_voltage(sensor: &mut CurrentSensorTable, s: usize, input: usize, mv: i32, timestamp: Tick) {
        sensor.high_voltage_mv[s][input] = mv;
        sensor.invalid_high_voltage_measurement[s][input] = false;
        sensor.timestamp_high_voltage[s][input] = timestamp;
        sensor.previous_timestamp_high_voltage[s][input] = timestamp - 100;
    }

    fn full_string(voltages: &mut CellVoltageTable, s: usize, mv: i16) {
        for m in voltages.invalid_cell_voltage[s].iter_mut() {
            for invalid in m.iter_mut() {
                *invalid = false;
            }
        }
        for m in voltages.cell_voltage_mv[s].iter_mut() {
            for voltage in m.iter_mut() {
                *voltage = mv;
            }
        }
        voltages.recompute_sums();
    }

    fn mask(strings: &[usize]) -> StringMask {
        let mut mask = StringMask::empty();
        for s in strings {
            mask.insert(*s);
        }
        mask
    }

    #[test]
    fn current_accepts_fresh_samples_once() {
        let config = RedundancyConfig::default();
        let sensor = sensor_with_currents([1000, 1500, 2000], 900);
        let mut state = PackState::new();
        let mut pack = PackValuesTable::new();

        validate_current(&config, NOW, &sensor, &mut state, &mut pack, &mut NoDiagnostics);

        assert_eq!(pack.string_current_ma, [1000, 1500, 2000]);
        assert_eq!(pack.invalid_string_current, [false; NR_OF_STRINGS]);
        assert_eq!(pack.pack_current_ma, 4500);
        assert!(!pack.invalid_pack_current);
        assert_eq!(state.current_timestamp, [900; NR_OF_STRINGS]);

        // Same timestamp, new value: not a new sample
        let mut unchanged = sensor.clone();
        unchanged.current_ma[0] = 7777;
        validate_current(&config, NOW + 10, &unchanged, &mut state, &mut pack, &mut NoDiagnostics);
        assert_eq!(pack.string_current_ma[0], 1000);
    }

    #[test]
    fn faulty_string_current_invalidates_pack_but_still_sums() {
        let config = RedundancyConfig::default();
        let mut sensor = sensor_with_currents([1000, 1200, 2000], 900);
        let mut state = PackState::new();
        let mut pack = PackValuesTable::new();
        validate_current(&config, NOW, &sensor, &mut state, &mut pack, &mut NoDiagnostics);

        sensor.timestamp_current = [1100; NR_OF_STRINGS];
        sensor.previous_timestamp_current = [900; NR_OF_STRINGS];
        sensor.invalid_current_measurement[1] = true;
        sensor.current_ma[1] = -5;
        let mut log = DiagnosticLog::<16>::new();
        validate_current(&config, NOW + 200, &sensor, &mut state, &mut pack, &mut log);

        assert!(pack.invalid_string_current[1]);
        assert!(pack.invalid_pack_current);
        // Last known value of the faulty string stays in the sum
        assert_eq!(pack.pack_current_ma, 1000 + 1200 + 2000);
        assert!(log.contains(
            DiagnosticId::CurrentMeasurementError,
            DiagnosticEvent::NotOk,
            DiagnosticScope::String(1)
        ));
    }

    #[test]
    fn stale_current_is_invalid() {
        let config = RedundancyConfig::default();
        let sensor = sensor_with_currents([1000, 1000, 1000], 100);
        let mut state = PackState::new();
        let mut pack = PackValuesTable::new();
        let mut log = DiagnosticLog::<16>::new();

        validate_current(&config, NOW, &sensor, &mut state, &mut pack, &mut log);

        assert_eq!(pack.invalid_string_current, [true; NR_OF_STRINGS]);
        assert!(pack.invalid_pack_current);
        assert_eq!(log.count_not_ok(DiagnosticId::CurrentMeasurementTimeout), NR_OF_STRINGS);
    }

    #[test]
    fn never_updated_current_is_invalid() {
        let config = RedundancyConfig::default();
        let sensor = CurrentSensorTable::new();
        let mut state = PackState::new();
        let mut pack = PackValuesTable::new();

        validate_current(&config, NOW, &sensor, &mut state, &mut pack, &mut NoDiagnostics);
        assert!(pack.invalid_pack_current);
    }

    #[test]
    fn string_voltage_prefers_current_sensor() {
        let config = RedundancyConfig::default();
        let mut sensor = CurrentSensorTable::new();
        set_sensor_voltage(&mut sensor, 0, STRING_VOLTAGE_INPUT, 88_900, 950);
        let mut voltages = CellVoltageTable::new(TableId::CellVoltage);
        full_string(&mut voltages, 0, 3700);
        let min_max = MinMaxTable::new();
        let mut pack = PackValuesTable::new();
        let mut log = DiagnosticLog::<16>::new();

        validate_string_voltage(
            &config, NOW, &sensor, &voltages, &min_max, &mut pack,
            &TolerancePlausibility::default(), &mut log,
        );

        assert_eq!(pack.string_voltage_mv[0], 88_900);
        assert!(!pack.invalid_string_voltage[0]);
        assert!(log.contains(
            DiagnosticId::PlausibilityPackVoltage,
            DiagnosticEvent::Ok,
            DiagnosticScope::String(0)
        ));
    }

    #[test]
    fn string_voltage_falls_back_to_complete_afe_sum() {
        let config = RedundancyConfig::default();
        let sensor = CurrentSensorTable::new();
        let mut voltages = CellVoltageTable::new(TableId::CellVoltage);
        full_string(&mut voltages, 1, 3600);
        let min_max = MinMaxTable::new();
        let mut pack = PackValuesTable::new();

        validate_string_voltage(
            &config, NOW, &sensor, &voltages, &min_max, &mut pack,
            &TolerancePlausibility::default(), &mut NoDiagnostics,
        );

        assert_eq!(pack.string_voltage_mv[1], 3600 * NR_OF_CELL_BLOCKS_PER_STRING as i32);
        assert!(!pack.invalid_string_voltage[1]);
        // Nothing at all for string 2
        assert!(pack.invalid_string_voltage[2]);
    }

    #[test]
    fn string_voltage_estimate_respects_allowance() {
        let mut voltages = CellVoltageTable::new(TableId::CellVoltage);
        full_string(&mut voltages, 0, 3700);
        voltages.invalid_cell_voltage[0][1][1] = true;
        voltages.invalid_cell_voltage[0][2][2] = true;
        voltages.recompute_sums();
        let mut min_max = MinMaxTable::new();
        min_max.strings[0].average_cell_voltage_mv = 3700;
        let sensor = CurrentSensorTable::new();
        let expected = 3700 * NR_OF_CELL_BLOCKS_PER_STRING as i32;

        let mut pack = PackValuesTable::new();
        let lenient = RedundancyConfig::default().with_allowed_invalid_cell_voltages(2);
        validate_string_voltage(
            &lenient, NOW, &sensor, &voltages, &min_max, &mut pack,
            &TolerancePlausibility::default(), &mut NoDiagnostics,
        );
        assert_eq!(pack.string_voltage_mv[0], expected);
        assert!(!pack.invalid_string_voltage[0]);

        let strict = RedundancyConfig::default().with_allowed_invalid_cell_voltages(1);
        validate_string_voltage(
            &strict, NOW, &sensor, &voltages, &min_max, &mut pack,
            &TolerancePlausibility::default(), &mut NoDiagnostics,
        );
        assert_eq!(pack.string_voltage_mv[0], expected);
        assert!(pack.invalid_string_voltage[0]);
    }

    #[test]
    fn implausible_string_voltage_is_reported_but_sensor_kept() {
        let config = RedundancyConfig::default();
        let mut sensor = CurrentSensorTable::new();
        set_sensor_voltage(&mut sensor, 2, STRING_VOLTAGE_INPUT, 60_000, 990);
        let mut voltages = CellVoltageTable::new(TableId::CellVoltage);
        full_string(&mut voltages, 2, 3700);
        let mut pack = PackValuesTable::new();
        let mut log = DiagnosticLog::<16>::new();

        validate_string_voltage(
            &config, NOW, &sensor, &voltages, &MinMaxTable::new(), &mut pack,
            &TolerancePlausibility::default(), &mut log,
        );

        assert_eq!(pack.string_voltage_mv[2], 60_000);
        assert!(log.contains(
            DiagnosticId::PlausibilityPackVoltage,
            DiagnosticEvent::NotOk,
            DiagnosticScope::String(2)
        ));
    }

    #[test]
    fn battery_voltage_without_connected_strings_averages_all_valid() {
        let mut pack = PackValuesTable::new();
        pack.string_voltage_mv = [98_000, 102_000, 0];
        pack.invalid_string_voltage = [false, false, true];

        validate_battery_voltage(&mut pack, &FixedTopology::all_open());

        assert_eq!(pack.battery_voltage_mv, 100_000);
        assert!(!pack.invalid_battery_voltage);
    }

    #[test]
    fn battery_voltage_uses_only_connected_strings() {
        let mut pack = PackValuesTable::new();
        pack.string_voltage_mv = [98_000, 102_000, 90_000];
        pack.invalid_string_voltage = [false, false, false];
        let topology = FixedTopology { closed: mask(&[1, 2]), precharging: StringMask::empty() };

        validate_battery_voltage(&mut pack, &topology);

        assert_eq!(pack.battery_voltage_mv, 96_000);
    }

    #[test]
    fn battery_voltage_without_contributors_is_sentinel() {
        let mut pack = PackValuesTable::new();
        validate_battery_voltage(&mut pack, &FixedTopology::all_open());
        assert_eq!(pack.battery_voltage_mv, BATTERY_VOLTAGE_SENTINEL_MV);
        assert!(pack.invalid_battery_voltage);

        // Connected string with invalid voltage does not fall back to others
        pack.string_voltage_mv = [0, 100_000, 0];
        pack.invalid_string_voltage = [true, false, true];
        let topology = FixedTopology { closed: mask(&[0]), precharging: StringMask::empty() };
        validate_battery_voltage(&mut pack, &topology);
        assert!(pack.invalid_battery_voltage);
    }

    #[test]
    fn bus_voltage_is_topology_gated() {
        let config = RedundancyConfig::default();
        let mut sensor = CurrentSensorTable::new();
        set_sensor_voltage(&mut sensor, 0, BUS_VOLTAGE_INPUT, 100_000, 950);
        set_sensor_voltage(&mut sensor, 1, BUS_VOLTAGE_INPUT, 102_000, 950);
        set_sensor_voltage(&mut sensor, 2, BUS_VOLTAGE_INPUT, 50_000, 950);
        let topology = FixedTopology { closed: mask(&[0]), precharging: mask(&[1]) };
        let mut pack = PackValuesTable::new();

        validate_bus_voltage(&config, NOW, &sensor, &mut pack, &topology);

        assert_eq!(pack.high_voltage_bus_voltage_mv, 101_000);
        assert!(!pack.invalid_high_voltage_bus_voltage);
    }

    #[test]
    fn bus_voltage_keeps_previous_value_when_nothing_qualifies() {
        let config = RedundancyConfig::default();
        let mut sensor = CurrentSensorTable::new();
        set_sensor_voltage(&mut sensor, 0, BUS_VOLTAGE_INPUT, 100_000, 950);
        let mut pack = PackValuesTable::new();
        pack.high_voltage_bus_voltage_mv = 99_000;
        pack.invalid_high_voltage_bus_voltage = false;

        validate_bus_voltage(&config, NOW, &sensor, &mut pack, &FixedTopology::all_open());

        assert_eq!(pack.high_voltage_bus_voltage_mv, 99_000);
        assert!(pack.invalid_high_voltage_bus_voltage);
    }

    #[test]
    fn power_taken_from_sensor_when_fresh() {
        let config = RedundancyConfig::default();
        let mut sensor = CurrentSensorTable::new();
        sensor.power_w = [100, 200, 300];
        sensor.invalid_power_measurement = [false; NR_OF_STRINGS];
        sensor.timestamp_power = [950; NR_OF_STRINGS];
        sensor.previous_timestamp_power = [850; NR_OF_STRINGS];
        let mut state = PackState::new();
        let mut pack = PackValuesTable::new();

        validate_power(&config, NOW, &sensor, &mut state, &mut pack, &mut NoDiagnostics);

        assert_eq!(pack.string_power_w, [100, 200, 300]);
        assert_eq!(pack.pack_power_w, 600);
        assert!(!pack.invalid_pack_power);
        assert_eq!(state.power_timestamp, [950; NR_OF_STRINGS]);
    }

    #[test]
    fn stale_power_falls_back_to_current_times_voltage() {
        let config = RedundancyConfig::default();
        let sensor = CurrentSensorTable::new();
        let mut state = PackState::new();
        let mut pack = PackValuesTable::new();
        pack.string_current_ma = [10_000, 20_000, 5_000];
        pack.invalid_string_current = [false, false, true];
        pack.string_voltage_mv = [400_000, 400_000, 400_000];
        pack.invalid_string_voltage = [false, false, false];
        let mut log = DiagnosticLog::<16>::new();

        validate_power(&config, NOW, &sensor, &mut state, &mut pack, &mut log);

        assert_eq!(pack.string_power_w[0], 4000);
        assert_eq!(pack.string_power_w[1], 8000);
        assert!(!pack.invalid_string_power[0]);
        assert!(pack.invalid_string_power[2]);
        assert!(pack.invalid_pack_power);
        assert_eq!(log.count_not_ok(DiagnosticId::CurrentSensorPowerTimeout), NR_OF_STRINGS);
    }

    #[test]
    fn power_calculation_handles_large_values() {
        assert_eq!(calculate_power_w(-250_000, 800_000), -200_000);
        assert_eq!(calculate_power_w(0, 800_000), 0);
    }
}
