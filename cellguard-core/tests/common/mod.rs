//! Shared fixtures for the integration tests
//!
//! - A manager wired to an in-memory store and a manually driven clock
//! - A store wrapper that fails on one table, for store error scenarios
//! - Table builders for uniform cell data
//! - Helpers that publish tables the way the measurement tasks would

#![allow(dead_code)]

use cellguard_core::{
    diagnostics::DiagnosticLog,
    plausibility::TolerancePlausibility,
    store::{MemoryStore, Store, Table},
    time::FixedClock,
    topology::FixedTopology,
    CellTemperatureTable, CellVoltageTable, CurrentSensorTable, RedundancyConfig,
    RedundancyError, RedundancyManager, RedundancyResult, TableId, Tick,
};

/// Tick at which every scenario starts
pub const START: Tick = 10_000;

/// One AFE measurement period
pub const PERIOD: Tick = 200;

/// Comfortably past every default timeout
pub const TIMED_OUT: Tick = 1_000;

/// Nominal cell voltage used by the scenarios
pub const NOMINAL_MV: i16 = 3_700;

/// Nominal cell temperature used by the scenarios
pub const NOMINAL_DDEGC: i16 = 250;

/// Enough for a few full cycles of events
pub const LOG_CAPACITY: usize = 256;

/// Manager type used by every scenario
pub type TestManager<'a> = RedundancyManager<
    MemoryStore<&'a FixedClock>,
    TolerancePlausibility,
    FixedTopology,
    DiagnosticLog<LOG_CAPACITY>,
    &'a FixedClock,
>;

/// Manager with default configuration
pub fn manager(clock: &FixedClock, topology: FixedTopology) -> TestManager<'_> {
    manager_with_config(clock, topology, RedundancyConfig::default())
}

/// Manager with a custom configuration
pub fn manager_with_config(
    clock: &FixedClock,
    topology: FixedTopology,
    config: RedundancyConfig,
) -> TestManager<'_> {
    RedundancyManager::new(
        config,
        MemoryStore::new(clock),
        TolerancePlausibility::default(),
        topology,
        DiagnosticLog::new(),
        clock,
    )
}

/// In-memory store that times out on every access to one table
pub struct FlakyStore<'a> {
    /// Backing store
    pub inner: MemoryStore<&'a FixedClock>,
    /// Table whose reads and writes fail
    pub failing: Option<TableId>,
}

impl FlakyStore<'_> {
    fn check(&self, id: TableId) -> RedundancyResult<()> {
        if self.failing == Some(id) {
            Err(RedundancyError::StoreTimeout)
        } else {
            Ok(())
        }
    }
}

impl Store for FlakyStore<'_> {
    fn read<T: Table>(&mut self, table: &mut T) -> RedundancyResult<()> {
        self.check(table.header().id)?;
        self.inner.read(table)
    }

    fn write<T: Table>(&mut self, table: &mut T) -> RedundancyResult<()> {
        self.check(table.header().id)?;
        self.inner.write(table)
    }
}

/// Manager over a [`FlakyStore`]
pub type FlakyManager<'a> = RedundancyManager<
    FlakyStore<'a>,
    TolerancePlausibility,
    FixedTopology,
    DiagnosticLog<LOG_CAPACITY>,
    &'a FixedClock,
>;

/// Manager whose store starts out healthy
pub fn flaky_manager(clock: &FixedClock) -> FlakyManager<'_> {
    RedundancyManager::new(
        RedundancyConfig::default(),
        FlakyStore {
            inner: MemoryStore::new(clock),
            failing: None,
        },
        TolerancePlausibility::default(),
        FixedTopology::all_open(),
        DiagnosticLog::new(),
        clock,
    )
}

/// Every cell valid at `mv`
///
/// Only per-cell values and flags are filled in, as an AFE driver would
/// publish them; counts and sums stay zero.
pub fn uniform_cell_voltages(id: TableId, mv: i16) -> CellVoltageTable {
    let mut table = CellVoltageTable::new(id);
    for string in table.cell_voltage_mv.iter_mut() {
        for module in string.iter_mut() {
            module.fill(mv);
        }
    }
    for string in table.invalid_cell_voltage.iter_mut() {
        for module in string.iter_mut() {
            module.fill(false);
        }
    }
    table
}

/// Every sensor valid at `ddegc`, counts left at zero
pub fn uniform_cell_temperatures(id: TableId, ddegc: i16) -> CellTemperatureTable {
    let mut table = CellTemperatureTable::new(id);
    for string in table.cell_temperature_ddegc.iter_mut() {
        for module in string.iter_mut() {
            module.fill(ddegc);
        }
    }
    for string in table.invalid_cell_temperature.iter_mut() {
        for module in string.iter_mut() {
            module.fill(false);
        }
    }
    table
}

/// Write `table` to the store as its producer would
///
/// The stored header is carried over so the timestamps chain.
pub fn publish<T: Table>(manager: &mut TestManager<'_>, table: &T) {
    publish_into(manager.store_mut(), table);
}

/// Write `table` to any store, chaining the stored header
pub fn publish_into<S: Store, T: Table>(store: &mut S, table: &T) {
    let mut stored = table.clone();
    store.read(&mut stored).expect("table slot exists");

    let mut copy = table.clone();
    *copy.header_mut() = *stored.header();
    store.write(&mut copy).expect("table slot exists");
}

/// Modify the stored current sensor table at tick `now`
pub fn update_current_sensor<F>(manager: &mut TestManager<'_>, now: Tick, update: F)
where
    F: FnOnce(&mut CurrentSensorTable, Tick),
{
    let mut table = manager.store().database().current_sensor.clone();
    update(&mut table, now);
    manager.store_mut().write(&mut table).expect("table slot exists");
}

fn stamp(timestamp: &mut Tick, previous: &mut Tick, now: Tick) {
    *previous = *timestamp;
    *timestamp = now;
}

/// Valid string current sample
pub fn set_current(table: &mut CurrentSensorTable, s: usize, ma: i32, now: Tick) {
    table.current_ma[s] = ma;
    table.invalid_current_measurement[s] = false;
    stamp(&mut table.timestamp_current[s], &mut table.previous_timestamp_current[s], now);
}

/// Current sample the sensor flagged as faulty
pub fn set_current_fault(table: &mut CurrentSensorTable, s: usize, ma: i32, now: Tick) {
    set_current(table, s, ma, now);
    table.invalid_current_measurement[s] = true;
}

/// Valid high-voltage sample on `input`
pub fn set_high_voltage(table: &mut CurrentSensorTable, s: usize, input: usize, mv: i32, now: Tick) {
    table.high_voltage_mv[s][input] = mv;
    table.invalid_high_voltage_measurement[s][input] = false;
    stamp(
        &mut table.timestamp_high_voltage[s][input],
        &mut table.previous_timestamp_high_voltage[s][input],
        now,
    );
}

/// Valid power sample
pub fn set_power(table: &mut CurrentSensorTable, s: usize, w: i32, now: Tick) {
    table.power_w[s] = w;
    table.invalid_power_measurement[s] = false;
    stamp(&mut table.timestamp_power[s], &mut table.previous_timestamp_power[s], now);
}
