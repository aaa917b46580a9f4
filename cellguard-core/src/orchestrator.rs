//! Redundancy orchestrator
//!
//! Drives both validation paths once per scheduling tick:
//!
//! ```text
//! cell cycle:  read base + redundant ─► freshness ─► decide ─► reconcile / accept
//!                                                              │
//!                                               aggregate ◄────┘ ─► write changed tables
//!
//! pack cycle:  read current sensor ─► current ─► string voltage ─► battery voltage
//!                                   ─► bus voltage ─► power ─► write pack values
//! ```
//!
//! ## Cell cycle decision
//!
//! Redundancy is engaged once the redundant source has produced its first
//! sample and stays engaged for the rest of the run. A source counts as
//! new when its timestamp differs from the one last consumed.
//!
//! | engaged | base new | redundant new | action                               |
//! |---------|----------|---------------|--------------------------------------|
//! | yes     | yes      | yes           | reconcile every cell                 |
//! | yes     | yes      | no            | accept base if redundant timed out   |
//! | yes     | no       | yes           | accept redundant if base timed out   |
//! | no      | yes      | -             | accept base                          |
//! | *       | no       | no            | nothing                              |
//!
//! A skipped cycle consumes nothing, so a late partner sample is still
//! reconciled on the next tick.
//!
//! Voltages and temperatures are committed separately. A sample counts as
//! consumed only once its validated table and the min/max table are in the
//! store; after a store failure it is validated again on the next tick.
//!
//! ## Concurrency
//!
//! The manager is not re-entrant. It owns its state and its working copies
//! of the validated tables; other tasks only see them through the store.

use crate::aggregate::{compute_temperature_min_max_average, compute_voltage_min_max_average};
use crate::config::RedundancyConfig;
use crate::constants::battery::NR_OF_STRINGS;
use crate::diagnostics::{DiagnosticEvent, DiagnosticId, DiagnosticScope, Diagnostics};
use crate::errors::{RedundancyError, RedundancyResult};
use crate::pack::{
    validate_battery_voltage, validate_bus_voltage, validate_current, validate_power,
    validate_string_voltage, PackState,
};
use crate::plausibility::Plausibility;
use crate::reconcile::{reconcile_cell_temperatures, reconcile_cell_voltages};
use crate::store::Store;
use crate::tables::{
    CellTemperatureTable, CellVoltageTable, CurrentSensorTable, MeasurementHeader, MinMaxTable,
    PackValuesTable, StringMask, TableId,
};
use crate::time::{Clock, Tick};
use crate::topology::Topology;

/// Everything the orchestrator remembers between cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrchestratorState {
    /// Last consumed base cell voltage timestamp
    pub last_base_cell_voltage_timestamp: Tick,
    /// Last consumed redundant cell voltage timestamp
    pub last_redundant_cell_voltage_timestamp: Tick,
    /// Last consumed base cell temperature timestamp
    pub last_base_cell_temperature_timestamp: Tick,
    /// Last consumed redundant cell temperature timestamp
    pub last_redundant_cell_temperature_timestamp: Tick,
    /// Redundant cell voltages have been seen at least once
    pub cell_voltage_redundancy_engaged: bool,
    /// Redundant cell temperatures have been seen at least once
    pub cell_temperature_redundancy_engaged: bool,
    /// Last consumed current sensor timestamps
    pub pack: PackState,
}

impl OrchestratorState {
    /// State at boot
    pub const fn new() -> Self {
        Self {
            last_base_cell_voltage_timestamp: 0,
            last_redundant_cell_voltage_timestamp: 0,
            last_base_cell_temperature_timestamp: 0,
            last_redundant_cell_temperature_timestamp: 0,
            cell_voltage_redundancy_engaged: false,
            cell_temperature_redundancy_engaged: false,
            pack: PackState::new(),
        }
    }
}

/// What the cell cycle does with one measurement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellAction {
    Reconcile,
    AcceptBase,
    AcceptRedundant,
    Skip,
}

/// Freshness and novelty of the two sources of one measurement kind
#[derive(Debug, Clone, Copy)]
struct SourceStatus {
    engaged: bool,
    base_new: bool,
    base_fresh: bool,
    redundant_new: bool,
    redundant_fresh: bool,
}

impl SourceStatus {
    fn action(&self) -> CellAction {
        match (self.engaged, self.base_new, self.redundant_new) {
            (true, true, true) => CellAction::Reconcile,
            (true, true, false) if !self.redundant_fresh => CellAction::AcceptBase,
            (true, false, true) if !self.base_fresh => CellAction::AcceptRedundant,
            (false, true, false) => CellAction::AcceptBase,
            (false, _, true) => unreachable!("redundant sample without engaged redundancy"),
            _ => CellAction::Skip,
        }
    }
}

/// Source timestamps a validation pass consumes once written
#[derive(Debug, Clone, Copy)]
struct Consumed {
    base: Tick,
    redundant: Tick,
}

fn report_per_string<D: Diagnostics>(diagnostics: &mut D, id: DiagnosticId, failed: StringMask) {
    for s in 0..NR_OF_STRINGS {
        diagnostics.report(
            id,
            DiagnosticEvent::from_ok(!failed.contains(s)),
            DiagnosticScope::String(s as u8),
        );
    }
}

/// Strings reported by an aggregation or plausibility result
fn failed_strings(result: RedundancyResult<()>) -> StringMask {
    match result {
        Ok(()) => StringMask::empty(),
        Err(RedundancyError::NoValidContributors { strings })
        | Err(RedundancyError::PlausibilityFailed { strings }) => strings,
        Err(_) => StringMask::all(),
    }
}

/// Redundancy orchestrator over its five collaborators
pub struct RedundancyManager<St, P, T, D, C>
where
    St: Store,
    P: Plausibility,
    T: Topology,
    D: Diagnostics,
    C: Clock,
{
    config: RedundancyConfig,
    store: St,
    plausibility: P,
    topology: T,
    diagnostics: D,
    clock: C,
    state: OrchestratorState,

    base_cell_voltage: CellVoltageTable,
    redundant_cell_voltage: CellVoltageTable,
    cell_voltage: CellVoltageTable,
    base_cell_temperature: CellTemperatureTable,
    redundant_cell_temperature: CellTemperatureTable,
    cell_temperature: CellTemperatureTable,
    min_max: MinMaxTable,
    current_sensor: CurrentSensorTable,
    pack_values: PackValuesTable,
}

impl<St, P, T, D, C> RedundancyManager<St, P, T, D, C>
where
    St: Store,
    P: Plausibility,
    T: Topology,
    D: Diagnostics,
    C: Clock,
{
    /// Create a manager with every validated table invalid
    pub fn new(config: RedundancyConfig, store: St, plausibility: P, topology: T, diagnostics: D, clock: C) -> Self {
        Self {
            config,
            store,
            plausibility,
            topology,
            diagnostics,
            clock,
            state: OrchestratorState::new(),
            base_cell_voltage: CellVoltageTable::new(TableId::CellVoltageBase),
            redundant_cell_voltage: CellVoltageTable::new(TableId::CellVoltageRedundant),
            cell_voltage: CellVoltageTable::new(TableId::CellVoltage),
            base_cell_temperature: CellTemperatureTable::new(TableId::CellTemperatureBase),
            redundant_cell_temperature: CellTemperatureTable::new(TableId::CellTemperatureRedundant),
            cell_temperature: CellTemperatureTable::new(TableId::CellTemperature),
            min_max: MinMaxTable::new(),
            current_sensor: CurrentSensorTable::new(),
            pack_values: PackValuesTable::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RedundancyConfig {
        &self.config
    }

    /// State carried between cycles
    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    /// Underlying store
    pub fn store(&self) -> &St {
        &self.store
    }

    /// Underlying store, e.g. to feed new measurements
    pub fn store_mut(&mut self) -> &mut St {
        &mut self.store
    }

    /// Diagnostics sink
    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Diagnostics sink, e.g. to drain recorded events
    pub fn diagnostics_mut(&mut self) -> &mut D {
        &mut self.diagnostics
    }

    /// Topology collaborator, e.g. to switch contactors in simulation
    pub fn topology_mut(&mut self) -> &mut T {
        &mut self.topology
    }

    /// Working copy of the validated cell voltages
    pub fn cell_voltages(&self) -> &CellVoltageTable {
        &self.cell_voltage
    }

    /// Working copy of the validated cell temperatures
    pub fn cell_temperatures(&self) -> &CellTemperatureTable {
        &self.cell_temperature
    }

    /// Working copy of the per-string aggregates
    pub fn min_max(&self) -> &MinMaxTable {
        &self.min_max
    }

    /// Working copy of the validated pack values
    pub fn pack_values(&self) -> &PackValuesTable {
        &self.pack_values
    }

    /// Run the cell cycle, then the pack cycle
    ///
    /// The pack cycle runs even if the cell cycle failed on the store; the
    /// first error is returned.
    pub fn run_cycle(&mut self) -> RedundancyResult<()> {
        let cells = self.run_cell_cycle();
        let pack = self.run_pack_cycle();
        cells.and(pack)
    }

    /// Validate cell voltages and temperatures
    ///
    /// Each kind writes its validated table, followed by the min/max table,
    /// only when it changed. A store failure in one kind does not stop the
    /// other; the first error is returned.
    pub fn run_cell_cycle(&mut self) -> RedundancyResult<()> {
        let now = self.clock.now();

        let voltages = self.commit_cell_voltages(now).map_err(|err| {
            log_warn!("cell voltage cycle aborted: {}", err);
            err
        });
        let temperatures = self.commit_cell_temperatures(now).map_err(|err| {
            log_warn!("cell temperature cycle aborted: {}", err);
            err
        });
        voltages.and(temperatures)
    }

    /// Validate pack values and write them once
    pub fn run_pack_cycle(&mut self) -> RedundancyResult<()> {
        let now = self.clock.now();
        self.store.read(&mut self.current_sensor).map_err(|err| {
            log_warn!("pack cycle aborted: {}", err);
            err
        })?;

        validate_current(
            &self.config,
            now,
            &self.current_sensor,
            &mut self.state.pack,
            &mut self.pack_values,
            &mut self.diagnostics,
        );
        validate_string_voltage(
            &self.config,
            now,
            &self.current_sensor,
            &self.cell_voltage,
            &self.min_max,
            &mut self.pack_values,
            &self.plausibility,
            &mut self.diagnostics,
        );
        validate_battery_voltage(&mut self.pack_values, &self.topology);
        validate_bus_voltage(
            &self.config,
            now,
            &self.current_sensor,
            &mut self.pack_values,
            &self.topology,
        );
        validate_power(
            &self.config,
            now,
            &self.current_sensor,
            &mut self.state.pack,
            &mut self.pack_values,
            &mut self.diagnostics,
        );

        self.store.write(&mut self.pack_values)
    }

    #[allow(clippy::too_many_arguments)]
    fn source_status(
        &mut self,
        engaged: bool,
        base: MeasurementHeader,
        last_base: Tick,
        redundant: MeasurementHeader,
        last_redundant: Tick,
        now: Tick,
        base_timeout_id: DiagnosticId,
        redundant_timeout_id: DiagnosticId,
    ) -> SourceStatus {
        let timeout = self.config.afe_measurement_timeout;

        let base_fresh = base.check_freshness(now, timeout).is_ok();
        self.diagnostics.report(
            base_timeout_id,
            DiagnosticEvent::from_ok(base_fresh),
            DiagnosticScope::System,
        );

        let redundant_fresh = engaged && redundant.check_freshness(now, timeout).is_ok();
        if engaged {
            self.diagnostics.report(
                redundant_timeout_id,
                DiagnosticEvent::from_ok(redundant_fresh),
                DiagnosticScope::System,
            );
        }

        SourceStatus {
            engaged,
            base_new: base.timestamp != last_base,
            base_fresh,
            redundant_new: engaged && redundant.timestamp != last_redundant,
            redundant_fresh,
        }
    }

    fn report_voltage_aggregation(&mut self) {
        let failed = failed_strings(compute_voltage_min_max_average(&self.cell_voltage, &mut self.min_max));
        report_per_string(&mut self.diagnostics, DiagnosticId::MinMaxCellVoltageAggregation, failed);
    }

    fn report_temperature_aggregation(&mut self) {
        let failed = failed_strings(compute_temperature_min_max_average(
            &self.cell_temperature,
            &mut self.min_max,
        ));
        report_per_string(
            &mut self.diagnostics,
            DiagnosticId::MinMaxCellTemperatureAggregation,
            failed,
        );
    }

    fn commit_cell_voltages(&mut self, now: Tick) -> RedundancyResult<()> {
        let consumed = match self.update_cell_voltages(now)? {
            Some(consumed) => consumed,
            None => return Ok(()),
        };
        self.store.write(&mut self.cell_voltage)?;
        self.store.write(&mut self.min_max)?;
        self.state.last_base_cell_voltage_timestamp = consumed.base;
        self.state.last_redundant_cell_voltage_timestamp = consumed.redundant;
        Ok(())
    }

    fn commit_cell_temperatures(&mut self, now: Tick) -> RedundancyResult<()> {
        let consumed = match self.update_cell_temperatures(now)? {
            Some(consumed) => consumed,
            None => return Ok(()),
        };
        self.store.write(&mut self.cell_temperature)?;
        self.store.write(&mut self.min_max)?;
        self.state.last_base_cell_temperature_timestamp = consumed.base;
        self.state.last_redundant_cell_temperature_timestamp = consumed.redundant;
        Ok(())
    }

    fn update_cell_voltages(&mut self, now: Tick) -> RedundancyResult<Option<Consumed>> {
        self.store.read(&mut self.base_cell_voltage)?;
        self.store.read(&mut self.redundant_cell_voltage)?;

        if self.redundant_cell_voltage.header.has_ever_updated() {
            self.state.cell_voltage_redundancy_engaged = true;
        }
        let status = self.source_status(
            self.state.cell_voltage_redundancy_engaged,
            self.base_cell_voltage.header,
            self.state.last_base_cell_voltage_timestamp,
            self.redundant_cell_voltage.header,
            self.state.last_redundant_cell_voltage_timestamp,
            now,
            DiagnosticId::AfeCellVoltageTimeout,
            DiagnosticId::RedundancyCellVoltageTimeout,
        );
        let mut consumed = Consumed {
            base: self.state.last_base_cell_voltage_timestamp,
            redundant: self.state.last_redundant_cell_voltage_timestamp,
        };

        match status.action() {
            CellAction::Reconcile => {
                let implausible = reconcile_cell_voltages(
                    &self.base_cell_voltage,
                    &self.redundant_cell_voltage,
                    &mut self.cell_voltage,
                    &self.plausibility,
                );
                if !implausible.is_empty() {
                    log_warn!("implausible cell voltages in strings {:#05b}", implausible.bits());
                }
                report_per_string(&mut self.diagnostics, DiagnosticId::PlausibilityCellVoltage, implausible);
                consumed.base = self.base_cell_voltage.header.timestamp;
                consumed.redundant = self.redundant_cell_voltage.header.timestamp;

                self.report_voltage_aggregation();

                let spread = failed_strings(
                    self.plausibility
                        .check_voltage_spread(&mut self.cell_voltage, &self.min_max),
                );
                report_per_string(&mut self.diagnostics, DiagnosticId::PlausibilityCellVoltageSpread, spread);
                if !spread.is_empty() {
                    log_warn!("cell voltage spread exceeded in strings {:#05b}", spread.bits());
                    self.report_voltage_aggregation();
                }
            }
            CellAction::AcceptBase => {
                log_debug!("accepting base cell voltages without redundancy check");
                self.cell_voltage.copy_values_from(&self.base_cell_voltage);
                consumed.base = self.base_cell_voltage.header.timestamp;
                self.report_voltage_aggregation();
            }
            CellAction::AcceptRedundant => {
                log_debug!("base cell voltages timed out, accepting redundant source");
                self.cell_voltage.copy_values_from(&self.redundant_cell_voltage);
                consumed.redundant = self.redundant_cell_voltage.header.timestamp;
                self.report_voltage_aggregation();
            }
            CellAction::Skip => return Ok(None),
        }
        Ok(Some(consumed))
    }

    fn update_cell_temperatures(&mut self, now: Tick) -> RedundancyResult<Option<Consumed>> {
        self.store.read(&mut self.base_cell_temperature)?;
        self.store.read(&mut self.redundant_cell_temperature)?;

        if self.redundant_cell_temperature.header.has_ever_updated() {
            self.state.cell_temperature_redundancy_engaged = true;
        }
        let status = self.source_status(
            self.state.cell_temperature_redundancy_engaged,
            self.base_cell_temperature.header,
            self.state.last_base_cell_temperature_timestamp,
            self.redundant_cell_temperature.header,
            self.state.last_redundant_cell_temperature_timestamp,
            now,
            DiagnosticId::AfeCellTemperatureTimeout,
            DiagnosticId::RedundancyCellTemperatureTimeout,
        );
        let mut consumed = Consumed {
            base: self.state.last_base_cell_temperature_timestamp,
            redundant: self.state.last_redundant_cell_temperature_timestamp,
        };

        match status.action() {
            CellAction::Reconcile => {
                let implausible = reconcile_cell_temperatures(
                    &self.base_cell_temperature,
                    &self.redundant_cell_temperature,
                    &mut self.cell_temperature,
                    &self.plausibility,
                );
                if !implausible.is_empty() {
                    log_warn!("implausible cell temperatures in strings {:#05b}", implausible.bits());
                }
                report_per_string(
                    &mut self.diagnostics,
                    DiagnosticId::PlausibilityCellTemperature,
                    implausible,
                );
                consumed.base = self.base_cell_temperature.header.timestamp;
                consumed.redundant = self.redundant_cell_temperature.header.timestamp;

                self.report_temperature_aggregation();

                let spread = failed_strings(
                    self.plausibility
                        .check_temperature_spread(&mut self.cell_temperature, &self.min_max),
                );
                report_per_string(
                    &mut self.diagnostics,
                    DiagnosticId::PlausibilityCellTemperatureSpread,
                    spread,
                );
                if !spread.is_empty() {
                    log_warn!("cell temperature spread exceeded in strings {:#05b}", spread.bits());
                    self.report_temperature_aggregation();
                }
            }
            CellAction::AcceptBase => {
                log_debug!("accepting base cell temperatures without redundancy check");
                self.cell_temperature.copy_values_from(&self.base_cell_temperature);
                consumed.base = self.base_cell_temperature.header.timestamp;
                self.report_temperature_aggregation();
            }
            CellAction::AcceptRedundant => {
                log_debug!("base cell temperatures timed out, accepting redundant source");
                self.cell_temperature.copy_values_from(&self.redundant_cell_temperature);
                consumed.redundant = self.redundant_cell_temperature.header.timestamp;
                self.report_temperature_aggregation();
            }
            CellAction::Skip => return Ok(None),
        }
        Ok(Some(consumed))
    }
}
