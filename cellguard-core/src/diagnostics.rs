//! Diagnostic Event Reporting
//!
//! The redundancy core reports every staleness and plausibility decision as
//! a fire-and-forget event. Reporting never blocks and never fails the
//! caller; what happens to an event (debouncing, fault latching, contactor
//! opening) is decided elsewhere.
//!
//! Both outcomes are reported: an `Ok` event is how a downstream debounce
//! counter learns that a fault condition has cleared.

use heapless::Vec;

/// Identifier of a diagnostic check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DiagnosticId {
    /// Base cell voltages not updated within timeout
    AfeCellVoltageTimeout = 0,
    /// Redundant cell voltages not updated within timeout
    RedundancyCellVoltageTimeout = 1,
    /// Base cell temperatures not updated within timeout
    AfeCellTemperatureTimeout = 2,
    /// Redundant cell temperatures not updated within timeout
    RedundancyCellTemperatureTimeout = 3,
    /// Base and redundant cell voltage disagree
    PlausibilityCellVoltage = 4,
    /// Base and redundant cell temperature disagree
    PlausibilityCellTemperature = 5,
    /// Cell voltage too far from string average
    PlausibilityCellVoltageSpread = 6,
    /// Cell temperature too far from string average
    PlausibilityCellTemperatureSpread = 7,
    /// String current not updated within timeout
    CurrentMeasurementTimeout = 8,
    /// Current sensor flagged its measurement as faulty
    CurrentMeasurementError = 9,
    /// AFE string sum and current sensor voltage disagree
    PlausibilityPackVoltage = 10,
    /// Current sensor voltage not updated within timeout
    CurrentSensorVoltageTimeout = 11,
    /// Current sensor power not updated within timeout
    CurrentSensorPowerTimeout = 12,
    /// A string had no valid cell voltage to aggregate
    MinMaxCellVoltageAggregation = 13,
    /// A string had no valid cell temperature to aggregate
    MinMaxCellTemperatureAggregation = 14,
}

/// Outcome of a diagnostic check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// Check passed
    Ok,
    /// Check failed
    NotOk,
}

impl DiagnosticEvent {
    /// `Ok` if `passed`, else `NotOk`
    pub const fn from_ok(passed: bool) -> Self {
        if passed {
            Self::Ok
        } else {
            Self::NotOk
        }
    }
}

/// What a diagnostic event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticScope {
    /// The whole system
    System,
    /// One string, by index
    String(u8),
}

/// Diagnostics collaborator
pub trait Diagnostics {
    /// Report the outcome of check `id` for `scope`
    fn report(&mut self, id: DiagnosticId, event: DiagnosticEvent, scope: DiagnosticScope);
}

impl<D: Diagnostics + ?Sized> Diagnostics for &mut D {
    fn report(&mut self, id: DiagnosticId, event: DiagnosticEvent, scope: DiagnosticScope) {
        (**self).report(id, event, scope)
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {
    fn report(&mut self, _id: DiagnosticId, _event: DiagnosticEvent, _scope: DiagnosticScope) {}
}

/// One recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Check
    pub id: DiagnosticId,
    /// Outcome
    pub event: DiagnosticEvent,
    /// Subject
    pub scope: DiagnosticScope,
}

/// Records up to `N` events; further events are counted and dropped
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog<const N: usize> {
    records: Vec<DiagnosticRecord, N>,
    dropped: usize,
}

impl<const N: usize> DiagnosticLog<N> {
    /// Empty log
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            dropped: 0,
        }
    }

    /// Recorded events, oldest first
    pub fn records(&self) -> &[DiagnosticRecord] {
        &self.records
    }

    /// Events that did not fit
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.records.clear();
        self.dropped = 0;
    }

    /// Whether `id` was reported with `event` for `scope`
    pub fn contains(&self, id: DiagnosticId, event: DiagnosticEvent, scope: DiagnosticScope) -> bool {
        self.records
            .iter()
            .any(|r| r.id == id && r.event == event && r.scope == scope)
    }

    /// Number of failed checks with `id`
    pub fn count_not_ok(&self, id: DiagnosticId) -> usize {
        self.records
            .iter()
            .filter(|r| r.id == id && r.event == DiagnosticEvent::NotOk)
            .count()
    }
}

impl<const N: usize> Diagnostics for DiagnosticLog<N> {
    fn report(&mut self, id: DiagnosticId, event: DiagnosticEvent, scope: DiagnosticScope) {
        if event == DiagnosticEvent::NotOk {
            log_debug!("diagnostic {:?} not ok ({:?})", id, scope);
        }
        if self.records.push(DiagnosticRecord { id, event, scope }).is_err() {
            self.dropped += 1;
        }
    }
}
