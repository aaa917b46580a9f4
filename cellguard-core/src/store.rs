//! Table Store
//!
//! Tables are exchanged between tasks by copy through a store keyed by the
//! table id in the header. A read copies the stored table over the caller's
//! table; a write stamps the header and copies the caller's table into the
//! store. Neither hands out references into shared data.
//!
//! ```text
//! AFE driver ──write──► [ TableDatabase ] ──read──► redundancy core
//!                              ▲                        │
//!                              └──────────write─────────┘
//! ```
//!
//! Store calls block with a bounded timeout and must not be issued from a
//! critical section; implementations do their own locking.

use crate::errors::{RedundancyError, RedundancyResult};
use crate::tables::{
    CellTemperatureTable, CellVoltageTable, CurrentSensorTable, MeasurementHeader, MinMaxTable,
    PackValuesTable, TableId,
};
use crate::time::Clock;

/// A table that can live in the store
pub trait Table: Clone {
    /// Header carrying the store key and timestamps
    fn header(&self) -> &MeasurementHeader;

    /// Mutable header, stamped on write
    fn header_mut(&mut self) -> &mut MeasurementHeader;

    /// Slot of this type addressed by `id`, if any
    fn slot(database: &TableDatabase, id: TableId) -> Option<&Self>;

    /// Mutable slot of this type addressed by `id`, if any
    fn slot_mut(database: &mut TableDatabase, id: TableId) -> Option<&mut Self>;
}

/// Store collaborator
///
/// Each call is atomic with respect to the store. On write the store sets
/// `previous_timestamp := timestamp; timestamp := now` on the table.
pub trait Store {
    /// Copy the stored table addressed by `table.header().id` into `table`
    fn read<T: Table>(&mut self, table: &mut T) -> RedundancyResult<()>;

    /// Stamp `table` and copy it into the store
    fn write<T: Table>(&mut self, table: &mut T) -> RedundancyResult<()>;
}

/// Every table of the system, statically allocated
#[derive(Debug, Clone, PartialEq)]
pub struct TableDatabase {
    /// Base AFE cell voltages
    pub cell_voltage_base: CellVoltageTable,
    /// Redundant cell voltages
    pub cell_voltage_redundant: CellVoltageTable,
    /// Validated cell voltages
    pub cell_voltage: CellVoltageTable,
    /// Base AFE cell temperatures
    pub cell_temperature_base: CellTemperatureTable,
    /// Redundant cell temperatures
    pub cell_temperature_redundant: CellTemperatureTable,
    /// Validated cell temperatures
    pub cell_temperature: CellTemperatureTable,
    /// Aggregates
    pub min_max: MinMaxTable,
    /// Raw current sensor readings
    pub current_sensor: CurrentSensorTable,
    /// Validated pack values
    pub pack_values: PackValuesTable,
}

impl TableDatabase {
    /// Database with every table in its startup state
    pub const fn new() -> Self {
        Self {
            cell_voltage_base: CellVoltageTable::new(TableId::CellVoltageBase),
            cell_voltage_redundant: CellVoltageTable::new(TableId::CellVoltageRedundant),
            cell_voltage: CellVoltageTable::new(TableId::CellVoltage),
            cell_temperature_base: CellTemperatureTable::new(TableId::CellTemperatureBase),
            cell_temperature_redundant: CellTemperatureTable::new(TableId::CellTemperatureRedundant),
            cell_temperature: CellTemperatureTable::new(TableId::CellTemperature),
            min_max: MinMaxTable::new(),
            current_sensor: CurrentSensorTable::new(),
            pack_values: PackValuesTable::new(),
        }
    }
}

impl Default for TableDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for CellVoltageTable {
    fn header(&self) -> &MeasurementHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MeasurementHeader {
        &mut self.header
    }

    fn slot(database: &TableDatabase, id: TableId) -> Option<&Self> {
        match id {
            TableId::CellVoltageBase => Some(&database.cell_voltage_base),
            TableId::CellVoltageRedundant => Some(&database.cell_voltage_redundant),
            TableId::CellVoltage => Some(&database.cell_voltage),
            _ => None,
        }
    }

    fn slot_mut(database: &mut TableDatabase, id: TableId) -> Option<&mut Self> {
        match id {
            TableId::CellVoltageBase => Some(&mut database.cell_voltage_base),
            TableId::CellVoltageRedundant => Some(&mut database.cell_voltage_redundant),
            TableId::CellVoltage => Some(&mut database.cell_voltage),
            _ => None,
        }
    }
}

impl Table for CellTemperatureTable {
    fn header(&self) -> &MeasurementHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MeasurementHeader {
        &mut self.header
    }

    fn slot(database: &TableDatabase, id: TableId) -> Option<&Self> {
        match id {
            TableId::CellTemperatureBase => Some(&database.cell_temperature_base),
            TableId::CellTemperatureRedundant => Some(&database.cell_temperature_redundant),
            TableId::CellTemperature => Some(&database.cell_temperature),
            _ => None,
        }
    }

    fn slot_mut(database: &mut TableDatabase, id: TableId) -> Option<&mut Self> {
        match id {
            TableId::CellTemperatureBase => Some(&mut database.cell_temperature_base),
            TableId::CellTemperatureRedundant => Some(&mut database.cell_temperature_redundant),
            TableId::CellTemperature => Some(&mut database.cell_temperature),
            _ => None,
        }
    }
}

impl Table for MinMaxTable {
    fn header(&self) -> &MeasurementHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MeasurementHeader {
        &mut self.header
    }

    fn slot(database: &TableDatabase, id: TableId) -> Option<&Self> {
        (id == TableId::MinMax).then_some(&database.min_max)
    }

    fn slot_mut(database: &mut TableDatabase, id: TableId) -> Option<&mut Self> {
        (id == TableId::MinMax).then_some(&mut database.min_max)
    }
}

impl Table for CurrentSensorTable {
    fn header(&self) -> &MeasurementHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MeasurementHeader {
        &mut self.header
    }

    fn slot(database: &TableDatabase, id: TableId) -> Option<&Self> {
        (id == TableId::CurrentSensor).then_some(&database.current_sensor)
    }

    fn slot_mut(database: &mut TableDatabase, id: TableId) -> Option<&mut Self> {
        (id == TableId::CurrentSensor).then_some(&mut database.current_sensor)
    }
}

impl Table for PackValuesTable {
    fn header(&self) -> &MeasurementHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut MeasurementHeader {
        &mut self.header
    }

    fn slot(database: &TableDatabase, id: TableId) -> Option<&Self> {
        (id == TableId::PackValues).then_some(&database.pack_values)
    }

    fn slot_mut(database: &mut TableDatabase, id: TableId) -> Option<&mut Self> {
        (id == TableId::PackValues).then_some(&mut database.pack_values)
    }
}

/// In-memory store over a [`TableDatabase`]
///
/// Single-task use: the scheduler never runs two accessors at once, so no
/// locking is done here.
#[derive(Debug)]
pub struct MemoryStore<C: Clock> {
    database: TableDatabase,
    clock: C,
}

impl<C: Clock> MemoryStore<C> {
    /// Store with every table in its startup state
    pub fn new(clock: C) -> Self {
        Self {
            database: TableDatabase::new(),
            clock,
        }
    }

    /// Read-only view of the stored tables
    pub fn database(&self) -> &TableDatabase {
        &self.database
    }

    /// Direct access to the stored tables, bypassing timestamp stamping
    pub fn database_mut(&mut self) -> &mut TableDatabase {
        &mut self.database
    }
}

impl<C: Clock> Store for MemoryStore<C> {
    fn read<T: Table>(&mut self, table: &mut T) -> RedundancyResult<()> {
        let id = table.header().id;
        let stored = T::slot(&self.database, id).ok_or(RedundancyError::UnknownTable { id })?;
        table.clone_from(stored);
        Ok(())
    }

    fn write<T: Table>(&mut self, table: &mut T) -> RedundancyResult<()> {
        let id = table.header().id;
        let now = self.clock.now();
        let stored = T::slot_mut(&mut self.database, id).ok_or(RedundancyError::UnknownTable { id })?;
        table.header_mut().stamp(now);
        stored.clone_from(table);
        log_trace!("table {:?} written at {}", id, now);
        Ok(())
    }
}
