//! Error Types for Measurement Redundancy
//!
//! ## Design Philosophy
//!
//! Errors here are sensor conditions, not crashes. Every error produced by
//! this crate resolves to an invalid flag plus a diagnostic event, and the
//! cycle continues. The type follows the usual embedded constraints:
//!
//! 1. **Small Size**: the largest variant carries two ticks.
//! 2. **No Heap Allocation**: all data is inline.
//! 3. **Copy Semantics**: errors are returned by value from hot paths.
//!
//! ## Error Categories
//!
//! ### Staleness
//! - `NeverUpdated`: the source has not produced a sample since boot
//! - `Stale`: the last sample is older than its timeout
//!
//! ### Plausibility
//! - `PlausibilityFailed`: base and redundant readings disagree, or a cell
//!   lies too far from its string average. Carries the affected strings.
//!
//! ### Aggregation
//! - `NoValidContributors`: a string has no valid entry to aggregate
//!
//! ### Store
//! - `UnknownTable`: the table id does not address a slot of this type
//! - `StoreTimeout`: the store did not answer within its bounded timeout
//!
//! Programming invariant violations are not represented here; they are
//! assertions.

use thiserror_no_std::Error;

use crate::tables::{StringMask, TableId};
use crate::time::Tick;

/// Result type for redundancy operations
pub type RedundancyResult<T> = Result<T, RedundancyError>;

/// Redundancy errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedundancyError {
    /// Measurement has not been updated within its timeout
    #[error("Measurement stale: age {age} exceeds {max_age}")]
    Stale {
        /// Ticks elapsed since the last update (wrapping)
        age: Tick,
        /// Allowed age in ticks
        max_age: Tick,
    },

    /// Measurement was never written since boot
    #[error("Measurement never updated")]
    NeverUpdated,

    /// Two sources disagree beyond tolerance
    #[error("Plausibility check failed for strings {strings:?}")]
    PlausibilityFailed {
        /// Strings with at least one implausible value
        strings: StringMask,
    },

    /// Aggregation found no valid entry
    #[error("No valid contributors for strings {strings:?}")]
    NoValidContributors {
        /// Strings without a single valid entry
        strings: StringMask,
    },

    /// Table id does not belong to the requested table type
    #[error("Unknown table {id:?}")]
    UnknownTable {
        /// Requested id
        id: TableId,
    },

    /// Store access timed out
    #[error("Store access timed out")]
    StoreTimeout,
}

impl RedundancyError {
    /// True for errors caused by missing or old data
    pub const fn is_staleness(&self) -> bool {
        matches!(self, Self::Stale { .. } | Self::NeverUpdated)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RedundancyError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Stale { age, max_age } =>
                defmt::write!(fmt, "Stale: age {} > {}", age, max_age),
            Self::NeverUpdated =>
                defmt::write!(fmt, "Never updated"),
            Self::PlausibilityFailed { strings } =>
                defmt::write!(fmt, "Plausibility failed: {=u8:b}", strings.bits()),
            Self::NoValidContributors { strings } =>
                defmt::write!(fmt, "No valid contributors: {=u8:b}", strings.bits()),
            Self::UnknownTable { id } =>
                defmt::write!(fmt, "Unknown table {}", *id as u8),
            Self::StoreTimeout =>
                defmt::write!(fmt, "Store timeout"),
        }
    }
}
