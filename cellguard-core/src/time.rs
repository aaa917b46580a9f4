//! Time and measurement freshness
//!
//! Ticks come from a free-running monotonic counter that wraps at `u32`
//! width. Ages are computed with wrapping subtraction, so a timer overflow
//! between the write of a timestamp and the check does not read as stale:
//!
//! ```text
//! timestamp = u32::MAX - 1, now = 1  =>  age = 3
//! ```
//!
//! `now` must come from the same clock that stamped the timestamp.

use core::cell::Cell;

use crate::errors::{RedundancyError, RedundancyResult};

/// Monotonic tick count (1 tick = 1 ms), wraps at `u32::MAX`
pub type Tick = u32;

/// Monotonic clock collaborator
pub trait Clock {
    /// Current tick count
    fn now(&self) -> Tick;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Tick {
        (**self).now()
    }
}

/// Manually driven clock for tests and simulation
///
/// Share it by reference: `&FixedClock` is itself a [`Clock`].
#[derive(Debug, Default)]
pub struct FixedClock {
    tick: Cell<Tick>,
}

impl FixedClock {
    /// Create a clock standing at `tick`
    pub const fn new(tick: Tick) -> Self {
        Self { tick: Cell::new(tick) }
    }

    /// Jump to `tick`
    pub fn set(&self, tick: Tick) {
        self.tick.set(tick);
    }

    /// Advance by `ticks`, wrapping like the hardware counter
    pub fn advance(&self, ticks: Tick) {
        self.tick.set(self.tick.get().wrapping_add(ticks));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Tick {
        self.tick.get()
    }
}

/// False only if the measurement was never written since boot
///
/// A never-written header has both timestamps at exactly zero.
pub const fn has_ever_updated(timestamp: Tick, previous_timestamp: Tick) -> bool {
    !(timestamp == 0 && previous_timestamp == 0)
}

/// Ticks elapsed since `timestamp`, wrap-safe
pub const fn age(timestamp: Tick, now: Tick) -> Tick {
    now.wrapping_sub(timestamp)
}

/// Check that a measurement exists and is at most `max_age` ticks old
pub fn check_freshness(
    timestamp: Tick,
    previous_timestamp: Tick,
    now: Tick,
    max_age: Tick,
) -> RedundancyResult<()> {
    if !has_ever_updated(timestamp, previous_timestamp) {
        return Err(RedundancyError::NeverUpdated);
    }

    let age = age(timestamp, now);
    if age > max_age {
        return Err(RedundancyError::Stale { age, max_age });
    }

    Ok(())
}

/// True iff the measurement was ever updated and is at most `max_age` old
pub fn is_fresh(timestamp: Tick, previous_timestamp: Tick, now: Tick, max_age: Tick) -> bool {
    check_freshness(timestamp, previous_timestamp, now, max_age).is_ok()
}
