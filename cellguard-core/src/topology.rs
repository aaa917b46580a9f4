//! Contactor topology queries
//!
//! Which strings are electrically connected decides which string voltages
//! make up the battery voltage and which strings see the high-voltage bus.

use crate::constants::battery::NR_OF_STRINGS;
use crate::tables::StringMask;

/// Topology collaborator
pub trait Topology {
    /// String contactors are closed
    fn is_string_closed(&self, s: usize) -> bool;

    /// String is precharging the bus
    fn is_string_precharging(&self, s: usize) -> bool;

    /// Number of strings currently connected
    fn connected_strings(&self) -> usize;
}

/// Topology given as fixed sets of closed and precharging strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedTopology {
    /// Closed strings
    pub closed: StringMask,
    /// Precharging strings
    pub precharging: StringMask,
}

impl FixedTopology {
    /// Every contactor open
    pub const fn all_open() -> Self {
        Self {
            closed: StringMask::empty(),
            precharging: StringMask::empty(),
        }
    }

    /// Every string closed
    pub const fn all_closed() -> Self {
        Self {
            closed: StringMask::all(),
            precharging: StringMask::empty(),
        }
    }
}

impl Topology for FixedTopology {
    fn is_string_closed(&self, s: usize) -> bool {
        self.closed.contains(s)
    }

    fn is_string_precharging(&self, s: usize) -> bool {
        self.precharging.contains(s)
    }

    fn connected_strings(&self) -> usize {
        (0..NR_OF_STRINGS).filter(|s| self.closed.contains(*s)).count()
    }
}

impl<T: Topology + ?Sized> Topology for &T {
    fn is_string_closed(&self, s: usize) -> bool {
        (**self).is_string_closed(s)
    }

    fn is_string_precharging(&self, s: usize) -> bool {
        (**self).is_string_precharging(s)
    }

    fn connected_strings(&self) -> usize {
        (**self).connected_strings()
    }
}
