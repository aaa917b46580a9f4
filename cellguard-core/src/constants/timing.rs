//! Measurement Timeouts
//!
//! All values are in ticks of the monotonic clock (1 tick = 1 ms). A
//! measurement older than its timeout is stale and degrades to invalid.
//! Each timeout is the nominal measurement period plus half a period of
//! jitter allowance.

/// Nominal AFE measurement period (ms).
pub const AFE_MEASUREMENT_PERIOD_MS: u32 = 200;

/// Maximum age of an AFE cell voltage/temperature table (ms).
pub const AFE_MEASUREMENT_TIMEOUT_MS: u32 =
    AFE_MEASUREMENT_PERIOD_MS + AFE_MEASUREMENT_PERIOD_MS / 2;

/// Nominal current sensor period (ms).
pub const CURRENT_SENSOR_PERIOD_MS: u32 = 200;

/// Maximum age of a string current reading (ms).
pub const CURRENT_MEASUREMENT_TIMEOUT_MS: u32 =
    CURRENT_SENSOR_PERIOD_MS + CURRENT_SENSOR_PERIOD_MS / 2;

/// Maximum age of a current sensor voltage or power reading (ms).
pub const CURRENT_SENSOR_MEASUREMENT_TIMEOUT_MS: u32 =
    CURRENT_SENSOR_PERIOD_MS + CURRENT_SENSOR_PERIOD_MS / 2;
