//! Runtime configuration for the cover controller and obstruction classifier.
//!
//! These are the structs consumed by `CoverController` and
//! `ObstructionClassifier`. They are separate from the TOML-deserialized
//! schema in `gdo_config`.

/// Calibrated travel times and broadcast cadence for the cover.
#[derive(Debug, Clone)]
pub struct CoverCfg {
    /// Full travel time from closed to open, in milliseconds.
    pub open_duration_ms: u64,
    /// Full travel time from open to closed, in milliseconds.
    pub close_duration_ms: u64,
    /// Non-forced state broadcast cadence while a move is active, for
    /// observers that poll rather than subscribe. Default: 1000 ms.
    pub publish_period_ms: u64,
}

impl CoverCfg {
    pub fn new(open_duration_ms: u64, close_duration_ms: u64) -> Self {
        Self {
            open_duration_ms,
            close_duration_ms,
            publish_period_ms: 1000,
        }
    }
}

/// Tuning for the obstruction line classifier.
///
/// The defaults match the sensor this was written for: a clear line pulses
/// low roughly every 7 ms, so more than 3 pulses per 50 ms window means
/// awake-and-clear, and the line needs 700 ms of steady high after last
/// being seen asleep before it counts as obstructed.
#[derive(Debug, Clone)]
pub struct ObstructionCfg {
    /// Sampling window length in milliseconds.
    pub check_period_ms: u64,
    /// Strictly more falling edges than this per window classify as clear.
    pub pulse_lower_limit: u32,
    /// Minimum steady-high, pulse-free time since the line was last seen
    /// asleep before classifying as obstructed. Covers the slow voltage
    /// decay on the awake-to-asleep transition.
    pub sleep_grace_ms: u64,
}

impl Default for ObstructionCfg {
    fn default() -> Self {
        Self {
            check_period_ms: 50,
            pulse_lower_limit: 3,
            sleep_grace_ms: 700,
        }
    }
}
