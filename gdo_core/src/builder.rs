//! Builder for `CoverController`.
//!
//! Both press triggers and both travel durations are mandatory; the
//! type-state markers make `build()` available only once they are set.
//! `try_build()` is available in any state and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel as xch;
use gdo_traits::{Clock, MonotonicClock, Trigger};

use crate::config::CoverCfg;
use crate::cover::{CoverController, CoverOperation, Endstop, StateSink, UNKNOWN_POSITION};
use crate::error::{BuildError, Result};
use crate::mocks::NoopSink;

// Type-state markers for the builder
pub struct Missing;
pub struct Set;

/// Builder for `CoverController`. All fields are validated on `build()`.
pub struct CoverBuilder<P, D> {
    single_press: Option<Box<dyn Trigger>>,
    double_press: Option<Box<dyn Trigger>>,
    sink: Option<Box<dyn StateSink>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    durations_ms: Option<(u64, u64)>,
    publish_period_ms: Option<u64>,
    // Some(..) means the endstop is configured; the inner value is its
    // initial state if the sensor already has one.
    open_endstop: Option<Option<bool>>,
    close_endstop: Option<Option<bool>>,
    restored_position: Option<f32>,
    // Type-state markers
    _p: PhantomData<P>,
    _d: PhantomData<D>,
}

impl Default for CoverBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            single_press: None,
            double_press: None,
            sink: None,
            clock: None,
            durations_ms: None,
            publish_period_ms: None,
            open_endstop: None,
            close_endstop: None,
            restored_position: None,
            _p: PhantomData,
            _d: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state
impl<P, D> CoverBuilder<P, D> {
    /// State broadcast sink; defaults to a sink that drops every broadcast.
    pub fn with_sink(mut self, sink: impl StateSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Non-forced broadcast cadence while moving. Default: 1000 ms.
    pub fn with_publish_period_ms(mut self, period_ms: u64) -> Self {
        self.publish_period_ms = Some(period_ms);
        self
    }

    /// Declare an open endstop, with its initial state if already known.
    pub fn with_open_endstop(mut self, initial_state: Option<bool>) -> Self {
        self.open_endstop = Some(initial_state);
        self
    }

    /// Declare a close endstop, with its initial state if already known.
    pub fn with_close_endstop(mut self, initial_state: Option<bool>) -> Self {
        self.close_endstop = Some(initial_state);
        self
    }

    /// Position restored from the persisted-state store, if any.
    pub fn with_restored_position(mut self, position: f32) -> Self {
        self.restored_position = Some(position);
        self
    }

    /// Fallible build available in any type-state; returns a detailed
    /// `BuildError` for missing pieces.
    pub fn try_build(self) -> Result<CoverController> {
        let CoverBuilder {
            single_press,
            double_press,
            sink,
            clock,
            durations_ms,
            publish_period_ms,
            open_endstop,
            close_endstop,
            restored_position,
            _p: _,
            _d: _,
        } = self;

        let single_press =
            single_press.ok_or_else(|| eyre::Report::new(BuildError::MissingSinglePress))?;
        let double_press =
            double_press.ok_or_else(|| eyre::Report::new(BuildError::MissingDoublePress))?;
        let (open_duration_ms, close_duration_ms) =
            durations_ms.ok_or_else(|| eyre::Report::new(BuildError::MissingDurations))?;

        if open_duration_ms == 0 || close_duration_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "travel durations must be > 0",
            )));
        }
        let publish_period_ms = publish_period_ms.unwrap_or(1000);
        if publish_period_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "publish period must be > 0",
            )));
        }
        if let Some(restored) = restored_position
            && !(0.0..=1.0).contains(&restored)
        {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "restored position out of range",
            )));
        }

        let sink: Box<dyn StateSink> = sink.unwrap_or_else(|| Box::new(NoopSink));
        let clock: Arc<dyn Clock + Send + Sync> = match clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        let cfg = CoverCfg {
            open_duration_ms,
            close_duration_ms,
            publish_period_ms,
        };

        // Restore position, then reconcile it against endstop ground truth:
        // a triggered endstop forces the matching extreme; a released one
        // contradicts a restored extreme and degrades it to unknown.
        let mut position = restored_position.unwrap_or(UNKNOWN_POSITION);
        if let Some(Some(state)) = open_endstop {
            if state {
                position = 1.0;
            } else if position == 1.0 {
                position = UNKNOWN_POSITION;
            }
        }
        if let Some(Some(state)) = close_endstop {
            if state {
                position = 0.0;
            } else if position == 0.0 {
                position = UNKNOWN_POSITION;
            }
        }

        let epoch: Instant = clock.now();
        let (inbox_tx, inbox_rx) = xch::bounded(16);

        Ok(CoverController {
            single_press,
            double_press,
            sink,
            clock,
            epoch,
            cfg,
            inbox_tx,
            inbox_rx,
            open_endstop: open_endstop.map(|state| Endstop { state }),
            close_endstop: close_endstop.map(|state| Endstop { state }),
            position,
            target_position: position,
            current_operation: CoverOperation::Idle,
            prev_press: None,
            start_dir_time_ms: 0,
            last_recompute_ms: 0,
            last_publish_ms: 0,
        })
    }
}

// Setters that advance type-state when providing mandatory components
impl<D> CoverBuilder<Missing, D> {
    pub fn with_triggers(
        self,
        single_press: impl Trigger + 'static,
        double_press: impl Trigger + 'static,
    ) -> CoverBuilder<Set, D> {
        let CoverBuilder {
            single_press: _,
            double_press: _,
            sink,
            clock,
            durations_ms,
            publish_period_ms,
            open_endstop,
            close_endstop,
            restored_position,
            _p: _,
            _d: _,
        } = self;
        CoverBuilder {
            single_press: Some(Box::new(single_press)),
            double_press: Some(Box::new(double_press)),
            sink,
            clock,
            durations_ms,
            publish_period_ms,
            open_endstop,
            close_endstop,
            restored_position,
            _p: PhantomData,
            _d: PhantomData,
        }
    }
}

impl<P> CoverBuilder<P, Missing> {
    /// Calibrated full-travel times in milliseconds.
    pub fn with_durations_ms(
        self,
        open_duration_ms: u64,
        close_duration_ms: u64,
    ) -> CoverBuilder<P, Set> {
        let CoverBuilder {
            single_press,
            double_press,
            sink,
            clock,
            durations_ms: _,
            publish_period_ms,
            open_endstop,
            close_endstop,
            restored_position,
            _p: _,
            _d: _,
        } = self;
        CoverBuilder {
            single_press,
            double_press,
            sink,
            clock,
            durations_ms: Some((open_duration_ms, close_duration_ms)),
            publish_period_ms,
            open_endstop,
            close_endstop,
            restored_position,
            _p: PhantomData,
            _d: PhantomData,
        }
    }
}

impl CoverBuilder<Set, Set> {
    /// Validate and build the controller. Only available once triggers and
    /// durations are set.
    pub fn build(self) -> Result<CoverController> {
        self.try_build()
    }
}
