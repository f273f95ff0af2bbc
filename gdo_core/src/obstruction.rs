//! Obstruction line classifier.
//!
//! The obstruction sensor has three electrical states: clear (high with a
//! low pulse every ~7 ms), obstructed (steady high), asleep (steady low).
//! The transitions between awake and asleep are the tricky part: the voltage
//! drops slowly when falling asleep and is high without pulses right after
//! waking up, so a steady-high window only counts as obstructed once the
//! line has been pulse-free and high for longer than the sleep grace period.

use std::sync::Arc;
use std::time::Instant;

use gdo_traits::{Clock, ObstructionPin};

use crate::config::ObstructionCfg;
use crate::counter::{IsrCounter, PulseCounter};

/// Converts the interrupt-counted pulse train into a debounced obstruction
/// boolean, evaluated on a fixed cadence.
pub struct ObstructionClassifier<P: ObstructionPin> {
    counter: PulseCounter,
    pin: P,
    cfg: ObstructionCfg,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    last_check_ms: u64,
    // Initialized to the construction timestamp so the first windows after
    // boot cannot satisfy the grace check retroactively.
    last_asleep_ms: u64,
    state: Option<bool>,
}

impl<P: ObstructionPin> ObstructionClassifier<P> {
    pub fn new(pin: P, cfg: ObstructionCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self {
            counter: PulseCounter::new(),
            pin,
            cfg,
            clock,
            epoch,
            last_check_ms: 0,
            last_asleep_ms: 0,
            state: None,
        }
    }

    /// Handle for the falling-edge interrupt to increment.
    pub fn isr_handle(&self) -> IsrCounter {
        self.counter.isr_handle()
    }

    /// Last debounced obstruction state, if one has been classified yet.
    pub fn state(&self) -> Option<bool> {
        self.state
    }

    /// Sample the pulse counter if a full window has elapsed since the last
    /// evaluation. May be called arbitrarily often; between window
    /// boundaries it returns `None` without consuming pulses. Returns the
    /// new debounced state only when it changed.
    pub fn poll(&mut self) -> Option<bool> {
        let now = self.clock.ms_since(self.epoch);
        if now.saturating_sub(self.last_check_ms) <= self.cfg.check_period_ms {
            return None;
        }

        let pulses = self.counter.take();
        let mut classified = None;
        if pulses > self.cfg.pulse_lower_limit {
            // Actively toggling: awake and clear.
            classified = Some(false);
        } else if pulses == 0 {
            if !self.pin.is_high() {
                // Steady low: asleep.
                self.last_asleep_ms = now;
            } else if now.saturating_sub(self.last_asleep_ms) > self.cfg.sleep_grace_ms {
                // Steady high well past the wake-up plateau: obstructed.
                classified = Some(true);
            }
        }
        // 1..=pulse_lower_limit pulses is an inconclusive awake state.
        self.last_check_ms = now;

        match classified {
            Some(obstructed) if self.state != Some(obstructed) => {
                tracing::debug!(obstructed, pulses, "obstruction state change");
                self.state = Some(obstructed);
                Some(obstructed)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::ObstructionClassifier;
    use crate::config::ObstructionCfg;
    use crate::mocks::{LevelPin, ManualClock};

    fn classifier(
        pin: LevelPin,
        clock: &ManualClock,
    ) -> ObstructionClassifier<LevelPin> {
        ObstructionClassifier::new(pin, ObstructionCfg::default(), Arc::new(clock.clone()))
    }

    #[test]
    fn poll_is_a_noop_between_window_boundaries() {
        let clock = ManualClock::new();
        let pin = LevelPin::new(true);
        let mut cls = classifier(pin, &clock);
        let isr = cls.isr_handle();

        for _ in 0..4 {
            isr.increment();
        }
        clock.advance_ms(10);
        assert_eq!(cls.poll(), None);
        // Pulses were not consumed; the full window still sees all 4.
        clock.advance_ms(41);
        assert_eq!(cls.poll(), Some(false));
    }

    #[test]
    fn few_pulses_are_inconclusive() {
        let clock = ManualClock::new();
        let pin = LevelPin::new(true);
        let mut cls = classifier(pin, &clock);
        let isr = cls.isr_handle();

        isr.increment();
        isr.increment();
        clock.advance_ms(51);
        assert_eq!(cls.poll(), None);
        assert_eq!(cls.state(), None);
    }

    #[test]
    fn repeated_clear_windows_publish_once() {
        let clock = ManualClock::new();
        let pin = LevelPin::new(true);
        let mut cls = classifier(pin, &clock);
        let isr = cls.isr_handle();

        for _ in 0..8 {
            isr.increment();
        }
        clock.advance_ms(51);
        assert_eq!(cls.poll(), Some(false));

        for _ in 0..8 {
            isr.increment();
        }
        clock.advance_ms(51);
        assert_eq!(cls.poll(), None);
        assert_eq!(cls.state(), Some(false));
    }
}
