//! Test and helper mocks for gdo_core.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gdo_traits::{Clock, ObstructionPin, Trigger};

use crate::cover::{CoverOperation, StateSink};

/// Sink that drops every broadcast; useful when observers read the
/// controller state directly instead of subscribing.
pub struct NoopSink;

impl StateSink for NoopSink {
    fn publish(&mut self, _position: f32, _operation: CoverOperation, _immediate: bool) {}
}

#[derive(Default)]
struct SpyTriggerState {
    fired: u32,
    cancelled: u32,
}

/// Trigger spy recording fire/cancel counts, shareable with the test body
/// through clones.
#[derive(Clone, Default)]
pub struct SpyTrigger {
    state: Arc<Mutex<SpyTriggerState>>,
}

impl SpyTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> u32 {
        self.state.lock().map(|s| s.fired).unwrap_or(0)
    }

    pub fn cancelled(&self) -> u32 {
        self.state.lock().map(|s| s.cancelled).unwrap_or(0)
    }
}

impl Trigger for SpyTrigger {
    fn fire(&mut self) {
        if let Ok(mut s) = self.state.lock() {
            s.fired += 1;
        }
    }

    fn cancel(&mut self) {
        if let Ok(mut s) = self.state.lock() {
            s.cancelled += 1;
        }
    }
}

/// Sink that records every broadcast for later assertions.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<(f32, CoverOperation, bool)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(f32, CoverOperation, bool)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<(f32, CoverOperation, bool)> {
        self.events.lock().ok().and_then(|e| e.last().copied())
    }
}

impl StateSink for RecordingSink {
    fn publish(&mut self, position: f32, operation: CoverOperation, immediate: bool) {
        if let Ok(mut e) = self.events.lock() {
            e.push((position, operation, immediate));
        }
    }
}

/// Deterministic clock advanced manually by tests.
///
/// now() = origin + offset; advancing never sleeps.
#[derive(Clone)]
pub struct ManualClock {
    origin: Instant,
    offset_ms: Arc<AtomicU64>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.offset_ms.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::Relaxed))
    }
}

/// Obstruction line level settable from the test body.
#[derive(Clone)]
pub struct LevelPin {
    high: Arc<AtomicBool>,
}

impl LevelPin {
    pub fn new(high: bool) -> Self {
        Self {
            high: Arc::new(AtomicBool::new(high)),
        }
    }

    pub fn set_high(&self, high: bool) {
        self.high.store(high, Ordering::Relaxed);
    }
}

impl ObstructionPin for LevelPin {
    fn is_high(&mut self) -> bool {
        self.high.load(Ordering::Relaxed)
    }
}
