//! ISR-shared pulse counter.
//!
//! The falling-edge count is the only state touched from both the interrupt
//! context and the main polling context. The interrupt side may only
//! increment; the poll side may only snapshot-and-reset. Raw reads and
//! writes are never exposed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Accumulated falling-edge count for one sampling window.
#[derive(Debug, Default)]
pub struct PulseCounter {
    count: Arc<AtomicU32>,
}

/// Increment-only handle intended to be moved into the interrupt handler.
/// The increment is a single relaxed atomic add: no allocation, no locking,
/// no logging.
#[derive(Debug, Clone)]
pub struct IsrCounter {
    count: Arc<AtomicU32>,
}

impl PulseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isr_handle(&self) -> IsrCounter {
        IsrCounter {
            count: Arc::clone(&self.count),
        }
    }

    /// Snapshot the accumulated count and reset it to zero in one atomic
    /// step. An increment racing with the swap lands in the next window, so
    /// no pulse is lost or counted twice.
    pub fn take(&self) -> u32 {
        self.count.swap(0, Ordering::Relaxed)
    }
}

impl IsrCounter {
    #[inline]
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::PulseCounter;

    #[test]
    fn take_returns_accumulated_and_resets() {
        let counter = PulseCounter::new();
        let isr = counter.isr_handle();
        for _ in 0..5 {
            isr.increment();
        }
        assert_eq!(counter.take(), 5);
        assert_eq!(counter.take(), 0);
    }

    #[test]
    fn increments_after_take_land_in_next_window() {
        let counter = PulseCounter::new();
        let isr = counter.isr_handle();
        isr.increment();
        assert_eq!(counter.take(), 1);
        isr.increment();
        isr.increment();
        assert_eq!(counter.take(), 2);
    }
}
