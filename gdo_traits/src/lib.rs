pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Momentary press actuator modeling a single tap on the door remote.
///
/// `fire` starts the press action; `cancel` aborts a still-running press
/// action and is a no-op once the action has finished. Neither call blocks
/// or reports errors: the press is fire-and-forget.
pub trait Trigger {
    fn fire(&mut self);
    fn cancel(&mut self);
}

/// Polled digital level read for the obstruction sensor line.
///
/// The falling-edge interrupt is attached by the hardware layer and feeds
/// the pulse counter directly; only the steady-level read goes through this
/// trait, and it is consulted exclusively when no pulses arrived in a
/// sampling window.
pub trait ObstructionPin {
    fn is_high(&mut self) -> bool;
}
