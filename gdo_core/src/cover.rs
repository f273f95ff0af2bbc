//! Time-based endstop cover state machine.
//!
//! The physical controller only understands momentary button taps, so this
//! module tracks movement direction, estimates position by time-integration
//! between the two endstops, and arbitrates which of the two press actuators
//! realizes a requested operation change. Endstop ground truth always
//! overrides the estimate.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel as xch;
use gdo_traits::{Clock, Trigger};

use crate::config::CoverCfg;

/// Position reported when the cover location cannot be inferred, e.g. after
/// a restart with no endstop confirmation or a move that timed out. Callers
/// must treat exactly 0.5 as "unknown".
pub const UNKNOWN_POSITION: f32 = 0.5;

const OPEN: f32 = 1.0;
const CLOSED: f32 = 0.0;

/// Direction of travel currently commanded, if any. At most one operation is
/// active at a time; `Idle` means no active intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverOperation {
    Idle,
    Opening,
    Closing,
}

/// Which of the two momentary actuators a transition fires. A single tap is
/// the remote's primary gesture (start, stop-while-opening, close); the
/// double tap is reserved for reversing while already moving the other way
/// and for nudging further open from a partial position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    Single,
    Double,
}

/// One external command. A stop request always takes priority over a
/// position request carried in the same call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverCall {
    pub stop: bool,
    pub position: Option<f32>,
}

impl CoverCall {
    pub fn stop() -> Self {
        Self {
            stop: true,
            position: None,
        }
    }

    pub fn to_position(position: f32) -> Self {
        Self {
            stop: false,
            position: Some(position),
        }
    }
}

/// Declared capability set negotiated with the surrounding framework.
#[derive(Debug, Clone, Copy)]
pub struct CoverTraits {
    pub supports_stop: bool,
    pub supports_position: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndstopSide {
    Open,
    Close,
}

/// State-change notification from an endstop binary sensor.
///
/// Events are delivered through the controller's inbox and drained in order
/// at the start of each tick, so endstop handling never interleaves with
/// tick logic.
#[derive(Debug, Clone, Copy)]
pub struct EndstopEvent {
    pub side: EndstopSide,
    pub state: bool,
}

/// Sink for cover state broadcasts. `immediate` asks observers to refresh
/// right away instead of on their own polling schedule.
pub trait StateSink {
    fn publish(&mut self, position: f32, operation: CoverOperation, immediate: bool);
}

/// Cached view of an external endstop binary sensor. The controller only
/// mirrors the sensor's boolean; it does not own the sensor's lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Endstop {
    pub(crate) state: Option<bool>,
}

/// Decide which momentary press (if any) realizes a requested operation
/// change. Pure decision table: cancellation and firing happen in a separate
/// application step, which keeps this independently testable.
///
/// `None` means no transition is committed, either because the request is
/// redundant (same operation) or impossible at the current extreme.
pub fn select_press(
    current: CoverOperation,
    requested: CoverOperation,
    position: f32,
) -> Option<Press> {
    use CoverOperation::{Closing, Idle, Opening};

    if requested == current {
        return None;
    }
    match (requested, current) {
        (Idle, Opening) => Some(Press::Single),
        (Idle, Closing) => Some(Press::Double),
        (Opening, Idle) => {
            if position == CLOSED {
                Some(Press::Single)
            } else if position == OPEN {
                // Already fully open; cannot open more.
                None
            } else {
                Some(Press::Double)
            }
        }
        (Opening, Closing) => Some(Press::Single),
        (Closing, Idle) => {
            if position == CLOSED {
                // Already fully closed; cannot close more.
                None
            } else {
                Some(Press::Single)
            }
        }
        (Closing, Opening) => Some(Press::Double),
        _ => None,
    }
}

/// Cover position/state machine driving two momentary press actuators.
pub struct CoverController {
    pub(crate) single_press: Box<dyn Trigger>,
    pub(crate) double_press: Box<dyn Trigger>,
    pub(crate) sink: Box<dyn StateSink>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) cfg: CoverCfg,

    pub(crate) inbox_tx: xch::Sender<EndstopEvent>,
    pub(crate) inbox_rx: xch::Receiver<EndstopEvent>,
    pub(crate) open_endstop: Option<Endstop>,
    pub(crate) close_endstop: Option<Endstop>,

    pub(crate) position: f32,
    pub(crate) target_position: f32,
    pub(crate) current_operation: CoverOperation,
    // Which actuator fired last, so a new transition can cancel a
    // still-running press action before firing its own.
    pub(crate) prev_press: Option<Press>,
    pub(crate) start_dir_time_ms: u64,
    pub(crate) last_recompute_ms: u64,
    pub(crate) last_publish_ms: u64,
}

impl core::fmt::Debug for CoverController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CoverController")
            .field("position", &self.position)
            .field("target_position", &self.target_position)
            .field("operation", &self.current_operation)
            .finish()
    }
}

impl CoverController {
    /// Start building a controller.
    pub fn builder() -> crate::builder::CoverBuilder<crate::builder::Missing, crate::builder::Missing>
    {
        crate::builder::CoverBuilder::default()
    }

    /// Estimated position in `[0.0, 1.0]`; exactly 0.5 means unknown.
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn operation(&self) -> CoverOperation {
        self.current_operation
    }

    pub fn target_position(&self) -> f32 {
        self.target_position
    }

    /// Capabilities: stop and absolute position, no discrete open/close.
    pub fn traits(&self) -> CoverTraits {
        CoverTraits {
            supports_stop: true,
            supports_position: true,
        }
    }

    /// Sender half of the endstop event inbox, for the binary-sensor side.
    pub fn endstop_sender(&self) -> xch::Sender<EndstopEvent> {
        self.inbox_tx.clone()
    }

    /// Sole external command entry point.
    pub fn control(&mut self, call: CoverCall) {
        if call.stop {
            self.start_direction(CoverOperation::Idle, true);
            self.publish(true);
        }
        if let Some(pos) = call.position {
            let pos = pos.clamp(CLOSED, OPEN);
            if pos == self.position {
                tracing::info!(position = pos, "nothing to do, already at target position");
            } else {
                let op = if pos < self.position {
                    CoverOperation::Closing
                } else {
                    CoverOperation::Opening
                };
                self.target_position = pos;
                self.start_direction(op, true);
            }
        }
    }

    /// Periodic tick: drains the endstop inbox, re-estimates position, and
    /// resolves target-reached / timeout conditions. Call every loop cycle.
    pub fn tick(&mut self) {
        self.drain_endstop_events();

        if self.current_operation == CoverOperation::Idle {
            return;
        }

        let now = self.now_ms();
        self.recompute_position();

        if self.is_at_target() {
            if self.target_position == OPEN || self.target_position == CLOSED {
                // Don't fire a stop; the door halts itself at the endstop.
                self.current_operation = CoverOperation::Idle;
            } else {
                self.start_direction(CoverOperation::Idle, true);
            }
            self.publish(true);
        } else if self.move_timed_out(now) {
            tracing::info!("failed to reach endstop, likely stopped externally");
            self.position = UNKNOWN_POSITION;
            self.current_operation = CoverOperation::Idle;
            self.publish(true);
        }

        // Periodic broadcast for observers that poll rather than subscribe.
        if now.saturating_sub(self.last_publish_ms) > self.cfg.publish_period_ms {
            self.publish(false);
        }
    }

    fn drain_endstop_events(&mut self) {
        while let Ok(ev) = self.inbox_rx.try_recv() {
            self.apply_endstop_event(ev);
        }
    }

    fn apply_endstop_event(&mut self, ev: EndstopEvent) {
        {
            let cache = match ev.side {
                EndstopSide::Open => &mut self.open_endstop,
                EndstopSide::Close => &mut self.close_endstop,
            };
            let Some(endstop) = cache else {
                tracing::warn!(side = ?ev.side, "endstop event for unconfigured endstop");
                return;
            };
            endstop.state = Some(ev.state);
        }

        match (ev.side, ev.state) {
            (EndstopSide::Open, true) => {
                let took_ms = self.now_ms().saturating_sub(self.start_dir_time_ms);
                tracing::info!(took_ms, "open endstop reached");
                self.position = OPEN;
                self.target_position = OPEN;
                self.current_operation = CoverOperation::Idle;
                self.publish(true);
            }
            (EndstopSide::Open, false) => {
                // Moved away from the open endstop. If this was externally
                // triggered, assume the target is fully closed and start
                // tracking without firing a press.
                tracing::info!("open endstop released");
                if self.current_operation == CoverOperation::Idle {
                    self.target_position = CLOSED;
                    self.start_direction(CoverOperation::Closing, false);
                }
            }
            (EndstopSide::Close, true) => {
                let took_ms = self.now_ms().saturating_sub(self.start_dir_time_ms);
                tracing::info!(took_ms, "closed endstop reached");
                self.position = CLOSED;
                self.target_position = CLOSED;
                self.current_operation = CoverOperation::Idle;
                self.publish(true);
            }
            (EndstopSide::Close, false) => {
                tracing::info!("closed endstop released");
                if self.current_operation == CoverOperation::Idle {
                    self.target_position = OPEN;
                    self.start_direction(CoverOperation::Opening, false);
                }
            }
        }
    }

    /// Commit an operation change and fire the selected press.
    ///
    /// Transitions caused by an endstop release pass `perform_press = false`:
    /// the motion is already physically underway, so only the bookkeeping
    /// (operation, timestamps) is updated.
    fn start_direction(&mut self, dir: CoverOperation, perform_press: bool) {
        if dir == self.current_operation {
            tracing::info!(operation = ?dir, "nothing to do, operation unchanged");
            return;
        }

        self.recompute_position();
        let Some(press) = select_press(self.current_operation, dir, self.position) else {
            match dir {
                CoverOperation::Opening => {
                    tracing::warn!("door is fully open, cannot open more");
                }
                CoverOperation::Closing => {
                    tracing::warn!("door is fully closed, cannot close more");
                }
                CoverOperation::Idle => {}
            }
            return;
        };
        tracing::info!(
            from = ?self.current_operation,
            to = ?dir,
            press = ?press,
            position = self.position,
            "transition"
        );

        self.current_operation = dir;
        let now = self.now_ms();
        self.start_dir_time_ms = now;
        self.last_recompute_ms = now;

        if perform_press {
            self.cancel_prev_press();
            self.press_mut(press).fire();
            self.prev_press = Some(press);
        }
    }

    fn cancel_prev_press(&mut self) {
        if let Some(prev) = self.prev_press.take() {
            self.press_mut(prev).cancel();
        }
    }

    fn press_mut(&mut self, press: Press) -> &mut dyn Trigger {
        match press {
            Press::Single => self.single_press.as_mut(),
            Press::Double => self.double_press.as_mut(),
        }
    }

    /// Ground truth from an endstop overrides the estimate when moving
    /// toward the matching extreme; otherwise compare the estimate against
    /// the target in the direction of travel.
    fn is_at_target(&self) -> bool {
        match self.current_operation {
            CoverOperation::Opening => {
                if self.target_position == OPEN
                    && let Some(endstop) = self.open_endstop
                {
                    return endstop.state.unwrap_or(false);
                }
                self.position >= self.target_position
            }
            CoverOperation::Closing => {
                if self.target_position == CLOSED
                    && let Some(endstop) = self.close_endstop
                {
                    return endstop.state.unwrap_or(false);
                }
                self.position <= self.target_position
            }
            CoverOperation::Idle => true,
        }
    }

    /// The motor ran the full calibrated duration without the endstop
    /// confirming: probably stopped externally. Only applies when the
    /// relevant endstop exists.
    fn move_timed_out(&self, now: u64) -> bool {
        let elapsed = now.saturating_sub(self.start_dir_time_ms);
        match self.current_operation {
            CoverOperation::Opening => {
                self.open_endstop.is_some() && elapsed > self.cfg.open_duration_ms
            }
            CoverOperation::Closing => {
                self.close_endstop.is_some() && elapsed > self.cfg.close_duration_ms
            }
            CoverOperation::Idle => false,
        }
    }

    /// Advance the estimate linearly at `±1 / duration` per millisecond
    /// elapsed since the last recompute, clamped to `[0, 1]`. No-op while
    /// idle.
    fn recompute_position(&mut self) {
        let (dir, duration_ms) = match self.current_operation {
            CoverOperation::Opening => (1.0f32, self.cfg.open_duration_ms),
            CoverOperation::Closing => (-1.0f32, self.cfg.close_duration_ms),
            CoverOperation::Idle => return,
        };
        let now = self.now_ms();
        let elapsed = now.saturating_sub(self.last_recompute_ms);
        self.position += dir * (elapsed as f32) / (duration_ms.max(1) as f32);
        self.position = self.position.clamp(CLOSED, OPEN);
        self.last_recompute_ms = now;
    }

    fn publish(&mut self, immediate: bool) {
        self.sink
            .publish(self.position, self.current_operation, immediate);
        if !immediate {
            self.last_publish_ms = self.now_ms();
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::CoverOperation::{Closing, Idle, Opening};
    use super::{Press, UNKNOWN_POSITION, select_press};

    #[test]
    fn same_operation_is_a_noop() {
        for op in [Idle, Opening, Closing] {
            for pos in [0.0, UNKNOWN_POSITION, 1.0] {
                assert_eq!(select_press(op, op, pos), None);
            }
        }
    }

    #[test]
    fn stop_press_depends_on_direction() {
        assert_eq!(select_press(Opening, Idle, 0.7), Some(Press::Single));
        assert_eq!(select_press(Closing, Idle, 0.7), Some(Press::Double));
    }

    #[test]
    fn open_from_idle_depends_on_position() {
        assert_eq!(select_press(Idle, Opening, 0.0), Some(Press::Single));
        assert_eq!(select_press(Idle, Opening, 1.0), None);
        assert_eq!(select_press(Idle, Opening, 0.4), Some(Press::Double));
    }

    #[test]
    fn close_from_idle_depends_on_position() {
        assert_eq!(select_press(Idle, Closing, 0.0), None);
        assert_eq!(select_press(Idle, Closing, 1.0), Some(Press::Single));
        assert_eq!(select_press(Idle, Closing, 0.4), Some(Press::Single));
    }

    #[test]
    fn reversals_while_moving() {
        assert_eq!(select_press(Closing, Opening, 0.4), Some(Press::Single));
        assert_eq!(select_press(Opening, Closing, 0.4), Some(Press::Double));
    }
}
