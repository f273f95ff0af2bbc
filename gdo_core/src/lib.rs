#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core cover-control logic (hardware-agnostic).
//!
//! This crate estimates and drives the position of a motorized door that
//! exposes only two binary endstops and accepts momentary button presses.
//! All hardware interactions go through `gdo_traits::Trigger` and
//! `gdo_traits::ObstructionPin` traits.
//!
//! ## Architecture
//!
//! - **Cover**: position/operation state machine with time-based position
//!   estimation between endstops (`cover` module)
//! - **Press selection**: pure decision table mapping an operation change to
//!   one of two momentary actuators (`cover::select_press`)
//! - **Obstruction**: pulse-train classifier for the obstruction line
//!   (`obstruction` module)
//! - **Counter**: the single ISR-shared datum, an atomic pulse counter
//!   (`counter` module)
//! - **Configuration**: runtime config structs (`config` module)
//!
//! Position is a normalized `f32` in `[0.0, 1.0]`: 0 is fully closed, 1 is
//! fully open, and exactly 0.5 is the "unknown" sentinel.

pub mod builder;
pub mod config;
pub mod counter;
pub mod cover;
pub mod error;
pub mod mocks;
pub mod obstruction;

pub use builder::{CoverBuilder, Missing, Set};
pub use config::{CoverCfg, ObstructionCfg};
pub use counter::{IsrCounter, PulseCounter};
pub use cover::{
    CoverCall, CoverController, CoverOperation, CoverTraits, EndstopEvent, EndstopSide, Press,
    StateSink, UNKNOWN_POSITION, select_press,
};
pub use error::{BuildError, Result};
pub use obstruction::ObstructionClassifier;
