#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the door controller.
//!
//! `Config` and sub-structs are deserialized from TOML and validated.
//! Travel durations and the obstruction input pin are required; endstops
//! and tuning knobs are optional with the core's defaults.

use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub cover: Cover,
    pub obstruction: Obstruction,
    #[serde(default)]
    pub logging: Logging,
}

/// Cover travel calibration and endstop wiring.
#[derive(Debug, Deserialize)]
pub struct Cover {
    /// Full travel time from closed to open (ms). Required.
    pub open_duration_ms: u64,
    /// Full travel time from open to closed (ms). Required.
    pub close_duration_ms: u64,
    /// Id of the binary sensor acting as open endstop, if wired.
    #[serde(default)]
    pub open_endstop: Option<String>,
    /// Id of the binary sensor acting as close endstop, if wired.
    #[serde(default)]
    pub close_endstop: Option<String>,
    /// Non-forced state broadcast cadence while moving (ms).
    #[serde(default = "default_publish_period_ms")]
    pub publish_period_ms: u64,
}

/// Obstruction sensor wiring and classifier tuning.
#[derive(Debug, Deserialize)]
pub struct Obstruction {
    /// GPIO number carrying the obstruction pulse line. Required.
    pub input_pin: u8,
    #[serde(default = "default_check_period_ms")]
    pub check_period_ms: u64,
    #[serde(default = "default_pulse_lower_limit")]
    pub pulse_lower_limit: u32,
    #[serde(default = "default_sleep_grace_ms")]
    pub sleep_grace_ms: u64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    /// "trace" | "debug" | "info" | "warn" | "error"
    pub level: Option<String>,
    /// Path to a log file; stderr when absent.
    pub file: Option<String>,
}

fn default_publish_period_ms() -> u64 {
    1000
}

fn default_check_period_ms() -> u64 {
    50
}

fn default_pulse_lower_limit() -> u32 {
    3
}

fn default_sleep_grace_ms() -> u64 {
    700
}

impl Config {
    pub fn from_toml_str(s: &str) -> eyre::Result<Self> {
        let config: Self = toml::from_str(s).wrap_err("parsing config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> eyre::Result<Self> {
        let s = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.cover.open_duration_ms == 0 || self.cover.close_duration_ms == 0 {
            eyre::bail!("cover durations must be > 0");
        }
        if self.cover.publish_period_ms == 0 {
            eyre::bail!("publish_period_ms must be > 0");
        }
        if self.obstruction.check_period_ms == 0 {
            eyre::bail!("obstruction check_period_ms must be > 0");
        }
        if self.obstruction.sleep_grace_ms < self.obstruction.check_period_ms {
            eyre::bail!("sleep_grace_ms must cover at least one sampling window");
        }
        if let Some(level) = &self.logging.level
            && !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error")
        {
            eyre::bail!("unknown logging level: {level}");
        }
        Ok(())
    }
}
