use thiserror::Error;

/// Construction-time failures. The running core never returns errors:
/// anomalies (redundant commands, refused moves, endstop timeouts) are
/// handled as state transitions plus a logged diagnostic.
#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing single press trigger")]
    MissingSinglePress,
    #[error("missing double press trigger")]
    MissingDoublePress,
    #[error("missing travel durations")]
    MissingDurations,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
