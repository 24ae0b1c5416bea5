use crate::lights::LightId;
use crate::models::phase::Phase;
use std::io;

/// Rejection of a timing configuration. Raised before any timer is armed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required timing configuration: {field}")]
    MissingField { field: &'static str },

    #[error("Yellow light duration must be at least 1 second ({field} = {actual_ms} ms, minimum {min_ms} ms)")]
    YellowTooShort {
        field: &'static str,
        actual_ms: u64,
        min_ms: u64,
    },

    #[error("Pedestrian green light duration must be at least 3 seconds (PEDESTRIAN.green = {actual_ms} ms, minimum {min_ms} ms)")]
    PedestrianGreenTooShort { actual_ms: u64, min_ms: u64 },

    #[error("Blink interval must be at least {min_ms} ms (BLINK_INTERVAL = {actual_ms} ms)")]
    BlinkIntervalTooShort { actual_ms: u64, min_ms: u64 },
}

/// Failure to load a timing configuration from disk or text.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read timing configuration: {0}")]
    Io(#[from] io::Error),

    #[error("could not parse timing configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigValidationError),
}

/// A pedestrian-only operation was invoked on a vehicle signal head.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} is only available for pedestrian lights ({light} is a vehicle light)")]
pub struct OperationNotSupportedError {
    pub operation: &'static str,
    pub light: LightId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] ConfigValidationError),

    #[error("intersection controller must be created inside a tokio runtime")]
    NoRuntime,

    #[error("interlock refused {light} -> {requested}: {reason}")]
    ConflictingGreens {
        light: LightId,
        requested: &'static str,
        reason: &'static str,
    },

    #[error("lights do not match phase {phase:?} (main {main}, side {side}, pedestrian {pedestrian})")]
    PhaseMismatch {
        phase: Phase,
        main: &'static str,
        side: &'static str,
        pedestrian: &'static str,
    },

    #[error("intersection controller has been disposed")]
    Disposed,

    #[error("intersection state lock poisoned")]
    Poisoned,
}
