//! Error types for the bubble simulation.
//!
//! Nothing in here ever reaches a user. The simulation corrects itself
//! (NaN positions fall back to the viewport centre, a missing host leaves the
//! loop inert) and these values mostly end up in a `log::warn!`.

use std::fmt;

/// Top-level error enum for the bubble field.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// No display/animation host is available; the loop stays inert.
    HostUnavailable,

    /// The host reported a drawable area we cannot place walls in.
    InvalidViewport {
        /// Reported width in pixels.
        width: f32,
        /// Reported height in pixels.
        height: f32,
    },

    /// A tuning value is outside its safe operating range.
    InvalidTuning {
        /// Name of the field (for logging).
        field: &'static str,
        /// The value that was rejected.
        value: f64,
        /// Human-readable description of the safe range.
        reason: &'static str,
    },

    /// Tuning JSON could not be decoded.
    TuningParse(String),

    /// The sound-effect hook failed. Never affects simulation state.
    Sound(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::HostUnavailable => write!(f, "no display/animation host available"),
            SimError::InvalidViewport { width, height } => {
                write!(f, "invalid viewport {}x{} (need finite, positive size)", width, height)
            }
            SimError::InvalidTuning {
                field,
                value,
                reason,
            } => write!(f, "tuning '{}' = {} is invalid: {}", field, value, reason),
            SimError::TuningParse(msg) => write!(f, "failed to parse tuning: {}", msg),
            SimError::Sound(msg) => write!(f, "sound hook failed: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::TuningParse(err.to_string())
    }
}

/// Convenience alias: a `Result` using `SimError` as the error type.
pub type SimResult<T> = Result<T, SimError>;
