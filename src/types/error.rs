//! Error types

use thiserror::Error;
use crate::types::{ClassifierPhase, SensorKind, Timestamp};

/// Failures surfaced by ingestion and the state machine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// A sensor's timestamps went backwards
    #[error("{sensor} samples out of order: {offending:.3}s after {previous:.3}s")]
    InputOrdering {
        sensor: SensorKind,
        previous: Timestamp,
        offending: Timestamp,
    },

    #[error("invalid {sensor} sample at {timestamp}: {reason}")]
    InvalidSample {
        sensor: SensorKind,
        timestamp: Timestamp,
        reason: &'static str,
    },

    /// Explicit time check earlier than the last processed sample
    #[error("clock moved backwards: {requested:.3}s is before {last:.3}s")]
    ClockRegression {
        last: Timestamp,
        requested: Timestamp,
    },

    #[error("explicit time check needs a finite timestamp, got {requested}")]
    NonFiniteClock { requested: Timestamp },

    /// Reached a phase/sample combination the machine never persists
    #[error("internal state fault: {phase} observed on {sensor:?} step")]
    InternalState {
        phase: ClassifierPhase,
        sensor: Option<SensorKind>,
    },
}

/// Failures building a `ThresholdConfig`
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_message_names_sensor_and_times() {
        let err = ClassifierError::InputOrdering {
            sensor: SensorKind::Distance,
            previous: 10.5,
            offending: 10.25,
        };
        assert_eq!(
            err.to_string(),
            "DISTANCE samples out of order: 10.250s after 10.500s"
        );
    }
}
