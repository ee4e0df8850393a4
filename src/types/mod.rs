//! Core types for HoopSense

mod phase;
mod sample;
mod shot;
mod config;
mod reason;
mod output;
mod error;
mod tally;

pub use phase::{ClassifierPhase, ClassifierState};
pub use sample::{
    AccelSample, DistanceSample, RawSample, SensorKind, SensorRow, TaggedSample, Timestamp,
    is_sentinel_distance, timestamp_from_ms, timestamp_micros,
};
pub use shot::{BasketType, Classification, ShotEvent};
pub use config::ThresholdConfig;
pub use reason::ReasonCode;
pub use output::StepOutput;
pub use error::{ClassifierError, ConfigError};
pub use tally::ShotTally;
