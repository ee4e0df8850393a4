//! Per-step output of the state machine

use serde::{Deserialize, Serialize};
use crate::types::{ClassifierPhase, ReasonCode, SensorKind, ShotEvent, Timestamp};

/// Result of feeding one sample (or one explicit time check) to the machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    /// Sensor time of the step
    pub timestamp: Timestamp,
    /// Stream that produced the step; `None` for explicit time checks
    pub sensor: Option<SensorKind>,
    /// Phase after the step
    pub phase: ClassifierPhase,
    /// Why the machine is in `phase`
    pub reason: ReasonCode,
    /// Shot completed by this step
    pub event: Option<ShotEvent>,
}

impl StepOutput {
    pub fn new(
        timestamp: Timestamp,
        sensor: Option<SensorKind>,
        phase: ClassifierPhase,
        reason: ReasonCode,
        event: Option<ShotEvent>,
    ) -> Self {
        Self { timestamp, sensor, phase, reason, event }
    }

    /// Did the phase change or a shot complete?
    pub fn is_transition(&self) -> bool {
        !matches!(
            self.reason,
            ReasonCode::R001_IDLE_NO_TRIGGER
                | ReasonCode::R001_AWAITING_BASKET
                | ReasonCode::R001_BLACKOUT_ACTIVE
                | ReasonCode::R001_STALE_SAMPLE
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        let sensor = match self.sensor {
            Some(sensor) => sensor.to_string(),
            None => "CLOCK".to_string(),
        };
        format!(
            "t={:.3} | sensor={} | phase={} | reason={}",
            self.timestamp,
            sensor,
            self.phase,
            self.reason.code()
        )
    }
}
