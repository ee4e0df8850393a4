//! Classifier phase definitions

use serde::{Deserialize, Serialize};
use crate::types::Timestamp;

/// The four phases of the shot state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassifierPhase {
    /// Waiting for an impact or a standalone basket reading
    Idle,
    /// Impact seen, waiting for a basket reading or the timeout
    ImpactDetected,
    /// Transient; collapsed into the transition that produced it
    BasketDetected,
    /// Cooldown after a completed shot
    Blackout,
}

impl ClassifierPhase {
    /// Get emoji for phase
    pub fn emoji(&self) -> &'static str {
        match self {
            ClassifierPhase::Idle => "⏳",
            ClassifierPhase::ImpactDetected => "💥",
            ClassifierPhase::BasketDetected => "🏀",
            ClassifierPhase::Blackout => "⛔",
        }
    }
}

impl std::fmt::Display for ClassifierPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClassifierPhase::Idle => "IDLE",
            ClassifierPhase::ImpactDetected => "IMPACT_DETECTED",
            ClassifierPhase::BasketDetected => "BASKET_DETECTED",
            ClassifierPhase::Blackout => "BLACKOUT",
        };
        write!(f, "{}", name)
    }
}

/// Mutable timing context owned by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierState {
    /// Current phase
    pub phase: ClassifierPhase,
    /// Timestamp of the impact being tracked
    pub impact_time: Option<Timestamp>,
    /// When the current phase began
    pub state_start_time: Option<Timestamp>,
}

impl Default for ClassifierState {
    fn default() -> Self {
        Self::idle()
    }
}

impl ClassifierState {
    /// Initial state
    pub fn idle() -> Self {
        Self {
            phase: ClassifierPhase::Idle,
            impact_time: None,
            state_start_time: None,
        }
    }

    /// Impact recorded at `timestamp`
    pub fn impact(timestamp: Timestamp) -> Self {
        Self {
            phase: ClassifierPhase::ImpactDetected,
            impact_time: Some(timestamp),
            state_start_time: Some(timestamp),
        }
    }

    /// Cooldown starting at `timestamp`; the impact that led here is kept for inspection
    pub fn blackout(timestamp: Timestamp, impact_time: Option<Timestamp>) -> Self {
        Self {
            phase: ClassifierPhase::Blackout,
            impact_time,
            state_start_time: Some(timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(ClassifierPhase::Idle.to_string(), "IDLE");
        assert_eq!(ClassifierPhase::ImpactDetected.to_string(), "IMPACT_DETECTED");
        assert_eq!(ClassifierPhase::Blackout.to_string(), "BLACKOUT");
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&ClassifierPhase::ImpactDetected).unwrap();
        assert_eq!(json, "\"IMPACT_DETECTED\"");
    }

    #[test]
    fn test_default_is_idle() {
        let state = ClassifierState::default();
        assert_eq!(state.phase, ClassifierPhase::Idle);
        assert!(state.impact_time.is_none());
        assert!(state.state_start_time.is_none());
    }
}
