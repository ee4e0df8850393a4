//! Reason codes for every state machine step

use serde::{Deserialize, Serialize};

/// Why a step left the machine where it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R001: Phase maintained
    // =========================================================================
    /// IDLE, sample below impact and basket thresholds
    R001_IDLE_NO_TRIGGER,
    /// IMPACT_DETECTED, still inside the basket window
    R001_AWAITING_BASKET,
    /// BLACKOUT, sample discarded
    R001_BLACKOUT_ACTIVE,
    /// Sample older than one already stepped, discarded
    R001_STALE_SAMPLE,

    // =========================================================================
    // R002: Phase transitions without a shot
    // =========================================================================
    /// IDLE → IMPACT_DETECTED
    R002_IMPACT_DETECTED,
    /// BLACKOUT → IDLE, cooldown over
    R002_BLACKOUT_EXPIRED,

    // =========================================================================
    // R003: Shot completed
    // =========================================================================
    /// Basket reading inside the window after an impact
    R003_MAKE_AFTER_IMPACT,
    /// Basket reading with no impact before it
    R003_STANDALONE_MAKE,
    /// Window after an impact elapsed without a basket reading
    R003_MISS_TIMEOUT,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R001_IDLE_NO_TRIGGER => "R001_IDLE_NO_TRIGGER",
            Self::R001_AWAITING_BASKET => "R001_AWAITING_BASKET",
            Self::R001_BLACKOUT_ACTIVE => "R001_BLACKOUT_ACTIVE",
            Self::R001_STALE_SAMPLE => "R001_STALE_SAMPLE",
            Self::R002_IMPACT_DETECTED => "R002_IMPACT_DETECTED",
            Self::R002_BLACKOUT_EXPIRED => "R002_BLACKOUT_EXPIRED",
            Self::R003_MAKE_AFTER_IMPACT => "R003_MAKE_AFTER_IMPACT",
            Self::R003_STANDALONE_MAKE => "R003_STANDALONE_MAKE",
            Self::R003_MISS_TIMEOUT => "R003_MISS_TIMEOUT",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R001_IDLE_NO_TRIGGER => "Waiting for impact or basket",
            Self::R001_AWAITING_BASKET => "Impact seen, waiting for basket",
            Self::R001_BLACKOUT_ACTIVE => "Cooldown, sample ignored",
            Self::R001_STALE_SAMPLE => "Out of order, sample ignored",
            Self::R002_IMPACT_DETECTED => "Impact detected",
            Self::R002_BLACKOUT_EXPIRED => "Cooldown over",
            Self::R003_MAKE_AFTER_IMPACT => "Basket after impact",
            Self::R003_STANDALONE_MAKE => "Basket without impact",
            Self::R003_MISS_TIMEOUT => "No basket after impact",
        }
    }

    /// Did this step complete a shot?
    pub fn completes_shot(&self) -> bool {
        matches!(
            self,
            Self::R003_MAKE_AFTER_IMPACT | Self::R003_STANDALONE_MAKE | Self::R003_MISS_TIMEOUT
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
