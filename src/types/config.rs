//! Threshold configuration
//!
//! Built once, validated, then handed to the classifier by value. Nothing
//! mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::{
    DEFAULT_IMPACT_ACCEL_THRESHOLD, DEFAULT_TOF_DISTANCE_THRESHOLD,
    DEFAULT_TOF_SIGNAL_RATE_THRESHOLD, DEFAULT_MAX_TIME_AFTER_IMPACT, DEFAULT_BLACKOUT_WINDOW,
};
use crate::types::ConfigError;

/// Numeric constants governing every classification decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Impact when magnitude exceeds this (g)
    pub impact_accel_threshold: f64,
    /// Basket when distance is below this (mm)
    pub tof_distance_threshold: u16,
    /// Basket requires signal rate above this
    pub tof_signal_rate_threshold: f64,
    /// Seconds after an impact in which a basket still counts
    pub max_time_after_impact: f64,
    /// Seconds of cooldown after a completed shot
    pub blackout_window: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            impact_accel_threshold: DEFAULT_IMPACT_ACCEL_THRESHOLD,
            tof_distance_threshold: DEFAULT_TOF_DISTANCE_THRESHOLD,
            tof_signal_rate_threshold: DEFAULT_TOF_SIGNAL_RATE_THRESHOLD,
            max_time_after_impact: DEFAULT_MAX_TIME_AFTER_IMPACT,
            blackout_window: DEFAULT_BLACKOUT_WINDOW,
        }
    }
}

impl ThresholdConfig {
    /// Check that every threshold is positive and finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("impact_accel_threshold", self.impact_accel_threshold),
            ("tof_distance_threshold", f64::from(self.tof_distance_threshold)),
            ("tof_signal_rate_threshold", self.tof_signal_rate_threshold),
            ("max_time_after_impact", self.max_time_after_impact),
            ("blackout_window", self.blackout_window),
        ];

        for (field, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ThresholdConfig::default();
        assert_eq!(config.impact_accel_threshold, 5.0);
        assert_eq!(config.tof_distance_threshold, 350);
        assert_eq!(config.tof_signal_rate_threshold, 1000.0);
        assert_eq!(config.max_time_after_impact, 0.5);
        assert_eq!(config.blackout_window, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_window() {
        let config = ThresholdConfig { blackout_window: 0.0, ..Default::default() };
        match config.validate() {
            Err(ConfigError::NonPositive { field, .. }) => assert_eq!(field, "blackout_window"),
            other => panic!("expected NonPositive, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_nan() {
        let config = ThresholdConfig { impact_accel_threshold: f64::NAN, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ThresholdConfig = serde_json::from_str(r#"{"impact_accel_threshold": 4.0}"#).unwrap();
        assert_eq!(config.impact_accel_threshold, 4.0);
        assert_eq!(config.blackout_window, 1.0);
    }
}
