//! Basket detection predicate and basket-type policies
//!
//! Two rules exist for telling a swish from a bank shot and they disagree:
//! one looks at whether an impact preceded the basket, the other at how strong
//! the TOF return was. Both ship as `BasketTypePolicy` implementations so the
//! choice is explicit at construction time. A make with no preceding impact is
//! always a swish regardless of policy.

use serde::{Deserialize, Serialize};
use crate::SWISH_SIGNAL_RATE_THRESHOLD;
use crate::types::{BasketType, DistanceSample, ThresholdConfig, Timestamp};

/// Does this TOF reading mean the ball is in the basket?
pub fn is_basket_event(config: &ThresholdConfig, sample: &DistanceSample) -> bool {
    sample.distance_mm < config.tof_distance_threshold
        && sample.signal_rate > config.tof_signal_rate_threshold
}

/// Decides SWISH vs BANK for a basket reading that followed an impact
pub trait BasketTypePolicy: std::fmt::Debug + Send + Sync {
    /// Short name for logs and CLI output
    fn name(&self) -> &'static str;

    fn classify(&self, impact_time: Timestamp, basket: &DistanceSample) -> BasketType;
}

/// An impact before the basket means the ball hit rim or board: BANK
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpactPresencePolicy;

impl BasketTypePolicy for ImpactPresencePolicy {
    fn name(&self) -> &'static str {
        "impact"
    }

    fn classify(&self, _impact_time: Timestamp, _basket: &DistanceSample) -> BasketType {
        BasketType::Bank
    }
}

/// A strong TOF return means a clean pass through the net: SWISH
#[derive(Debug, Clone, Copy)]
pub struct SignalRatePolicy {
    pub swish_threshold: f64,
}

impl Default for SignalRatePolicy {
    fn default() -> Self {
        Self { swish_threshold: SWISH_SIGNAL_RATE_THRESHOLD }
    }
}

impl BasketTypePolicy for SignalRatePolicy {
    fn name(&self) -> &'static str {
        "signal-rate"
    }

    fn classify(&self, _impact_time: Timestamp, basket: &DistanceSample) -> BasketType {
        if basket.signal_rate > self.swish_threshold {
            BasketType::Swish
        } else {
            BasketType::Bank
        }
    }
}

/// Serializable selector for the shipped policies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BasketPolicyKind {
    #[default]
    Impact,
    SignalRate,
}

impl BasketPolicyKind {
    pub fn build(self) -> Box<dyn BasketTypePolicy> {
        match self {
            BasketPolicyKind::Impact => Box::new(ImpactPresencePolicy),
            BasketPolicyKind::SignalRate => Box::new(SignalRatePolicy::default()),
        }
    }
}
