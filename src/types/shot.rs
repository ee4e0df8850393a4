//! Shot event model
//!
//! A `ShotEvent` is built once by the state machine and never mutated. MAKE and
//! MISS carry different fields, so a MISS can never hold a basket type or
//! basket time.

use serde::{Deserialize, Serialize};
use crate::types::Timestamp;

/// Outcome of a shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Make,
    Miss,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Make => write!(f, "MAKE"),
            Classification::Miss => write!(f, "MISS"),
        }
    }
}

/// How the ball went in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasketType {
    /// Clean, nothing but net
    Swish,
    /// Off the board or rim first
    Bank,
}

impl std::fmt::Display for BasketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BasketType::Swish => write!(f, "SWISH"),
            BasketType::Bank => write!(f, "BANK"),
        }
    }
}

/// A completed shot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "classification", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotEvent {
    Make {
        impact_time: Option<Timestamp>,
        basket_time: Timestamp,
        basket_type: BasketType,
        confidence: f64,
    },
    Miss {
        impact_time: Timestamp,
        confidence: f64,
    },
}

impl ShotEvent {
    pub fn make(
        impact_time: Option<Timestamp>,
        basket_time: Timestamp,
        basket_type: BasketType,
        confidence: f64,
    ) -> Self {
        ShotEvent::Make { impact_time, basket_time, basket_type, confidence }
    }

    pub fn miss(impact_time: Timestamp, confidence: f64) -> Self {
        ShotEvent::Miss { impact_time, confidence }
    }

    pub fn classification(&self) -> Classification {
        match self {
            ShotEvent::Make { .. } => Classification::Make,
            ShotEvent::Miss { .. } => Classification::Miss,
        }
    }

    pub fn is_make(&self) -> bool {
        matches!(self, ShotEvent::Make { .. })
    }

    pub fn impact_time(&self) -> Option<Timestamp> {
        match self {
            ShotEvent::Make { impact_time, .. } => *impact_time,
            ShotEvent::Miss { impact_time, .. } => Some(*impact_time),
        }
    }

    pub fn basket_time(&self) -> Option<Timestamp> {
        match self {
            ShotEvent::Make { basket_time, .. } => Some(*basket_time),
            ShotEvent::Miss { .. } => None,
        }
    }

    pub fn basket_type(&self) -> Option<BasketType> {
        match self {
            ShotEvent::Make { basket_type, .. } => Some(*basket_type),
            ShotEvent::Miss { .. } => None,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            ShotEvent::Make { confidence, .. } | ShotEvent::Miss { confidence, .. } => *confidence,
        }
    }

    /// Single-line form for logs and plain terminals
    pub fn to_parseable_string(&self) -> String {
        let fmt_ts = |t: Option<Timestamp>| match t {
            Some(t) => format!("{:.3}", t),
            None => "-".to_string(),
        };
        let basket_type = self
            .basket_type()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "shot={} | type={} | impact={} | basket={} | confidence={:.2}",
            self.classification(),
            basket_type,
            fmt_ts(self.impact_time()),
            fmt_ts(self.basket_time()),
            self.confidence()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_has_no_basket_fields() {
        let miss = ShotEvent::miss(15.0, 0.85);
        assert_eq!(miss.classification(), Classification::Miss);
        assert_eq!(miss.basket_type(), None);
        assert_eq!(miss.basket_time(), None);
        assert_eq!(miss.impact_time(), Some(15.0));
    }

    #[test]
    fn test_make_accessors() {
        let make = ShotEvent::make(None, 25.0, BasketType::Swish, 0.85);
        assert!(make.is_make());
        assert_eq!(make.basket_type(), Some(BasketType::Swish));
        assert_eq!(make.impact_time(), None);
    }

    #[test]
    fn test_json_shape() {
        let make = ShotEvent::make(Some(10.0), 10.1, BasketType::Bank, 0.95);
        let json: serde_json::Value = serde_json::to_value(make).unwrap();
        assert_eq!(json["classification"], "MAKE");
        assert_eq!(json["basket_type"], "BANK");
        assert_eq!(json["impact_time"], 10.0);

        let miss = ShotEvent::miss(15.0, 0.85);
        let json: serde_json::Value = serde_json::to_value(miss).unwrap();
        assert_eq!(json["classification"], "MISS");
        assert!(json.get("basket_type").is_none());
    }

    #[test]
    fn test_parseable_string() {
        let miss = ShotEvent::miss(15.0, 0.85);
        assert_eq!(
            miss.to_parseable_string(),
            "shot=MISS | type=- | impact=15.000 | basket=- | confidence=0.85"
        );
    }
}
