//! Shot statistics for display consumers

use serde::{Deserialize, Serialize};
use crate::types::{BasketType, ShotEvent};

/// Running make/miss counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotTally {
    pub makes: u32,
    pub misses: u32,
    pub swishes: u32,
    pub banks: u32,
    pub total: u32,
    /// makes / total × 100, zero before the first shot
    pub percentage: f64,
}

impl ShotTally {
    /// Tally a sequence of shots
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a ShotEvent>) -> Self {
        let mut tally = Self::default();
        for event in events {
            tally.record(event);
        }
        tally
    }

    /// Add one shot
    pub fn record(&mut self, event: &ShotEvent) {
        match event.basket_type() {
            Some(basket_type) => {
                self.makes += 1;
                match basket_type {
                    BasketType::Swish => self.swishes += 1,
                    BasketType::Bank => self.banks += 1,
                }
            }
            None => self.misses += 1,
        }
        self.total = self.makes + self.misses;
        self.percentage = f64::from(self.makes) / f64::from(self.total) * 100.0;
    }
}

impl std::fmt::Display for ShotTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({:.0}%)", self.makes, self.total, self.percentage)
    }
}
