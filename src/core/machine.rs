//! Shot state machine
//!
//! Phase transitions (all driven by sample timestamps, never wall-clock):
//! - IDLE → IMPACT_DETECTED: accel magnitude > impact threshold
//! - IDLE → BLACKOUT: basket reading, emits standalone MAKE (SWISH, 0.85)
//! - IMPACT_DETECTED → BLACKOUT: any sample past the window, emits MISS (0.85)
//! - IMPACT_DETECTED → BLACKOUT: basket reading inside the window, emits MAKE (0.95)
//! - BLACKOUT → IDLE: first sample at or after the end of the cooldown;
//!   that sample is then evaluated as an IDLE sample
//!
//! BASKET_DETECTED is never persisted: the IDLE basket transition goes
//! straight to BLACKOUT within one step.
//!
//! Window arithmetic runs on whole microseconds (`timestamp_micros`). A sample
//! older than the newest one already stepped is discarded untouched.

use tracing::{debug, info, warn};
use crate::{CONFIDENCE_MAKE_AFTER_IMPACT, CONFIDENCE_MISS, CONFIDENCE_STANDALONE_MAKE};
use crate::core::basket::{is_basket_event, BasketTypePolicy, ImpactPresencePolicy};
use crate::types::{
    BasketType, ClassifierError, ClassifierPhase, ClassifierState, ReasonCode, SensorKind,
    ShotEvent, StepOutput, TaggedSample, ThresholdConfig, Timestamp, timestamp_micros,
};

/// State machine over the merged sample sequence
#[derive(Debug)]
pub struct ShotStateMachine {
    config: ThresholdConfig,
    policy: Box<dyn BasketTypePolicy>,
    state: ClassifierState,
    /// Newest timestamp seen by any step
    clock: Option<Timestamp>,
    /// Samples discarded for arriving behind `clock`
    stale: u64,
}

impl Default for ShotStateMachine {
    fn default() -> Self {
        Self::new(ThresholdConfig::default(), Box::new(ImpactPresencePolicy))
    }
}

impl ShotStateMachine {
    pub fn new(config: ThresholdConfig, policy: Box<dyn BasketTypePolicy>) -> Self {
        Self {
            config,
            policy,
            state: ClassifierState::idle(),
            clock: None,
            stale: 0,
        }
    }

    /// Feed one merged sample
    pub fn step(&mut self, sample: &TaggedSample) -> Result<StepOutput, ClassifierError> {
        let timestamp = sample.timestamp();
        if self.is_stale(timestamp) {
            self.stale += 1;
            warn!(
                t = timestamp,
                clock = ?self.clock,
                sensor = %sample.sensor(),
                "discarding sample older than classifier clock"
            );
            return Ok(StepOutput::new(
                timestamp,
                Some(sample.sensor()),
                self.state.phase,
                ReasonCode::R001_STALE_SAMPLE,
                None,
            ));
        }
        self.tick_clock(timestamp);

        let expired = self.expire_blackout(timestamp);

        let (reason, event) = match self.state.phase {
            ClassifierPhase::Idle => self.on_idle(sample),
            ClassifierPhase::ImpactDetected => self.on_impact_detected(sample)?,
            ClassifierPhase::Blackout => (ReasonCode::R001_BLACKOUT_ACTIVE, None),
            ClassifierPhase::BasketDetected => {
                return Err(ClassifierError::InternalState {
                    phase: ClassifierPhase::BasketDetected,
                    sensor: Some(sample.sensor()),
                });
            }
        };

        let reason = if expired && reason == ReasonCode::R001_IDLE_NO_TRIGGER {
            ReasonCode::R002_BLACKOUT_EXPIRED
        } else {
            reason
        };

        Ok(StepOutput::new(timestamp, Some(sample.sensor()), self.state.phase, reason, event))
    }

    /// Explicit time check: applies the impact timeout and blackout exit
    /// without a sample
    pub fn advance_to(&mut self, timestamp: Timestamp) -> Result<StepOutput, ClassifierError> {
        if !timestamp.is_finite() {
            return Err(ClassifierError::NonFiniteClock { requested: timestamp });
        }
        if let Some(last) = self.clock.filter(|_| self.is_stale(timestamp)) {
            return Err(ClassifierError::ClockRegression { last, requested: timestamp });
        }
        self.tick_clock(timestamp);

        let (reason, event) = match self.state.phase {
            ClassifierPhase::Idle => (ReasonCode::R001_IDLE_NO_TRIGGER, None),
            ClassifierPhase::ImpactDetected => {
                let impact_time = self.impact_time(None)?;
                if self.window_elapsed(impact_time, timestamp) {
                    (ReasonCode::R003_MISS_TIMEOUT, Some(self.miss(impact_time, timestamp)))
                } else {
                    (ReasonCode::R001_AWAITING_BASKET, None)
                }
            }
            ClassifierPhase::Blackout => {
                if self.expire_blackout(timestamp) {
                    (ReasonCode::R002_BLACKOUT_EXPIRED, None)
                } else {
                    (ReasonCode::R001_BLACKOUT_ACTIVE, None)
                }
            }
            ClassifierPhase::BasketDetected => {
                return Err(ClassifierError::InternalState {
                    phase: ClassifierPhase::BasketDetected,
                    sensor: None,
                });
            }
        };

        Ok(StepOutput::new(timestamp, None, self.state.phase, reason, event))
    }

    fn on_idle(&mut self, sample: &TaggedSample) -> (ReasonCode, Option<ShotEvent>) {
        match sample {
            TaggedSample::Accel(accel) if accel.magnitude > self.config.impact_accel_threshold => {
                debug!(t = accel.timestamp, magnitude = accel.magnitude, "impact detected");
                self.state = ClassifierState::impact(accel.timestamp);
                (ReasonCode::R002_IMPACT_DETECTED, None)
            }
            TaggedSample::Distance(tof) if is_basket_event(&self.config, tof) => {
                let event = ShotEvent::make(None, tof.timestamp, BasketType::Swish, CONFIDENCE_STANDALONE_MAKE);
                self.complete(event, tof.timestamp, None);
                (ReasonCode::R003_STANDALONE_MAKE, Some(event))
            }
            _ => (ReasonCode::R001_IDLE_NO_TRIGGER, None),
        }
    }

    fn on_impact_detected(
        &mut self,
        sample: &TaggedSample,
    ) -> Result<(ReasonCode, Option<ShotEvent>), ClassifierError> {
        let impact_time = self.impact_time(Some(sample.sensor()))?;
        let timestamp = sample.timestamp();

        // Timeout first: a late basket reading is still a miss
        if self.window_elapsed(impact_time, timestamp) {
            return Ok((ReasonCode::R003_MISS_TIMEOUT, Some(self.miss(impact_time, timestamp))));
        }

        match sample {
            TaggedSample::Distance(tof) if is_basket_event(&self.config, tof) => {
                let basket_type = self.policy.classify(impact_time, tof);
                let event = ShotEvent::make(
                    Some(impact_time),
                    tof.timestamp,
                    basket_type,
                    CONFIDENCE_MAKE_AFTER_IMPACT,
                );
                self.complete(event, tof.timestamp, Some(impact_time));
                Ok((ReasonCode::R003_MAKE_AFTER_IMPACT, Some(event)))
            }
            // Further impacts while waiting are rim/board rattle, not new shots
            _ => Ok((ReasonCode::R001_AWAITING_BASKET, None)),
        }
    }

    fn miss(&mut self, impact_time: Timestamp, timestamp: Timestamp) -> ShotEvent {
        let event = ShotEvent::miss(impact_time, CONFIDENCE_MISS);
        self.complete(event, timestamp, Some(impact_time));
        event
    }

    /// Enter the cooldown after a shot
    fn complete(&mut self, event: ShotEvent, timestamp: Timestamp, impact_time: Option<Timestamp>) {
        info!(
            t = timestamp,
            classification = %event.classification(),
            basket_type = ?event.basket_type(),
            confidence = event.confidence(),
            "shot classified"
        );
        self.state = ClassifierState::blackout(timestamp, impact_time);
    }

    /// Leave BLACKOUT if the cooldown has run out; true if it did
    fn expire_blackout(&mut self, timestamp: Timestamp) -> bool {
        if self.state.phase != ClassifierPhase::Blackout {
            return false;
        }
        let Some(start) = self.state.state_start_time else {
            // No start time recorded: nothing to wait for
            self.state = ClassifierState::idle();
            return true;
        };
        let end = timestamp_micros(start) + timestamp_micros(self.config.blackout_window);
        if timestamp_micros(timestamp) >= end {
            debug!(t = timestamp, since = start, "blackout expired");
            self.state = ClassifierState::idle();
            true
        } else {
            false
        }
    }

    fn window_elapsed(&self, impact_time: Timestamp, timestamp: Timestamp) -> bool {
        timestamp_micros(timestamp) - timestamp_micros(impact_time)
            > timestamp_micros(self.config.max_time_after_impact)
    }

    /// Behind the newest stepped timestamp?
    fn is_stale(&self, timestamp: Timestamp) -> bool {
        self.clock
            .is_some_and(|clock| timestamp_micros(timestamp) < timestamp_micros(clock))
    }

    fn impact_time(&self, sensor: Option<SensorKind>) -> Result<Timestamp, ClassifierError> {
        self.state.impact_time.ok_or(ClassifierError::InternalState {
            phase: self.state.phase,
            sensor,
        })
    }

    fn tick_clock(&mut self, timestamp: Timestamp) {
        self.clock = Some(match self.clock {
            Some(last) => last.max(timestamp),
            None => timestamp,
        });
    }

    /// Current phase
    pub fn phase(&self) -> ClassifierPhase {
        self.state.phase
    }

    /// Copy of the full timing context
    pub fn state(&self) -> ClassifierState {
        self.state
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn BasketTypePolicy {
        self.policy.as_ref()
    }

    /// Newest sensor time seen
    pub fn clock(&self) -> Option<Timestamp> {
        self.clock
    }

    /// Samples discarded for arriving behind the clock
    pub fn stale_samples(&self) -> u64 {
        self.stale
    }

    /// Back to IDLE with no history, keeping config and policy
    pub fn reset(&mut self) {
        self.state = ClassifierState::idle();
        self.clock = None;
        self.stale = 0;
    }
}

// =============================================================================
// TESTS
// =============================================================================
