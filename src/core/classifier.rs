//! Shot classifier: ingestion + chronological merge + state machine
//!
//! One instance per sensor rig. Processing is synchronous and batch-oriented;
//! each call runs to completion and returns the shots it completed, in the
//! order their triggering samples were consumed.

use tracing::debug;
use crate::core::basket::{BasketPolicyKind, BasketTypePolicy};
use crate::core::ingest::SampleIngest;
use crate::core::machine::ShotStateMachine;
use crate::core::merge::{MergeBound, MergeMode};
use crate::types::{
    ClassifierError, ClassifierPhase, ClassifierState, ConfigError, RawSample, ReasonCode, SensorRow,
    ShotEvent, ShotTally, StepOutput, ThresholdConfig, Timestamp,
};

/// Construction-time behaviour switches
#[derive(Debug)]
pub struct ClassifierOptions {
    /// SWISH vs BANK rule for makes that follow an impact
    pub basket_policy: Box<dyn BasketTypePolicy>,
    pub merge_mode: MergeMode,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            basket_policy: BasketPolicyKind::default().build(),
            merge_mode: MergeMode::default(),
        }
    }
}

/// Stream-merge-and-classify engine
#[derive(Debug)]
pub struct ShotClassifier {
    ingest: SampleIngest,
    machine: ShotStateMachine,
    merge_mode: MergeMode,
    /// Every shot completed since creation or reset
    completed: Vec<ShotEvent>,
    samples_processed: u64,
}

impl Default for ShotClassifier {
    fn default() -> Self {
        Self::from_parts(ThresholdConfig::default(), ClassifierOptions::default())
    }
}

impl ShotClassifier {
    /// Create a classifier with the default policy and merge mode
    pub fn new(config: ThresholdConfig) -> Result<Self, ConfigError> {
        Self::with_options(config, ClassifierOptions::default())
    }

    /// Create a classifier with explicit options
    pub fn with_options(config: ThresholdConfig, options: ClassifierOptions) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config, options))
    }

    fn from_parts(config: ThresholdConfig, options: ClassifierOptions) -> Self {
        Self {
            ingest: SampleIngest::new(),
            machine: ShotStateMachine::new(config, options.basket_policy),
            merge_mode: options.merge_mode,
            completed: Vec::new(),
            samples_processed: 0,
        }
    }

    /// Ingest a batch and classify everything the merge mode releases.
    ///
    /// Returns only the shots completed by this call. An ingestion error
    /// leaves the classifier untouched.
    pub fn process_batch(&mut self, batch: &[RawSample]) -> Result<Vec<ShotEvent>, ClassifierError> {
        self.process_batch_with(batch, |_| {})
    }

    /// Like `process_batch`, reporting every state machine step to `observer`
    pub fn process_batch_with<F>(
        &mut self,
        batch: &[RawSample],
        mut observer: F,
    ) -> Result<Vec<ShotEvent>, ClassifierError>
    where
        F: FnMut(&StepOutput),
    {
        let report = self.ingest.ingest(batch)?;
        debug!(
            accel = report.accel,
            distance = report.distance,
            dropped = report.dropped_sentinels,
            "batch ingested"
        );
        self.drive(self.merge_mode.into(), &mut observer)
    }

    /// Process recorder rows (accelerometer paired with a TOF slot)
    pub fn process_rows(&mut self, rows: &[SensorRow]) -> Result<Vec<ShotEvent>, ClassifierError> {
        let batch: Vec<RawSample> = rows.iter().flat_map(|row| row.to_raw_samples()).collect();
        self.process_batch(&batch)
    }

    /// Classify every buffered sample regardless of merge mode
    pub fn flush(&mut self) -> Result<Vec<ShotEvent>, ClassifierError> {
        self.drive(MergeBound::All, &mut |_| {})
    }

    /// Declare that sensor time has reached `timestamp`.
    ///
    /// Buffered samples up to that time are classified first, then the impact
    /// timeout and blackout exit are checked against `timestamp` itself.
    pub fn advance_to(&mut self, timestamp: Timestamp) -> Result<Vec<ShotEvent>, ClassifierError> {
        if !timestamp.is_finite() {
            return Err(ClassifierError::NonFiniteClock { requested: timestamp });
        }
        let mut events = self.drive(MergeBound::Until(timestamp), &mut |_| {})?;
        let output = self.machine.advance_to(timestamp)?;
        if let Some(event) = output.event {
            self.completed.push(event);
            events.push(event);
        }
        Ok(events)
    }

    fn drive(
        &mut self,
        bound: MergeBound,
        observer: &mut dyn FnMut(&StepOutput),
    ) -> Result<Vec<ShotEvent>, ClassifierError> {
        let mut events = Vec::new();

        for sample in self.ingest.merge(bound) {
            let output = self.machine.step(&sample)?;
            if output.reason != ReasonCode::R001_STALE_SAMPLE {
                self.samples_processed += 1;
            }
            observer(&output);

            if let Some(event) = output.event {
                self.completed.push(event);
                events.push(event);
            }
        }
        self.ingest.compact();

        Ok(events)
    }

    /// Current phase
    pub fn phase(&self) -> ClassifierPhase {
        self.machine.phase()
    }

    /// Copy of the timing context
    pub fn state(&self) -> ClassifierState {
        self.machine.state()
    }

    pub fn config(&self) -> &ThresholdConfig {
        self.machine.config()
    }

    /// Name of the active basket-type policy
    pub fn policy_name(&self) -> &'static str {
        self.machine.policy().name()
    }

    pub fn merge_mode(&self) -> MergeMode {
        self.merge_mode
    }

    /// Every shot completed since creation or the last reset
    pub fn completed_shots(&self) -> &[ShotEvent] {
        &self.completed
    }

    /// Make/miss statistics over `completed_shots`
    pub fn tally(&self) -> ShotTally {
        ShotTally::from_events(&self.completed)
    }

    /// Buffered samples waiting for the merge
    pub fn pending_samples(&self) -> usize {
        self.ingest.pending()
    }

    /// Samples consumed by the state machine, not counting stale ones
    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    /// Samples discarded for arriving behind the classifier clock
    pub fn stale_samples(&self) -> u64 {
        self.machine.stale_samples()
    }

    /// Sentinel distance readings dropped at ingestion
    pub fn dropped_sentinels(&self) -> u64 {
        self.ingest.dropped_sentinels()
    }

    /// Start a new session: clear buffers, history, and state.
    /// Thresholds, policy, and merge mode are kept.
    pub fn reset(&mut self) {
        self.ingest.clear();
        self.machine.reset();
        self.completed.clear();
        self.samples_processed = 0;
    }
}

// =============================================================================
// TESTS
// =============================================================================
