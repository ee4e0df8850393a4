//! Sample ingestion: validate raw readings, drop sentinels, buffer per sensor
//!
//! Each sensor keeps an append-only arena with a read cursor. The merge
//! advances the cursor; consumed prefixes are compacted away after each batch
//! so unconsumed tails survive into the next call without re-sorting.

use tracing::trace;
use crate::core::merge::{ChronoMerge, MergeBound};
use crate::types::{
    AccelSample, ClassifierError, DistanceSample, RawSample, SensorKind, TaggedSample, Timestamp,
    is_sentinel_distance,
};

/// Anything carrying a sensor timestamp
pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

impl Timestamped for AccelSample {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl Timestamped for DistanceSample {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Timestamp-ordered samples of one sensor with a merge cursor
#[derive(Debug, Clone)]
pub struct SampleBuffer<T> {
    samples: Vec<T>,
    cursor: usize,
    last_ingested: Option<Timestamp>,
}

impl<T> Default for SampleBuffer<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            cursor: 0,
            last_ingested: None,
        }
    }
}

impl<T: Timestamped + Copy> SampleBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample; caller guarantees it is not older than the last one
    pub fn push(&mut self, sample: T) {
        self.last_ingested = Some(sample.timestamp());
        self.samples.push(sample);
    }

    /// Next unconsumed sample
    pub fn peek(&self) -> Option<&T> {
        self.samples.get(self.cursor)
    }

    /// Consume the next sample
    pub fn advance(&mut self) -> Option<T> {
        let sample = *self.samples.get(self.cursor)?;
        self.cursor += 1;
        Some(sample)
    }

    /// Number of buffered, unconsumed samples
    pub fn pending(&self) -> usize {
        self.samples.len() - self.cursor
    }

    /// Unconsumed samples, oldest first
    pub fn pending_samples(&self) -> &[T] {
        &self.samples[self.cursor..]
    }

    /// Timestamp of the newest sample ever ingested, consumed or not
    pub fn last_ingested(&self) -> Option<Timestamp> {
        self.last_ingested
    }

    /// Drop the consumed prefix
    pub fn compact(&mut self) {
        if self.cursor > 0 {
            self.samples.drain(..self.cursor);
            self.cursor = 0;
        }
    }

    pub fn clear(&mut self) {
        *self = Self {
            samples: Vec::new(),
            cursor: 0,
            last_ingested: None,
        };
    }
}

/// Counts from one ingested batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accel: usize,
    pub distance: usize,
    pub dropped_sentinels: usize,
}

/// The two per-sensor buffers
#[derive(Debug, Clone, Default)]
pub struct SampleIngest {
    accel: SampleBuffer<AccelSample>,
    distance: SampleBuffer<DistanceSample>,
    dropped_sentinels: u64,
}

impl SampleIngest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and buffer a batch.
    ///
    /// All-or-nothing: on any error no sample of the batch is buffered.
    pub fn ingest(&mut self, batch: &[RawSample]) -> Result<IngestReport, ClassifierError> {
        let mut accepted = Vec::with_capacity(batch.len());
        let mut last_accel = self.accel.last_ingested();
        let mut last_distance = self.distance.last_ingested();
        let mut report = IngestReport::default();

        for raw in batch {
            let Some(sample) = validate(raw)? else {
                report.dropped_sentinels += 1;
                continue;
            };

            let last = match sample.sensor() {
                SensorKind::Accel => &mut last_accel,
                SensorKind::Distance => &mut last_distance,
            };
            if let Some(previous) = *last {
                if sample.timestamp() < previous {
                    return Err(ClassifierError::InputOrdering {
                        sensor: sample.sensor(),
                        previous,
                        offending: sample.timestamp(),
                    });
                }
            }
            *last = Some(sample.timestamp());
            accepted.push(sample);
        }

        for sample in accepted {
            match sample {
                TaggedSample::Accel(s) => {
                    self.accel.push(s);
                    report.accel += 1;
                }
                TaggedSample::Distance(s) => {
                    self.distance.push(s);
                    report.distance += 1;
                }
            }
        }
        self.dropped_sentinels += report.dropped_sentinels as u64;

        Ok(report)
    }

    /// Merge iterator over the buffered samples
    pub fn merge(&mut self, bound: MergeBound) -> ChronoMerge<'_> {
        ChronoMerge::new(&mut self.accel, &mut self.distance, bound)
    }

    pub fn compact(&mut self) {
        self.accel.compact();
        self.distance.compact();
    }

    pub fn accel(&self) -> &SampleBuffer<AccelSample> {
        &self.accel
    }

    pub fn distance(&self) -> &SampleBuffer<DistanceSample> {
        &self.distance
    }

    /// Buffered samples not yet consumed by the merge
    pub fn pending(&self) -> usize {
        self.accel.pending() + self.distance.pending()
    }

    /// Sentinel distance readings dropped since creation or reset
    pub fn dropped_sentinels(&self) -> u64 {
        self.dropped_sentinels
    }

    pub fn clear(&mut self) {
        self.accel.clear();
        self.distance.clear();
        self.dropped_sentinels = 0;
    }
}

/// Turn a raw reading into a model sample; `None` for sentinel distances
fn validate(raw: &RawSample) -> Result<Option<TaggedSample>, ClassifierError> {
    match *raw {
        RawSample::Accel { timestamp, magnitude } => {
            if !timestamp.is_finite() {
                return Err(invalid(SensorKind::Accel, timestamp, "timestamp is not finite"));
            }
            if !magnitude.is_finite() || magnitude < 0.0 {
                return Err(invalid(SensorKind::Accel, timestamp, "magnitude must be finite and non-negative"));
            }
            Ok(Some(TaggedSample::Accel(AccelSample::new(timestamp, magnitude))))
        }
        RawSample::Distance { timestamp, distance_mm, signal_rate } => {
            // Sentinel slots may carry placeholder timestamps; drop before any checks
            if is_sentinel_distance(distance_mm) {
                trace!(timestamp, distance_mm, "dropping sentinel distance");
                return Ok(None);
            }
            if !timestamp.is_finite() {
                return Err(invalid(SensorKind::Distance, timestamp, "timestamp is not finite"));
            }
            let Ok(distance_mm) = u16::try_from(distance_mm) else {
                return Err(invalid(SensorKind::Distance, timestamp, "distance exceeds sensor range"));
            };
            if !signal_rate.is_finite() || signal_rate < 0.0 {
                return Err(invalid(SensorKind::Distance, timestamp, "signal rate must be finite and non-negative"));
            }
            Ok(Some(TaggedSample::Distance(DistanceSample::new(timestamp, distance_mm, signal_rate))))
        }
    }
}

fn invalid(sensor: SensorKind, timestamp: Timestamp, reason: &'static str) -> ClassifierError {
    ClassifierError::InvalidSample { sensor, timestamp, reason }
}

// =============================================================================
// TESTS
// =============================================================================
