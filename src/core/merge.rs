//! Chronological merge of the two sensor buffers
//!
//! Classic two-pointer merge over the buffer heads. On equal timestamps the
//! accelerometer sample goes first, so an impact and a basket reading stamped
//! at the same instant are seen as impact-then-basket.

use serde::{Deserialize, Serialize};
use crate::core::ingest::SampleBuffer;
use crate::types::{AccelSample, DistanceSample, TaggedSample, Timestamp};

/// How far a processing call may consume the buffers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Consume everything buffered. A lagging sensor's late samples then
    /// arrive behind the machine clock and are discarded.
    Drain,
    /// Only consume samples the other sensor can no longer precede;
    /// the rest waits for the next batch or a flush
    #[default]
    Watermark,
}

/// Stopping rule for one merge pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MergeBound {
    /// Until both buffers are empty
    All,
    /// Until the head is newer than everything the other sensor has delivered
    Watermark,
    /// Until the head is newer than the given time
    Until(Timestamp),
}

impl From<MergeMode> for MergeBound {
    fn from(mode: MergeMode) -> Self {
        match mode {
            MergeMode::Drain => MergeBound::All,
            MergeMode::Watermark => MergeBound::Watermark,
        }
    }
}

/// Lazy, timestamp-ordered view over both buffers.
///
/// Consumed samples are gone from the buffers; anything left when the
/// iterator stops stays buffered for the next pass.
#[derive(Debug)]
pub struct ChronoMerge<'a> {
    accel: &'a mut SampleBuffer<AccelSample>,
    distance: &'a mut SampleBuffer<DistanceSample>,
    bound: MergeBound,
}

impl<'a> ChronoMerge<'a> {
    pub fn new(
        accel: &'a mut SampleBuffer<AccelSample>,
        distance: &'a mut SampleBuffer<DistanceSample>,
        bound: MergeBound,
    ) -> Self {
        Self { accel, distance, bound }
    }

    /// May a head at `timestamp` be released, given the other sensor's newest reading?
    ///
    /// A distance head equal to the accel watermark must wait: a later accel
    /// sample with that same timestamp would still go first.
    fn releasable(&self, timestamp: Timestamp, other_last: Option<Timestamp>, loses_ties: bool) -> bool {
        match self.bound {
            MergeBound::All => true,
            MergeBound::Watermark => other_last.is_some_and(|last| {
                timestamp < last || (timestamp == last && !loses_ties)
            }),
            MergeBound::Until(limit) => timestamp <= limit,
        }
    }
}

impl Iterator for ChronoMerge<'_> {
    type Item = TaggedSample;

    fn next(&mut self) -> Option<TaggedSample> {
        let take_accel = match (self.accel.peek(), self.distance.peek()) {
            (None, None) => return None,
            (Some(a), Some(d)) => {
                let take_accel = a.timestamp <= d.timestamp;
                let head = if take_accel { a.timestamp } else { d.timestamp };
                // With both heads present the watermark always holds; only Until can stop us
                if let MergeBound::Until(limit) = self.bound {
                    if head > limit {
                        return None;
                    }
                }
                take_accel
            }
            (Some(a), None) => {
                if !self.releasable(a.timestamp, self.distance.last_ingested(), false) {
                    return None;
                }
                true
            }
            (None, Some(d)) => {
                if !self.releasable(d.timestamp, self.accel.last_ingested(), true) {
                    return None;
                }
                false
            }
        };

        if take_accel {
            self.accel.advance().map(TaggedSample::Accel)
        } else {
            self.distance.advance().map(TaggedSample::Distance)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
