//! CSV replay of recorded sensor sessions
//!
//! Reads the recorder log (one row per accelerometer sample, paired with the
//! TOF slot at the same packet index) and feeds it to a classifier in
//! packet-sized batches, the same cadence the live receiver uses.
//! `SessionLog` writes that same log from live packets.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use crate::SAMPLES_PER_PACKET;
use crate::core::ShotClassifier;
use crate::types::{RawSample, SensorRow, ShotEvent, ShotTally, StepOutput};

/// Minimum columns: everything up to and including the range
const MIN_COLUMNS: usize = 9;

const LOG_COLUMNS: [&str; 10] = [
    "MPU_Timestamp (ms)",
    "AcX (g)",
    "AcY (g)",
    "AcZ (g)",
    "GyX (dps)",
    "GyY (dps)",
    "GyZ (dps)",
    "TOF_Timestamp (ms)",
    "Range (mm)",
    "Signal_Rate",
];

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("cannot read replay log: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot write session log: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a replay run
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub batches: usize,
    /// Batches refused by the classifier (ordering or invalid values)
    pub batches_rejected: usize,
    pub events: Vec<ShotEvent>,
    pub tally: ShotTally,
}

/// Parsed replay log
#[derive(Debug, Clone, Default)]
pub struct CsvReplay {
    rows: Vec<SensorRow>,
    rows_skipped: usize,
}

impl CsvReplay {
    /// Load a log file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        Ok(Self::from_csv(reader))
    }

    /// Load from any reader (header row expected)
    pub fn from_reader<R: Read>(reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Self::from_csv(reader)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Self {
        let mut replay = Self::default();

        for (line, record) in reader.records().enumerate() {
            let parsed = match record {
                Ok(record) => parse_row(&record),
                Err(e) => {
                    debug!(line = line + 2, error = %e, "unreadable replay row");
                    None
                }
            };
            match parsed {
                Some(row) => replay.rows.push(row),
                None => {
                    debug!(line = line + 2, "skipping malformed replay row");
                    replay.rows_skipped += 1;
                }
            }
        }

        replay
    }

    pub fn rows(&self) -> &[SensorRow] {
        &self.rows
    }

    pub fn rows_skipped(&self) -> usize {
        self.rows_skipped
    }

    /// Feed all rows to `classifier`, then flush anything the merge held back
    pub fn run<F>(&self, classifier: &mut ShotClassifier, mut observer: F) -> ReplaySummary
    where
        F: FnMut(&StepOutput),
    {
        let mut events = Vec::new();
        let mut batches = 0;
        let mut batches_rejected = 0;

        for chunk in self.rows.chunks(SAMPLES_PER_PACKET) {
            batches += 1;
            let batch: Vec<RawSample> = chunk.iter().flat_map(|row| row.to_raw_samples()).collect();
            match classifier.process_batch_with(&batch, &mut observer) {
                Ok(shots) => events.extend(shots),
                Err(e) => {
                    warn!(batch = batches, error = %e, "replay batch rejected");
                    batches_rejected += 1;
                }
            }
        }

        match classifier.flush() {
            Ok(shots) => events.extend(shots),
            Err(e) => warn!(error = %e, "replay flush failed"),
        }

        let tally = ShotTally::from_events(&events);
        ReplaySummary {
            rows_read: self.rows.len(),
            rows_skipped: self.rows_skipped,
            batches,
            batches_rejected,
            events,
            tally,
        }
    }
}

/// Recorder log writer, readable by `CsvReplay`
pub struct SessionLog<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl SessionLog<File> {
    /// Create (or truncate) a log file and write the header
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> SessionLog<W> {
    pub fn new(inner: W) -> Result<Self, ReplayError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(LOG_COLUMNS)?;
        writer.flush()?;
        Ok(Self { writer, rows_written: 0 })
    }

    /// Append rows and flush, so a crash loses at most the current packet
    pub fn record(&mut self, rows: &[SensorRow]) -> Result<(), ReplayError> {
        for row in rows {
            let [ax, ay, az] = row.accel;
            let [gx, gy, gz] = row.gyro;
            self.writer.write_record([
                row.mpu_ts_ms.to_string(),
                ax.to_string(),
                ay.to_string(),
                az.to_string(),
                gx.to_string(),
                gy.to_string(),
                gz.to_string(),
                row.tof_ts_ms.to_string(),
                row.distance.to_string(),
                row.signal_rate.to_string(),
            ])?;
        }
        self.writer.flush()?;
        self.rows_written += rows.len();
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn into_inner(self) -> Result<W, ReplayError> {
        self.writer.into_inner().map_err(|e| ReplayError::Io(e.into_error()))
    }
}

/// Parse one log row; `None` if it is short or has non-numeric fields
fn parse_row(record: &csv::StringRecord) -> Option<SensorRow> {
    if record.len() < MIN_COLUMNS {
        return None;
    }
    let float = |i: usize| record.get(i)?.trim().parse::<f64>().ok();
    let int = |i: usize| record.get(i)?.trim().parse::<i64>().ok();

    let signal_rate = match record.get(9) {
        Some(field) if !field.trim().is_empty() => field.trim().parse::<f64>().ok()?,
        _ => 0.0,
    };

    Some(SensorRow {
        mpu_ts_ms: int(0)?,
        accel: [float(1)?, float(2)?, float(3)?],
        gyro: [float(4)?, float(5)?, float(6)?],
        tof_ts_ms: int(7)?,
        distance: i32::try_from(int(8)?).ok()?,
        signal_rate,
    })
}

// =============================================================================
// TESTS
// =============================================================================
