//! Sensor sample types
//!
//! Raw readings arrive as `RawSample` (tagged, unvalidated). Ingestion turns the
//! valid ones into `AccelSample` / `DistanceSample`; the merge hands them to the
//! state machine as `TaggedSample`.

use serde::{Deserialize, Serialize};
use crate::{DISTANCE_SENTINEL_NO_SAMPLE, DISTANCE_SENTINEL_OUT_OF_RANGE};

/// Sensor time in seconds
pub type Timestamp = f64;

/// Sensor clocks tick in milliseconds
pub fn timestamp_from_ms(ms: i64) -> Timestamp {
    ms as f64 / 1000.0
}

/// Whole microseconds, for window arithmetic.
///
/// Millisecond ticks divided by 1000 are not exact in binary; differences of
/// such values drift off the window edges. Rounding to integer microseconds
/// makes a 500 ms gap compare equal to a 0.5 s window.
pub fn timestamp_micros(t: Timestamp) -> i64 {
    (t * 1_000_000.0).round() as i64
}

/// Which stream a sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorKind {
    /// MPU accelerometer magnitude
    Accel,
    /// VL53L1X time-of-flight distance
    Distance,
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Accel => write!(f, "ACCEL"),
            SensorKind::Distance => write!(f, "DISTANCE"),
        }
    }
}

/// Accelerometer magnitude reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub timestamp: Timestamp,
    /// Magnitude in g (non-negative)
    pub magnitude: f64,
}

impl AccelSample {
    pub fn new(timestamp: Timestamp, magnitude: f64) -> Self {
        Self { timestamp, magnitude }
    }
}

/// Valid time-of-flight reading. Sentinel reads never become one of these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    pub timestamp: Timestamp,
    /// Distance in millimetres
    pub distance_mm: u16,
    /// Return signal strength (non-negative)
    pub signal_rate: f64,
}

impl DistanceSample {
    pub fn new(timestamp: Timestamp, distance_mm: u16, signal_rate: f64) -> Self {
        Self { timestamp, distance_mm, signal_rate }
    }
}

/// True for raw distances that denote "no reading": the two reserved
/// sentinels, and negative values (replay logs render out-of-range as -1)
pub fn is_sentinel_distance(raw: i32) -> bool {
    raw == DISTANCE_SENTINEL_NO_SAMPLE || raw == DISTANCE_SENTINEL_OUT_OF_RANGE || raw < 0
}

/// A raw reading as delivered by transport, before validation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawSample {
    Accel {
        timestamp: Timestamp,
        magnitude: f64,
    },
    Distance {
        timestamp: Timestamp,
        distance_mm: i32,
        signal_rate: f64,
    },
}

impl RawSample {
    /// Accelerometer reading
    pub fn accel(timestamp: Timestamp, magnitude: f64) -> Self {
        RawSample::Accel { timestamp, magnitude }
    }

    /// Time-of-flight reading
    pub fn distance(timestamp: Timestamp, distance_mm: i32, signal_rate: f64) -> Self {
        RawSample::Distance { timestamp, distance_mm, signal_rate }
    }

    pub fn sensor(&self) -> SensorKind {
        match self {
            RawSample::Accel { .. } => SensorKind::Accel,
            RawSample::Distance { .. } => SensorKind::Distance,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            RawSample::Accel { timestamp, .. } | RawSample::Distance { timestamp, .. } => *timestamp,
        }
    }
}

/// A validated sample tagged with its stream, in merge order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaggedSample {
    Accel(AccelSample),
    Distance(DistanceSample),
}

impl TaggedSample {
    pub fn sensor(&self) -> SensorKind {
        match self {
            TaggedSample::Accel(_) => SensorKind::Accel,
            TaggedSample::Distance(_) => SensorKind::Distance,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            TaggedSample::Accel(s) => s.timestamp,
            TaggedSample::Distance(s) => s.timestamp,
        }
    }
}

/// One recorder row: an accelerometer sample paired with the TOF slot at the
/// same index of the packet. Timestamps are in milliseconds.
///
/// Rows without a TOF sample carry `DISTANCE_SENTINEL_NO_SAMPLE`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRow {
    pub mpu_ts_ms: i64,
    /// Acceleration per axis in g
    pub accel: [f64; 3],
    /// Angular rate per axis in °/s
    pub gyro: [f64; 3],
    pub tof_ts_ms: i64,
    /// Raw range, possibly a sentinel
    pub distance: i32,
    pub signal_rate: f64,
}

impl SensorRow {
    /// Euclidean norm of the acceleration vector
    pub fn accel_magnitude(&self) -> f64 {
        let [x, y, z] = self.accel;
        (x * x + y * y + z * z).sqrt()
    }

    /// Split into the two raw readings the row carries
    pub fn to_raw_samples(&self) -> [RawSample; 2] {
        [
            RawSample::accel(timestamp_from_ms(self.mpu_ts_ms), self.accel_magnitude()),
            RawSample::distance(timestamp_from_ms(self.tof_ts_ms), self.distance, self.signal_rate),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(is_sentinel_distance(0xFFFE));
        assert!(is_sentinel_distance(0xFFFF));
        assert!(is_sentinel_distance(-1));
        assert!(!is_sentinel_distance(0));
        assert!(!is_sentinel_distance(200));
        assert!(!is_sentinel_distance(0xFFFD));
    }

    #[test]
    fn test_row_magnitude() {
        let row = SensorRow {
            mpu_ts_ms: 1000,
            accel: [3.0, 4.0, 0.0],
            gyro: [0.0; 3],
            tof_ts_ms: 1000,
            distance: 500,
            signal_rate: 10.0,
        };
        assert!((row.accel_magnitude() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_row_converts_milliseconds() {
        let row = SensorRow {
            mpu_ts_ms: 10_250,
            accel: [0.0, 0.0, 1.0],
            gyro: [0.0; 3],
            tof_ts_ms: 10_240,
            distance: 300,
            signal_rate: 1500.0,
        };
        let [accel, distance] = row.to_raw_samples();
        assert_eq!(accel.sensor(), SensorKind::Accel);
        assert!((accel.timestamp() - 10.25).abs() < 1e-12);
        assert!((distance.timestamp() - 10.24).abs() < 1e-12);
    }

    #[test]
    fn test_micros_absorb_millisecond_rounding() {
        // 1.07 - 0.57 is slightly above 0.5 in f64
        assert!(timestamp_from_ms(1070) - timestamp_from_ms(570) > 0.5);
        assert_eq!(
            timestamp_micros(timestamp_from_ms(1070)) - timestamp_micros(timestamp_from_ms(570)),
            timestamp_micros(0.5)
        );
        assert_eq!(timestamp_micros(12.345), 12_345_000);
    }

    #[test]
    fn test_raw_sample_json_is_tagged() {
        let json = r#"{"sensor":"DISTANCE","timestamp":1.5,"distance_mm":200,"signal_rate":1500.0}"#;
        let sample: RawSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample, RawSample::distance(1.5, 200, 1500.0));
    }
}
