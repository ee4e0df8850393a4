//! Sensor packet decoding
//!
//! Packet layout (network byte order):
//!
//! ```text
//! u32  packet timestamp (ms)
//! u8   accel sample count N
//! N ×  u16 delta (ms) | i16 ax ay az gx gy gz
//! u8   TOF sample count M
//! 8 ×  u16 delta (ms) | u16 distance (mm) | u16 signal rate
//! ```
//!
//! Sample time is the packet timestamp minus the slot's delta. Only the first
//! M TOF slots hold data.

use thiserror::Error;
use crate::{ACCEL_SENSITIVITY, DISTANCE_SENTINEL_NO_SAMPLE, GYRO_SENSITIVITY, TOF_SLOTS_PER_PACKET};
use crate::types::{timestamp_from_ms, RawSample, SensorRow};

const ACCEL_SLOT_BYTES: usize = 14;
const TOF_SLOT_BYTES: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("packet truncated: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    #[error("packet claims {count} TOF samples, only {TOF_SLOTS_PER_PACKET} slots exist")]
    TooManyTofSamples { count: usize },
}

/// One IMU slot in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuReading {
    pub timestamp_ms: i64,
    /// g
    pub accel: [f64; 3],
    /// dps
    pub gyro: [f64; 3],
}

/// One valid TOF slot, raw distance kept so sentinels survive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TofReading {
    pub timestamp_ms: i64,
    pub distance: i32,
    pub signal_rate: f64,
}

/// A decoded sensor packet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packet {
    pub imu: Vec<ImuReading>,
    pub tof: Vec<TofReading>,
}

impl Packet {
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let mut cursor = Cursor::new(data);

        let packet_ts = i64::from(cursor.u32()?);
        let imu_count = usize::from(cursor.u8()?);
        cursor.require(imu_count * ACCEL_SLOT_BYTES + 1 + TOF_SLOTS_PER_PACKET * TOF_SLOT_BYTES)?;

        let mut imu = Vec::with_capacity(imu_count);
        for _ in 0..imu_count {
            let delta = i64::from(cursor.u16()?);
            let mut raw = [0i16; 6];
            for word in raw.iter_mut() {
                *word = cursor.i16()?;
            }
            imu.push(ImuReading {
                timestamp_ms: packet_ts - delta,
                accel: [0, 1, 2].map(|i| f64::from(raw[i]) / ACCEL_SENSITIVITY),
                gyro: [3, 4, 5].map(|i| f64::from(raw[i]) / GYRO_SENSITIVITY),
            });
        }

        let tof_count = usize::from(cursor.u8()?);
        if tof_count > TOF_SLOTS_PER_PACKET {
            return Err(WireError::TooManyTofSamples { count: tof_count });
        }

        let mut tof = Vec::with_capacity(tof_count);
        for slot in 0..TOF_SLOTS_PER_PACKET {
            let delta = i64::from(cursor.u16()?);
            let distance = i32::from(cursor.u16()?);
            let signal_rate = f64::from(cursor.u16()?);
            if slot < tof_count {
                tof.push(TofReading { timestamp_ms: packet_ts - delta, distance, signal_rate });
            }
        }

        Ok(Self { imu, tof })
    }

    /// Classifier input: accelerometer magnitudes first, then TOF readings
    pub fn samples(&self) -> Vec<RawSample> {
        let accel = self.imu.iter().map(|r| {
            let [x, y, z] = r.accel;
            RawSample::accel(timestamp_from_ms(r.timestamp_ms), (x * x + y * y + z * z).sqrt())
        });
        let tof = self
            .tof
            .iter()
            .map(|r| RawSample::distance(timestamp_from_ms(r.timestamp_ms), r.distance, r.signal_rate));
        accel.chain(tof).collect()
    }

    /// Recorder rows: IMU slot i paired with TOF slot i.
    ///
    /// IMU slots past the last TOF reading get the no-sample sentinel with
    /// the IMU timestamp. TOF readings past the last IMU slot have no row.
    pub fn rows(&self) -> Vec<SensorRow> {
        self.imu
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let tof = self.tof.get(i).copied().unwrap_or(TofReading {
                    timestamp_ms: r.timestamp_ms,
                    distance: DISTANCE_SENTINEL_NO_SAMPLE,
                    signal_rate: 0.0,
                });
                SensorRow {
                    mpu_ts_ms: r.timestamp_ms,
                    accel: r.accel,
                    gyro: r.gyro,
                    tof_ts_ms: tof.timestamp_ms,
                    distance: tof.distance,
                    signal_rate: tof.signal_rate,
                }
            })
            .collect()
    }
}

/// Decode one packet into raw samples (accelerometer first, then TOF)
pub fn decode_packet(data: &[u8]) -> Result<Vec<RawSample>, WireError> {
    Ok(Packet::decode(data)?.samples())
}

/// Big-endian reader over a byte slice
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Fail unless `len` more bytes are available
    fn require(&self, len: usize) -> Result<(), WireError> {
        let needed = self.pos + len;
        if needed > self.data.len() {
            return Err(WireError::Truncated { needed, got: self.data.len() });
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        self.require(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    fn i16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_be_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.take()?))
    }
}

/// Build a packet in wire layout (test and simulator helper)
pub fn encode_packet(
    packet_ts_ms: u32,
    accel: &[(u16, [i16; 6])],
    tof: &[(u16, u16, u16)],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + accel.len() * ACCEL_SLOT_BYTES + TOF_SLOTS_PER_PACKET * TOF_SLOT_BYTES);
    out.extend_from_slice(&packet_ts_ms.to_be_bytes());
    out.push(accel.len() as u8);
    for (delta, axes) in accel {
        out.extend_from_slice(&delta.to_be_bytes());
        for axis in axes {
            out.extend_from_slice(&axis.to_be_bytes());
        }
    }
    let tof_count = tof.len().min(TOF_SLOTS_PER_PACKET);
    out.push(tof_count as u8);
    for slot in 0..TOF_SLOTS_PER_PACKET {
        let (delta, distance, signal_rate) = tof.get(slot).copied().unwrap_or((0, 0xFFFE, 0));
        out.extend_from_slice(&delta.to_be_bytes());
        out.extend_from_slice(&distance.to_be_bytes());
        out.extend_from_slice(&signal_rate.to_be_bytes());
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
