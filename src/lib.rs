//! HoopSense: basketball shot classifier
//!
//! Fuses two independently sampled sensor streams into MAKE/MISS shot events:
//! accelerometer magnitude (rim/board impacts) and time-of-flight distance plus
//! signal rate (ball through the basket).
//!
//! raw samples → filter → per-sensor buffers → chronological merge → state machine → events

pub mod core;
pub mod types;

// =============================================================================
// THRESHOLDS - defaults for ThresholdConfig
// =============================================================================

/// Acceleration magnitude above which a sample counts as an impact (g)
pub const DEFAULT_IMPACT_ACCEL_THRESHOLD: f64 = 5.0;

/// Ball is in the basket when TOF distance is below this (mm)
pub const DEFAULT_TOF_DISTANCE_THRESHOLD: u16 = 350;

/// A basketball returns a strong signal; reflections above this rate qualify
pub const DEFAULT_TOF_SIGNAL_RATE_THRESHOLD: f64 = 1000.0;

/// Maximum time after an impact for a basket reading to count (seconds)
pub const DEFAULT_MAX_TIME_AFTER_IMPACT: f64 = 0.5;

/// Cooldown after a completed shot during which all samples are ignored (seconds)
pub const DEFAULT_BLACKOUT_WINDOW: f64 = 1.0;

// =============================================================================
// CONFIDENCE SCORES - fixed heuristics, not learned probabilities
// =============================================================================

/// Basket reading within the window after an impact
pub const CONFIDENCE_MAKE_AFTER_IMPACT: f64 = 0.95;

/// Basket reading with no preceding impact
pub const CONFIDENCE_STANDALONE_MAKE: f64 = 0.85;

/// Impact with no basket reading inside the window
pub const CONFIDENCE_MISS: f64 = 0.85;

/// Signal rate above which the signal-rate policy calls a make a swish
pub const SWISH_SIGNAL_RATE_THRESHOLD: f64 = 1200.0;

// =============================================================================
// TRANSPORT - sensor packet layout
// =============================================================================

/// Raw TOF value written when a packet slot carries no sample
pub const DISTANCE_SENTINEL_NO_SAMPLE: i32 = 0xFFFE;

/// Raw TOF value reported for an out-of-range read
pub const DISTANCE_SENTINEL_OUT_OF_RANGE: i32 = 0xFFFF;

/// Accelerometer samples per packet (and rows per replay batch)
pub const SAMPLES_PER_PACKET: usize = 20;

/// Fixed number of TOF slots in every packet
pub const TOF_SLOTS_PER_PACKET: usize = 8;

/// LSB per g at ±16g range
pub const ACCEL_SENSITIVITY: f64 = 2048.0;

/// LSB per degree/second at ±2000 dps range
pub const GYRO_SENSITIVITY: f64 = 16.384;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
