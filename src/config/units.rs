//! Unit types for physical quantities.
//!
//! Configuration speaks millimeters, mm/min and mm/s²; the motion core
//! speaks micrometers, steps and timer ticks. These wrappers keep the two
//! from mixing.

use serde::Deserialize;

/// Micrometers per millimeter.
pub const UM_PER_MM: i64 = 1_000;

/// Micrometers per meter.
pub const UM_PER_M: i64 = 1_000_000;

/// Linear length in millimeters (configuration only).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f32);

impl Millimeters {
    /// Create a new Millimeters value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Convert to micrometers, rounded to nearest.
    #[inline]
    pub fn to_micrometers(self) -> i32 {
        libm::roundf(self.0 * UM_PER_MM as f32) as i32
    }
}

/// Feed rate in millimeters per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerMin(pub u32);

impl MmPerMin {
    /// Create a new MmPerMin value.
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

/// Linear acceleration in millimeters per second squared.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct MmPerSecSquared(pub f32);

impl MmPerSecSquared {
    /// Create a new MmPerSecSquared value.
    #[inline]
    pub const fn new(value: f32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }
}

/// Axis resolution in steps per meter of travel (steps/mm × 1000).
///
/// For threaded rods this is `steps_per_turn / pitch_mm * 1000`; for belts
/// `steps_per_turn / teeth / module_mm * 1000`. Microstepping multiplies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(transparent)]
pub struct StepsPerMeter(pub u32);

impl StepsPerMeter {
    /// Create a new StepsPerMeter value.
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Absolute step position of a micrometer coordinate, rounded to nearest.
    #[inline]
    pub fn steps(self, um: i32) -> i64 {
        let scaled = um as i64 * self.0 as i64;
        let half = UM_PER_M / 2;
        if scaled >= 0 {
            (scaled + half) / UM_PER_M
        } else {
            (scaled - half) / UM_PER_M
        }
    }

    /// Steps per second squared for a linear acceleration.
    #[inline]
    pub fn acceleration(self, accel: MmPerSecSquared) -> f32 {
        accel.0 * self.0 as f32 / UM_PER_MM as f32
    }
}
