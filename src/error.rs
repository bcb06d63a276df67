//! Error types for axis-motion.
//!
//! Provides unified error handling across configuration, queue admission,
//! motion control and hardware access.

use core::fmt;

use crate::motion::Axis;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all axis-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Move queue admission error
    Queue(QueueError),
    /// Motion control error
    Motion(MotionError),
    /// Pin or timer access error
    Hardware(HardwareError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Steps per meter must be > 0
    InvalidStepsPerMeter(Axis),
    /// Feed rate limits must be > 0
    InvalidFeedRate(Axis),
    /// Invalid soft limits (min must be < max)
    InvalidSoftLimits {
        /// Axis carrying the limits
        axis: Axis,
        /// Minimum limit value in millimeters
        min: f32,
        /// Maximum limit value in millimeters
        max: f32,
    },
    /// Endstop debounce count must be in 1..=255
    InvalidDebounce(u16),
    /// Acceleration must be > 0
    InvalidAcceleration(f32),
    /// Timer frequency must be > 0
    InvalidTimerFrequency,
    /// Minimum step interval must be > 0
    InvalidMinInterval,
    /// Homing approach and backoff distances must be > 0
    InvalidHomingDistance,
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Move queue errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// No free slot; the producer must stall and retry
    Full,
}

/// Motion control errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionError {
    /// The machine latched an emergency stop and accepts no more motion
    Halted,
    /// Authoritative position touched while segments were still pending
    NotDrained,
    /// A homing approach ran its full distance without tripping the endstop
    EndstopNotReached(Axis),
}

/// Hardware access errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    /// STEP or DIR pin operation failed
    OutputPin(Axis),
    /// Endstop pin read failed
    InputPin(Axis),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Queue(e) => write!(f, "Queue error: {}", e),
            Error::Motion(e) => write!(f, "Motion error: {}", e),
            Error::Hardware(e) => write!(f, "Hardware error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidStepsPerMeter(axis) => {
                write!(f, "Invalid steps_per_m on axis {}: must be > 0", axis)
            }
            ConfigError::InvalidFeedRate(axis) => {
                write!(f, "Invalid feed rate on axis {}: must be > 0", axis)
            }
            ConfigError::InvalidSoftLimits { axis, min, max } => write!(
                f,
                "Invalid soft limits on axis {}: min ({}) must be < max ({})",
                axis, min, max
            ),
            ConfigError::InvalidDebounce(v) => {
                write!(f, "Invalid endstop debounce: {}. Must be 1-255", v)
            }
            ConfigError::InvalidAcceleration(v) => {
                write!(f, "Invalid acceleration: {}. Must be > 0", v)
            }
            ConfigError::InvalidTimerFrequency => write!(f, "Timer frequency must be > 0"),
            ConfigError::InvalidMinInterval => write!(f, "Minimum step interval must be > 0"),
            ConfigError::InvalidHomingDistance => {
                write!(f, "Homing approach and backoff distances must be > 0")
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full => write!(f, "Move queue is full"),
        }
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionError::Halted => write!(f, "Machine halted, restart required"),
            MotionError::NotDrained => write!(f, "Move queue must be drained first"),
            MotionError::EndstopNotReached(axis) => {
                write!(f, "Endstop on axis {} not reached during homing", axis)
            }
        }
    }
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareError::OutputPin(axis) => write!(f, "Output pin failed on axis {}", axis),
            HardwareError::InputPin(axis) => write!(f, "Endstop read failed on axis {}", axis),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Error::Queue(e)
    }
}

impl From<MotionError> for Error {
    fn from(e: MotionError) -> Self {
        Error::Motion(e)
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Error::Hardware(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for QueueError {}

#[cfg(feature = "std")]
impl std::error::Error for MotionError {}

#[cfg(feature = "std")]
impl std::error::Error for HardwareError {}
