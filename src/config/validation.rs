//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::motion::Axis;

use super::{AxisConfig, MachineConfig};

/// Validate a machine configuration.
///
/// Checks:
/// - Timer frequency, minimum interval and acceleration are positive
/// - Endstop debounce is in 1..=255
/// - Homing distances are positive
/// - Every fitted axis has positive resolution and feed rates
/// - Soft limits are valid (min < max)
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    if config.timer_frequency_hz == 0 {
        return Err(Error::Config(ConfigError::InvalidTimerFrequency));
    }

    if config.min_interval_ticks == 0 {
        return Err(Error::Config(ConfigError::InvalidMinInterval));
    }

    // Also rejects NaN
    if !(config.acceleration.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidAcceleration(
            config.acceleration.0,
        )));
    }

    if config.endstop_debounce == 0 || config.endstop_debounce > u8::MAX as u16 {
        return Err(Error::Config(ConfigError::InvalidDebounce(
            config.endstop_debounce,
        )));
    }

    if config.homing.approach_distance_um == 0 || config.homing.backoff_distance_um == 0 {
        return Err(Error::Config(ConfigError::InvalidHomingDistance));
    }

    for axis in Axis::ALL {
        if let Some(axis_config) = config.axis(axis) {
            validate_axis(axis, axis_config)?;
        }
    }

    Ok(())
}

fn validate_axis(axis: Axis, config: &AxisConfig) -> Result<()> {
    if config.steps_per_m.0 == 0 {
        return Err(Error::Config(ConfigError::InvalidStepsPerMeter(axis)));
    }

    if config.max_feedrate.0 == 0 || config.search_feedrate.0 == 0 {
        return Err(Error::Config(ConfigError::InvalidFeedRate(axis)));
    }

    if let Some(ref limits) = config.limits {
        if !limits.is_valid() {
            return Err(Error::Config(ConfigError::InvalidSoftLimits {
                axis,
                min: limits.min.map(|m| m.0).unwrap_or_default(),
                max: limits.max.map(|m| m.0).unwrap_or_default(),
            }));
        }
    }

    Ok(())
}
