//! Machine configuration - root configuration structure.

use serde::Deserialize;

use super::axis::AxisConfig;
use super::units::{MmPerMin, MmPerSecSquared};
use crate::motion::Axis;

/// Homing distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HomingConfig {
    /// Programmed length of the fast approach, in micrometers. Only an
    /// endstop trip ends it early, so it must exceed the axis travel.
    #[serde(default = "default_approach_distance")]
    pub approach_distance_um: u32,

    /// Distance backed off the switch before the slow re-approach.
    #[serde(default = "default_backoff_distance")]
    pub backoff_distance_um: u32,
}

fn default_approach_distance() -> u32 {
    1_000_000
}

fn default_backoff_distance() -> u32 {
    1_000
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            approach_distance_um: default_approach_distance(),
            backoff_distance_um: default_backoff_distance(),
        }
    }
}

/// The three axes; an absent table means the axis is not fitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AxesConfig {
    /// X axis.
    #[serde(default)]
    pub x: Option<AxisConfig>,
    /// Y axis.
    #[serde(default)]
    pub y: Option<AxisConfig>,
    /// Z axis.
    #[serde(default)]
    pub z: Option<AxisConfig>,
}

impl AxesConfig {
    /// Configuration of `axis`, if fitted.
    pub fn get(&self, axis: Axis) -> Option<&AxisConfig> {
        match axis {
            Axis::X => self.x.as_ref(),
            Axis::Y => self.y.as_ref(),
            Axis::Z => self.z.as_ref(),
        }
    }

    /// Replace the configuration of `axis`.
    pub fn set(&mut self, axis: Axis, config: Option<AxisConfig>) {
        match axis {
            Axis::X => self.x = config,
            Axis::Y => self.y = config,
            Axis::Z => self.z = config,
        }
    }
}

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Step timer tick rate.
    pub timer_frequency_hz: u32,

    /// Shortest interval the step timer is ever armed with. Must cover the
    /// worst-case step interrupt duration.
    #[serde(default = "default_min_interval")]
    pub min_interval_ticks: u32,

    /// Ramp acceleration applied along the dominant axis.
    #[serde(rename = "acceleration_mm_per_s2")]
    pub acceleration: MmPerSecSquared,

    /// Consecutive tripped endstop reads needed to end a homing move.
    /// 4 or less for reliable switches, 8 or more for noisy ones.
    #[serde(default = "default_debounce")]
    pub endstop_debounce: u16,

    /// Let the step interrupt run with interrupts enabled outside its
    /// critical sections.
    #[serde(default)]
    pub reentrant_step_interrupt: bool,

    /// Feed rate in effect before any move sets one.
    #[serde(default = "default_feedrate", rename = "default_feedrate_mm_per_min")]
    pub default_feedrate: MmPerMin,

    /// Homing distances.
    #[serde(default)]
    pub homing: HomingConfig,

    /// Axis configurations.
    #[serde(default)]
    pub axes: AxesConfig,
}

fn default_min_interval() -> u32 {
    100
}

fn default_debounce() -> u16 {
    4
}

fn default_feedrate() -> MmPerMin {
    MmPerMin(60)
}

impl MachineConfig {
    /// A configuration with no axes fitted and defaults everywhere else.
    pub fn new(timer_frequency_hz: u32, acceleration: MmPerSecSquared) -> Self {
        Self {
            timer_frequency_hz,
            min_interval_ticks: default_min_interval(),
            acceleration,
            endstop_debounce: default_debounce(),
            reentrant_step_interrupt: false,
            default_feedrate: default_feedrate(),
            homing: HomingConfig::default(),
            axes: AxesConfig::default(),
        }
    }

    /// Fit an axis.
    pub fn with_axis(mut self, axis: Axis, config: AxisConfig) -> Self {
        self.axes.set(axis, Some(config));
        self
    }

    /// Get an axis configuration.
    pub fn axis(&self, axis: Axis) -> Option<&AxisConfig> {
        self.axes.get(axis)
    }
}
