//! Runtime capability descriptors derived from configuration.
//!
//! Optional axes, endstops and soft limits are resolved here once at
//! startup, so the motion core asks "does this axis have an endstop"
//! instead of re-reading configuration.

use super::axis::{AxisConfig, EndstopConfig, EndstopPosition};
use super::limits::TravelLimits;
use super::machine::{HomingConfig, MachineConfig};
use super::units::StepsPerMeter;
use crate::motion::Axis;

/// Derived parameters for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisProfile {
    /// Axis is fitted. Absent axes never step.
    pub present: bool,

    /// Resolution.
    pub steps_per_m: StepsPerMeter,

    /// Feed rate cap in mm/min.
    pub max_feedrate: u32,

    /// Homing search feed rate in mm/min.
    pub search_feedrate: u32,

    /// Direction pin logic inverted.
    pub invert_direction: bool,

    /// Soft limits in micrometers.
    pub limits: TravelLimits,

    /// Endstop, if fitted.
    pub endstop: Option<EndstopConfig>,
}

impl AxisProfile {
    /// Profile of an axis that is not fitted.
    pub const ABSENT: AxisProfile = AxisProfile {
        present: false,
        steps_per_m: StepsPerMeter(0),
        max_feedrate: u32::MAX,
        search_feedrate: u32::MAX,
        invert_direction: false,
        limits: TravelLimits {
            min_um: None,
            max_um: None,
        },
        endstop: None,
    };

    /// Compute the profile of a fitted axis.
    pub fn from_config(config: &AxisConfig) -> Self {
        Self {
            present: true,
            steps_per_m: config.steps_per_m,
            max_feedrate: config.max_feedrate.value(),
            search_feedrate: config.search_feedrate.value(),
            invert_direction: config.invert_direction,
            limits: config
                .limits
                .as_ref()
                .map(TravelLimits::from_soft_limits)
                .unwrap_or_default(),
            endstop: config.endstop,
        }
    }

    /// Absolute step position of a coordinate on this axis.
    #[inline]
    pub fn steps(&self, um: i32) -> i64 {
        if self.present {
            self.steps_per_m.steps(um)
        } else {
            0
        }
    }

    /// Whether homing can run on this axis.
    #[inline]
    pub fn has_endstop(&self) -> bool {
        self.present && self.endstop.is_some()
    }

    /// Coordinate the axis takes once homed: the limit on the endstop's
    /// side, or zero when that limit is unset.
    pub fn home_position(&self) -> i32 {
        match self.endstop.map(|e| e.position) {
            Some(EndstopPosition::Max) => self.limits.max_um.unwrap_or(0),
            _ => self.limits.min_um.unwrap_or(0),
        }
    }

    /// Sign of travel toward the endstop: -1 for a min switch, +1 for max.
    pub fn homing_sign(&self) -> i32 {
        match self.endstop.map(|e| e.position) {
            Some(EndstopPosition::Max) => 1,
            _ => -1,
        }
    }
}

/// Derived parameters for the whole machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineProfile {
    /// Per-axis profiles in [`Axis::index`] order.
    pub axes: [AxisProfile; 3],

    /// Step timer tick rate.
    pub timer_frequency_hz: u32,

    /// Floor for every armed interval.
    pub min_interval_ticks: u32,

    /// Acceleration in mm/s².
    pub acceleration_mm_per_s2: f32,

    /// Endstop debounce count.
    pub endstop_debounce: u8,

    /// Step interrupt may nest.
    pub reentrant_step_interrupt: bool,

    /// Initial feed rate in mm/min.
    pub default_feedrate: u32,

    /// Homing distances.
    pub homing: HomingConfig,
}

impl MachineProfile {
    /// Resolve a validated configuration.
    pub fn from_config(config: &MachineConfig) -> Self {
        let mut axes = [AxisProfile::ABSENT; 3];
        for axis in Axis::ALL {
            if let Some(axis_config) = config.axis(axis) {
                axes[axis.index()] = AxisProfile::from_config(axis_config);
            }
        }

        Self {
            axes,
            timer_frequency_hz: config.timer_frequency_hz,
            min_interval_ticks: config.min_interval_ticks.max(1),
            acceleration_mm_per_s2: config.acceleration.value(),
            endstop_debounce: config.endstop_debounce.clamp(1, u8::MAX as u16) as u8,
            reentrant_step_interrupt: config.reentrant_step_interrupt,
            default_feedrate: config.default_feedrate.value(),
            homing: config.homing,
        }
    }

    /// Profile of `axis`.
    #[inline]
    pub fn axis(&self, axis: Axis) -> &AxisProfile {
        &self.axes[axis.index()]
    }

    /// Highest feed rate any fitted axis allows, used for rapid moves.
    pub fn rapid_feedrate(&self) -> u32 {
        self.axes
            .iter()
            .filter(|a| a.present)
            .map(|a| a.max_feedrate)
            .max()
            .unwrap_or(self.default_feedrate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::limits::SoftLimits;
    use crate::config::units::{Millimeters, MmPerSecSquared};

    fn make_test_config() -> MachineConfig {
        MachineConfig::new(16_000_000, MmPerSecSquared(50.0))
            .with_axis(
                Axis::X,
                AxisConfig::new(200_000, 2_500, 60)
                    .with_limits(SoftLimits::new(Some(Millimeters(0.0)), Some(Millimeters(720.0))))
                    .with_endstop(EndstopConfig::default()),
            )
            .with_axis(
                Axis::Z,
                AxisConfig::new(333_333, 300, 60).with_endstop(EndstopConfig {
                    position: EndstopPosition::Max,
                    inverted: false,
                }),
            )
    }

    #[test]
    fn test_absent_axis_never_steps() {
        let profile = MachineProfile::from_config(&make_test_config());
        let y = profile.axis(Axis::Y);

        assert!(!y.present);
        assert!(!y.has_endstop());
        assert_eq!(y.steps(1_000_000), 0);
    }

    #[test]
    fn test_home_position_follows_endstop_side() {
        let profile = MachineProfile::from_config(&make_test_config());

        assert_eq!(profile.axis(Axis::X).home_position(), 0);
        assert_eq!(profile.axis(Axis::X).homing_sign(), -1);
        // Max switch without a max limit homes to zero
        assert_eq!(profile.axis(Axis::Z).home_position(), 0);
        assert_eq!(profile.axis(Axis::Z).homing_sign(), 1);
    }

    #[test]
    fn test_rapid_feedrate_uses_fastest_axis() {
        let profile = MachineProfile::from_config(&make_test_config());
        assert_eq!(profile.rapid_feedrate(), 2_500);
    }
}
