//! Per-axis configuration from TOML.

use serde::Deserialize;

use super::limits::SoftLimits;
use super::units::{MmPerMin, StepsPerMeter};

/// Which end of the travel an endstop sits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndstopPosition {
    /// At the minimum; homing moves in the negative direction.
    #[default]
    Min,
    /// At the maximum; homing moves in the positive direction.
    Max,
}

/// Endstop wiring for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndstopConfig {
    /// End of travel the switch is mounted at.
    #[serde(default)]
    pub position: EndstopPosition,

    /// Input reads low when triggered.
    #[serde(default)]
    pub inverted: bool,
}

/// Complete axis configuration from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Resolution in steps per meter.
    pub steps_per_m: StepsPerMeter,

    /// Cap for every feed rate on this axis; also used for rapid moves and
    /// the homing approach.
    #[serde(rename = "max_feedrate_mm_per_min")]
    pub max_feedrate: MmPerMin,

    /// Feed rate for homing backoff and re-approach.
    #[serde(rename = "search_feedrate_mm_per_min")]
    pub search_feedrate: MmPerMin,

    /// Invert direction pin logic.
    #[serde(default)]
    pub invert_direction: bool,

    /// Optional soft limits.
    #[serde(default)]
    pub limits: Option<SoftLimits>,

    /// Optional endstop.
    #[serde(default)]
    pub endstop: Option<EndstopConfig>,
}

impl AxisConfig {
    /// Create an axis with no limits and no endstop.
    pub fn new(steps_per_m: u32, max_feedrate: u32, search_feedrate: u32) -> Self {
        Self {
            steps_per_m: StepsPerMeter(steps_per_m),
            max_feedrate: MmPerMin(max_feedrate),
            search_feedrate: MmPerMin(search_feedrate),
            invert_direction: false,
            limits: None,
            endstop: None,
        }
    }

    /// Add soft limits.
    pub fn with_limits(mut self, limits: SoftLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Add an endstop.
    pub fn with_endstop(mut self, endstop: EndstopConfig) -> Self {
        self.endstop = Some(endstop);
        self
    }
}
