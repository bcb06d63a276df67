//! Soft limit configuration and types.

use serde::Deserialize;

use super::units::Millimeters;

/// Soft axis limits in millimeters (from configuration).
///
/// Either bound may be absent; a missing bound is simply not enforced.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SoftLimits {
    /// Minimum allowed coordinate.
    #[serde(default, rename = "min_mm")]
    pub min: Option<Millimeters>,

    /// Maximum allowed coordinate.
    #[serde(default, rename = "max_mm")]
    pub max: Option<Millimeters>,
}

impl SoftLimits {
    /// Create new soft limits.
    pub fn new(min: Option<Millimeters>, max: Option<Millimeters>) -> Self {
        Self { min, max }
    }

    /// Check if limits are valid (min < max when both are set).
    pub fn is_valid(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min.0 < max.0,
            _ => true,
        }
    }
}

/// Soft limits converted to micrometers (for runtime use).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TravelLimits {
    /// Minimum coordinate in micrometers.
    pub min_um: Option<i32>,
    /// Maximum coordinate in micrometers.
    pub max_um: Option<i32>,
}

impl TravelLimits {
    /// Convert soft limits to micrometers.
    pub fn from_soft_limits(soft: &SoftLimits) -> Self {
        Self {
            min_um: soft.min.map(Millimeters::to_micrometers),
            max_um: soft.max.map(Millimeters::to_micrometers),
        }
    }

    /// Clamp a coordinate into the configured travel.
    pub fn clamp(&self, um: i32) -> i32 {
        let mut um = um;
        if let Some(min) = self.min_um {
            um = um.max(min);
        }
        if let Some(max) = self.max_um {
            um = um.min(max);
        }
        um
    }
}
