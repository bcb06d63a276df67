//! Configuration module for axis-motion.
//!
//! Provides types for loading and validating machine configurations
//! from TOML files (with `std` feature) or values built in code, and the
//! per-axis capability profiles resolved from them at startup.

mod axis;
mod limits;
mod machine;
mod profile;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use axis::{AxisConfig, EndstopConfig, EndstopPosition};
pub use limits::{SoftLimits, TravelLimits};
pub use machine::{AxesConfig, HomingConfig, MachineConfig};
pub use profile::{AxisProfile, MachineProfile};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Millimeters, MmPerMin, MmPerSecSquared, StepsPerMeter};
