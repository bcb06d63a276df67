//! # axis-motion
//!
//! Queue-driven motion core for three-axis stepper machines, with
//! embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Precomputed segments**: per-axis step deltas and a constant
//!   acceleration ramp are planned once, at admission
//! - **Integer step interrupt**: Bresenham stepping and a fixed-point ramp
//!   recurrence, no floating point in the interrupt
//! - **Backpressure**: a fixed-capacity ring queue between command intake
//!   and the step interrupt
//! - **Homing**: approach, backoff and re-approach with debounced endstops
//! - **no_std compatible**: core library works without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axis_motion::{Machine, Target};
//!
//! // Load configuration from TOML
//! let config = axis_motion::load_config("machine.toml")?;
//!
//! // Hardware: embedded-hal pins plus a board timer
//! let machine: Machine<_, _> = Machine::new(&config, pin_driver, step_timer)?;
//!
//! // The timer interrupt calls `machine.on_step_timer()`
//! machine.home_all(|| watchdog.feed())?;
//! machine.enqueue(&Target::new().x(120_000).y(40_000).feed_rate(1_200))?;
//! machine.drain_wait(|| watchdog.feed())?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt formatting for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod error;
pub mod hal;
pub mod homing;
pub mod machine;
pub mod motion;
pub mod queue;
pub mod scheduler;
pub mod tracker;

// Re-exports for ergonomic API
pub use config::{validate_config, AxisConfig, MachineConfig, MachineProfile};
pub use error::{Error, Result};
pub use hal::{AxisPins, MotionHardware, PinDriver, StepTimer};
pub use homing::{HomingCycle, HomingPhase};
pub use machine::{Admission, Machine, Progress};
pub use motion::{Axis, AxisMask, Completion, Position, Segment, SegmentBuilder, Target, Termination};
pub use queue::{MoveQueue, QueueStatus};
pub use scheduler::{Advance, Retired, StepScheduler};
pub use tracker::{DistanceMode, PositionTracker};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Millimeters, MmPerMin, MmPerSecSquared, StepsPerMeter};
