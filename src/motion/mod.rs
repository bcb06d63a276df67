//! Motion module for axis-motion.
//!
//! Provides machine coordinates, ramp planning and precomputed move
//! segments.

mod position;
pub mod ramp;
mod segment;

pub use position::{Axis, AxisMask, Position, Target};
pub use ramp::{RampPlan, RampShape};
pub use segment::{Completion, Segment, SegmentBuilder, Termination};
