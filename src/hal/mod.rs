//! Hardware seams of the motion core.
//!
//! The scheduler only ever talks to a [`MotionHardware`] (step, direction
//! and endstop lines) and a [`StepTimer`] (the countdown that fires the
//! step interrupt). [`PinDriver`] implements the former over embedded-hal
//! pins; timers are board specific and implemented by the application.

mod pins;

pub use pins::{AxisPins, PinDriver};

use crate::error::HardwareError;
use crate::motion::Axis;

/// Step, direction and endstop lines of the machine.
pub trait MotionHardware {
    /// Emit one step pulse on `axis`.
    fn step(&mut self, axis: Axis) -> Result<(), HardwareError>;

    /// Set the direction line of `axis` (`forward` = positive travel).
    fn set_direction(&mut self, axis: Axis, forward: bool) -> Result<(), HardwareError>;

    /// Whether the endstop of `axis` is triggered. Axes without an endstop
    /// read untriggered.
    fn read_endstop(&mut self, axis: Axis) -> Result<bool, HardwareError>;

    /// Whether the emergency-stop input is asserted.
    fn emergency_stop_asserted(&mut self) -> bool {
        false
    }
}

/// One-shot countdown timer driving the step interrupt.
///
/// After [`arm`](StepTimer::arm) the timer fires once after `ticks` and
/// stays armed until it is re-armed or [`disarm`](StepTimer::disarm)ed; the
/// interrupt handler does one or the other on every firing.
pub trait StepTimer {
    /// Fire after `ticks` timer ticks.
    fn arm(&mut self, ticks: u32);

    /// Stop firing.
    fn disarm(&mut self);

    /// Whether a firing is pending. False once a one-shot has fired.
    fn is_armed(&self) -> bool;
}
