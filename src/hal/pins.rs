//! [`MotionHardware`] over embedded-hal 1.0 pins.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::MotionHardware;
use crate::config::MachineProfile;
use crate::error::HardwareError;
use crate::motion::Axis;

/// Default STEP pulse width in nanoseconds.
pub const DEFAULT_PULSE_NS: u32 = 2_000;

/// STEP/DIR outputs and an optional endstop input of one axis.
pub struct AxisPins<STEP, DIR, END> {
    step: STEP,
    dir: DIR,
    endstop: Option<END>,
    invert_direction: bool,
    invert_endstop: bool,
    // Cached to skip redundant DIR writes
    forward: Option<bool>,
}

impl<STEP, DIR, END> AxisPins<STEP, DIR, END>
where
    STEP: OutputPin,
    DIR: OutputPin,
    END: InputPin,
{
    /// Axis with STEP and DIR lines and no endstop.
    pub fn new(step: STEP, dir: DIR) -> Self {
        Self {
            step,
            dir,
            endstop: None,
            invert_direction: false,
            invert_endstop: false,
            forward: None,
        }
    }

    /// Attach an endstop input.
    pub fn with_endstop(mut self, endstop: END) -> Self {
        self.endstop = Some(endstop);
        self
    }

    /// Drive DIR low for positive travel.
    pub fn invert_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }

    /// Treat a low endstop input as triggered.
    pub fn invert_endstop(mut self, invert: bool) -> Self {
        self.invert_endstop = invert;
        self
    }

    /// Release the pins.
    pub fn release(self) -> (STEP, DIR, Option<END>) {
        (self.step, self.dir, self.endstop)
    }
}

/// Step/direction driver for up to three axes.
///
/// Generic over:
/// - `STEP`: STEP pin type (must implement `OutputPin`)
/// - `DIR`: DIR pin type (must implement `OutputPin`)
/// - `END`: endstop and emergency-stop input type (must implement `InputPin`)
/// - `DELAY`: delay provider for the pulse width (must implement `DelayNs`)
pub struct PinDriver<STEP, DIR, END, DELAY> {
    axes: [Option<AxisPins<STEP, DIR, END>>; 3],
    estop: Option<END>,
    delay: DELAY,
    pulse_ns: u32,
}

impl<STEP, DIR, END, DELAY> PinDriver<STEP, DIR, END, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    END: InputPin,
    DELAY: DelayNs,
{
    /// Driver with no axes attached.
    pub fn new(delay: DELAY) -> Self {
        Self {
            axes: [None, None, None],
            estop: None,
            delay,
            pulse_ns: DEFAULT_PULSE_NS,
        }
    }

    /// Attach the pins of `axis`.
    pub fn with_axis(mut self, axis: Axis, pins: AxisPins<STEP, DIR, END>) -> Self {
        self.axes[axis.index()] = Some(pins);
        self
    }

    /// Attach an emergency-stop input (high = asserted).
    pub fn with_emergency_stop(mut self, pin: END) -> Self {
        self.estop = Some(pin);
        self
    }

    /// Set the STEP pulse width.
    pub fn with_pulse_width_ns(mut self, ns: u32) -> Self {
        self.pulse_ns = ns;
        self
    }

    /// Take direction and endstop inversion from a machine profile.
    pub fn apply_profile(mut self, profile: &MachineProfile) -> Self {
        for axis in Axis::ALL {
            let axis_profile = profile.axis(axis);
            if let Some(pins) = self.axes[axis.index()].as_mut() {
                pins.invert_direction = axis_profile.invert_direction;
                pins.invert_endstop = axis_profile.endstop.map(|e| e.inverted).unwrap_or(false);
                pins.forward = None;
            }
        }
        self
    }

    /// Release the delay provider and the pins of every axis.
    #[allow(clippy::type_complexity)]
    pub fn release(self) -> (DELAY, [Option<AxisPins<STEP, DIR, END>>; 3], Option<END>) {
        (self.delay, self.axes, self.estop)
    }
}

impl<STEP, DIR, END, DELAY> MotionHardware for PinDriver<STEP, DIR, END, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    END: InputPin,
    DELAY: DelayNs,
{
    fn step(&mut self, axis: Axis) -> Result<(), HardwareError> {
        let Some(pins) = self.axes[axis.index()].as_mut() else {
            return Ok(());
        };

        pins.step.set_high().map_err(|_| HardwareError::OutputPin(axis))?;
        self.delay.delay_ns(self.pulse_ns);
        pins.step.set_low().map_err(|_| HardwareError::OutputPin(axis))?;
        Ok(())
    }

    fn set_direction(&mut self, axis: Axis, forward: bool) -> Result<(), HardwareError> {
        let Some(pins) = self.axes[axis.index()].as_mut() else {
            return Ok(());
        };
        if pins.forward == Some(forward) {
            return Ok(());
        }

        let high = forward != pins.invert_direction;
        if high {
            pins.dir.set_high()
        } else {
            pins.dir.set_low()
        }
        .map_err(|_| HardwareError::OutputPin(axis))?;

        pins.forward = Some(forward);
        Ok(())
    }

    fn read_endstop(&mut self, axis: Axis) -> Result<bool, HardwareError> {
        let Some(pins) = self.axes[axis.index()].as_mut() else {
            return Ok(false);
        };
        let Some(endstop) = pins.endstop.as_mut() else {
            return Ok(false);
        };

        let high = endstop.is_high().map_err(|_| HardwareError::InputPin(axis))?;
        Ok(high != pins.invert_endstop)
    }

    fn emergency_stop_asserted(&mut self) -> bool {
        match self.estop.as_mut() {
            // An unreadable stop input counts as asserted
            Some(pin) => pin.is_high().unwrap_or(true),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    type Driver = PinDriver<PinMock, PinMock, PinMock, NoopDelay>;

    #[test]
    fn test_step_pulses_high_then_low() {
        let step = PinMock::new(&[
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ]);
        let dir = PinMock::new(&[]);
        let mut step_check = step.clone();
        let mut dir_check = dir.clone();

        let mut driver: Driver =
            PinDriver::new(NoopDelay::new()).with_axis(Axis::X, AxisPins::new(step, dir));
        driver.step(Axis::X).unwrap();
        // Unattached axes are ignored
        driver.step(Axis::Y).unwrap();

        step_check.done();
        dir_check.done();
    }

    #[test]
    fn test_direction_inversion_and_caching() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[
            Transaction::set(State::Low),
            Transaction::set(State::High),
        ]);
        let mut step_check = step.clone();
        let mut dir_check = dir.clone();

        let mut driver: Driver = PinDriver::new(NoopDelay::new())
            .with_axis(Axis::Z, AxisPins::new(step, dir).invert_direction(true));
        driver.set_direction(Axis::Z, true).unwrap();
        // Same direction again: no pin write
        driver.set_direction(Axis::Z, true).unwrap();
        driver.set_direction(Axis::Z, false).unwrap();

        step_check.done();
        dir_check.done();
    }

    #[test]
    fn test_inverted_endstop_reads_low_as_triggered() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[]);
        let endstop = PinMock::new(&[
            Transaction::get(State::Low),
            Transaction::get(State::High),
        ]);
        let mut step_check = step.clone();
        let mut dir_check = dir.clone();
        let mut endstop_check = endstop.clone();

        let mut driver: Driver = PinDriver::new(NoopDelay::new()).with_axis(
            Axis::Y,
            AxisPins::new(step, dir)
                .with_endstop(endstop)
                .invert_endstop(true),
        );
        assert!(driver.read_endstop(Axis::Y).unwrap());
        assert!(!driver.read_endstop(Axis::Y).unwrap());
        // No endstop fitted on X
        assert!(!driver.read_endstop(Axis::X).unwrap());

        step_check.done();
        dir_check.done();
        endstop_check.done();
    }

    #[test]
    fn test_emergency_stop_input() {
        let estop = PinMock::new(&[Transaction::get(State::High)]);
        let mut estop_check = estop.clone();

        let mut driver: Driver = PinDriver::new(NoopDelay::new()).with_emergency_stop(estop);
        assert!(driver.emergency_stop_asserted());

        estop_check.done();
    }
}
