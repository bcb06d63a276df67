//! Simulated hardware and timer for driving a `Machine` on the host.

#![allow(dead_code)]

use axis_motion::config::{EndstopConfig, EndstopPosition, SoftLimits};
use axis_motion::error::HardwareError;
use axis_motion::{
    Axis, AxisConfig, Machine, MachineConfig, Millimeters, MmPerSecSquared, MotionHardware,
    StepTimer,
};

/// Upper bound on firings per drive call, to fail instead of hanging.
pub const MAX_FIRINGS: usize = 5_000_000;

/// A simulated endstop switch.
#[derive(Debug, Clone, Copy)]
pub struct SimEndstop {
    /// Step position at which the switch closes.
    pub at: i64,
    /// Switch sits at the positive end.
    pub max: bool,
}

impl SimEndstop {
    fn tripped(&self, position: i64) -> bool {
        if self.max {
            position >= self.at
        } else {
            position <= self.at
        }
    }
}

/// Step/direction lines of a simulated machine.
#[derive(Debug, Default)]
pub struct SimHardware {
    /// Physical position in steps.
    pub position: [i64; 3],
    /// Current direction line per axis.
    pub forward: [bool; 3],
    /// Total pulses per axis.
    pub pulses: [u64; 3],
    /// Fitted endstops.
    pub endstops: [Option<SimEndstop>; 3],
    /// Emergency stop input.
    pub estop: bool,
    /// Axes in the order they started moving, one entry per run of pulses.
    pub movers: Vec<Axis>,
    /// Pulses after which the STEP line fails.
    pub fail_after: Option<u64>,
}

impl SimHardware {
    pub fn new() -> Self {
        Self {
            forward: [true; 3],
            ..Self::default()
        }
    }

    pub fn with_endstop(mut self, axis: Axis, at: i64, max: bool) -> Self {
        self.endstops[axis.index()] = Some(SimEndstop { at, max });
        self
    }

    pub fn total_pulses(&self) -> u64 {
        self.pulses.iter().sum()
    }
}

impl MotionHardware for SimHardware {
    fn step(&mut self, axis: Axis) -> Result<(), HardwareError> {
        if let Some(limit) = self.fail_after {
            if self.total_pulses() >= limit {
                return Err(HardwareError::OutputPin(axis));
            }
        }
        let i = axis.index();
        self.position[i] += if self.forward[i] { 1 } else { -1 };
        self.pulses[i] += 1;
        if self.movers.last() != Some(&axis) {
            self.movers.push(axis);
        }
        Ok(())
    }

    fn set_direction(&mut self, axis: Axis, forward: bool) -> Result<(), HardwareError> {
        self.forward[axis.index()] = forward;
        Ok(())
    }

    fn read_endstop(&mut self, axis: Axis) -> Result<bool, HardwareError> {
        let i = axis.index();
        Ok(self.endstops[i]
            .map(|e| e.tripped(self.position[i]))
            .unwrap_or(false))
    }

    fn emergency_stop_asserted(&mut self) -> bool {
        self.estop
    }
}

/// One-shot timer that records every interval it is armed with.
#[derive(Debug, Default)]
pub struct SimTimer {
    pub armed: Option<u32>,
    pub arm_count: u64,
    pub elapsed_ticks: u64,
    pub shortest: Option<u32>,
    pub longest: Option<u32>,
}

impl StepTimer for SimTimer {
    fn arm(&mut self, ticks: u32) {
        assert!(ticks > 0, "timer armed with zero ticks");
        self.armed = Some(ticks);
        self.arm_count += 1;
        self.shortest = Some(self.shortest.map_or(ticks, |s| s.min(ticks)));
        self.longest = Some(self.longest.map_or(ticks, |l| l.max(ticks)));
    }

    fn disarm(&mut self) {
        self.armed = None;
    }

    fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

pub type SimMachine<const N: usize = 8> = Machine<SimHardware, SimTimer, N>;

/// Fire the step interrupt once if the timer is armed. Returns whether it
/// fired.
pub fn fire<const N: usize>(machine: &SimMachine<N>) -> bool {
    let pending = machine.with_timer(|t| t.armed);
    match pending {
        Some(ticks) => {
            machine.with_timer(|t| t.elapsed_ticks += ticks as u64);
            machine.on_step_timer();
            true
        }
        None => false,
    }
}

/// Fire until the timer stops. Returns the number of firings.
pub fn run_to_idle<const N: usize>(machine: &SimMachine<N>) -> usize {
    let mut firings = 0;
    while fire(machine) {
        firings += 1;
        assert!(firings < MAX_FIRINGS, "machine never went idle");
    }
    firings
}

/// 1 MHz timer, 1 step per micrometer on every axis, no endstops.
pub fn basic_config() -> MachineConfig {
    let mut config = MachineConfig::new(1_000_000, MmPerSecSquared(1_000.0))
        .with_axis(Axis::X, AxisConfig::new(1_000_000, 6_000, 60))
        .with_axis(Axis::Y, AxisConfig::new(1_000_000, 6_000, 60))
        .with_axis(Axis::Z, AxisConfig::new(1_000_000, 3_000, 60));
    config.min_interval_ticks = 10;
    config
}

/// `basic_config` with min endstops on X and Y and a max endstop on Z.
///
/// X homes to 5 mm, Y to 0 (no limit), Z to 40 mm.
pub fn homing_config() -> MachineConfig {
    let mut config = basic_config();
    config.homing.approach_distance_um = 1_000_000;
    config.homing.backoff_distance_um = 1_000;

    let x = AxisConfig::new(1_000_000, 6_000, 600)
        .with_limits(SoftLimits::new(Some(Millimeters(5.0)), Some(Millimeters(300.0))))
        .with_endstop(EndstopConfig::default());
    let y = AxisConfig::new(1_000_000, 6_000, 600).with_endstop(EndstopConfig::default());
    let z = AxisConfig::new(1_000_000, 3_000, 300)
        .with_limits(SoftLimits::new(None, Some(Millimeters(40.0))))
        .with_endstop(EndstopConfig {
            position: EndstopPosition::Max,
            inverted: false,
        });

    config.with_axis(Axis::X, x).with_axis(Axis::Y, y).with_axis(Axis::Z, z)
}

/// Hardware matching `homing_config`, with switches a few millimeters
/// from the start position.
pub fn homing_hardware() -> SimHardware {
    SimHardware::new()
        .with_endstop(Axis::X, -3_000, false)
        .with_endstop(Axis::Y, -1_500, false)
        .with_endstop(Axis::Z, 2_000, true)
}
