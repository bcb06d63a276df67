//! Move segments and the builder that precomputes them.
//!
//! A segment is everything the step interrupt needs to execute one move:
//! per-axis step deltas, the dominant-axis step count, the Bresenham
//! accumulators and the ramp schedule. It is built completely before it is
//! admitted to the queue; afterwards only the execution fields
//! (accumulators, progress, interval) change, and only at the queue's
//! consumption point.

use libm::sqrt;

use super::position::{Axis, AxisMask, Position};
use super::ramp::{self, RampPlan, MAX_INTERVAL};
use crate::config::units::UM_PER_MM;
use crate::config::MachineProfile;

/// How a segment ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Termination {
    /// Ends when the dominant axis has made all its steps.
    Distance,
    /// Also ends when any watched endstop reads `level` for the configured
    /// number of consecutive firings.
    Endstop {
        /// Endstops sampled each firing.
        axes: AxisMask,
        /// Reading that counts toward the debounce.
        level: bool,
    },
}

/// Why a segment was retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Completion {
    /// All steps were made.
    DistanceExhausted,
    /// A watched endstop tripped first.
    EndstopTriggered,
}

/// One precomputed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    start: Position,
    end: Position,
    delta: [i32; 3],
    dominant: Axis,
    total_steps: u32,
    ramp: RampPlan,
    termination: Termination,

    // Execution state, advanced by the step scheduler.
    accumulators: [u32; 3],
    steps_done: u32,
    interval: u32,
}

impl Segment {
    /// A segment with no motion that leaves the machine at `at`.
    pub const fn null(at: Position) -> Self {
        Self {
            start: at,
            end: at,
            delta: [0; 3],
            dominant: Axis::X,
            total_steps: 0,
            ramp: RampPlan::flat(0, 1),
            termination: Termination::Distance,
            accumulators: [0; 3],
            steps_done: 0,
            interval: ramp::to_fixed(1),
        }
    }

    /// Position the segment starts from.
    #[inline]
    pub fn start(&self) -> &Position {
        &self.start
    }

    /// Position the segment ends at.
    #[inline]
    pub fn end(&self) -> &Position {
        &self.end
    }

    /// Signed step delta of `axis`.
    #[inline]
    pub fn delta(&self, axis: Axis) -> i32 {
        self.delta[axis.index()]
    }

    /// Direction flag of `axis` (true = positive).
    #[inline]
    pub fn forward(&self, axis: Axis) -> bool {
        self.delta[axis.index()] >= 0
    }

    /// Axes moving in the positive direction.
    pub fn forward_mask(&self) -> AxisMask {
        let mut mask = AxisMask::NONE;
        for axis in Axis::ALL {
            if self.forward(axis) {
                mask.insert(axis);
            }
        }
        mask
    }

    /// Axis with the most steps.
    #[inline]
    pub fn dominant_axis(&self) -> Axis {
        self.dominant
    }

    /// Steps of the dominant axis.
    #[inline]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Firings executed so far.
    #[inline]
    pub fn steps_done(&self) -> u32 {
        self.steps_done
    }

    /// Bresenham accumulator of `axis`.
    #[inline]
    pub fn accumulator(&self, axis: Axis) -> u32 {
        self.accumulators[axis.index()]
    }

    /// Interval before the next firing, in whole ticks.
    #[inline]
    pub fn interval(&self) -> u32 {
        ramp::from_fixed(self.interval)
    }

    /// Interval at full speed, in ticks.
    #[inline]
    pub fn cruise_interval(&self) -> u32 {
        self.ramp.cruise_interval
    }

    /// The ramp schedule.
    #[inline]
    pub fn ramp(&self) -> &RampPlan {
        &self.ramp
    }

    /// How this segment ends.
    #[inline]
    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Segment carries no motion.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.total_steps == 0
    }

    /// Every step has been made.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.steps_done >= self.total_steps
    }

    /// Where the machine is after `steps_done` of `total_steps`, interpolated
    /// per axis between start and end.
    pub fn interpolate(&self) -> Position {
        if self.total_steps == 0 || self.steps_done >= self.total_steps {
            return self.end;
        }
        let mut pos = self.end;
        for axis in Axis::ALL {
            let from = self.start.get(axis) as i64;
            let to = self.end.get(axis) as i64;
            let moved = (to - from) * self.steps_done as i64 / self.total_steps as i64;
            pos.set(axis, (from + moved) as i32);
        }
        pos
    }

    /// Restore execution state to "not started".
    pub(crate) fn rewind(&mut self) {
        // Centre the line: each minor axis takes its first step half-way
        // through its first run of the dominant axis.
        let half = self.total_steps / 2;
        self.accumulators = [half; 3];
        self.steps_done = 0;
        self.interval = ramp::to_fixed(self.ramp.initial_interval);
    }

    /// Execute one firing: Bresenham update for every axis, progress and
    /// ramp. Returns the axes that must emit a step pulse.
    pub(crate) fn advance(&mut self) -> AxisMask {
        let mut steps = AxisMask::NONE;
        if self.is_finished() {
            return steps;
        }

        for axis in Axis::ALL {
            let i = axis.index();
            let magnitude = self.delta[i].unsigned_abs();
            if magnitude == 0 {
                continue;
            }
            self.accumulators[i] += magnitude;
            if self.accumulators[i] >= self.total_steps {
                self.accumulators[i] -= self.total_steps;
                steps.insert(axis);
            }
        }

        self.steps_done += 1;
        if self.steps_done < self.total_steps {
            self.interval = self
                .ramp
                .next_interval(self.interval, self.steps_done, self.total_steps);
        }

        steps
    }
}

/// Builds segments against a machine profile.
#[derive(Debug, Clone, Copy)]
pub struct SegmentBuilder<'a> {
    profile: &'a MachineProfile,
}

impl<'a> SegmentBuilder<'a> {
    /// Create a builder.
    pub fn new(profile: &'a MachineProfile) -> Self {
        Self { profile }
    }

    /// Distance-terminated move from `start` to `end` at `end.feed()`.
    pub fn build(&self, start: &Position, end: &Position) -> Segment {
        self.build_terminated(start, end, Termination::Distance)
    }

    /// Move from `start` to `end` with an explicit termination.
    pub fn build_terminated(
        &self,
        start: &Position,
        end: &Position,
        termination: Termination,
    ) -> Segment {
        let mut delta = [0i32; 3];
        let mut dominant = Axis::X;
        let mut total: u32 = 0;

        for axis in Axis::ALL {
            let profile = self.profile.axis(axis);
            let steps = profile.steps(end.get(axis)) - profile.steps(start.get(axis));
            let steps = steps.clamp(i32::MIN as i64 + 1, i32::MAX as i64) as i32;
            delta[axis.index()] = steps;
            if steps.unsigned_abs() > total {
                total = steps.unsigned_abs();
                dominant = axis;
            }
        }

        if total == 0 {
            let mut segment = Segment::null(*end);
            segment.start = *start;
            return segment;
        }

        let cruise = self.cruise_interval(start, end, total);
        let accel = self
            .profile
            .axis(dominant)
            .steps_per_m
            .acceleration(crate::config::MmPerSecSquared(
                self.profile.acceleration_mm_per_s2,
            ));
        let ramp = RampPlan::plan(total, cruise, self.profile.timer_frequency_hz, accel);

        let mut segment = Segment {
            start: *start,
            end: *end,
            delta,
            dominant,
            total_steps: total,
            ramp,
            termination,
            accumulators: [0; 3],
            steps_done: 0,
            interval: 0,
        };
        segment.rewind();
        segment
    }

    /// Ticks per dominant-axis step for the requested feed rate, slowed
    /// down until no axis exceeds its own maximum feed rate.
    fn cruise_interval(&self, start: &Position, end: &Position, total_steps: u32) -> u32 {
        let ticks_per_min = self.profile.timer_frequency_hz as u64 * 60;
        let feed = end.feed().max(1) as u64;

        let mut sum_sq = 0f64;
        let mut interval: u64 = 0;
        for axis in Axis::ALL {
            let profile = self.profile.axis(axis);
            if !profile.present {
                continue;
            }
            let um = (end.get(axis) as i64 - start.get(axis) as i64).unsigned_abs();
            if um == 0 {
                continue;
            }
            sum_sq += (um as f64) * (um as f64);

            // Fastest this axis may cover its share of the move
            let axis_ticks = um
                .saturating_mul(ticks_per_min)
                / (profile.max_feedrate.max(1) as u64 * UM_PER_MM as u64);
            interval = interval.max(axis_ticks / total_steps as u64);
        }

        let distance_um = (sqrt(sum_sq) + 0.5) as u64;
        let move_ticks = distance_um.saturating_mul(ticks_per_min) / (feed * UM_PER_MM as u64);
        interval = interval.max(move_ticks / total_steps as u64);

        if interval < self.profile.min_interval_ticks as u64 {
            log::warn!(
                "step interval {} ticks below minimum, clamped to {}",
                interval,
                self.profile.min_interval_ticks
            );
        }
        interval.clamp(self.profile.min_interval_ticks as u64, MAX_INTERVAL as u64) as u32
    }
}
