//! Constant-acceleration ramp planning and the integer interval recurrence.
//!
//! The schedule is planned once per segment with floating point; the step
//! interrupt then only runs the integer recurrence
//! `c -= 2c / (4n + 1)` (and its mirror while decelerating), which
//! approximates `c_n = c_0 (sqrt(n + 1) - sqrt(n))` without square roots.
//!
//! Intervals are held in 24.8 fixed point so that the per-step decrement
//! keeps resolution once `4n + 1` exceeds the interval in ticks. With 8
//! fractional bits the longest representable interval is
//! [`MAX_INTERVAL`] ticks (about one second at 16 MHz).

use libm::sqrtf;

/// Fractional bits of the fixed-point interval.
pub const FRACT_BITS: u32 = 8;

/// Longest interval, in timer ticks, the scheduler ever arms.
pub const MAX_INTERVAL: u32 = u32::MAX >> FRACT_BITS;

// Correction applied to the first interval of the discrete ramp so the
// recurrence tracks true constant acceleration from the first step.
const FIRST_STEP_FACTOR: f32 = 0.676;

/// Convert whole ticks to fixed point.
#[inline]
pub const fn to_fixed(ticks: u32) -> u32 {
    let ticks = if ticks > MAX_INTERVAL { MAX_INTERVAL } else { ticks };
    ticks << FRACT_BITS
}

/// Convert fixed point to whole ticks (never zero).
#[inline]
pub const fn from_fixed(fixed: u32) -> u32 {
    let ticks = fixed >> FRACT_BITS;
    if ticks == 0 {
        1
    } else {
        ticks
    }
}

/// Shape of a planned ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampShape {
    /// No ramp: the segment runs at cruise from its first step.
    Flat,
    /// Ramp up, cruise, ramp down.
    Trapezoidal,
    /// Ramp up to the midpoint, then straight back down.
    Triangular,
}

/// Precomputed ramp schedule of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RampPlan {
    /// Step count at which acceleration ends.
    pub ramp_up_end: u32,
    /// Step count from which deceleration runs.
    pub ramp_down_start: u32,
    /// Interval before the first step, in ticks.
    pub initial_interval: u32,
    /// Interval at full speed, in ticks.
    pub cruise_interval: u32,
    /// Profile shape.
    pub shape: RampShape,
    /// The ramp gets all the way to cruise speed.
    pub reaches_cruise: bool,
}

impl RampPlan {
    /// A plan that runs every step at `cruise_interval`.
    pub const fn flat(total_steps: u32, cruise_interval: u32) -> Self {
        Self {
            ramp_up_end: 0,
            ramp_down_start: total_steps,
            initial_interval: cruise_interval,
            cruise_interval,
            shape: RampShape::Flat,
            reaches_cruise: true,
        }
    }

    /// Plan a ramp for `total_steps` at `cruise_interval` ticks per step.
    ///
    /// `timer_hz` is the tick rate and `accel` the acceleration of the
    /// dominant axis in steps/s².
    pub fn plan(total_steps: u32, cruise_interval: u32, timer_hz: u32, accel: f32) -> Self {
        let ramp_steps = ramp_distance(cruise_interval, timer_hz, accel);
        let initial = initial_interval(timer_hz, accel);

        // Too short to ramp, or cruise is slower than the first ramp step
        if total_steps < 2 || ramp_steps < 2 || initial <= cruise_interval {
            return Self::flat(total_steps, cruise_interval);
        }

        if ramp_steps.saturating_mul(2) >= total_steps {
            let up = total_steps / 2;
            Self {
                ramp_up_end: up,
                ramp_down_start: total_steps - up,
                initial_interval: initial,
                cruise_interval,
                shape: RampShape::Triangular,
                reaches_cruise: ramp_steps.saturating_mul(2) == total_steps,
            }
        } else {
            Self {
                ramp_up_end: ramp_steps,
                ramp_down_start: total_steps - ramp_steps,
                initial_interval: initial,
                cruise_interval,
                shape: RampShape::Trapezoidal,
                reaches_cruise: true,
            }
        }
    }

    /// Interval (fixed point) to wait after `progress` steps of
    /// `total_steps`, given the interval just used.
    pub fn next_interval(&self, current: u32, progress: u32, total_steps: u32) -> u32 {
        let cruise = to_fixed(self.cruise_interval);
        let c = current as u64;

        if progress < self.ramp_up_end {
            let n = progress as u64;
            if self.reaches_cruise && progress + 1 >= self.ramp_up_end {
                return cruise;
            }
            let next = c - (2 * c) / (4 * n + 1);
            (next as u32).max(cruise)
        } else if progress >= self.ramp_down_start {
            let remaining = total_steps.saturating_sub(progress) as u64;
            if remaining == 0 {
                return current;
            }
            let next = c + (2 * c) / (4 * remaining - 1);
            next.min(to_fixed(self.initial_interval) as u64) as u32
        } else if self.reaches_cruise {
            cruise
        } else {
            current
        }
    }
}

/// Steps needed to reach the speed of `cruise_interval` from rest:
/// `v² / 2a` with `v = timer_hz / cruise_interval`.
pub fn ramp_distance(cruise_interval: u32, timer_hz: u32, accel: f32) -> u32 {
    if cruise_interval == 0 || !(accel > 0.0) {
        return 0;
    }
    let v = timer_hz as f32 / cruise_interval as f32;
    let steps = v * v / (2.0 * accel);
    if steps >= u32::MAX as f32 {
        u32::MAX
    } else {
        steps as u32
    }
}

/// Interval before the first step of a ramp from rest:
/// `0.676 · timer_hz · sqrt(2 / a)`, clamped to [`MAX_INTERVAL`].
pub fn initial_interval(timer_hz: u32, accel: f32) -> u32 {
    if !(accel > 0.0) {
        return MAX_INTERVAL;
    }
    let c0 = FIRST_STEP_FACTOR * timer_hz as f32 * sqrtf(2.0 / accel);
    if c0 >= MAX_INTERVAL as f32 {
        MAX_INTERVAL
    } else {
        (c0 as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HZ: u32 = 16_000_000;
    // 50 mm/s² at 200 steps/mm
    const ACCEL: f32 = 10_000.0;

    fn run(plan: &RampPlan, total: u32) -> heapless::Vec<u32, 8192> {
        let mut intervals = heapless::Vec::new();
        let mut c = to_fixed(plan.initial_interval);
        intervals.push(from_fixed(c)).unwrap();
        for progress in 1..total {
            c = plan.next_interval(c, progress, total);
            intervals.push(from_fixed(c)).unwrap();
        }
        intervals
    }

    #[test]
    fn test_trapezoid_reaches_and_holds_cruise() {
        // 8000 steps/s: ramp of 3200 steps
        let cruise = HZ / 8_000;
        let plan = RampPlan::plan(3_000, cruise, HZ, ACCEL / 4.0);
        assert_eq!(plan.shape, RampShape::Triangular);

        let plan = RampPlan::plan(4_000, cruise, HZ, ACCEL * 4.0);
        assert_eq!(plan.shape, RampShape::Trapezoidal);
        assert_eq!(plan.ramp_up_end, 4_000 - plan.ramp_down_start);

        let intervals = run(&plan, 4_000);
        assert_eq!(*intervals.iter().min().unwrap(), cruise);
        assert_eq!(intervals[2_000], cruise);
        // monotonic ramp up
        for w in intervals[..plan.ramp_up_end as usize].windows(2) {
            assert!(w[1] <= w[0]);
        }
    }

    #[test]
    fn test_triangle_is_symmetric() {
        let cruise = 200;
        let total = 1_001;
        let plan = RampPlan::plan(total, cruise, HZ, ACCEL);
        assert_eq!(plan.shape, RampShape::Triangular);

        let up = plan.ramp_up_end;
        let down = total - plan.ramp_down_start;
        assert!(up.abs_diff(down) <= 1);
    }

    #[test]
    fn test_truncated_triangle_never_reaches_cruise() {
        let cruise = 2_000;
        let ramp = ramp_distance(cruise, HZ, ACCEL);
        let plan = RampPlan::plan(ramp, cruise, HZ, ACCEL);
        assert!(!plan.reaches_cruise);

        let intervals = run(&plan, ramp);
        assert!(*intervals.iter().min().unwrap() > cruise);
    }

    #[test]
    fn test_exact_triangle_peaks_at_cruise() {
        let cruise = 2_000;
        let ramp = ramp_distance(cruise, HZ, ACCEL);
        let plan = RampPlan::plan(ramp * 2, cruise, HZ, ACCEL);
        assert!(plan.reaches_cruise);
        assert_eq!(plan.shape, RampShape::Triangular);

        let intervals = run(&plan, ramp * 2);
        assert_eq!(*intervals.iter().min().unwrap(), cruise);
    }

    #[test]
    fn test_short_move_collapses_to_flat() {
        let plan = RampPlan::plan(1, 200, HZ, ACCEL);
        assert_eq!(plan.shape, RampShape::Flat);
        assert_eq!(plan.initial_interval, 200);

        // cruise slower than the first ramp interval
        let slow = initial_interval(HZ, ACCEL) + 1;
        assert_eq!(RampPlan::plan(10_000, slow, HZ, ACCEL).shape, RampShape::Flat);
    }

    #[test]
    fn test_deceleration_never_exceeds_initial_interval() {
        let cruise = 4_000;
        let plan = RampPlan::plan(4_000, cruise, HZ, ACCEL);
        assert_eq!(plan.shape, RampShape::Trapezoidal);
        let intervals = run(&plan, 4_000);

        assert!(intervals.iter().all(|&c| c <= plan.initial_interval));
        assert!(intervals.last().unwrap() > &cruise);
    }
}
