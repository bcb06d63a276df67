//! Property tests for step generation and ramp planning.

mod common;

use axis_motion::motion::ramp::{from_fixed, to_fixed};
use axis_motion::motion::{RampPlan, RampShape};
use axis_motion::{
    Axis, AxisMask, Machine, MachineProfile, MoveQueue, Position, SegmentBuilder, StepScheduler,
    Target,
};
use proptest::prelude::*;

use common::{basic_config, run_to_idle, SimHardware, SimMachine, SimTimer};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every axis emits exactly |delta| pulses and ends where it was told.
    #[test]
    fn prop_pulse_counts_match_deltas(
        x in -3_000i32..3_000,
        y in -3_000i32..3_000,
        z in -3_000i32..3_000,
        feed in 50u32..20_000,
    ) {
        let machine: SimMachine =
            Machine::new(&basic_config(), SimHardware::new(), SimTimer::default()).unwrap();

        machine.enqueue(&Target::new().x(x).y(y).z(z).feed_rate(feed)).unwrap();
        run_to_idle(&machine);

        let (position, pulses) = machine.with_hardware(|hw| (hw.position, hw.pulses));
        prop_assert_eq!(position, [x as i64, y as i64, z as i64]);
        prop_assert_eq!(
            pulses,
            [x.unsigned_abs() as u64, y.unsigned_abs() as u64, z.unsigned_abs() as u64]
        );
    }

    /// Accumulators never reach the dominant-axis total while a segment runs.
    #[test]
    fn prop_bresenham_accumulators_stay_bounded(
        x in -2_000i32..2_000,
        y in -2_000i32..2_000,
        z in -2_000i32..2_000,
    ) {
        let profile = MachineProfile::from_config(&basic_config());
        let builder = SegmentBuilder::new(&profile);
        let segment = builder.build(&Position::origin(600), &Position::new(x, y, z, 600));
        let total = segment.total_steps();

        let mut queue: MoveQueue<2> = MoveQueue::new();
        queue.enqueue(segment).unwrap();
        let mut scheduler = StepScheduler::new(4, profile.min_interval_ticks);

        let mut advance = scheduler.begin(&mut queue);
        while advance.next.is_some() {
            if let Some(running) = queue.peek_tail() {
                for axis in Axis::ALL {
                    prop_assert!(running.accumulator(axis) < total);
                }
            }
            advance = scheduler.advance(&mut queue, AxisMask::NONE);
        }
        prop_assert!(queue.is_empty());
    }

    /// Triangular ramps are symmetric and never go faster than cruise.
    #[test]
    fn prop_triangle_is_symmetric(
        total in 2u32..6_000,
        cruise in 20u32..2_000,
    ) {
        let plan = RampPlan::plan(total, cruise, 1_000_000, 1_000_000.0);

        if plan.shape == RampShape::Triangular {
            let up = plan.ramp_up_end;
            let down = total - plan.ramp_down_start;
            prop_assert!(up.abs_diff(down) <= 1);
        }

        let mut c = to_fixed(plan.initial_interval);
        for progress in 1..total {
            c = plan.next_interval(c, progress, total);
            prop_assert!(from_fixed(c) >= cruise);
            prop_assert!(from_fixed(c) <= plan.initial_interval);
        }
    }
}
