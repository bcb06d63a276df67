//! Per-axis homing cycle.
//!
//! Homing is three ordinary segments run one at a time, with a drain after
//! each so the next one is planned from where the machine actually
//! stopped:
//!
//! 1. **Approach**: fast, toward the endstop, ends on the trip.
//! 2. **Backoff**: slow, a fixed distance away, always runs to the end.
//! 3. **Re-approach**: slow, toward the endstop again, ends on the re-trip.
//!
//! The axis is then set to its home coordinate. This module only plans
//! the segments and interprets their outcome; [`Machine`](crate::Machine)
//! queues them and waits.

use crate::config::{AxisProfile, MachineProfile};
use crate::error::{MotionError, Result};
use crate::motion::{Axis, AxisMask, Completion, Position, Segment, SegmentBuilder, Termination};
use crate::scheduler::Retired;

/// Stage of a homing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingPhase {
    /// Fast move toward the endstop.
    Approach,
    /// Slow move off the endstop.
    Backoff,
    /// Slow move back onto the endstop.
    Reapproach,
    /// Axis is homed.
    Done,
}

/// Homing state machine for one axis.
#[derive(Debug, Clone, Copy)]
pub struct HomingCycle {
    axis: Axis,
    phase: HomingPhase,
    profile: AxisProfile,
    approach_um: i32,
    backoff_um: i32,
}

impl HomingCycle {
    /// Start a cycle on `axis`, or `None` if the axis has no endstop.
    pub fn new(axis: Axis, profile: &MachineProfile) -> Option<Self> {
        let axis_profile = *profile.axis(axis);
        if !axis_profile.has_endstop() {
            return None;
        }
        Some(Self {
            axis,
            phase: HomingPhase::Approach,
            profile: axis_profile,
            approach_um: profile.homing.approach_distance_um.min(i32::MAX as u32) as i32,
            backoff_um: profile.homing.backoff_distance_um.min(i32::MAX as u32 / 2) as i32,
        })
    }

    /// Axis being homed.
    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Current stage.
    #[inline]
    pub fn phase(&self) -> HomingPhase {
        self.phase
    }

    /// Segment for the current stage, planned from `from`. `None` once
    /// done.
    pub fn plan(&self, builder: &SegmentBuilder<'_>, from: &Position) -> Option<Segment> {
        let sign = self.profile.homing_sign();
        let trip = Termination::Endstop {
            axes: AxisMask::of(self.axis),
            level: true,
        };

        let (offset, feed, termination) = match self.phase {
            HomingPhase::Approach => (sign * self.approach_um, self.profile.max_feedrate, trip),
            HomingPhase::Backoff => (
                -sign * self.backoff_um,
                self.profile.search_feedrate,
                Termination::Distance,
            ),
            HomingPhase::Reapproach => (
                sign * self.backoff_um * 2,
                self.profile.search_feedrate,
                trip,
            ),
            HomingPhase::Done => return None,
        };

        let mut to = from.with_feed(feed);
        to.set(self.axis, from.get(self.axis).saturating_add(offset));
        Some(builder.build_terminated(from, &to, termination))
    }

    /// Consume the outcome of the current stage and move to the next.
    ///
    /// Returns the coordinate the axis must now be set to.
    pub fn complete(&mut self, retired: &Retired) -> Result<i32> {
        let tripped = retired.completion == Completion::EndstopTriggered;
        match self.phase {
            HomingPhase::Approach => {
                if !tripped {
                    return Err(MotionError::EndstopNotReached(self.axis).into());
                }
                self.phase = HomingPhase::Backoff;
                Ok(retired.position.get(self.axis))
            }
            HomingPhase::Backoff => {
                self.phase = HomingPhase::Reapproach;
                Ok(retired.position.get(self.axis))
            }
            HomingPhase::Reapproach => {
                if !tripped {
                    log::warn!(
                        "axis {}: endstop not re-tripped within {} um",
                        self.axis,
                        self.backoff_um * 2
                    );
                }
                self.phase = HomingPhase::Done;
                Ok(self.profile.home_position())
            }
            HomingPhase::Done => Ok(self.profile.home_position()),
        }
    }
}
