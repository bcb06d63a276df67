//! Authoritative commanded position and the advisory live estimate.
//!
//! The commanded endpoint is what the segment builder plans from. It moves
//! when a segment is admitted and on explicit resets (homing, position
//! set), never in the step interrupt. The live position is derived on
//! demand from the executing segment's progress and is only ever reported.

use crate::config::MachineProfile;
use crate::motion::{Axis, Position, Segment, Target};

/// How target coordinates are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DistanceMode {
    /// Coordinates are machine positions.
    #[default]
    Absolute,
    /// Coordinates are offsets from the commanded endpoint.
    Relative,
}

/// A target resolved against the commanded endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Endpoint to plan to.
    pub position: Position,
    /// A zero feed rate was requested and the previous one kept.
    pub feed_held: bool,
}

/// Last commanded endpoint plus the distance mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionTracker {
    commanded: Position,
    mode: DistanceMode,
}

impl PositionTracker {
    /// Tracker at the origin with `feed` as the current feed rate.
    pub const fn new(feed: u32) -> Self {
        Self {
            commanded: Position::origin(feed),
            mode: DistanceMode::Absolute,
        }
    }

    /// The authoritative endpoint.
    #[inline]
    pub fn commanded(&self) -> &Position {
        &self.commanded
    }

    /// Current distance mode.
    #[inline]
    pub fn mode(&self) -> DistanceMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: DistanceMode) {
        self.mode = mode;
    }

    /// Work out the endpoint a target asks for.
    ///
    /// Unset axes carry over, relative coordinates are added to the
    /// commanded endpoint and the result is clamped to each axis' soft
    /// limits. A missing or zero feed rate keeps the current one.
    pub fn resolve(&self, target: &Target, profile: &MachineProfile) -> Resolved {
        let mut position = self.commanded;

        for axis in Axis::ALL {
            let Some(um) = target.axis(axis) else {
                continue;
            };
            let um = match self.mode {
                DistanceMode::Absolute => um,
                DistanceMode::Relative => self.commanded.get(axis).saturating_add(um),
            };
            position.set(axis, profile.axis(axis).limits.clamp(um));
        }

        let feed_held = target.feed() == Some(0);
        if let Some(feed) = target.feed().filter(|f| *f > 0) {
            position.set_feed(feed);
        }

        Resolved {
            position,
            feed_held,
        }
    }

    /// Record an admitted endpoint.
    #[inline]
    pub fn commit(&mut self, position: Position) {
        self.commanded = position;
    }

    /// Overwrite the axes a target specifies, as absolute machine
    /// coordinates, without planning a move.
    pub fn set_axes(&mut self, target: &Target) {
        for axis in Axis::ALL {
            if let Some(um) = target.axis(axis) {
                self.commanded.set(axis, um);
            }
        }
        if let Some(feed) = target.feed().filter(|f| *f > 0) {
            self.commanded.set_feed(feed);
        }
    }

    /// Overwrite one axis.
    #[inline]
    pub fn set_axis(&mut self, axis: Axis, um: i32) {
        self.commanded.set(axis, um);
    }

    /// Best estimate of where the machine is now: the executing segment
    /// interpolated by its progress, or the commanded endpoint when idle.
    pub fn live(&self, executing: Option<&Segment>) -> Position {
        match executing {
            Some(segment) => segment.interpolate(),
            None => self.commanded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AxisConfig, MachineConfig, Millimeters, MmPerSecSquared, SoftLimits};

    fn profile() -> MachineProfile {
        let config = MachineConfig::new(1_000_000, MmPerSecSquared(100.0))
            .with_axis(
                Axis::X,
                AxisConfig::new(1_000_000, 6_000, 60).with_limits(SoftLimits::new(
                    Some(Millimeters(0.0)),
                    Some(Millimeters(100.0)),
                )),
            )
            .with_axis(Axis::Y, AxisConfig::new(1_000_000, 6_000, 60));
        MachineProfile::from_config(&config)
    }

    #[test]
    fn test_unset_axes_carry_over() {
        let profile = profile();
        let mut tracker = PositionTracker::new(60);
        tracker.commit(Position::new(1_000, 2_000, 3_000, 600));

        let resolved = tracker.resolve(&Target::new().y(5_000), &profile);
        assert_eq!(resolved.position, Position::new(1_000, 5_000, 3_000, 600));
        assert!(!resolved.feed_held);
    }

    #[test]
    fn test_zero_feed_rate_is_held() {
        let profile = profile();
        let mut tracker = PositionTracker::new(60);
        tracker.commit(Position::new(0, 0, 0, 900));

        let resolved = tracker.resolve(&Target::new().x(10).feed_rate(0), &profile);
        assert!(resolved.feed_held);
        assert_eq!(resolved.position.feed(), 900);
    }

    #[test]
    fn test_relative_mode_adds_offsets() {
        let profile = profile();
        let mut tracker = PositionTracker::new(60);
        tracker.commit(Position::new(10_000, 10_000, 0, 60));
        tracker.set_mode(DistanceMode::Relative);

        let resolved = tracker.resolve(&Target::new().x(-2_500).y(500), &profile);
        assert_eq!(resolved.position.x(), 7_500);
        assert_eq!(resolved.position.y(), 10_500);
    }

    #[test]
    fn test_soft_limits_clamp_only_limited_axes() {
        let profile = profile();
        let tracker = PositionTracker::new(60);

        let resolved = tracker.resolve(&Target::new().x(250_000).y(-250_000), &profile);
        assert_eq!(resolved.position.x(), 100_000);
        assert_eq!(resolved.position.y(), -250_000);

        let resolved = tracker.resolve(&Target::new().x(-1), &profile);
        assert_eq!(resolved.position.x(), 0);
    }

    #[test]
    fn test_set_axes_is_absolute() {
        let mut tracker = PositionTracker::new(60);
        tracker.set_mode(DistanceMode::Relative);
        tracker.commit(Position::new(5, 5, 5, 60));

        tracker.set_axes(&Target::new().z(0));
        assert_eq!(*tracker.commanded(), Position::new(5, 5, 0, 60));
    }

    #[test]
    fn test_live_position_when_idle() {
        let tracker = PositionTracker::new(60);
        assert_eq!(tracker.live(None), *tracker.commanded());
    }
}
