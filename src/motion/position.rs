//! Axis identifiers and machine coordinates.
//!
//! Positions are fixed-point micrometers (1 unit = 1/1000 mm) with a feed
//! rate in mm/min attached, the same shape for commanded endpoints and for
//! the live estimate.

use core::fmt;

/// One of the three linear axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Array index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        f.write_str(name)
    }
}

/// Set of axes, one bit per axis (X = 1, Y = 2, Z = 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisMask(u8);

impl AxisMask {
    /// No axis.
    pub const NONE: AxisMask = AxisMask(0);
    /// Every axis.
    pub const ALL: AxisMask = AxisMask(0b111);

    /// Mask holding a single axis.
    #[inline]
    pub const fn of(axis: Axis) -> Self {
        AxisMask(1 << axis.index())
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether `axis` is in the set.
    #[inline]
    pub const fn contains(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    /// Add `axis` to the set.
    #[inline]
    pub fn insert(&mut self, axis: Axis) {
        self.0 |= 1 << axis.index();
    }

    /// Builder form of [`insert`](Self::insert).
    #[inline]
    pub const fn with(self, axis: Axis) -> Self {
        AxisMask(self.0 | (1 << axis.index()))
    }

    /// Whether the set is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Axes in the set, in index order.
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl From<Axis> for AxisMask {
    fn from(axis: Axis) -> Self {
        AxisMask::of(axis)
    }
}

/// A machine position: X/Y/Z in micrometers plus a feed rate in mm/min.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position {
    axes: [i32; 3],
    feed: u32,
}

impl Position {
    /// Create a position from micrometer coordinates and a feed rate.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32, feed: u32) -> Self {
        Self {
            axes: [x, y, z],
            feed,
        }
    }

    /// The origin with the given feed rate.
    #[inline]
    pub const fn origin(feed: u32) -> Self {
        Self::new(0, 0, 0, feed)
    }

    /// Coordinate of `axis` in micrometers.
    #[inline]
    pub const fn get(&self, axis: Axis) -> i32 {
        self.axes[axis.index()]
    }

    /// Set the coordinate of `axis`.
    #[inline]
    pub fn set(&mut self, axis: Axis, um: i32) {
        self.axes[axis.index()] = um;
    }

    /// X coordinate in micrometers.
    #[inline]
    pub const fn x(&self) -> i32 {
        self.axes[0]
    }

    /// Y coordinate in micrometers.
    #[inline]
    pub const fn y(&self) -> i32 {
        self.axes[1]
    }

    /// Z coordinate in micrometers.
    #[inline]
    pub const fn z(&self) -> i32 {
        self.axes[2]
    }

    /// Feed rate in mm/min.
    #[inline]
    pub const fn feed(&self) -> u32 {
        self.feed
    }

    /// Replace the feed rate.
    #[inline]
    pub fn set_feed(&mut self, feed: u32) {
        self.feed = feed;
    }

    /// Same coordinates, different feed rate.
    #[inline]
    pub const fn with_feed(mut self, feed: u32) -> Self {
        self.feed = feed;
        self
    }
}

/// A partially specified position.
///
/// Axes left unset carry over from the previous endpoint; an unset feed
/// rate keeps the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Target {
    axes: [Option<i32>; 3],
    feed: Option<u32>,
}

impl Target {
    /// A target with nothing set.
    #[inline]
    pub const fn new() -> Self {
        Self {
            axes: [None; 3],
            feed: None,
        }
    }

    /// Set the X coordinate in micrometers.
    pub const fn x(mut self, um: i32) -> Self {
        self.axes[0] = Some(um);
        self
    }

    /// Set the Y coordinate in micrometers.
    pub const fn y(mut self, um: i32) -> Self {
        self.axes[1] = Some(um);
        self
    }

    /// Set the Z coordinate in micrometers.
    pub const fn z(mut self, um: i32) -> Self {
        self.axes[2] = Some(um);
        self
    }

    /// Set the coordinate of `axis` in micrometers.
    pub const fn with_axis(mut self, axis: Axis, um: i32) -> Self {
        self.axes[axis.index()] = Some(um);
        self
    }

    /// Set the feed rate in mm/min.
    pub const fn feed_rate(mut self, feed: u32) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Requested coordinate of `axis`, if any.
    #[inline]
    pub const fn axis(&self, axis: Axis) -> Option<i32> {
        self.axes[axis.index()]
    }

    /// Requested feed rate, if any.
    #[inline]
    pub const fn feed(&self) -> Option<u32> {
        self.feed
    }

    /// The axes this target specifies.
    pub fn specified(&self) -> AxisMask {
        let mut mask = AxisMask::NONE;
        for axis in Axis::ALL {
            if self.axes[axis.index()].is_some() {
                mask.insert(axis);
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_mask_bits_match_axis_order() {
        assert_eq!(AxisMask::of(Axis::X).bits(), 0x1);
        assert_eq!(AxisMask::of(Axis::Y).bits(), 0x2);
        assert_eq!(AxisMask::of(Axis::Z).bits(), 0x4);

        let mask = AxisMask::NONE.with(Axis::X).with(Axis::Z);
        let axes: heapless::Vec<Axis, 3> = mask.iter().collect();
        assert_eq!(axes.as_slice(), &[Axis::X, Axis::Z]);
        assert!(!mask.contains(Axis::Y));
    }

    #[test]
    fn test_target_records_specified_axes() {
        let target = Target::new().x(1_000).z(-250).feed_rate(600);

        assert_eq!(target.axis(Axis::X), Some(1_000));
        assert_eq!(target.axis(Axis::Y), None);
        assert_eq!(target.feed(), Some(600));
        assert_eq!(target.specified(), AxisMask::of(Axis::X).with(Axis::Z));
    }

    #[test]
    fn test_position_accessors() {
        let mut pos = Position::new(1, 2, 3, 60);
        pos.set(Axis::Y, -20);

        assert_eq!((pos.x(), pos.y(), pos.z()), (1, -20, 3));
        assert_eq!(pos.with_feed(900).feed(), 900);
    }
}
