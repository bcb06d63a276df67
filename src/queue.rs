//! Fixed-capacity move queue between command intake and the step scheduler.
//!
//! `head` is the next free slot and is only advanced by the producer;
//! `tail` is the executing (oldest) segment and is only advanced by the
//! scheduler. Both are free-running wrapping counters, so the occupancy is
//! `head - tail` and the queue holds exactly `N` segments with no separate
//! count to keep in sync.

use core::fmt;

use crate::error::{QueueError, Result};
use crate::motion::{Position, Segment};

/// Ring buffer of precomputed segments. `N` must be a power of two.
#[derive(Debug, Clone)]
pub struct MoveQueue<const N: usize> {
    slots: [Segment; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> MoveQueue<N> {
    const CAPACITY_IS_POWER_OF_TWO: () =
        assert!(N.is_power_of_two(), "queue capacity must be a power of two");

    /// Create an empty queue.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_IS_POWER_OF_TWO;
        Self {
            slots: [Segment::null(Position::origin(0)); N],
            head: 0,
            tail: 0,
        }
    }

    #[inline]
    fn slot(index: usize) -> usize {
        index & (N - 1)
    }

    /// Admit a segment. Never blocks; a full queue is left untouched.
    pub fn enqueue(&mut self, segment: Segment) -> Result<()> {
        if self.is_full() {
            return Err(QueueError::Full.into());
        }
        self.slots[Self::slot(self.head)] = segment;
        self.head = self.head.wrapping_add(1);
        Ok(())
    }

    /// Drop the executing segment and return it.
    pub fn retire(&mut self) -> Option<Segment> {
        if self.is_empty() {
            return None;
        }
        let segment = self.slots[Self::slot(self.tail)];
        self.tail = self.tail.wrapping_add(1);
        Some(segment)
    }

    /// The executing (oldest) segment.
    #[inline]
    pub fn peek_tail(&self) -> Option<&Segment> {
        if self.is_empty() {
            None
        } else {
            Some(&self.slots[Self::slot(self.tail)])
        }
    }

    #[inline]
    pub(crate) fn tail_mut(&mut self) -> Option<&mut Segment> {
        if self.is_empty() {
            None
        } else {
            Some(&mut self.slots[Self::slot(self.tail)])
        }
    }

    /// Discard every pending segment, including the executing one.
    pub fn flush(&mut self) {
        self.tail = self.head;
    }

    /// Number of queued segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail)
    }

    /// No segment queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// No free slot.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Number of slots.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Queued segments, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> + '_ {
        (0..self.len()).map(move |i| &self.slots[Self::slot(self.tail.wrapping_add(i))])
    }

    /// Occupancy snapshot for reporting.
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            len: self.len(),
            capacity: N,
        }
    }
}

impl<const N: usize> Default for MoveQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue occupancy, printed as `Q3/8`, with ` E` when empty and ` F` when
/// full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueStatus {
    /// Queued segments.
    pub len: usize,
    /// Slots.
    pub capacity: usize,
}

impl QueueStatus {
    /// No segment queued.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// No free slot.
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}/{}", self.len, self.capacity)?;
        if self.is_empty() {
            f.write_str(" E")?;
        }
        if self.is_full() {
            f.write_str(" F")?;
        }
        Ok(())
    }
}
