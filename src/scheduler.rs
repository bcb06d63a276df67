//! Interrupt-side step scheduler.
//!
//! [`StepScheduler::advance`] is the body of one timer firing. It works on
//! the segment at the queue's tail and hands back what the firing must do
//! to the outside world: which axes pulse, whether new direction levels
//! must be written, and how long until the next firing. It never touches
//! hardware itself.

use crate::motion::ramp::MAX_INTERVAL;
use crate::motion::{AxisMask, Completion, Position, Segment, Termination};
use crate::queue::MoveQueue;

/// Outputs of one firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Advance {
    /// Axes that emit a step pulse now.
    pub steps: AxisMask,
    /// A segment was loaded; these axes travel forward, the rest backward.
    /// Written after this firing's pulses.
    pub load: Option<AxisMask>,
    /// Ticks until the next firing, or `None` to disarm.
    pub next: Option<u32>,
}

impl Advance {
    /// Nothing to do; disarm.
    pub const IDLE: Advance = Advance {
        steps: AxisMask::NONE,
        load: None,
        next: None,
    };
}

/// Record of the last retired segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Retired {
    /// Where the segment left the machine.
    pub position: Position,
    /// Why it ended.
    pub completion: Completion,
    /// Firings executed.
    pub steps_done: u32,
    /// Firings planned.
    pub total_steps: u32,
}

/// Executes queued segments one firing at a time.
#[derive(Debug, Clone)]
pub struct StepScheduler {
    debounce_limit: u8,
    debounce: u8,
    min_interval: u32,
    loaded: bool,
    last_retired: Option<Retired>,
    retired: u32,
}

impl StepScheduler {
    /// Create a scheduler.
    ///
    /// `debounce_limit` consecutive qualifying endstop reads end an
    /// endstop-terminated segment; no interval shorter than
    /// `min_interval` ticks is ever returned.
    pub fn new(debounce_limit: u8, min_interval: u32) -> Self {
        Self {
            debounce_limit: debounce_limit.max(1),
            debounce: 0,
            min_interval: min_interval.clamp(1, MAX_INTERVAL),
            loaded: false,
            last_retired: None,
            retired: 0,
        }
    }

    /// A segment is executing.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The last retired segment.
    #[inline]
    pub fn last_retired(&self) -> Option<Retired> {
        self.last_retired
    }

    /// Segments retired since startup (wrapping).
    #[inline]
    pub fn retired_count(&self) -> u32 {
        self.retired
    }

    /// Endstops the executing segment watches.
    pub fn watched<const N: usize>(&self, queue: &MoveQueue<N>) -> AxisMask {
        if !self.loaded {
            return AxisMask::NONE;
        }
        match queue.peek_tail().map(Segment::termination) {
            Some(Termination::Endstop { axes, .. }) => axes,
            _ => AxisMask::NONE,
        }
    }

    /// Load the next real segment, retiring null segments on the way.
    pub fn begin<const N: usize>(&mut self, queue: &mut MoveQueue<N>) -> Advance {
        loop {
            let Some(segment) = queue.peek_tail() else {
                self.loaded = false;
                return Advance::IDLE;
            };

            if segment.is_null() {
                self.retire(queue, Completion::DistanceExhausted);
                continue;
            }

            log::trace!(
                "load segment: {} steps, cruise {} ticks",
                segment.total_steps(),
                segment.cruise_interval()
            );
            self.loaded = true;
            self.debounce = 0;
            return Advance {
                steps: AxisMask::NONE,
                load: Some(segment.forward_mask()),
                next: Some(self.clamp(segment.interval())),
            };
        }
    }

    /// One timer firing. `triggered` holds the watched endstops that read
    /// triggered this firing.
    pub fn advance<const N: usize>(
        &mut self,
        queue: &mut MoveQueue<N>,
        triggered: AxisMask,
    ) -> Advance {
        if !self.loaded {
            return self.begin(queue);
        }
        let Some(segment) = queue.tail_mut() else {
            // Flushed underneath us
            self.loaded = false;
            return Advance::IDLE;
        };

        // Endstop first: a qualifying read ends the segment without a step
        if let Termination::Endstop { axes, level } = segment.termination() {
            let qualifies = !axes.is_empty() && axes.iter().all(|a| triggered.contains(a) == level);
            self.debounce = if qualifies {
                self.debounce.saturating_add(1)
            } else {
                0
            };
            if self.debounce >= self.debounce_limit {
                return self.complete(queue, Completion::EndstopTriggered, AxisMask::NONE);
            }
        }

        let steps = segment.advance();
        if segment.is_finished() {
            return self.complete(queue, Completion::DistanceExhausted, steps);
        }

        Advance {
            steps,
            load: None,
            next: Some(self.clamp(segment.interval())),
        }
    }

    /// Forget the executing segment (after a flush).
    pub fn reset(&mut self) {
        self.loaded = false;
        self.debounce = 0;
    }

    fn complete<const N: usize>(
        &mut self,
        queue: &mut MoveQueue<N>,
        completion: Completion,
        steps: AxisMask,
    ) -> Advance {
        self.retire(queue, completion);
        self.loaded = false;
        let mut next = self.begin(queue);
        next.steps = steps;
        next
    }

    fn retire<const N: usize>(&mut self, queue: &mut MoveQueue<N>, completion: Completion) {
        if let Some(segment) = queue.retire() {
            log::trace!("retire segment: {:?} after {} steps", completion, segment.steps_done());
            self.last_retired = Some(Retired {
                position: segment.interpolate(),
                completion,
                steps_done: segment.steps_done(),
                total_steps: segment.total_steps(),
            });
            self.retired = self.retired.wrapping_add(1);
        }
    }

    #[inline]
    fn clamp(&self, interval: u32) -> u32 {
        interval.clamp(self.min_interval, MAX_INTERVAL)
    }
}
