//! The motion core as one shared object.
//!
//! [`Machine`] owns the move queue, the step scheduler, the position
//! tracker and the hardware. The main context calls the command methods;
//! the step timer interrupt calls [`Machine::on_step_timer`]. Everything
//! both sides touch sits in `critical_section::Mutex<RefCell<_>>` cells and
//! is only borrowed inside short critical sections, so a `Machine` can live
//! in a `static` and be shared by reference.
//!
//! ```rust,ignore
//! static MACHINE: StaticCell<Machine<Board, Tim2>> = StaticCell::new();
//!
//! #[interrupt]
//! fn TIM2() {
//!     MACHINE.get().on_step_timer();
//! }
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::{CriticalSection, Mutex};
use embedded_hal::delay::DelayNs;

use crate::config::{validate_config, MachineConfig, MachineProfile};
use crate::error::{Error, MotionError, Result};
use crate::hal::{MotionHardware, StepTimer};
use crate::homing::HomingCycle;
use crate::motion::{Axis, AxisMask, Completion, Position, Segment, SegmentBuilder, Target};
use crate::queue::{MoveQueue, QueueStatus};
use crate::scheduler::{Advance, Retired, StepScheduler};
use crate::tracker::{DistanceMode, PositionTracker};

/// Outcome of a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Admission {
    /// Queued as requested.
    Queued,
    /// Queued, but a zero feed rate was ignored and the previous one used.
    FeedRateHeld,
}

/// Progress of the executing segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Progress {
    /// Where the segment ends.
    pub endpoint: Position,
    /// Firings executed.
    pub steps_done: u32,
    /// Firings planned.
    pub total_steps: u32,
}

struct Motion<const N: usize> {
    queue: MoveQueue<N>,
    scheduler: StepScheduler,
}

struct Io<H, T> {
    hardware: H,
    timer: T,
}

impl<H: MotionHardware, T: StepTimer> Io<H, T> {
    // Pulses go out with the old directions, then a loaded segment's
    // directions are written, then the timer is re-armed or stopped.
    fn apply(&mut self, advance: &Advance) -> Result<()> {
        for axis in advance.steps.iter() {
            self.hardware.step(axis)?;
        }
        if let Some(forward) = advance.load {
            for axis in Axis::ALL {
                self.hardware.set_direction(axis, forward.contains(axis))?;
            }
        }
        match advance.next {
            Some(ticks) => self.timer.arm(ticks),
            None => self.timer.disarm(),
        }
        Ok(())
    }
}

/// Queue-driven motion core.
///
/// Generic over:
/// - `H`: step/direction/endstop lines (must implement [`MotionHardware`])
/// - `T`: step timer (must implement [`StepTimer`])
/// - `N`: move queue capacity, a power of two
pub struct Machine<H, T, const N: usize = 8> {
    profile: MachineProfile,
    motion: Mutex<RefCell<Motion<N>>>,
    io: Mutex<RefCell<Io<H, T>>>,
    tracker: Mutex<RefCell<PositionTracker>>,
    busy: AtomicBool,
    missed: AtomicBool,
    halted: AtomicBool,
}

impl<H, T, const N: usize> Machine<H, T, N>
where
    H: MotionHardware,
    T: StepTimer,
{
    /// Validate `config` and build an idle machine at the origin.
    pub fn new(config: &MachineConfig, hardware: H, timer: T) -> Result<Self> {
        validate_config(config)?;
        Ok(Self::from_profile(
            MachineProfile::from_config(config),
            hardware,
            timer,
        ))
    }

    /// Build an idle machine from an already resolved profile.
    pub fn from_profile(profile: MachineProfile, hardware: H, mut timer: T) -> Self {
        timer.disarm();
        Self {
            motion: Mutex::new(RefCell::new(Motion {
                queue: MoveQueue::new(),
                scheduler: StepScheduler::new(
                    profile.endstop_debounce,
                    profile.min_interval_ticks,
                ),
            })),
            io: Mutex::new(RefCell::new(Io { hardware, timer })),
            tracker: Mutex::new(RefCell::new(PositionTracker::new(profile.default_feedrate))),
            busy: AtomicBool::new(false),
            missed: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            profile,
        }
    }

    /// The resolved machine profile.
    #[inline]
    pub fn profile(&self) -> &MachineProfile {
        &self.profile
    }

    // ---- Step interrupt ----

    /// Body of the step timer interrupt.
    ///
    /// Without `reentrant_step_interrupt` the whole firing runs in one
    /// critical section. With it, the firing is split into short sections
    /// and a nested firing returns immediately; if it expired the one-shot,
    /// the outer firing re-arms the timer at the minimum interval.
    pub fn on_step_timer(&self) {
        if self.halted.load(Ordering::Relaxed) {
            critical_section::with(|cs| self.io.borrow_ref_mut(cs).timer.disarm());
            return;
        }

        if self.profile.reentrant_step_interrupt {
            self.fire();
        } else {
            critical_section::with(|_| self.fire());
        }
    }

    fn fire(&self) {
        let claimed = critical_section::with(|_| {
            if self.busy.load(Ordering::Relaxed) {
                self.missed.store(true, Ordering::Relaxed);
                false
            } else {
                self.busy.store(true, Ordering::Relaxed);
                true
            }
        });
        if !claimed {
            return;
        }

        if let Err(e) = self.fire_claimed() {
            self.busy.store(false, Ordering::Relaxed);
            log::error!("step interrupt fault: {}", e);
            self.abort();
        }
    }

    fn fire_claimed(&self) -> Result<()> {
        let watched = critical_section::with(|cs| {
            let motion = self.motion.borrow_ref(cs);
            motion.scheduler.watched(&motion.queue)
        });

        let triggered = critical_section::with(|cs| -> Result<Option<AxisMask>> {
            let mut io = self.io.borrow_ref_mut(cs);
            if io.hardware.emergency_stop_asserted() {
                return Ok(None);
            }
            let mut triggered = AxisMask::NONE;
            for axis in watched.iter() {
                if io.hardware.read_endstop(axis)? {
                    triggered.insert(axis);
                }
            }
            Ok(Some(triggered))
        })?;
        let Some(triggered) = triggered else {
            self.busy.store(false, Ordering::Relaxed);
            log::error!("emergency stop asserted");
            self.abort();
            return Ok(());
        };

        // Advance and output in one section so an admission cannot kick the
        // scheduler between them. The claim is released in the same section,
        // so a firing that is held off by it finds the scheduler free.
        critical_section::with(|cs| -> Result<()> {
            let mut motion = self.motion.borrow_ref_mut(cs);
            let Motion { queue, scheduler } = &mut *motion;
            let advance = scheduler.advance(queue, triggered);
            let mut io = self.io.borrow_ref_mut(cs);
            io.apply(&advance)?;

            // A firing dropped while claimed expired the one-shot
            if self.missed.load(Ordering::Relaxed) {
                self.missed.store(false, Ordering::Relaxed);
                if advance.next.is_some() && !io.timer.is_armed() {
                    log::trace!("nested step firing replayed");
                    io.timer.arm(self.profile.min_interval_ticks);
                }
            }
            self.busy.store(false, Ordering::Relaxed);
            Ok(())
        })
    }

    // ---- Admission ----

    /// Queue a move to `target`.
    ///
    /// Unset axes keep their commanded coordinate and an unset feed rate
    /// keeps the previous one. Coordinates are clamped to soft limits.
    ///
    /// # Errors
    ///
    /// `QueueError::Full` when no slot is free (nothing is changed, retry
    /// later); `MotionError::Halted` after an emergency stop.
    pub fn enqueue(&self, target: &Target) -> Result<Admission> {
        self.admit_target(target, None)
    }

    /// Queue a move to `target` at the fastest feed rate the axes allow.
    /// The modal feed rate is left unchanged.
    pub fn enqueue_rapid(&self, target: &Target) -> Result<Admission> {
        self.admit_target(target, Some(self.profile.rapid_feedrate()))
    }

    /// Queue a null segment that retires once every earlier move has
    /// finished.
    pub fn wait_marker(&self) -> Result<()> {
        self.ensure_running()?;
        let here = self.commanded_position();
        self.admit(Segment::null(here))
    }

    fn admit_target(&self, target: &Target, feed_override: Option<u32>) -> Result<Admission> {
        self.ensure_running()?;

        let (start, resolved) = critical_section::with(|cs| {
            let tracker = self.tracker.borrow_ref(cs);
            (*tracker.commanded(), tracker.resolve(target, &self.profile))
        });

        let end = match feed_override {
            Some(feed) => resolved.position.with_feed(feed),
            None => resolved.position,
        };
        let segment = SegmentBuilder::new(&self.profile).build(&start, &end);
        self.admit(segment)?;

        critical_section::with(|cs| self.tracker.borrow_ref_mut(cs).commit(resolved.position));
        log::debug!(
            "queued move to ({}, {}, {}) F{}: {} steps",
            end.x(),
            end.y(),
            end.z(),
            end.feed(),
            segment.total_steps()
        );

        if resolved.feed_held && feed_override.is_none() {
            log::warn!("zero feed rate ignored, holding F{}", resolved.position.feed());
            Ok(Admission::FeedRateHeld)
        } else {
            Ok(Admission::Queued)
        }
    }

    fn admit(&self, segment: Segment) -> Result<()> {
        critical_section::with(|cs| -> Result<()> {
            let mut motion = self.motion.borrow_ref_mut(cs);
            motion.queue.enqueue(segment)?;
            if motion.scheduler.is_loaded() {
                return Ok(());
            }
            let Motion { queue, scheduler } = &mut *motion;
            let advance = scheduler.begin(queue);
            self.io.borrow_ref_mut(cs).apply(&advance)
        })
        .map_err(|e| self.hardware_fault(e))
    }

    fn hardware_fault(&self, e: Error) -> Error {
        if let Error::Hardware(_) = e {
            log::error!("hardware fault: {}", e);
            self.abort();
        }
        e
    }

    fn ensure_running(&self) -> Result<()> {
        if self.halted.load(Ordering::Relaxed) {
            return Err(MotionError::Halted.into());
        }
        let estop = critical_section::with(|cs| {
            self.io.borrow_ref_mut(cs).hardware.emergency_stop_asserted()
        });
        if estop {
            log::error!("emergency stop asserted");
            self.abort();
            return Err(MotionError::Halted.into());
        }
        Ok(())
    }

    // ---- Synchronization ----

    /// Poll until every queued segment has retired and the timer is
    /// stopped, calling `heartbeat` on every iteration.
    ///
    /// # Errors
    ///
    /// `MotionError::Halted` if the machine halts while waiting.
    pub fn drain_wait(&self, mut heartbeat: impl FnMut()) -> Result<()> {
        loop {
            self.ensure_running()?;
            if self.is_idle() {
                return Ok(());
            }
            heartbeat();
        }
    }

    /// Queue empty and timer stopped.
    pub fn is_idle(&self) -> bool {
        critical_section::with(|cs| {
            self.motion.borrow_ref(cs).queue.is_empty() && !self.io.borrow_ref(cs).timer.is_armed()
        })
    }

    /// Discard all pending motion and stop the timer. The commanded
    /// position is no longer where the machine is; only use this on an
    /// emergency stop.
    pub fn flush(&self) {
        critical_section::with(|cs| self.flush_in(cs));
    }

    fn flush_in(&self, cs: CriticalSection<'_>) {
        let mut motion = self.motion.borrow_ref_mut(cs);
        motion.queue.flush();
        motion.scheduler.reset();
        self.io.borrow_ref_mut(cs).timer.disarm();
    }

    /// Stop all motion and latch the halted state. Every later admission
    /// fails with `MotionError::Halted`.
    pub fn abort(&self) {
        critical_section::with(|cs| {
            self.halted.store(true, Ordering::Relaxed);
            self.flush_in(cs);
        });
    }

    /// Abort, then spin forever servicing only `heartbeat`. Recovery
    /// needs a restart.
    pub fn halt(&self, mut heartbeat: impl FnMut()) -> ! {
        self.abort();
        log::error!("machine halted");
        loop {
            heartbeat();
        }
    }

    /// Whether the machine has halted.
    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Relaxed)
    }

    // ---- Position ----

    /// Overwrite the commanded coordinates of the axes `target` sets.
    ///
    /// # Errors
    ///
    /// `MotionError::NotDrained` while any segment is queued.
    pub fn set_logical_position(&self, target: &Target) -> Result<()> {
        critical_section::with(|cs| -> Result<()> {
            let motion = self.motion.borrow_ref(cs);
            if !motion.queue.is_empty() || motion.scheduler.is_loaded() {
                return Err(MotionError::NotDrained.into());
            }
            self.tracker.borrow_ref_mut(cs).set_axes(target);
            Ok(())
        })
    }

    /// Switch between absolute and relative coordinates after draining.
    pub fn set_distance_mode(&self, mode: DistanceMode, heartbeat: impl FnMut()) -> Result<()> {
        self.drain_wait(heartbeat)?;
        critical_section::with(|cs| self.tracker.borrow_ref_mut(cs).set_mode(mode));
        Ok(())
    }

    /// Current distance mode.
    pub fn distance_mode(&self) -> DistanceMode {
        critical_section::with(|cs| self.tracker.borrow_ref(cs).mode())
    }

    /// Drain, then wait `ms` milliseconds calling `heartbeat` every
    /// millisecond.
    pub fn dwell(
        &self,
        ms: u32,
        delay: &mut impl DelayNs,
        mut heartbeat: impl FnMut(),
    ) -> Result<()> {
        self.drain_wait(&mut heartbeat)?;
        for _ in 0..ms {
            delay.delay_ms(1);
            heartbeat();
        }
        Ok(())
    }

    // ---- Homing ----

    /// Home one axis. A no-op for axes without an endstop.
    ///
    /// # Errors
    ///
    /// `MotionError::EndstopNotReached` if the approach runs its full
    /// distance, `MotionError::Halted` if the machine halts.
    pub fn home_axis(&self, axis: Axis, mut heartbeat: impl FnMut()) -> Result<()> {
        let Some(mut cycle) = HomingCycle::new(axis, &self.profile) else {
            log::debug!("axis {}: no endstop, homing skipped", axis);
            return Ok(());
        };

        self.drain_wait(&mut heartbeat)?;
        let builder = SegmentBuilder::new(&self.profile);

        loop {
            let phase = cycle.phase();
            let Some(segment) = cycle.plan(&builder, &self.commanded_position()) else {
                break;
            };
            log::debug!("axis {}: homing {:?}", axis, phase);

            self.ensure_running()?;
            self.admit(segment)?;
            self.drain_wait(&mut heartbeat)?;

            let retired = self.last_retired().unwrap_or(Retired {
                position: *segment.end(),
                completion: Completion::DistanceExhausted,
                steps_done: segment.total_steps(),
                total_steps: segment.total_steps(),
            });
            let um = match cycle.complete(&retired) {
                Ok(um) => um,
                Err(e) => {
                    // Keep the tracker on the axis' physical stop point
                    let stopped = retired.position.get(axis);
                    critical_section::with(|cs| {
                        self.tracker.borrow_ref_mut(cs).set_axis(axis, stopped)
                    });
                    return Err(e);
                }
            };
            critical_section::with(|cs| self.tracker.borrow_ref_mut(cs).set_axis(axis, um));
        }

        self.drain_wait(&mut heartbeat)?;
        log::debug!("axis {}: homed at {} um", axis, self.commanded_position().get(axis));
        Ok(())
    }

    /// Home every axis in `axes`, Z first, then Y, then X.
    pub fn home_axes(&self, axes: AxisMask, mut heartbeat: impl FnMut()) -> Result<()> {
        for axis in [Axis::Z, Axis::Y, Axis::X] {
            if axes.contains(axis) {
                self.home_axis(axis, &mut heartbeat)?;
            }
        }
        Ok(())
    }

    /// Home every axis that has an endstop.
    pub fn home_all(&self, heartbeat: impl FnMut()) -> Result<()> {
        self.home_axes(AxisMask::ALL, heartbeat)
    }

    // ---- Reporting ----

    /// Endpoint and progress of the executing segment.
    pub fn peek_progress(&self) -> Option<Progress> {
        critical_section::with(|cs| {
            let motion = self.motion.borrow_ref(cs);
            if !motion.scheduler.is_loaded() {
                return None;
            }
            motion.queue.peek_tail().map(|segment| Progress {
                endpoint: *segment.end(),
                steps_done: segment.steps_done(),
                total_steps: segment.total_steps(),
            })
        })
    }

    /// Number of queued segments, the executing one included.
    pub fn queue_len(&self) -> usize {
        critical_section::with(|cs| self.motion.borrow_ref(cs).queue.len())
    }

    /// Queue occupancy for status reports.
    pub fn queue_status(&self) -> QueueStatus {
        critical_section::with(|cs| self.motion.borrow_ref(cs).queue.status())
    }

    /// Estimated physical position, interpolated from the executing
    /// segment. Advisory only.
    pub fn current_position(&self) -> Position {
        critical_section::with(|cs| {
            let motion = self.motion.borrow_ref(cs);
            let executing = motion.queue.peek_tail().filter(|_| motion.scheduler.is_loaded());
            self.tracker.borrow_ref(cs).live(executing)
        })
    }

    /// Endpoint of the last admitted move.
    pub fn commanded_position(&self) -> Position {
        critical_section::with(|cs| *self.tracker.borrow_ref(cs).commanded())
    }

    /// Endstop readings per axis; `None` where no endstop is fitted.
    pub fn endstop_status(&self) -> Result<[Option<bool>; 3]> {
        critical_section::with(|cs| -> Result<[Option<bool>; 3]> {
            let mut io = self.io.borrow_ref_mut(cs);
            let mut status = [None; 3];
            for axis in Axis::ALL {
                if self.profile.axis(axis).has_endstop() {
                    status[axis.index()] = Some(io.hardware.read_endstop(axis)?);
                }
            }
            Ok(status)
        })
    }

    /// Why the last segment ended.
    pub fn last_completion(&self) -> Option<Completion> {
        self.last_retired().map(|r| r.completion)
    }

    /// The last retired segment.
    pub fn last_retired(&self) -> Option<Retired> {
        critical_section::with(|cs| self.motion.borrow_ref(cs).scheduler.last_retired())
    }

    /// Segments retired since startup (wrapping).
    pub fn retired_count(&self) -> u32 {
        critical_section::with(|cs| self.motion.borrow_ref(cs).scheduler.retired_count())
    }

    /// Run `f` with exclusive access to the hardware.
    pub fn with_hardware<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        critical_section::with(|cs| f(&mut self.io.borrow_ref_mut(cs).hardware))
    }

    /// Run `f` with exclusive access to the step timer.
    pub fn with_timer<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.io.borrow_ref_mut(cs).timer))
    }
}
