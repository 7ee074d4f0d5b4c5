//! Resumable routines driven by the tick clock
//!
//! A routine is a small state machine that produces outputs each time it is
//! resumed and tells the scheduler when it wants to run next. Only one routine
//! runs at a time; cancellation is a flag checked before each resume.

use tracing::debug;

use super::time::TickClock;

/// What a routine wants after a resume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resume {
    /// Run again on the next tick
    NextTick,
    /// Run again once this many seconds have elapsed
    WaitSeconds(f32),
    /// The routine is complete
    Finished,
}

/// A suspended task that emits `Out` values when resumed
pub trait Routine<Out>: Send {
    fn resume(&mut self, clock: &TickClock, out: &mut Vec<Out>) -> Resume;

    /// Name used in diagnostics
    fn name(&self) -> &'static str {
        "routine"
    }
}

/// Identifies a scheduled routine for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutineId(u64);

struct Scheduled<Out> {
    id: RoutineId,
    wake_tick: u64,
    cancelled: bool,
    routine: Box<dyn Routine<Out>>,
}

/// Cooperative scheduler for routines
pub struct Scheduler<Out> {
    next_id: u64,
    routines: Vec<Scheduled<Out>>,
}

impl<Out> Scheduler<Out> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            routines: Vec::new(),
        }
    }

    /// Schedule a routine; its first resume happens on the next `run` call
    pub fn start(&mut self, clock: &TickClock, routine: Box<dyn Routine<Out>>) -> RoutineId {
        let id = RoutineId(self.next_id);
        self.next_id += 1;
        debug!(routine = routine.name(), "Routine scheduled");
        self.routines.push(Scheduled {
            id,
            wake_tick: clock.tick(),
            cancelled: false,
            routine,
        });
        id
    }

    /// Request cancellation; takes effect at the routine's next resume point
    pub fn cancel(&mut self, id: RoutineId) -> bool {
        match self.routines.iter_mut().find(|s| s.id == id) {
            Some(scheduled) => {
                scheduled.cancelled = true;
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for scheduled in &mut self.routines {
            scheduled.cancelled = true;
        }
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// Resume every routine whose wake tick has arrived, in scheduling order
    pub fn run(&mut self, clock: &TickClock, out: &mut Vec<Out>) {
        let now = clock.tick();
        for scheduled in &mut self.routines {
            if scheduled.cancelled || scheduled.wake_tick > now {
                continue;
            }

            match scheduled.routine.resume(clock, out) {
                Resume::NextTick => scheduled.wake_tick = now + 1,
                Resume::WaitSeconds(seconds) => {
                    scheduled.wake_tick = now + clock.ticks_for(seconds).max(1);
                }
                Resume::Finished => scheduled.cancelled = true,
            }
        }

        self.routines.retain(|s| !s.cancelled);
    }
}

impl<Out> Default for Scheduler<Out> {
    fn default() -> Self {
        Self::new()
    }
}
