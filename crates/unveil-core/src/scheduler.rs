//! Virtual host clock with timer, interval, and frame-callback queues.
//!
//! The scheduler never runs callbacks itself. It hands the next due task back
//! to the caller via [`Scheduler::pop_due`], which keeps task payloads plain
//! data (dispatched by enum match in the stage) and lets the caller own every
//! piece of state a task touches.
//!
//! # Ordering
//!
//! Tasks are ordered by `(due time, lane, insertion order)`. Timers run
//! before frames that fall due at the same instant.
//!
//! # Frames
//!
//! Frame callbacks run on frame boundaries (multiples of the frame
//! interval). Every frame requested before a boundary runs in that boundary's
//! batch with the boundary as its timestamp; a frame requested from inside a
//! batch lands on the following boundary, so a self-re-arming loop advances
//! exactly one frame per boundary.

use crate::id::{Millis, TaskId};
use slotmap::SlotMap;

/// Default frame interval (about 60 frames per second).
pub const DEFAULT_FRAME_INTERVAL_MS: Millis = 16;

/// Default cap on tasks executed by one drain of the queue.
pub const DEFAULT_STEP_LIMIT: usize = 100_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while draining the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// A drain ran more tasks than the step limit (usually an interval that
    /// is never cancelled during a flush).
    #[error(
        "drain exceeded the step limit of {limit} tasks (now={now}ms, pending={pending})"
    )]
    StepLimitExceeded {
        limit: usize,
        now: Millis,
        pending: usize,
    },
}

// ---------------------------------------------------------------------------
// Queue entries
// ---------------------------------------------------------------------------

/// Which queue a task belongs to. Timers sort before frames on ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    Timer = 0,
    Frame = 1,
}

#[derive(Debug, Clone)]
struct Scheduled<T> {
    task: T,
    due_at: Millis,
    lane: Lane,
    order: u64,
    /// Repeat period for intervals.
    period: Option<Millis>,
}

/// A task that has fallen due, handed back to the caller to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Due<T> {
    /// The handle the task was scheduled under. For intervals this stays
    /// valid (and cancellable) across repeats.
    pub id: TaskId,
    pub task: T,
    /// Clock time at which the task runs.
    pub at: Millis,
    pub lane: Lane,
}

/// A read-only summary of one pending task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTask {
    pub id: TaskId,
    pub due_at: Millis,
    pub lane: Lane,
    pub repeating: bool,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The virtual clock and its pending tasks.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Millis,
    frame_interval: Millis,
    step_limit: usize,
    next_order: u64,
    pending: SlotMap<TaskId, Scheduled<T>>,
}

impl<T: Clone> Scheduler<T> {
    /// Create a scheduler at time 0. A frame interval of 0 is clamped to 1.
    pub fn new(frame_interval: Millis) -> Self {
        Self {
            now: 0,
            frame_interval: frame_interval.max(1),
            step_limit: DEFAULT_STEP_LIMIT,
            next_order: 0,
            pending: SlotMap::with_key(),
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit.max(1);
        self
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn frame_interval(&self) -> Millis {
        self.frame_interval
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Move the clock forward to `at`. Never moves it backwards.
    pub fn set_now(&mut self, at: Millis) {
        self.now = self.now.max(at);
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Run `task` once, `delay` milliseconds from now.
    pub fn schedule_timeout(&mut self, delay: Millis, task: T) -> TaskId {
        let due_at = self.now.saturating_add(delay);
        self.insert(task, due_at, Lane::Timer, None)
    }

    /// Run `task` every `period` milliseconds, first at `now + period`.
    /// A period of 0 is clamped to 1.
    pub fn schedule_interval(&mut self, period: Millis, task: T) -> TaskId {
        let period = period.max(1);
        let due_at = self.now.saturating_add(period);
        self.insert(task, due_at, Lane::Timer, Some(period))
    }

    /// Run `task` on the next frame boundary.
    pub fn request_frame(&mut self, task: T) -> TaskId {
        let due_at = self.next_frame_boundary();
        self.insert(task, due_at, Lane::Frame, None)
    }

    /// The first frame boundary strictly after now.
    pub fn next_frame_boundary(&self) -> Millis {
        (self.now / self.frame_interval)
            .saturating_add(1)
            .saturating_mul(self.frame_interval)
    }

    fn insert(&mut self, task: T, due_at: Millis, lane: Lane, period: Option<Millis>) -> TaskId {
        let order = self.next_order;
        self.next_order += 1;
        self.pending.insert(Scheduled {
            task,
            due_at,
            lane,
            order,
            period,
        })
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Cancel a pending task. Returns `false` if it already ran (one-shots)
    /// or was already cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Cancel everything. Returns how many tasks were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// All pending tasks in execution order.
    pub fn pending(&self) -> Vec<PendingTask> {
        let mut out: Vec<(u64, PendingTask)> = self
            .pending
            .iter()
            .map(|(id, s)| {
                (
                    s.order,
                    PendingTask {
                        id,
                        due_at: s.due_at,
                        lane: s.lane,
                        repeating: s.period.is_some(),
                    },
                )
            })
            .collect();
        out.sort_by_key(|(order, p)| (p.due_at, p.lane, *order));
        out.into_iter().map(|(_, p)| p).collect()
    }

    /// Due time of the latest pending one-shot task, ignoring intervals.
    pub fn last_one_shot_due(&self) -> Option<Millis> {
        self.pending
            .values()
            .filter(|s| s.period.is_none())
            .map(|s| s.due_at)
            .max()
    }

    // -----------------------------------------------------------------------
    // Draining
    // -----------------------------------------------------------------------

    /// Pop the next task due at or before `limit`, advancing the clock to its
    /// due time. Intervals are re-armed under the same id.
    pub fn pop_due(&mut self, limit: Millis) -> Option<Due<T>> {
        let (id, due_at, lane) = self
            .pending
            .iter()
            .filter(|(_, s)| s.due_at <= limit)
            .min_by_key(|(_, s)| (s.due_at, s.lane, s.order))
            .map(|(id, s)| (id, s.due_at, s.lane))?;

        self.set_now(due_at);

        let repeat = self.pending.get(id).and_then(|s| s.period);
        let task = match repeat {
            Some(period) => {
                let order = self.next_order;
                self.next_order += 1;
                let entry = self.pending.get_mut(id)?;
                entry.due_at = due_at.saturating_add(period);
                entry.order = order;
                entry.task.clone()
            }
            None => self.pending.remove(id)?.task,
        };

        Some(Due {
            id,
            task,
            at: due_at,
            lane,
        })
    }

    /// Check a running drain count against the step limit.
    pub fn check_budget(&self, steps: usize) -> Result<(), SchedulerError> {
        if steps > self.step_limit {
            return Err(SchedulerError::StepLimitExceeded {
                limit: self.step_limit,
                now: self.now,
                pending: self.pending.len(),
            });
        }
        Ok(())
    }
}
