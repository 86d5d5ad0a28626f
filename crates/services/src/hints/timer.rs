//! Delayed callbacks for hint disclosure.
//!
//! Each armed timer captures the epoch current at arming time, and a fire
//! whose epoch is no longer current is dropped by the handler. Re-arming also
//! cancels the previous timer through its `TimerHandle`, so a handler keeps at
//! most one timer outstanding.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lesson_core::Clock;
use lesson_core::time::fixed_clock;
use tokio::runtime::{Handle, TryCurrentError};

/// Callback run when a timer fires.
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs a callback once `delay` has elapsed.
pub trait TimerScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

/// Cancels a timer that has not fired yet. Dropping the handle leaves the timer armed.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle for a timer that cannot be cancelled.
    #[must_use]
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Cancel the timer. A no-op if it already fired.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

//
// ─── EPOCH GUARD ───────────────────────────────────────────────────────────────
//

/// Monotonic sequence number that invalidates previously armed timers.
///
/// Never reset, so a handler reused for a new state or a restored
/// checkpoint cannot collide with callbacks armed before it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EpochGuard {
    current: u64,
}

impl EpochGuard {
    /// Invalidate every outstanding timer and return the epoch for the next one.
    pub fn invalidate(&mut self) -> u64 {
        self.current = self.current.wrapping_add(1);
        self.current
    }

    #[must_use]
    pub fn is_current(&self, epoch: u64) -> bool {
        self.current == epoch
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.current
    }
}

//
// ─── TOKIO ─────────────────────────────────────────────────────────────────────
//

/// Scheduler backed by `tokio::time::sleep` on a runtime handle.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns `TryCurrentError` when called outside a tokio runtime.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerHandle::new(move || join.abort())
    }
}

//
// ─── MANUAL ────────────────────────────────────────────────────────────────────
//

struct PendingTask {
    due: DateTime<Utc>,
    seq: u64,
    task: TimerTask,
}

struct ManualQueue {
    clock: Clock,
    next_seq: u64,
    pending: Vec<PendingTask>,
}

/// Scheduler driven by virtual time, for deterministic tests and replay.
///
/// Nothing fires until `advance` is called. Due tasks run in due-time order,
/// ties broken by arming order, and the clock reads each task's due time
/// while it runs so that timers armed from a callback are relative to it.
#[derive(Clone)]
pub struct ManualScheduler {
    queue: Arc<Mutex<ManualQueue>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(fixed_clock())
    }

    /// Start from the given clock. A `Clock::System` never advances, so pass a fixed clock.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            queue: Arc::new(Mutex::new(ManualQueue {
                clock,
                next_seq: 0,
                pending: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.queue().clock.now()
    }

    /// Number of timers armed but not yet fired, stale ones included.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue().pending.len()
    }

    /// Advance virtual time by `delta`, running every task that comes due.
    ///
    /// Returns how many tasks ran.
    pub fn advance(&self, delta: Duration) -> usize {
        let target = {
            let queue = self.queue();
            due_after(queue.clock.now(), delta)
        };

        let mut ran = 0;
        loop {
            let next = {
                let mut queue = self.queue();
                let earliest = queue
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(_, p)| (p.due, p.seq))
                    .map(|(i, _)| i);
                match earliest {
                    Some(i) => {
                        let pending = queue.pending.swap_remove(i);
                        queue.clock.advance_to(pending.due);
                        Some(pending.task)
                    }
                    None => {
                        queue.clock.advance_to(target);
                        None
                    }
                }
            };

            // The lock is released before running so the task may arm new timers.
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    fn queue(&self) -> MutexGuard<'_, ManualQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let seq = {
            let mut queue = self.queue();
            let due = due_after(queue.clock.now(), delay);
            let seq = queue.next_seq;
            queue.next_seq += 1;
            queue.pending.push(PendingTask { due, seq, task });
            seq
        };

        let queue = Arc::downgrade(&self.queue);
        TimerHandle::new(move || {
            if let Some(queue) = queue.upgrade() {
                queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pending
                    .retain(|pending| pending.seq != seq);
            }
        })
    }
}

fn due_after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
