use std::time::{Duration, Instant};

/// Single-slot deferred task: at most one value waits, and only the latest survives.
///
/// Time is supplied by the caller, so the scheduler never owns a timer. Whoever
/// drives it polls [`DebounceScheduler::take_due`] with the current instant.
#[derive(Debug)]
pub struct DebounceScheduler<T> {
    quiet_period: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    due_at: Instant,
    value: T,
}

impl<T> DebounceScheduler<T> {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Replace any pending value and restart the quiet period from `now`.
    /// Returns `true` when an earlier pending value was superseded.
    pub fn schedule(&mut self, value: T, now: Instant) -> bool {
        let superseded = self.pending.is_some();
        self.pending = Some(Pending {
            due_at: now + self.quiet_period,
            value,
        });
        superseded
    }

    /// Hand out the pending value once its quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.due_at <= now);
        if due {
            self.take_pending()
        } else {
            None
        }
    }

    /// Hand out the pending value regardless of its deadline.
    pub fn take_pending(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    /// Drop the pending value. Returns whether anything was pending.
    pub fn cancel_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due_at)
    }
}
