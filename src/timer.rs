//! Cooperative timers driven by the host's clock.
//!
//! Nothing here sleeps or spawns; the engine's `tick` asks each timer whether
//! it is due at the instant the host supplies.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Shared stop flag for a bounded background task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Fixed-period repeating timer.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next_due: Instant,
}

impl Interval {
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next_due: start + period,
        }
    }

    /// True once per elapsed period. Missed periods collapse into one firing.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.period;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPoll {
    /// Run attempt number `n` (starting at 1) now.
    Attempt(u32),
    Idle,
    /// Budget spent or cancelled; never fires again.
    Finished,
}

/// Runs an attempt every `interval`, at most `max_attempts` times.
#[derive(Debug, Clone)]
pub struct RetryTask {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
    next_due: Instant,
    cancel: CancelToken,
}

impl RetryTask {
    pub fn new(interval: Duration, max_attempts: u32, start: Instant) -> Self {
        Self {
            interval,
            max_attempts,
            attempts: 0,
            next_due: start + interval,
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_finished(&self) -> bool {
        self.cancel.is_cancelled() || self.attempts >= self.max_attempts
    }

    pub fn poll(&mut self, now: Instant) -> RetryPoll {
        if self.is_finished() {
            return RetryPoll::Finished;
        }
        if now < self.next_due {
            return RetryPoll::Idle;
        }
        self.attempts += 1;
        self.next_due = now + self.interval;
        RetryPoll::Attempt(self.attempts)
    }
}
