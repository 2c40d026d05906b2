//! Per-element debounce.
//!
//! Nothing here owns a timer: the host passes the current `Instant` to
//! `trigger` and `poll` and decides how often to poll.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
    threshold: Duration,
    leading: bool,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Trailing-edge debouncer.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            leading: false,
            deadline: None,
        }
    }

    /// Fire on the first signal of a burst, then stay quiet until the burst
    /// has been idle for `threshold`.
    pub fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    /// Records a signal and pushes the deadline out. Returns true when the
    /// caller should run right now (leading edge only).
    pub fn trigger(&mut self, now: Instant) -> bool {
        let call_now = self.leading && self.deadline.is_none();
        self.deadline = Some(now + self.threshold);
        call_now
    }

    /// Returns true exactly once when the quiescence window has elapsed and
    /// a trailing call is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                !self.leading
            }
            _ => false,
        }
    }

    /// Ends the current window early. Returns true when a trailing call was
    /// owed.
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some() && !self.leading
    }
}
