//! Timestamp sources for driving a [`Scheduler`](crate::Scheduler).
//!
//! The scheduler itself never reads time; whoever drives it passes `now` into
//! `tick`. These clocks are what drivers read that value from.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A monotonic millisecond timestamp source.
pub trait Clock {
    /// Current time in milliseconds since an arbitrary, fixed origin.
    fn now_ms(&self) -> f64;
}

/// Wall-clock time backed by [`Instant`], with the origin at construction.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Synthetic time that only moves when told to.
///
/// Clones share the same underlying time, so a test can hold one handle while
/// a driver reads another.
///
/// ```rust
/// use rune_loop::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let view = clock.clone();
/// clock.advance(16.5);
/// assert_eq!(view.now_ms(), 16.5);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Start at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at `ms`.
    pub fn starting_at(ms: f64) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    /// Move forward by `ms` and return the new time.
    pub fn advance(&self, ms: f64) -> f64 {
        let next = self.now.get() + ms;
        self.now.set(next);
        next
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::starting_at(100.0);
        let other = clock.clone();
        assert_eq!(clock.advance(10.0), 110.0);
        assert_eq!(other.now_ms(), 110.0);
        other.set(5.0);
        assert_eq!(clock.now_ms(), 5.0);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(a >= 0.0);
        assert!(b >= a);
    }
}
