//! Headless drive loops.
//!
//! In a browser the display refresh drives the scheduler (see the `web`
//! feature). Elsewhere something has to call `tick` repeatedly; these loops do
//! that either against real time or against a [`ManualClock`].

use std::thread;
use std::time::Duration;

use crate::clock::{Clock, ManualClock};
use crate::scheduler::Scheduler;

/// Default time between ticks.
pub const DEFAULT_DRIVE_INTERVAL: Duration = Duration::from_millis(1);

/// Calls [`Scheduler::tick`] at a fixed drive rate.
///
/// The drive rate should be at least the scheduler's frame rate; the scheduler
/// drops the ticks it does not need.
///
/// ## Example
///
/// ```rust
/// use rune_loop::{HeadlessDriver, ManualClock, Scheduler};
/// use std::time::Duration;
///
/// let mut scheduler = Scheduler::new(10.0).unwrap();
/// scheduler.play();
///
/// let clock = ManualClock::new();
/// let frames = HeadlessDriver::default().simulate(
///     &mut scheduler,
///     &clock,
///     Duration::from_millis(250),
/// );
/// assert_eq!(frames, 2);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct HeadlessDriver {
    drive_interval: Duration,
}

impl Default for HeadlessDriver {
    fn default() -> Self {
        Self::new(DEFAULT_DRIVE_INTERVAL)
    }
}

impl HeadlessDriver {
    /// Create a driver ticking every `drive_interval`. A zero interval is
    /// raised to 1µs.
    pub fn new(drive_interval: Duration) -> Self {
        Self {
            drive_interval: drive_interval.max(Duration::from_micros(1)),
        }
    }

    #[inline]
    pub fn drive_interval(&self) -> Duration {
        self.drive_interval
    }

    /// Drive in real time for `window`, sleeping between ticks.
    ///
    /// Blocks the calling thread. Returns the number of frames fired.
    pub fn run_for<C: Clock>(&self, scheduler: &mut Scheduler, clock: &C, window: Duration) -> u64 {
        let start = clock.now_ms();
        let window_ms = window.as_secs_f64() * 1000.0;
        let before = scheduler.frame_count();
        log::debug!(
            "driving for {}ms every {:?}",
            window_ms,
            self.drive_interval
        );

        loop {
            let now = clock.now_ms();
            scheduler.tick(now);
            if now - start >= window_ms {
                break;
            }
            thread::sleep(self.drive_interval);
        }

        scheduler.frame_count() - before
    }

    /// Drive a synthetic clock through `window` without sleeping.
    ///
    /// Ticks once at the clock's current time, then advances it by the drive
    /// interval and ticks again until the window end has been reached. Returns
    /// the number of frames fired.
    pub fn simulate(&self, scheduler: &mut Scheduler, clock: &ManualClock, window: Duration) -> u64 {
        let step_ms = self.drive_interval.as_secs_f64() * 1000.0;
        let start = clock.now_ms();
        let end = start + window.as_secs_f64() * 1000.0;
        let before = scheduler.frame_count();

        scheduler.tick(start);
        let mut step = 0u64;
        loop {
            step += 1;
            let now = start + step as f64 * step_ms;
            if now > end {
                break;
            }
            clock.set(now);
            scheduler.tick(now);
        }

        scheduler.frame_count() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::PlaybackState;

    #[test]
    fn test_simulate_tracks_frame_rate() {
        for (fps, expected) in [(60.0, 15), (30.0, 7), (10.0, 2), (4.0, 1)] {
            let mut scheduler = Scheduler::new(fps).unwrap();
            scheduler.play();
            let clock = ManualClock::new();
            let frames =
                HeadlessDriver::default().simulate(&mut scheduler, &clock, Duration::from_millis(250));
            assert_eq!(frames, expected, "at {} fps", fps);
            assert_eq!(clock.now_ms(), 250.0);
        }
    }

    #[test]
    fn test_simulate_with_coarse_drive() {
        // A 60Hz display driving a 60fps loop.
        let driver = HeadlessDriver::new(Duration::from_micros(16_667));
        let mut scheduler = Scheduler::default();
        scheduler.play();
        let clock = ManualClock::new();
        let frames = driver.simulate(&mut scheduler, &clock, Duration::from_secs(1));
        assert!((59..=61).contains(&frames), "got {} frames", frames);
    }

    #[test]
    fn test_simulate_paused_scheduler() {
        let mut scheduler = Scheduler::default();
        let clock = ManualClock::new();
        let frames =
            HeadlessDriver::default().simulate(&mut scheduler, &clock, Duration::from_millis(100));
        assert_eq!(frames, 0);
        assert_eq!(scheduler.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_run_for_real_time() {
        let mut scheduler = Scheduler::new(10.0).unwrap();
        scheduler.play();
        let clock = SystemClock::new();
        let frames =
            HeadlessDriver::default().run_for(&mut scheduler, &clock, Duration::from_millis(250));
        // Sleep granularity varies by platform; stay within one frame of 2.5.
        assert!((1..=3).contains(&frames), "got {} frames", frames);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let driver = HeadlessDriver::new(Duration::ZERO);
        assert_eq!(driver.drive_interval(), Duration::from_micros(1));
    }
}
