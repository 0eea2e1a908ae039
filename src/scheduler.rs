//! Frame-rate gated draw loop.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::config::{validate_frame_rate, ConfigError, DEFAULT_FRAME_RATE};
use crate::events::{DispatchReport, EventHub, UPDATE};

/// Ticks this close to a frame boundary count as having reached it.
const TOLERANCE_MS: f64 = 1e-3;

/// Number of recent frame intervals used for the measured frame rate.
const STATS_WINDOW: usize = 60;

/// Current playback state of a [`Scheduler`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// Never played
    #[default]
    Stopped,
    /// Ticks may fire frames
    Running,
    /// Suspended by `pause()`
    Paused,
}

/// Payload of the `"update"` event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateEvent {
    /// Milliseconds since the previous frame, or since the tick that
    /// anchored the cadence for the first frame after `play()`.
    pub elapsed_ms: f64,
    /// Running frame counter, starting at 1. Not reset by pausing.
    pub frame: u64,
    /// The `now` passed to the tick that fired this frame.
    pub timestamp_ms: f64,
}

/// Timing cursor. Reset on every `play()`.
#[derive(Clone, Copy, Debug, Default)]
struct FrameClock {
    /// Time of the tick that started the current cadence.
    anchor: Option<f64>,
    /// Time of the last fired frame (or the anchor before the first one).
    last_frame: f64,
    /// Index, counted from the anchor, of the next frame slot.
    next_slot: u64,
}

type ArmHook = Box<dyn FnMut()>;

/// State shared between a scheduler and its [`PlaybackHandle`]s.
struct Transport {
    state: Cell<PlaybackState>,
    clock: Cell<FrameClock>,
    armed: Cell<bool>,
    arm_hook: RefCell<Option<ArmHook>>,
}

impl Transport {
    fn new() -> Self {
        Self {
            state: Cell::new(PlaybackState::Stopped),
            clock: Cell::new(FrameClock::default()),
            armed: Cell::new(false),
            arm_hook: RefCell::new(None),
        }
    }

    fn play(&self) {
        let previous = self.state.get();
        if previous == PlaybackState::Running {
            return;
        }
        self.state.set(PlaybackState::Running);
        self.clock.set(FrameClock::default());
        log::debug!("playback {:?} -> Running", previous);
        self.arm();
    }

    fn pause(&self) {
        if self.state.get() == PlaybackState::Running {
            self.state.set(PlaybackState::Paused);
            log::debug!("playback Running -> Paused");
        }
    }

    fn arm(&self) {
        if self.armed.get() {
            return;
        }
        // A hook that re-enters play() while arming finds the cell borrowed
        // and leaves arming to the outer call.
        let Ok(mut hook) = self.arm_hook.try_borrow_mut() else {
            return;
        };
        if let Some(hook) = hook.as_mut() {
            self.armed.set(true);
            log::debug!("arming drive loop");
            hook();
        }
    }
}

/// Cloneable control over a scheduler's playback.
///
/// Listeners cannot borrow the scheduler that is dispatching to them, so they
/// capture one of these instead. A `pause()` issued from inside a listener
/// stops every later dispatch.
#[derive(Clone)]
pub struct PlaybackHandle {
    transport: Rc<Transport>,
}

impl PlaybackHandle {
    /// Start or resume playback. No-op when already running.
    pub fn play(&self) {
        self.transport.play();
    }

    /// Suspend playback. No-op unless running.
    pub fn pause(&self) {
        self.transport.pause();
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.transport.state.get()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == PlaybackState::Running
    }

    /// Whether a drive loop is currently scheduled to keep ticking.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.transport.armed.get()
    }

    /// Record that the drive loop stopped; the next `play()` re-arms it.
    pub fn disarm(&self) {
        if self.transport.armed.replace(false) {
            log::debug!("drive loop disarmed");
        }
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("state", &self.state())
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Counters describing how the loop has been running.
#[derive(Clone, Debug, Default)]
pub struct FrameStats {
    /// Frames dispatched.
    pub frames: u64,
    /// Ticks received while running.
    pub ticks: u64,
    /// Running ticks that arrived before the next frame was due.
    pub dropped_ticks: u64,
    /// Frame slots passed over because ticks arrived too late.
    pub skipped_slots: u64,
    /// Listener failures caught during dispatch.
    pub listener_failures: u64,
    intervals: VecDeque<f64>,
}

impl FrameStats {
    fn record_interval(&mut self, ms: f64) {
        if self.intervals.len() == STATS_WINDOW {
            self.intervals.pop_front();
        }
        self.intervals.push_back(ms);
    }

    /// Frame rate measured over recent frames, if at least one interval has
    /// been observed.
    pub fn measured_frame_rate(&self) -> Option<f64> {
        let total: f64 = self.intervals.iter().sum();
        if self.intervals.is_empty() || total <= 0.0 {
            return None;
        }
        Some(1000.0 * self.intervals.len() as f64 / total)
    }
}

/// Emits `"update"` at a target frame rate while playing.
///
/// The scheduler does not own a timer. Whatever drives it calls
/// [`tick`](Scheduler::tick) as often as it likes, at least as often as the
/// target frame rate, and the scheduler decides whether a frame fires. Ticks
/// that arrive early are dropped; ticks that arrive late fire one frame and
/// skip the missed slots rather than bursting.
///
/// The first tick after `play()` anchors the cadence, so resuming from a pause
/// starts a fresh cadence.
///
/// ## Example
///
/// ```rust
/// use rune_loop::{PlaybackState, Scheduler};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let mut scheduler = Scheduler::new(10.0).unwrap(); // 100ms frames
/// let frames = Rc::new(Cell::new(0));
/// let counter = frames.clone();
/// scheduler.on("update", move |_| counter.set(counter.get() + 1));
///
/// scheduler.play();
/// assert_eq!(scheduler.state(), PlaybackState::Running);
///
/// assert!(!scheduler.tick(0.0)); // anchors the cadence
/// assert!(!scheduler.tick(50.0)); // too early
/// assert!(scheduler.tick(100.0));
/// assert_eq!(frames.get(), 1);
///
/// scheduler.pause();
/// assert!(!scheduler.tick(500.0));
/// assert_eq!(frames.get(), 1);
/// ```
pub struct Scheduler {
    /// Frames per second
    frame_rate: f64,
    /// Milliseconds between frames
    frame_interval_ms: f64,
    transport: Rc<Transport>,
    hub: EventHub<UpdateEvent>,
    stats: FrameStats,
}

impl Scheduler {
    /// Create a scheduler targeting `frame_rate` frames per second.
    pub fn new(frame_rate: f64) -> Result<Self, ConfigError> {
        validate_frame_rate(frame_rate).map(Self::with_valid_rate)
    }

    /// `frame_rate` must already have passed [`validate_frame_rate`].
    fn with_valid_rate(frame_rate: f64) -> Self {
        Self {
            frame_rate,
            frame_interval_ms: 1000.0 / frame_rate,
            transport: Rc::new(Transport::new()),
            hub: EventHub::new(),
            stats: FrameStats::default(),
        }
    }

    /// Target frames per second.
    #[inline]
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Milliseconds between frames.
    #[inline]
    pub fn frame_interval_ms(&self) -> f64 {
        self.frame_interval_ms
    }

    /// Register a listener. `"update"` receives an [`UpdateEvent`] per frame.
    pub fn on<F>(&mut self, event: &str, listener: F)
    where
        F: FnMut(&UpdateEvent) + 'static,
    {
        self.hub.on(event, listener);
    }

    /// Register a fallible listener; errors are logged and counted.
    pub fn try_on<F, E>(&mut self, event: &str, listener: F)
    where
        F: FnMut(&UpdateEvent) -> Result<(), E> + 'static,
        E: fmt::Display,
    {
        self.hub.try_on(event, listener);
    }

    /// Dispatch `event` to its listeners outside the frame loop.
    pub fn emit(&mut self, event: &str, payload: &UpdateEvent) -> DispatchReport {
        self.hub.emit(event, payload)
    }

    /// Listeners registered with this scheduler.
    pub fn events(&self) -> &EventHub<UpdateEvent> {
        &self.hub
    }

    /// Start or resume playback.
    pub fn play(&mut self) {
        self.transport.play();
    }

    /// Pause playback.
    pub fn pause(&mut self) {
        self.transport.pause();
    }

    /// Toggle between running and paused.
    pub fn toggle(&mut self) {
        match self.state() {
            PlaybackState::Running => self.pause(),
            PlaybackState::Stopped | PlaybackState::Paused => self.play(),
        }
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.transport.state.get()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == PlaybackState::Running
    }

    /// A handle listeners can capture to control playback.
    pub fn controls(&self) -> PlaybackHandle {
        PlaybackHandle {
            transport: self.transport.clone(),
        }
    }

    /// Install the function that (re)starts the environment's drive loop.
    ///
    /// It runs on `play()` whenever the loop is not already armed. Drivers
    /// call [`PlaybackHandle::disarm`] when they stop ticking.
    pub fn set_arm_hook<F>(&mut self, hook: F)
    where
        F: FnMut() + 'static,
    {
        *self.transport.arm_hook.borrow_mut() = Some(Box::new(hook));
        if self.is_running() {
            self.transport.arm();
        }
    }

    /// Remove the arm hook and mark the loop disarmed.
    pub fn clear_arm_hook(&mut self) {
        self.transport.arm_hook.borrow_mut().take();
        self.transport.armed.set(false);
    }

    /// Frames dispatched so far.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.stats.frames
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Offer the scheduler a chance to fire a frame at `now_ms`.
    ///
    /// Returns `true` when an `"update"` was dispatched. At most one frame
    /// fires per call.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if self.state() != PlaybackState::Running {
            return false;
        }
        self.stats.ticks += 1;
        if !now_ms.is_finite() {
            log::trace!("ignoring tick with non-finite timestamp {}", now_ms);
            return false;
        }

        let mut clock = self.transport.clock.get();
        let Some(anchor) = clock.anchor else {
            clock.anchor = Some(now_ms);
            clock.last_frame = now_ms;
            clock.next_slot = 1;
            self.transport.clock.set(clock);
            return false;
        };

        if now_ms < clock.last_frame {
            log::trace!(
                "ignoring tick at {}ms, last frame at {}ms",
                now_ms,
                clock.last_frame
            );
            return false;
        }

        let due = anchor + clock.next_slot as f64 * self.frame_interval_ms;
        if now_ms + TOLERANCE_MS < due {
            self.stats.dropped_ticks += 1;
            return false;
        }

        let reached = ((now_ms - anchor + TOLERANCE_MS) / self.frame_interval_ms).floor() as u64;
        let reached = reached.max(clock.next_slot);
        self.stats.skipped_slots = self
            .stats
            .skipped_slots
            .saturating_add(reached - clock.next_slot);

        let elapsed_ms = now_ms - clock.last_frame;
        clock.last_frame = now_ms;
        clock.next_slot = reached.saturating_add(1);
        self.transport.clock.set(clock);

        self.stats.frames += 1;
        self.stats.record_interval(elapsed_ms);
        let event = UpdateEvent {
            elapsed_ms,
            frame: self.stats.frames,
            timestamp_ms: now_ms,
        };
        let report = self.hub.emit(UPDATE, &event);
        self.stats.listener_failures += report.failed() as u64;
        true
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::with_valid_rate(DEFAULT_FRAME_RATE)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("frame_rate", &self.frame_rate)
            .field("state", &self.state())
            .field("frames", &self.stats.frames)
            .field("hub", &self.hub)
            .finish()
    }
}
