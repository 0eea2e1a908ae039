//! The host-facing animation object.

use std::fmt;

use crate::config::{ConfigError, RuneConfig};
use crate::events::DispatchReport;
use crate::scheduler::{PlaybackHandle, PlaybackState, Scheduler, UpdateEvent};
use crate::sizing::{DimensionResolver, HeadlessResolver, SurfaceDimensions};

/// A sized drawing surface with a frame-rate driven update loop.
///
/// Dimensions are resolved once at construction and never change. Everything
/// time-related is delegated to the owned [`Scheduler`].
///
/// ## Example
///
/// ```rust
/// use rune_loop::{Rune, RuneConfig};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let mut rune = Rune::new(RuneConfig::new().container(".parent")).unwrap();
/// assert_eq!((rune.width(), rune.height()), (640, 480));
///
/// let frames = Rc::new(Cell::new(0));
/// let seen = frames.clone();
/// rune.on("update", move |_| seen.set(seen.get() + 1));
/// rune.play();
///
/// let mut now = 0.0;
/// while now <= 100.0 {
///     rune.tick(now);
///     now += 1.0;
/// }
/// assert_eq!(frames.get(), 6);
/// ```
pub struct Rune {
    dimensions: SurfaceDimensions,
    scheduler: Scheduler,
}

impl Rune {
    /// Build with the [`HeadlessResolver`].
    pub fn new(config: RuneConfig) -> Result<Self, ConfigError> {
        Self::with_resolver(config, &HeadlessResolver)
    }

    /// Build, sizing the surface with `resolver`.
    pub fn with_resolver<R>(config: RuneConfig, resolver: &R) -> Result<Self, ConfigError>
    where
        R: DimensionResolver + ?Sized,
    {
        config.validate()?;
        let scheduler = Scheduler::new(config.frame_rate_or_default()?)?;
        let dimensions = resolver.resolve(&config);
        log::debug!(
            "rune {}x{} at {} fps",
            dimensions.width,
            dimensions.height,
            scheduler.frame_rate()
        );
        Ok(Self {
            dimensions,
            scheduler,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    #[inline]
    pub fn dimensions(&self) -> SurfaceDimensions {
        self.dimensions
    }

    /// Target frames per second.
    #[inline]
    pub fn frame_rate(&self) -> f64 {
        self.scheduler.frame_rate()
    }

    pub fn on<F>(&mut self, event: &str, listener: F)
    where
        F: FnMut(&UpdateEvent) + 'static,
    {
        self.scheduler.on(event, listener);
    }

    pub fn try_on<F, E>(&mut self, event: &str, listener: F)
    where
        F: FnMut(&UpdateEvent) -> Result<(), E> + 'static,
        E: fmt::Display,
    {
        self.scheduler.try_on(event, listener);
    }

    pub fn emit(&mut self, event: &str, payload: &UpdateEvent) -> DispatchReport {
        self.scheduler.emit(event, payload)
    }

    pub fn play(&mut self) {
        self.scheduler.play();
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    /// See [`Scheduler::tick`].
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.scheduler.tick(now_ms)
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    pub fn controls(&self) -> PlaybackHandle {
        self.scheduler.controls()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Give up the sizing and keep only the loop, e.g. to hand it to a driver
    /// that needs ownership.
    pub fn into_scheduler(self) -> Scheduler {
        self.scheduler
    }
}

impl fmt::Debug for Rune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rune")
            .field("dimensions", &self.dimensions)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::{ContainerResolver, Dimension};

    #[test]
    fn test_defaults() {
        let rune = Rune::new(RuneConfig::default()).unwrap();
        assert_eq!(rune.width(), 640);
        assert_eq!(rune.height(), 480);
        assert_eq!(rune.frame_rate(), 60.0);
        assert_eq!(rune.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            Rune::new(RuneConfig::new().frame_rate(0.0)),
            Err(ConfigError::NonPositiveFrameRate(_))
        ));
        assert!(matches!(
            Rune::new(RuneConfig::new().height(Dimension::Pixels(0))),
            Err(ConfigError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_with_container_resolver() {
        let resolver = ContainerResolver::new(|_: &str| Some((300, 200)));
        let config = RuneConfig::new()
            .width(Dimension::Percent(100.0))
            .height(Dimension::Percent(100.0))
            .container(".parent")
            .frame_rate(24.0);
        let rune = Rune::with_resolver(config, &resolver).unwrap();
        assert_eq!(rune.dimensions(), SurfaceDimensions::new(300, 200));
        assert_eq!(rune.frame_rate(), 24.0);
    }

    #[test]
    fn test_play_pause_delegate() {
        let mut rune = Rune::new(RuneConfig::default()).unwrap();
        let controls = rune.controls();
        rune.play();
        assert!(controls.is_running());
        rune.pause();
        assert_eq!(controls.state(), PlaybackState::Paused);
        assert_eq!(rune.into_scheduler().state(), PlaybackState::Paused);
    }
}
