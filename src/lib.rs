//! # rune-loop
//!
//! A minimal animation driver: a draw loop that emits `"update"` events at a
//! target frame rate and can be played, paused and resumed, plus sizing of
//! the drawing surface from configuration or a container element.
//!
//! This crate provides platform-agnostic logic for:
//! - Registering listeners and dispatching named events in order
//! - Gating environment ticks down to a configured frame rate
//! - Resolving surface dimensions from pixels, percentages or a container
//! - Driving the loop headlessly or (with `web`) from `requestAnimationFrame`
//!
//! ## Features
//!
//! - `serde` - Enable serialization/deserialization of [`RuneConfig`]
//! - `toml` - Load [`RuneConfig`] from TOML
//! - `web` - Enable browser driving, timing and DOM sizing
//!
//! ## Example
//!
//! ```rust
//! use rune_loop::{HeadlessDriver, ManualClock, Rune, RuneConfig};
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let mut rune = Rune::new(RuneConfig::new().frame_rate(10.0))?;
//! assert_eq!((rune.width(), rune.height()), (640, 480));
//!
//! let frames = Rc::new(Cell::new(0));
//! let seen = frames.clone();
//! rune.on("update", move |frame| {
//!     assert!(frame.elapsed_ms >= 0.0);
//!     seen.set(seen.get() + 1);
//! });
//! rune.play();
//!
//! let clock = ManualClock::new();
//! HeadlessDriver::default().simulate(rune.scheduler_mut(), &clock, Duration::from_millis(250));
//! assert_eq!(frames.get(), 2);
//! # Ok::<(), rune_loop::ConfigError>(())
//! ```

mod clock;
mod config;
mod driver;
pub mod events;
mod rune;
mod scheduler;
pub mod sizing;

#[cfg(feature = "web")]
pub mod web;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    validate_frame_rate, ConfigError, RuneConfig, DEFAULT_FRAME_RATE, MAX_FRAME_RATE,
};
pub use driver::{HeadlessDriver, DEFAULT_DRIVE_INTERVAL};
pub use events::{DispatchReport, EventHub, ListenerError, UPDATE};
pub use rune::Rune;
pub use scheduler::{FrameStats, PlaybackHandle, PlaybackState, Scheduler, UpdateEvent};
pub use sizing::{
    ContainerResolver, Dimension, DimensionResolver, HeadlessResolver, SurfaceDimensions,
};
