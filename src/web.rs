//! Browser support: `requestAnimationFrame` driving, `performance.now()`
//! timestamps and DOM container sizing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::clock::Clock;
use crate::config::RuneConfig;
use crate::scheduler::{PlaybackHandle, Scheduler};
use crate::sizing::{resolve_with_container, DimensionResolver, SurfaceDimensions};

fn window() -> Result<Window, String> {
    web_sys::window().ok_or_else(|| "No window available".to_string())
}

/// Timestamps from `window.performance.now()`.
#[derive(Clone, Debug)]
pub struct PerformanceClock {
    performance: web_sys::Performance,
}

impl PerformanceClock {
    pub fn new() -> Result<Self, String> {
        let performance = window()?
            .performance()
            .ok_or("No performance timer available")?;
        Ok(Self { performance })
    }
}

impl Clock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        self.performance.now()
    }
}

/// Sizes the surface against the first element matching `container`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomResolver;

impl DimensionResolver for DomResolver {
    fn resolve(&self, config: &RuneConfig) -> SurfaceDimensions {
        let measured = config.container.as_deref().and_then(|selector| {
            let found = measure_container(selector);
            if found.is_none() {
                log::debug!("container '{}' not found", selector);
            }
            found
        });
        resolve_with_container(config, measured)
    }
}

fn measure_container(selector: &str) -> Option<(u32, u32)> {
    let document = web_sys::window()?.document()?;
    let element = document.query_selector(selector).ok()??;
    let width = element.client_width().max(0) as u32;
    let height = element.client_height().max(0) as u32;
    Some((width, height))
}

type FrameCallback = Closure<dyn FnMut(f64)>;

struct LoopInner {
    window: Window,
    callback: RefCell<Option<FrameCallback>>,
    request_id: Cell<Option<i32>>,
}

impl LoopInner {
    /// Ask for the next animation frame unless one is already pending.
    fn request(&self) -> Result<(), String> {
        if self.request_id.get().is_some() {
            return Ok(());
        }
        let callback = self.callback.borrow();
        let callback = callback.as_ref().ok_or("Animation loop was detached")?;
        let function: &js_sys::Function = callback.as_ref().unchecked_ref();
        let id = self
            .window
            .request_animation_frame(function)
            .map_err(|_| "Failed to request animation frame")?;
        self.request_id.set(Some(id));
        Ok(())
    }

    fn cancel(&self) {
        if let Some(id) = self.request_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
    }
}

/// Drives a scheduler from the display refresh.
///
/// While the scheduler is running, every animation frame calls
/// [`Scheduler::tick`] with the frame timestamp. When a frame finds the
/// scheduler paused the loop stops requesting frames and disarms; the next
/// `play()` re-arms it through the scheduler's arm hook.
///
/// Dropping the loop cancels any pending frame and removes the hook.
///
/// ## Example
///
/// ```rust,ignore
/// use rune_loop::{Rune, RuneConfig};
/// use rune_loop::web::{AnimationFrameLoop, DomResolver};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let mut rune = Rune::with_resolver(RuneConfig::new().container("#stage"), &DomResolver)?;
/// rune.on("update", |frame| draw(frame.elapsed_ms));
///
/// let scheduler = Rc::new(RefCell::new(rune.into_scheduler()));
/// let animation = AnimationFrameLoop::attach(scheduler.clone())?;
/// animation.controls().play();
/// ```
pub struct AnimationFrameLoop {
    inner: Rc<LoopInner>,
    scheduler: Rc<RefCell<Scheduler>>,
    controls: PlaybackHandle,
}

impl AnimationFrameLoop {
    /// Hook the loop into `scheduler`. Starts ticking immediately when the
    /// scheduler is already running.
    pub fn attach(scheduler: Rc<RefCell<Scheduler>>) -> Result<Self, String> {
        let controls = scheduler
            .try_borrow()
            .map_err(|_| "Scheduler is busy")?
            .controls();
        let inner = Rc::new(LoopInner {
            window: window()?,
            callback: RefCell::new(None),
            request_id: Cell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let target = scheduler.clone();
        let frame_controls = controls.clone();
        let callback = Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.request_id.set(None);

            match target.try_borrow_mut() {
                Ok(mut scheduler) => {
                    scheduler.tick(timestamp);
                }
                Err(_) => log::warn!("scheduler busy at {}ms, frame skipped", timestamp),
            }

            if !frame_controls.is_running() {
                frame_controls.disarm();
                return;
            }
            if let Err(err) = inner.request() {
                log::warn!("animation loop stopped: {}", err);
                frame_controls.disarm();
            }
        });
        *inner.callback.borrow_mut() = Some(callback);

        let weak = Rc::downgrade(&inner);
        let hook_controls = controls.clone();
        scheduler
            .try_borrow_mut()
            .map_err(|_| "Scheduler is busy")?
            .set_arm_hook(move || {
                let armed = weak
                    .upgrade()
                    .ok_or_else(|| "Animation loop was dropped".to_string())
                    .and_then(|inner| inner.request());
                if let Err(err) = armed {
                    log::warn!("could not arm animation loop: {}", err);
                    hook_controls.disarm();
                }
            });

        Ok(Self {
            inner,
            scheduler,
            controls,
        })
    }

    /// Playback control for the attached scheduler.
    pub fn controls(&self) -> PlaybackHandle {
        self.controls.clone()
    }

    pub fn scheduler(&self) -> Rc<RefCell<Scheduler>> {
        self.scheduler.clone()
    }

    /// Whether an animation frame is currently requested.
    pub fn is_pending(&self) -> bool {
        self.inner.request_id.get().is_some()
    }

    /// Pause the scheduler and cancel the pending frame.
    pub fn stop(&self) {
        self.controls.pause();
        self.inner.cancel();
        self.controls.disarm();
    }
}

impl Drop for AnimationFrameLoop {
    fn drop(&mut self) {
        self.inner.cancel();
        if let Ok(mut scheduler) = self.scheduler.try_borrow_mut() {
            scheduler.clear_arm_hook();
        } else {
            self.controls.disarm();
        }
        self.inner.callback.borrow_mut().take();
    }
}
