#![cfg(all(feature = "web", target_arch = "wasm32"))]

use std::cell::RefCell;
use std::rc::Rc;

use rune_loop::web::{AnimationFrameLoop, DomResolver, PerformanceClock};
use rune_loop::{Clock, Dimension, DimensionResolver, RuneConfig, Scheduler, SurfaceDimensions};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn missing_container_uses_default_size() {
    let config = RuneConfig::new().container(".does-not-exist");
    assert_eq!(DomResolver.resolve(&config), SurfaceDimensions::new(640, 480));
}

#[wasm_bindgen_test]
fn pixel_sizes_ignore_the_document() {
    let config = RuneConfig::new()
        .width(Dimension::Pixels(320))
        .height(Dimension::Pixels(240));
    assert_eq!(DomResolver.resolve(&config), SurfaceDimensions::new(320, 240));
}

#[wasm_bindgen_test]
fn performance_clock_moves_forward() {
    let clock = PerformanceClock::new().unwrap();
    let a = clock.now_ms();
    let b = clock.now_ms();
    assert!(b >= a);
}

#[wasm_bindgen_test]
fn play_arms_the_frame_loop() {
    let scheduler = Rc::new(RefCell::new(Scheduler::default()));
    let animation = AnimationFrameLoop::attach(scheduler.clone()).unwrap();
    assert!(!animation.is_pending());

    animation.controls().play();
    assert!(animation.is_pending());
    assert!(animation.controls().is_armed());

    animation.stop();
    assert!(!animation.is_pending());
    assert!(!animation.controls().is_armed());
}
