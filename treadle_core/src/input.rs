// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame input snapshots.
//!
//! Raw host events (pointer, wheel, keyboard, focus, resize) are fed into a
//! [`FrameContextFactory`] as they arrive. Once per rendered frame the
//! factory produces an immutable [`FrameContext`] that every consumer of
//! that frame (coroutines, draw callbacks, components) reads.
//!
//! # Edge detection
//!
//! Buttons and keys carry three independent flags: `down` (held at snapshot
//! time), `pressed` (went down since the previous snapshot) and `released`
//! (went up since the previous snapshot). Edges are latched by the event
//! handlers and cleared after each snapshot, so a press and release that
//! both land between two frames still report both edges.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use kurbo::{Point, Size, Vec2};

use crate::time::{Duration, HostTime};

/// A mouse button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Wheel button.
    Middle,
    /// Secondary button.
    Right,
}

/// One boolean per mouse button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Buttons {
    /// Left button flag.
    pub left: bool,
    /// Middle button flag.
    pub middle: bool,
    /// Right button flag.
    pub right: bool,
}

impl Buttons {
    /// Returns the flag for `button`.
    #[must_use]
    pub const fn get(self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.left,
            MouseButton::Middle => self.middle,
            MouseButton::Right => self.right,
        }
    }

    /// Sets the flag for `button`.
    pub fn set(&mut self, button: MouseButton, value: bool) {
        match button {
            MouseButton::Left => self.left = value,
            MouseButton::Middle => self.middle = value,
            MouseButton::Right => self.right = value,
        }
    }

    /// Returns `true` if any flag is set.
    #[must_use]
    pub const fn any(self) -> bool {
        self.left || self.middle || self.right
    }
}

/// Mouse state for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MouseState {
    /// Pointer position in screen coordinates.
    pub position: Point,
    /// Whether the pointer moved since the previous frame.
    pub moved: bool,
    /// Buttons held at snapshot time.
    pub down: Buttons,
    /// Buttons that went down since the previous frame.
    pub pressed: Buttons,
    /// Buttons that went up since the previous frame.
    pub released: Buttons,
    /// Wheel delta accumulated since the previous frame.
    pub scroll: Vec2,
}

/// A key as reported by the host: physical code plus logical value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyInput {
    /// Layout-independent physical code, e.g. `"BracketLeft"`.
    pub code: String,
    /// Logical value under the active layout, e.g. `"["`.
    pub key: String,
}

/// Keyboard state for one frame, keyed by physical code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyboardState {
    /// Keys held at snapshot time.
    pub down: BTreeMap<String, KeyInput>,
    /// Keys that went down since the previous frame.
    pub pressed: BTreeMap<String, KeyInput>,
    /// Keys that went up since the previous frame.
    pub released: BTreeMap<String, KeyInput>,
}

impl KeyboardState {
    /// Returns `true` if the key with physical `code` is held.
    #[must_use]
    pub fn is_down(&self, code: &str) -> bool {
        self.down.contains_key(code)
    }

    /// Returns `true` if the key with physical `code` went down this frame.
    #[must_use]
    pub fn was_pressed(&self, code: &str) -> bool {
        self.pressed.contains_key(code)
    }

    /// Returns `true` if the key with physical `code` went up this frame.
    #[must_use]
    pub fn was_released(&self, code: &str) -> bool {
        self.released.contains_key(code)
    }
}

/// Which kinds of raw events arrived since the last snapshot.
///
/// Also used as the filter for
/// [`RenderTrigger::OnInput`](crate::render_loop::RenderTrigger::OnInput).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InputTriggers {
    /// Pointer movement.
    pub mouse_move: bool,
    /// Mouse button presses and releases.
    pub mouse_button: bool,
    /// Wheel input.
    pub scroll: bool,
    /// Key presses and releases.
    pub keyboard: bool,
    /// Surface resizes.
    pub resize: bool,
}

impl InputTriggers {
    /// Every event kind.
    pub const ALL: Self = Self {
        mouse_move: true,
        mouse_button: true,
        scroll: true,
        keyboard: true,
        resize: true,
    };

    /// No event kind.
    pub const NONE: Self = Self {
        mouse_move: false,
        mouse_button: false,
        scroll: false,
        keyboard: false,
        resize: false,
    };

    /// Returns `true` if any kind is set in both `self` and `other`.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.mouse_move && other.mouse_move)
            || (self.mouse_button && other.mouse_button)
            || (self.scroll && other.scroll)
            || (self.keyboard && other.keyboard)
            || (self.resize && other.resize)
    }
}

/// Immutable snapshot of input and timing for one frame.
pub struct FrameContext {
    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
    /// Host time of this frame.
    pub now: HostTime,
    /// Time since the previous frame (zero on the first frame).
    pub delta: Duration,
    /// Time since the first frame.
    pub elapsed: Duration,
    /// Instantaneous frames per second, from `delta` (0 on the first frame).
    pub fps: f64,
    /// Exponentially smoothed frames per second.
    pub smoothed_fps: f64,
    /// Size of the render surface.
    pub screen_size: Size,
    /// Mouse state.
    pub mouse: MouseState,
    /// Keyboard state.
    pub keys: KeyboardState,
    dispose: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl fmt::Debug for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameContext")
            .field("frame_index", &self.frame_index)
            .field("now", &self.now)
            .field("delta", &self.delta)
            .field("screen_size", &self.screen_size)
            .field("mouse", &self.mouse)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl FrameContext {
    /// Creates a context for frame `frame_index` with no input.
    ///
    /// Hosts normally get contexts from [`FrameContextFactory::next_frame`];
    /// this constructor is for synthesizing frames directly.
    #[must_use]
    pub fn new(frame_index: u64, now: HostTime, delta: Duration) -> Self {
        Self {
            frame_index,
            now,
            delta,
            elapsed: Duration::ZERO,
            fps: 0.0,
            smoothed_fps: 0.0,
            screen_size: Size::ZERO,
            mouse: MouseState::default(),
            keys: KeyboardState::default(),
            dispose: RefCell::new(Vec::new()),
        }
    }

    /// Returns `true` if `button` is held.
    #[must_use]
    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.mouse.down.get(button)
    }

    /// Returns `true` if `button` went down this frame.
    #[must_use]
    pub fn was_mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse.pressed.get(button)
    }

    /// Returns `true` if `button` went up this frame.
    #[must_use]
    pub fn was_mouse_released(&self, button: MouseButton) -> bool {
        self.mouse.released.get(button)
    }

    /// Registers `callback` to run when this frame is disposed.
    pub fn defer(&self, callback: impl FnOnce() + 'static) {
        self.dispose.borrow_mut().push(Box::new(callback));
    }

    /// Runs the deferred callbacks in registration order.
    ///
    /// Called by the render loop once the frame's processing is complete.
    /// Callbacks deferred while disposing run in the same call.
    pub fn dispose(&self) {
        loop {
            let callbacks = core::mem::take(&mut *self.dispose.borrow_mut());
            if callbacks.is_empty() {
                break;
            }
            for callback in callbacks {
                callback();
            }
        }
    }
}

/// Exponential moving average tracker.
#[derive(Clone, Copy, Debug)]
struct Ema {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl Ema {
    const fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha,
            initialized: false,
        }
    }

    fn update(&mut self, sample: f64) {
        if self.initialized {
            self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        } else {
            self.value = sample;
            self.initialized = true;
        }
    }

    const fn get(&self) -> f64 {
        self.value
    }
}

/// Accumulates raw input events and produces one [`FrameContext`] per
/// rendered frame.
#[derive(Debug)]
pub struct FrameContextFactory {
    screen_size: Size,
    mouse_position: Point,
    mouse_moved: bool,
    mouse_down: Buttons,
    mouse_pressed: Buttons,
    mouse_released: Buttons,
    scroll: Vec2,
    keys_down: BTreeMap<String, KeyInput>,
    keys_pressed: BTreeMap<String, KeyInput>,
    keys_released: BTreeMap<String, KeyInput>,
    pending: InputTriggers,
    frame_index: u64,
    first_frame: Option<HostTime>,
    last_frame: Option<HostTime>,
    fps: Ema,
}

impl Default for FrameContextFactory {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl FrameContextFactory {
    /// Creates a factory whose FPS smoothing uses the given EMA factor.
    #[must_use]
    pub fn new(fps_smoothing: f64) -> Self {
        Self {
            screen_size: Size::ZERO,
            mouse_position: Point::ZERO,
            mouse_moved: false,
            mouse_down: Buttons::default(),
            mouse_pressed: Buttons::default(),
            mouse_released: Buttons::default(),
            scroll: Vec2::ZERO,
            keys_down: BTreeMap::new(),
            keys_pressed: BTreeMap::new(),
            keys_released: BTreeMap::new(),
            pending: InputTriggers::NONE,
            frame_index: 0,
            first_frame: None,
            last_frame: None,
            fps: Ema::new(fps_smoothing),
        }
    }

    // -- Raw event entry points --

    /// Pointer moved to `position`.
    pub fn mouse_move(&mut self, position: Point) {
        if position != self.mouse_position {
            self.mouse_position = position;
            self.mouse_moved = true;
            self.pending.mouse_move = true;
        }
    }

    /// `button` went down.
    pub fn mouse_down(&mut self, button: MouseButton) {
        self.mouse_down.set(button, true);
        self.mouse_pressed.set(button, true);
        self.pending.mouse_button = true;
    }

    /// `button` went up.
    pub fn mouse_up(&mut self, button: MouseButton) {
        self.mouse_down.set(button, false);
        self.mouse_released.set(button, true);
        self.pending.mouse_button = true;
    }

    /// Wheel scrolled by `delta`.
    pub fn wheel(&mut self, delta: Vec2) {
        self.scroll += delta;
        self.pending.scroll = true;
    }

    /// Key with physical `code` and logical `key` went down.
    ///
    /// Host auto-repeat (a second down without an up) is ignored.
    pub fn key_down(&mut self, code: &str, key: &str) {
        if self.keys_down.contains_key(code) {
            return;
        }
        let input = KeyInput {
            code: code.into(),
            key: key.into(),
        };
        self.keys_down.insert(code.into(), input.clone());
        self.keys_pressed.insert(code.into(), input);
        self.pending.keyboard = true;
    }

    /// Key with physical `code` and logical `key` went up.
    pub fn key_up(&mut self, code: &str, key: &str) {
        self.keys_down.remove(code);
        self.keys_released.insert(
            code.into(),
            KeyInput {
                code: code.into(),
                key: key.into(),
            },
        );
        self.pending.keyboard = true;
    }

    /// The surface lost focus: everything held is released.
    pub fn blur(&mut self) {
        for button in [MouseButton::Left, MouseButton::Middle, MouseButton::Right] {
            if self.mouse_down.get(button) {
                self.mouse_up(button);
            }
        }
        let held: Vec<KeyInput> = core::mem::take(&mut self.keys_down).into_values().collect();
        for input in held {
            self.key_up(&input.code, &input.key);
        }
    }

    /// The render surface was resized.
    pub fn resize(&mut self, size: Size) {
        if size != self.screen_size {
            self.screen_size = size;
            self.pending.resize = true;
        }
    }

    // -- Snapshots --

    /// Returns `true` if an event of a kind in `triggers` arrived since the
    /// last snapshot.
    #[must_use]
    pub fn has_pending(&self, triggers: InputTriggers) -> bool {
        self.pending.intersects(triggers)
    }

    /// Returns the index the next snapshot will carry.
    #[must_use]
    pub fn next_frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Produces the snapshot for the frame rendered at `now` and clears the
    /// per-frame edges.
    pub fn next_frame(&mut self, now: HostTime) -> FrameContext {
        let delta = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        let first = *self.first_frame.get_or_insert(now);
        self.last_frame = Some(now);

        let fps = if delta.is_zero() {
            0.0
        } else {
            1.0 / delta.as_secs_f64()
        };
        if fps > 0.0 {
            self.fps.update(fps);
        }

        let frame = FrameContext {
            frame_index: self.frame_index,
            now,
            delta,
            elapsed: now.saturating_duration_since(first),
            fps,
            smoothed_fps: self.fps.get(),
            screen_size: self.screen_size,
            mouse: MouseState {
                position: self.mouse_position,
                moved: self.mouse_moved,
                down: self.mouse_down,
                pressed: self.mouse_pressed,
                released: self.mouse_released,
                scroll: self.scroll,
            },
            keys: KeyboardState {
                down: self.keys_down.clone(),
                pressed: core::mem::take(&mut self.keys_pressed),
                released: core::mem::take(&mut self.keys_released),
            },
            dispose: RefCell::new(Vec::new()),
        };

        self.frame_index += 1;
        self.mouse_moved = false;
        self.mouse_pressed = Buttons::default();
        self.mouse_released = Buttons::default();
        self.scroll = Vec2::ZERO;
        self.pending = InputTriggers::NONE;
        frame
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use super::*;

    #[test]
    fn click_within_one_frame_reports_both_edges() {
        let mut factory = FrameContextFactory::default();
        factory.mouse_down(MouseButton::Left);
        factory.mouse_up(MouseButton::Left);

        let frame = factory.next_frame(HostTime(0));
        assert!(frame.was_mouse_pressed(MouseButton::Left));
        assert!(frame.was_mouse_released(MouseButton::Left));
        assert!(!frame.is_mouse_down(MouseButton::Left));

        let next = factory.next_frame(HostTime(16_000));
        assert!(!next.mouse.pressed.any(), "edges clear after a snapshot");
        assert!(!next.mouse.released.any());
    }

    #[test]
    fn held_button_stays_down_without_edges() {
        let mut factory = FrameContextFactory::default();
        factory.mouse_down(MouseButton::Right);
        let first = factory.next_frame(HostTime(0));
        assert!(first.was_mouse_pressed(MouseButton::Right));
        let second = factory.next_frame(HostTime(16_000));
        assert!(second.is_mouse_down(MouseButton::Right));
        assert!(!second.was_mouse_pressed(MouseButton::Right));
    }

    #[test]
    fn key_state_carries_logical_value() {
        let mut factory = FrameContextFactory::default();
        factory.key_down("BracketLeft", "[");
        let frame = factory.next_frame(HostTime(0));
        assert!(frame.keys.was_pressed("BracketLeft"));
        assert_eq!(frame.keys.down["BracketLeft"].key, "[");

        // Host auto-repeat does not produce another press edge.
        factory.key_down("BracketLeft", "[");
        let frame = factory.next_frame(HostTime(16_000));
        assert!(frame.keys.is_down("BracketLeft"));
        assert!(!frame.keys.was_pressed("BracketLeft"));

        factory.key_up("BracketLeft", "[");
        let frame = factory.next_frame(HostTime(32_000));
        assert!(!frame.keys.is_down("BracketLeft"));
        assert!(frame.keys.was_released("BracketLeft"));
    }

    #[test]
    fn blur_releases_everything() {
        let mut factory = FrameContextFactory::default();
        factory.mouse_down(MouseButton::Left);
        factory.key_down("KeyA", "a");
        let _ = factory.next_frame(HostTime(0));
        factory.blur();
        let frame = factory.next_frame(HostTime(16_000));
        assert!(!frame.is_mouse_down(MouseButton::Left));
        assert!(frame.was_mouse_released(MouseButton::Left));
        assert!(frame.keys.down.is_empty());
        assert!(frame.keys.was_released("KeyA"));
    }

    #[test]
    fn timing_and_scroll() {
        let mut factory = FrameContextFactory::new(0.5);
        let first = factory.next_frame(HostTime(1_000_000));
        assert_eq!(first.frame_index, 0);
        assert_eq!(first.delta, Duration::ZERO);
        assert_eq!(first.fps, 0.0);

        factory.wheel(Vec2::new(0.0, 3.0));
        factory.wheel(Vec2::new(0.0, 2.0));
        let second = factory.next_frame(HostTime(1_020_000));
        assert_eq!(second.frame_index, 1);
        assert_eq!(second.delta, Duration::from_millis(20));
        assert_eq!(second.elapsed, Duration::from_millis(20));
        assert!((second.fps - 50.0).abs() < 1e-9, "got {}", second.fps);
        assert_eq!(second.mouse.scroll, Vec2::new(0.0, 5.0));

        let third = factory.next_frame(HostTime(1_030_000));
        assert_eq!(third.mouse.scroll, Vec2::ZERO, "scroll resets per frame");
        assert!(
            (third.smoothed_fps - 75.0).abs() < 1e-9,
            "EMA of 50 and 100 at alpha 0.5, got {}",
            third.smoothed_fps
        );
    }

    #[test]
    fn pending_triggers_track_event_kinds() {
        let mut factory = FrameContextFactory::default();
        assert!(!factory.has_pending(InputTriggers::ALL));
        factory.mouse_move(Point::new(3.0, 4.0));
        assert!(factory.has_pending(InputTriggers {
            mouse_move: true,
            ..InputTriggers::NONE
        }));
        assert!(!factory.has_pending(InputTriggers {
            keyboard: true,
            ..InputTriggers::NONE
        }));
        let frame = factory.next_frame(HostTime(0));
        assert!(frame.mouse.moved);
        assert!(!factory.has_pending(InputTriggers::ALL));
    }

    #[test]
    fn dispose_runs_deferred_callbacks_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let frame = FrameContext::new(0, HostTime(0), Duration::ZERO);
        for tag in [1, 2, 3] {
            let log = log.clone();
            frame.defer(move || log.borrow_mut().push(tag));
        }
        frame.dispose();
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        frame.dispose();
        assert_eq!(log.borrow().len(), 3, "callbacks run once");
    }
}
