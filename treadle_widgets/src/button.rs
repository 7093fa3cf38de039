// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A clickable container and the coroutine that drives it.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Insets, Point, Size};
use treadle_core::component::bitmap::Color;
use treadle_core::component::{
    ChildKey, Collider, Component, ComponentId, Effects, Invalidation, LayoutCx, Prop, RenderCx,
    SizeCx, SizeRequest,
};
use treadle_core::coroutine::awaiters::{
    first_of, left_mouse_pressed, left_mouse_released, mouse_entered, mouse_exited, on_dispose,
};
use treadle_core::coroutine::{CoroutineBody, HitRegion, Resume, Step, from_fn};
use treadle_core::error::BoxError;
use treadle_core::render_loop::SharedTree;

/// Visual state of a [`Button`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// The pointer is elsewhere.
    #[default]
    Idle,
    /// The pointer is over the button.
    Hovered,
    /// The left button went down over the button and has not been released.
    Pressed,
}

/// A single child on a background that follows the [`ButtonState`].
///
/// The button does not react to input by itself; start the coroutine
/// returned by [`Button::interaction`] to drive it.
#[derive(Debug)]
pub struct Button {
    state: Prop<ButtonState>,
    insets: Prop<Insets>,
    colors: [Color; 3],
}

impl Button {
    /// The key of the button's content.
    pub const CHILD: ChildKey = ChildKey(0);

    /// Creates a button with 4 px padding and grey backgrounds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Prop::new(ButtonState::Idle, Effects::RENDER),
            insets: Prop::new(
                Insets::uniform(4.0),
                Effects::RESIZE | Effects::REALLOCATE | Effects::RENDER,
            ),
            colors: [
                Color::rgb(0xdd, 0xdd, 0xdd),
                Color::rgb(0xee, 0xee, 0xee),
                Color::rgb(0xaa, 0xaa, 0xaa),
            ],
        }
    }

    /// Builder-style padding around the content.
    #[must_use]
    pub fn with_insets(mut self, insets: impl Into<Insets>) -> Self {
        self.insets = Prop::new(insets.into(), self.insets.effects());
        self
    }

    /// Builder-style backgrounds for the idle, hovered and pressed states.
    #[must_use]
    pub fn with_colors(mut self, idle: Color, hovered: Color, pressed: Color) -> Self {
        self.colors = [idle, hovered, pressed];
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ButtonState {
        *self.state.get()
    }

    /// Sets the state.
    pub fn set_state(&mut self, state: ButtonState, inv: &mut Invalidation) {
        self.state.set(state, inv);
    }

    /// Returns the coroutine body that moves button `id` of `tree` between
    /// states as the pointer enters, presses, releases and leaves it, and
    /// calls `on_click` when a press is released over it.
    ///
    /// Disposing the coroutine returns the button to [`ButtonState::Idle`].
    pub fn interaction<F: FnMut()>(
        tree: SharedTree,
        id: ComponentId,
        on_click: F,
    ) -> ButtonInteraction<F> {
        let collider = tree.borrow_mut().collider(id);
        ButtonInteraction {
            tree,
            id,
            collider,
            on_click,
            phase: Phase::Start,
        }
    }

    fn extra(&self) -> Size {
        let insets = self.insets.get();
        Size::new(insets.x_value(), insets.y_value())
    }
}

impl Default for Button {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Button {
    fn name(&self) -> &str {
        "Button"
    }

    fn child_limit(&self) -> usize {
        1
    }

    fn size_request(&self, cx: &SizeCx<'_>) -> SizeRequest {
        let extra = self.extra();
        if cx.child_count() == 0 {
            return SizeRequest::fixed(extra);
        }
        let (_, content) = cx.single_child();
        SizeRequest::new(content.min + extra, content.preferred.map(|p| p + extra))
    }

    fn children_sizes(&self, cx: &LayoutCx<'_>) -> Vec<(ChildKey, Size)> {
        let (key, _) = cx.single_child();
        let extra = self.extra();
        let size = cx.size();
        vec![(
            key,
            Size::new(
                (size.width - extra.width).max(0.0),
                (size.height - extra.height).max(0.0),
            ),
        )]
    }

    fn child_position(&self, _key: ChildKey, _cx: &LayoutCx<'_>) -> Point {
        let insets = self.insets.get();
        Point::new(insets.x0, insets.y0)
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), BoxError> {
        let color = match self.state() {
            ButtonState::Idle => self.colors[0],
            ButtonState::Hovered => self.colors[1],
            ButtonState::Pressed => self.colors[2],
        };
        cx.bitmap_mut().fill(color);
        cx.draw_children();
        Ok(())
    }
}

/// What the interaction is currently waiting for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Not resumed yet.
    Start,
    /// Registering the reset hook.
    Hooked,
    /// Pointer outside; waiting for it to enter.
    Idle,
    /// Pointer inside; waiting for it to leave or press.
    Hovered,
    /// Pressed inside; waiting for release or leave.
    Pressed,
}

/// Coroutine body returned by [`Button::interaction`].
pub struct ButtonInteraction<F> {
    tree: SharedTree,
    id: ComponentId,
    collider: Collider,
    on_click: F,
    phase: Phase,
}

impl<F> fmt::Debug for ButtonInteraction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonInteraction")
            .field("id", &self.id)
            .field("collider", &self.collider)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl<F: FnMut()> ButtonInteraction<F> {
    fn show(&self, state: ButtonState) -> Result<(), BoxError> {
        self.tree
            .try_borrow_mut()?
            .update::<Button, _>(self.id, |button, inv| button.set_state(state, inv));
        Ok(())
    }

    fn enter(&mut self, phase: Phase) -> Result<Step, BoxError> {
        self.phase = phase;
        let awaiter = match phase {
            Phase::Idle => {
                self.show(ButtonState::Idle)?;
                mouse_entered(self.collider.clone())
            }
            Phase::Hovered => {
                self.show(ButtonState::Hovered)?;
                first_of(vec![
                    mouse_exited(self.collider.clone()),
                    left_mouse_pressed(),
                ])
            }
            Phase::Pressed => {
                self.show(ButtonState::Pressed)?;
                first_of(vec![
                    left_mouse_released(),
                    mouse_exited(self.collider.clone()),
                ])
            }
            Phase::Start | Phase::Hooked => unreachable!("not a waiting phase"),
        };
        Ok(Step::Await(awaiter))
    }
}

/// Puts the button back into [`ButtonState::Idle`]. Returns `false` if the
/// tree is currently borrowed.
fn reset_to_idle(tree: &SharedTree, id: ComponentId) -> bool {
    let Ok(mut tree) = tree.try_borrow_mut() else {
        return false;
    };
    tree.update::<Button, _>(id, |button, inv| button.set_state(ButtonState::Idle, inv));
    true
}

impl<F: FnMut()> CoroutineBody for ButtonInteraction<F> {
    fn resume(&mut self, r: Resume<'_>) -> Result<Step, BoxError> {
        if r.aborted {
            return Ok(Step::Done);
        }
        match self.phase {
            Phase::Start => {
                self.phase = Phase::Hooked;
                let tree = Rc::clone(&self.tree);
                let id = self.id;
                let scheduler = r.scheduler.clone();
                Ok(Step::Await(on_dispose(move || {
                    if reset_to_idle(&tree, id) {
                        return;
                    }
                    // Disposed while the tree is borrowed; retry next tick.
                    tracing::debug!(button = ?id, "tree busy at disposal; deferring reset");
                    scheduler.start(from_fn(move |_r: Resume<'_>| {
                        if !reset_to_idle(&tree, id) {
                            tracing::debug!(button = ?id, "tree still busy; reset skipped");
                        }
                        Ok(Step::Done)
                    }));
                })))
            }
            Phase::Hooked => self.enter(Phase::Idle),
            Phase::Idle => self.enter(Phase::Hovered),
            Phase::Hovered => match r.data.into_first_of() {
                Some((1, _)) => self.enter(Phase::Pressed),
                _ => self.enter(Phase::Idle),
            },
            Phase::Pressed => match r.data.into_first_of() {
                Some((0, data)) => {
                    let inside = data
                        .position()
                        .is_some_and(|p| self.collider.contains(p));
                    if inside {
                        tracing::debug!(button = ?self.id, frame = r.frame.frame_index, "button clicked");
                        (self.on_click)();
                        self.enter(Phase::Hovered)
                    } else {
                        self.enter(Phase::Idle)
                    }
                }
                _ => self.enter(Phase::Idle),
            },
        }
    }
}
