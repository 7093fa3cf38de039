// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The awaiter value a suspended coroutine waits on.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::RefCell;
use core::fmt;
use core::marker::PhantomData;

use kurbo::{Point, Rect};

use super::scheduler::{self, Scheduler, SlotRef};
use crate::error::FrameError;
use crate::input::{FrameContext, KeyInput, MouseButton};
use crate::time::Duration;

/// Data an awaiter resumes its coroutine with.
#[derive(Default)]
pub enum AwaitData {
    /// Nothing to report.
    #[default]
    None,
    /// The key that satisfied a keyboard awaiter.
    Key(KeyInput),
    /// The pointer position that satisfied a mouse awaiter.
    Position(Point),
    /// Which child of a first-of awaiter won, and its data.
    FirstOf {
        /// Argument index of the winning child.
        index: usize,
        /// The winning child's data.
        data: Box<AwaitData>,
    },
    /// Every child's data, in argument order.
    AllOf(Vec<AwaitData>),
    /// A value delivered through a [`Completer`].
    Value(Box<dyn Any>),
}

impl fmt::Debug for AwaitData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Position(p) => f.debug_tuple("Position").field(p).finish(),
            Self::FirstOf { index, data } => f
                .debug_struct("FirstOf")
                .field("index", index)
                .field("data", data)
                .finish(),
            Self::AllOf(all) => f.debug_tuple("AllOf").field(all).finish(),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

impl AwaitData {
    /// Returns the key, if this is [`AwaitData::Key`].
    #[must_use]
    pub fn key(&self) -> Option<&KeyInput> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }

    /// Returns the pointer position, if this is [`AwaitData::Position`].
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Position(p) => Some(*p),
            _ => None,
        }
    }

    /// Returns the winning index and data of a first-of awaiter.
    #[must_use]
    pub fn into_first_of(self) -> Option<(usize, Self)> {
        match self {
            Self::FirstOf { index, data } => Some((index, *data)),
            _ => None,
        }
    }

    /// Takes a completed value of type `T`.
    #[must_use]
    pub fn into_value<T: 'static>(self) -> Option<T> {
        match self {
            Self::Value(value) => value.downcast::<T>().ok().map(|v| *v),
            _ => None,
        }
    }
}

/// Result of evaluating an awaiter for one frame.
#[derive(Debug)]
pub enum Readiness {
    /// Keep waiting.
    Pending,
    /// Resume the coroutine with this data.
    Ready(AwaitData),
    /// Resume the coroutine with `aborted` set.
    Aborted(AwaitData),
}

/// A user-defined wait condition.
///
/// `poll` is called at most once per frame for each suspended coroutine.
pub trait Await {
    /// Evaluates the condition against `frame`.
    fn poll(&mut self, frame: &FrameContext) -> Readiness;
}

/// A screen-space region the pointer can enter and leave.
pub trait HitRegion {
    /// Returns `true` if `point` lies inside the region.
    fn contains(&self, point: Point) -> bool;
}

impl HitRegion for Rect {
    fn contains(&self, point: Point) -> bool {
        Self::contains(self, point)
    }
}

pub(crate) enum PendingState {
    Waiting,
    Done(Box<dyn Any>),
    Failed,
}

/// Resolves the awaiter returned by [`awaiters::pending`](super::awaiters::pending).
///
/// Hosts hand a completer to an asynchronous operation; the waiting
/// coroutine resumes on the first frame after the operation settles.
pub struct Completer<T> {
    state: Rc<RefCell<PendingState>>,
    _value: PhantomData<fn(T)>,
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").finish_non_exhaustive()
    }
}

impl<T: 'static> Completer<T> {
    pub(crate) fn new() -> (Self, Awaiter) {
        let state = Rc::new(RefCell::new(PendingState::Waiting));
        let awaiter = Awaiter::from_kind(Kind::Pending(state.clone()));
        (
            Self {
                state,
                _value: PhantomData,
            },
            awaiter,
        )
    }

    /// Resolves the awaiter with `value`.
    ///
    /// Has no effect if the awaiter was already resolved.
    pub fn complete(self, value: T) {
        let mut state = self.state.borrow_mut();
        if matches!(*state, PendingState::Waiting) {
            *state = PendingState::Done(Box::new(value));
        }
    }

    /// Resolves the awaiter as aborted and logs `reason`.
    pub fn fail(self, reason: impl fmt::Display) {
        tracing::warn!(%reason, "pending host operation failed");
        let mut state = self.state.borrow_mut();
        if matches!(*state, PendingState::Waiting) {
            *state = PendingState::Failed;
        }
    }
}

/// A coroutine held by an awaiter. Dropping it disposes the coroutine if it
/// is still running.
pub(crate) struct Nested(pub(crate) SlotRef);

impl Drop for Nested {
    fn drop(&mut self) {
        scheduler::dispose_slot(&self.0);
    }
}

pub(crate) enum Kind {
    NextTick,
    Delay {
        duration: Duration,
        elapsed: Duration,
    },
    Check(Box<dyn FnMut(&FrameContext) -> bool>),
    MousePressed(MouseButton),
    MouseReleased(MouseButton),
    KeyPressed(String),
    KeyReleased(String),
    AnyKeyPressed,
    OtherKeyPressed(String),
    Entered(Box<dyn HitRegion>),
    Exited(Box<dyn HitRegion>),
    Pending(Rc<RefCell<PendingState>>),
    Coroutine(Nested),
    FirstOf(Vec<Awaiter>),
    AllOf(Vec<(Awaiter, Option<(bool, AwaitData)>)>),
    OnDispose(Option<Box<dyn FnOnce()>>),
    Custom(Box<dyn Await>),
}

/// What a suspended coroutine waits on.
///
/// Dropping an awaiter disposes any coroutine it drives.
pub struct Awaiter {
    kind: Kind,
}

impl fmt::Debug for Awaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.kind {
            Kind::NextTick => "NextTick",
            Kind::Delay { .. } => "Delay",
            Kind::Check(_) => "Check",
            Kind::MousePressed(_) => "MousePressed",
            Kind::MouseReleased(_) => "MouseReleased",
            Kind::KeyPressed(_) => "KeyPressed",
            Kind::KeyReleased(_) => "KeyReleased",
            Kind::AnyKeyPressed => "AnyKeyPressed",
            Kind::OtherKeyPressed(_) => "OtherKeyPressed",
            Kind::Entered(_) => "Entered",
            Kind::Exited(_) => "Exited",
            Kind::Pending(_) => "Pending",
            Kind::Coroutine(_) => "Coroutine",
            Kind::FirstOf(_) => "FirstOf",
            Kind::AllOf(_) => "AllOf",
            Kind::OnDispose(_) => "OnDispose",
            Kind::Custom(_) => "Custom",
        };
        f.debug_tuple("Awaiter").field(&name).finish()
    }
}

impl Awaiter {
    pub(crate) fn from_kind(kind: Kind) -> Self {
        Self { kind }
    }

    /// Wraps a user-defined condition.
    pub fn custom(condition: impl Await + 'static) -> Self {
        Self::from_kind(Kind::Custom(Box::new(condition)))
    }

    /// Disposes the awaiter and any coroutine it drives.
    pub fn dispose(self) {
        drop(self);
    }

    /// Takes the hook out of an `on_dispose` awaiter.
    pub(crate) fn take_dispose_hook(&mut self) -> Option<Box<dyn FnOnce()>> {
        match &mut self.kind {
            Kind::OnDispose(hook) => hook.take(),
            _ => None,
        }
    }

    /// Evaluates the awaiter for `frame`, advancing nested coroutines.
    pub(crate) fn poll(
        &mut self,
        frame: &FrameContext,
        scheduler: &Scheduler,
    ) -> Result<Readiness, FrameError> {
        let ready = |hit: bool, data: AwaitData| {
            if hit {
                Readiness::Ready(data)
            } else {
                Readiness::Pending
            }
        };
        let position = || AwaitData::Position(frame.mouse.position);
        let key = |code: &str, map: &alloc::collections::BTreeMap<String, KeyInput>| {
            map.get(code).cloned().map(AwaitData::Key)
        };

        Ok(match &mut self.kind {
            Kind::NextTick => Readiness::Ready(AwaitData::None),
            Kind::Delay { duration, elapsed } => {
                *elapsed += frame.delta;
                ready(*elapsed >= *duration, AwaitData::None)
            }
            Kind::Check(condition) => ready(condition(frame), AwaitData::None),
            Kind::MousePressed(button) => ready(frame.mouse.pressed.get(*button), position()),
            Kind::MouseReleased(button) => ready(frame.mouse.released.get(*button), position()),
            Kind::KeyPressed(code) => key(code.as_str(), &frame.keys.pressed)
                .map_or(Readiness::Pending, Readiness::Ready),
            Kind::KeyReleased(code) => key(code.as_str(), &frame.keys.released)
                .map_or(Readiness::Pending, Readiness::Ready),
            Kind::AnyKeyPressed => frame
                .keys
                .pressed
                .values()
                .next()
                .cloned()
                .map_or(Readiness::Pending, |k| Readiness::Ready(AwaitData::Key(k))),
            Kind::OtherKeyPressed(code) => frame
                .keys
                .pressed
                .values()
                .find(|k| k.code != *code)
                .cloned()
                .map_or(Readiness::Pending, |k| Readiness::Ready(AwaitData::Key(k))),
            Kind::Entered(region) => ready(region.contains(frame.mouse.position), position()),
            Kind::Exited(region) => ready(!region.contains(frame.mouse.position), position()),
            Kind::Pending(state) => {
                let mut state = state.borrow_mut();
                match core::mem::replace(&mut *state, PendingState::Waiting) {
                    PendingState::Waiting => Readiness::Pending,
                    PendingState::Done(value) => Readiness::Ready(AwaitData::Value(value)),
                    PendingState::Failed => Readiness::Aborted(AwaitData::None),
                }
            }
            Kind::Coroutine(nested) => {
                scheduler::advance(&nested.0, frame, scheduler)?;
                match nested.0.borrow().state {
                    scheduler::CoroutineState::Running => Readiness::Pending,
                    scheduler::CoroutineState::Completed => Readiness::Ready(AwaitData::None),
                    _ => Readiness::Aborted(AwaitData::None),
                }
            }
            Kind::FirstOf(children) => {
                let mut winner = None;
                for (index, child) in children.iter_mut().enumerate() {
                    match child.poll(frame, scheduler)? {
                        Readiness::Pending => {}
                        Readiness::Ready(data) => {
                            winner = Some((index, data, false));
                            break;
                        }
                        Readiness::Aborted(data) => {
                            winner = Some((index, data, true));
                            break;
                        }
                    }
                }
                match winner {
                    None => Readiness::Pending,
                    Some((index, data, aborted)) => {
                        // Losers are disposed now, before any other coroutine runs.
                        drop(core::mem::take(children));
                        let data = AwaitData::FirstOf {
                            index,
                            data: Box::new(data),
                        };
                        if aborted {
                            Readiness::Aborted(data)
                        } else {
                            Readiness::Ready(data)
                        }
                    }
                }
            }
            Kind::AllOf(children) => {
                for (child, outcome) in children.iter_mut() {
                    if outcome.is_some() {
                        continue;
                    }
                    match child.poll(frame, scheduler)? {
                        Readiness::Pending => {}
                        Readiness::Ready(data) => *outcome = Some((false, data)),
                        Readiness::Aborted(data) => *outcome = Some((true, data)),
                    }
                }
                if children.iter().any(|(_, outcome)| outcome.is_none()) {
                    Readiness::Pending
                } else {
                    let mut aborted = false;
                    let datas = core::mem::take(children)
                        .into_iter()
                        .filter_map(|(_, outcome)| outcome)
                        .map(|(a, data)| {
                            aborted |= a;
                            data
                        })
                        .collect();
                    if aborted {
                        Readiness::Aborted(AwaitData::AllOf(datas))
                    } else {
                        Readiness::Ready(AwaitData::AllOf(datas))
                    }
                }
            }
            Kind::OnDispose(_) => {
                panic!("on_dispose must be awaited directly, not inside a combinator")
            }
            Kind::Custom(condition) => condition.poll(frame),
        })
    }
}
