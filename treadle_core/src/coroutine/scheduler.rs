// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coroutine registry and the per-frame tick.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use super::awaiter::{AwaitData, Awaiter, Kind, Nested, Readiness};
use crate::error::{BoxError, FrameError};
use crate::input::FrameContext;

/// What a coroutine body returns from one resumption.
#[derive(Debug)]
pub enum Step {
    /// Suspend until the awaiter is ready.
    Await(Awaiter),
    /// The coroutine is finished.
    Done,
}

/// Arguments of one resumption.
pub struct Resume<'a> {
    /// The frame being processed.
    pub frame: &'a FrameContext,
    /// Whether the awaiter that resumed the body was aborted.
    pub aborted: bool,
    /// Data produced by the awaiter.
    pub data: AwaitData,
    /// The scheduler, for starting nested coroutines.
    pub scheduler: &'a Scheduler,
}

impl fmt::Debug for Resume<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resume")
            .field("frame", &self.frame.frame_index)
            .field("aborted", &self.aborted)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// A resumable coroutine body.
///
/// Bodies are explicit state machines: each call to `resume` runs until the
/// next suspension point and returns what to wait on next.
pub trait CoroutineBody {
    /// Runs the body until its next suspension point.
    fn resume(&mut self, resume: Resume<'_>) -> Result<Step, BoxError>;
}

/// A [`CoroutineBody`] made from a closure; see [`from_fn`].
pub struct FnBody<F>(F);

impl<F> fmt::Debug for FnBody<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBody").finish_non_exhaustive()
    }
}

impl<F> CoroutineBody for FnBody<F>
where
    F: FnMut(Resume<'_>) -> Result<Step, BoxError>,
{
    fn resume(&mut self, resume: Resume<'_>) -> Result<Step, BoxError> {
        (self.0)(resume)
    }
}

/// Creates a coroutine body from a closure.
pub fn from_fn<F>(f: F) -> FnBody<F>
where
    F: FnMut(Resume<'_>) -> Result<Step, BoxError>,
{
    FnBody(f)
}

/// Lifecycle state of a coroutine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoroutineState {
    /// Started and not yet finished.
    Running,
    /// The body returned [`Step::Done`].
    Completed,
    /// Cancelled, or disposed together with the awaiter that drove it.
    Disposed,
    /// The body returned an error.
    Failed,
}

/// Identifies a coroutine within its scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoroutineId(pub u64);

/// A cloneable cancellation flag.
///
/// A coroutine started with a signal is disposed at its next evaluation
/// after the signal fires.
#[derive(Clone, Debug, Default)]
pub struct CancelSignal(Rc<Cell<bool>>);

impl CancelSignal {
    /// Creates an unfired signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal.
    pub fn fire(&self) {
        self.0.set(true);
    }

    /// Returns `true` once the signal has fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.0.get()
    }
}

/// Options for [`Scheduler::start_with`].
#[derive(Clone, Debug, Default)]
pub struct CoroutineOptions {
    /// Display name used in logs and errors.
    pub name: Option<String>,
    /// External cancellation flag.
    pub signal: Option<CancelSignal>,
}

/// Counters for the most recent [`Scheduler::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Coroutines merged into the active set at the start of the tick.
    pub started: u32,
    /// Bodies resumed.
    pub resumed: u32,
    /// Coroutines that completed.
    pub completed: u32,
    /// Coroutines that were disposed.
    pub disposed: u32,
    /// Coroutines still active after the tick.
    pub active: u32,
}

pub(crate) struct Slot {
    id: CoroutineId,
    name: String,
    body: Option<Box<dyn CoroutineBody>>,
    awaiter: Option<Awaiter>,
    first_resume_done: bool,
    root_driven: bool,
    pub(crate) state: CoroutineState,
    dispose_hooks: Vec<Box<dyn FnOnce()>>,
    last_advanced: Option<u64>,
    signal: Option<CancelSignal>,
    in_body: bool,
    cancel_requested: bool,
    stats: Rc<Cell<TickStats>>,
}

pub(crate) type SlotRef = Rc<RefCell<Slot>>;

struct Shared {
    next_id: Cell<u64>,
    active: RefCell<Vec<SlotRef>>,
    started: RefCell<Vec<SlotRef>>,
    ticking: Cell<bool>,
    last_frame: Cell<Option<u64>>,
    stats: Rc<Cell<TickStats>>,
}

/// Owns every coroutine and advances them once per frame.
///
/// Cloning a scheduler yields another handle to the same registry.
#[derive(Clone)]
pub struct Scheduler {
    shared: Rc<Shared>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("active", &self.shared.active.borrow().len())
            .field("started", &self.shared.started.borrow().len())
            .field("last_frame", &self.shared.last_frame.get())
            .finish_non_exhaustive()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                next_id: Cell::new(0),
                active: RefCell::new(Vec::new()),
                started: RefCell::new(Vec::new()),
                ticking: Cell::new(false),
                last_frame: Cell::new(None),
                stats: Rc::new(Cell::new(TickStats::default())),
            }),
        }
    }

    /// Starts a coroutine. Its body first runs on the next tick.
    pub fn start(&self, body: impl CoroutineBody + 'static) -> CoroutineHandle {
        self.start_with(CoroutineOptions::default(), body)
    }

    /// Starts a coroutine with a name and/or cancellation signal.
    pub fn start_with(
        &self,
        options: CoroutineOptions,
        body: impl CoroutineBody + 'static,
    ) -> CoroutineHandle {
        let id = CoroutineId(self.shared.next_id.get());
        self.shared.next_id.set(id.0 + 1);
        let name = options
            .name
            .unwrap_or_else(|| alloc::format!("coroutine#{}", id.0));
        tracing::trace!(coroutine = %name, "coroutine started");
        let slot = Rc::new(RefCell::new(Slot {
            id,
            name,
            body: Some(Box::new(body)),
            awaiter: None,
            first_resume_done: false,
            root_driven: true,
            state: CoroutineState::Running,
            dispose_hooks: Vec::new(),
            last_advanced: None,
            signal: options.signal,
            in_body: false,
            cancel_requested: false,
            stats: self.shared.stats.clone(),
        }));
        self.shared.started.borrow_mut().push(slot.clone());
        CoroutineHandle { slot }
    }

    /// Advances every root-driven coroutine by at most one step.
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly, twice for the same frame index, or with
    /// a frame index that skips one.
    pub fn tick(&self, frame: &FrameContext) -> Result<(), FrameError> {
        assert!(
            !self.shared.ticking.get(),
            "Scheduler::tick called re-entrantly"
        );
        if let Some(last) = self.shared.last_frame.get() {
            assert!(
                frame.frame_index != last,
                "frame {last} was already ticked"
            );
            assert!(
                frame.frame_index == last + 1,
                "missed tick: expected frame {}, got {}",
                last + 1,
                frame.frame_index
            );
        }
        self.shared.last_frame.set(Some(frame.frame_index));

        let _guard = TickGuard::new(&self.shared.ticking);
        let started: Vec<SlotRef> = core::mem::take(&mut *self.shared.started.borrow_mut());
        self.shared.stats.set(TickStats {
            started: count(started.len()),
            ..TickStats::default()
        });
        self.shared.active.borrow_mut().extend(started);

        let snapshot: Vec<SlotRef> = self.shared.active.borrow().clone();
        let mut result = Ok(());
        for slot in &snapshot {
            let driven = {
                let s = slot.borrow();
                s.root_driven && s.state == CoroutineState::Running
            };
            if driven {
                if let Err(err) = advance(slot, frame, self) {
                    result = Err(err);
                    break;
                }
            }
        }

        let mut active = self.shared.active.borrow_mut();
        active.retain(|slot| slot.borrow().state == CoroutineState::Running);
        let mut stats = self.shared.stats.get();
        stats.active = count(active.len());
        self.shared.stats.set(stats);
        result
    }

    /// Disposes every coroutine, running their dispose hooks.
    pub fn cancel_all(&self) {
        let mut all: Vec<SlotRef> = core::mem::take(&mut *self.shared.active.borrow_mut());
        all.extend(core::mem::take(&mut *self.shared.started.borrow_mut()));
        for slot in &all {
            dispose_slot(slot);
        }
    }

    /// Returns the number of running coroutines, including ones not yet
    /// merged by a tick.
    #[must_use]
    pub fn len(&self) -> usize {
        let running = |v: &Vec<SlotRef>| {
            v.iter()
                .filter(|s| s.borrow().state == CoroutineState::Running)
                .count()
        };
        running(&self.shared.active.borrow()) + running(&self.shared.started.borrow())
    }

    /// Returns `true` if no coroutine is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the counters of the most recent tick.
    #[must_use]
    pub fn last_tick_stats(&self) -> TickStats {
        self.shared.stats.get()
    }

    /// Returns the index of the most recently ticked frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<u64> {
        self.shared.last_frame.get()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "coroutine counts stay far below u32::MAX"
)]
fn count(n: usize) -> u32 {
    n as u32
}

fn bump(stats: &Cell<TickStats>, f: impl FnOnce(&mut TickStats)) {
    let mut s = stats.get();
    f(&mut s);
    stats.set(s);
}

struct TickGuard<'a>(&'a Cell<bool>);

impl<'a> TickGuard<'a> {
    fn new(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Advances `slot` by at most one step for `frame`.
pub(crate) fn advance(
    slot: &SlotRef,
    frame: &FrameContext,
    scheduler: &Scheduler,
) -> Result<(), FrameError> {
    let (fired, first) = {
        let mut s = slot.borrow_mut();
        if s.state != CoroutineState::Running || s.last_advanced == Some(frame.frame_index) {
            return Ok(());
        }
        s.last_advanced = Some(frame.frame_index);
        let fired = s.signal.as_ref().is_some_and(CancelSignal::is_fired);
        let first = !s.first_resume_done;
        s.first_resume_done = true;
        (fired, first)
    };
    if fired {
        dispose_slot(slot);
        return Ok(());
    }

    let (mut aborted, mut data) = if first {
        (false, AwaitData::None)
    } else {
        let Some(mut awaiter) = slot.borrow_mut().awaiter.take() else {
            return Ok(());
        };
        let readiness = match awaiter.poll(frame, scheduler) {
            Ok(readiness) => readiness,
            Err(err) => {
                drop(awaiter);
                tracing::debug!(coroutine = %slot.borrow().name, "awaited work failed");
                retire(slot, CoroutineState::Failed, true);
                return Err(err);
            }
        };
        match readiness {
            Readiness::Pending => {
                let mut s = slot.borrow_mut();
                if s.state == CoroutineState::Running {
                    s.awaiter = Some(awaiter);
                }
                return Ok(());
            }
            Readiness::Ready(data) => (false, data),
            Readiness::Aborted(data) => (true, data),
        }
    };

    loop {
        let mut body = {
            let mut s = slot.borrow_mut();
            if s.state != CoroutineState::Running {
                return Ok(());
            }
            let Some(body) = s.body.take() else {
                return Ok(());
            };
            s.in_body = true;
            body
        };
        let stats = slot.borrow().stats.clone();
        bump(&stats, |s| s.resumed += 1);

        let step = body.resume(Resume {
            frame,
            aborted,
            data: core::mem::take(&mut data),
            scheduler,
        });

        let cancel_requested = {
            let mut s = slot.borrow_mut();
            s.in_body = false;
            s.cancel_requested
        };

        match step {
            Err(source) => {
                drop(body);
                let name = slot.borrow().name.clone();
                tracing::debug!(coroutine = %name, "coroutine failed");
                retire(slot, CoroutineState::Failed, true);
                return Err(FrameError::Coroutine { name, source });
            }
            Ok(Step::Done) => {
                drop(body);
                if cancel_requested {
                    retire(slot, CoroutineState::Disposed, true);
                } else {
                    tracing::trace!(coroutine = %slot.borrow().name, "coroutine completed");
                    retire(slot, CoroutineState::Completed, false);
                }
                return Ok(());
            }
            Ok(Step::Await(mut awaiter)) => {
                if cancel_requested {
                    drop(body);
                    drop(awaiter);
                    retire(slot, CoroutineState::Disposed, true);
                    return Ok(());
                }
                if let Some(hook) = awaiter.take_dispose_hook() {
                    let mut s = slot.borrow_mut();
                    s.dispose_hooks.push(hook);
                    s.body = Some(body);
                    aborted = false;
                    data = AwaitData::None;
                    continue;
                }
                let mut s = slot.borrow_mut();
                s.body = Some(body);
                s.awaiter = Some(awaiter);
                return Ok(());
            }
        }
    }
}

/// Disposes `slot` if it is still running.
///
/// Called from inside the coroutine's own body, disposal is deferred until
/// the body returns to the scheduler.
pub(crate) fn dispose_slot(slot: &SlotRef) {
    {
        let mut s = slot.borrow_mut();
        if s.state != CoroutineState::Running {
            return;
        }
        if s.in_body {
            s.cancel_requested = true;
            return;
        }
    }
    retire(slot, CoroutineState::Disposed, true);
}

/// Moves `slot` into a terminal state, releasing its body and awaiter.
fn retire(slot: &SlotRef, state: CoroutineState, run_hooks: bool) {
    let (hooks, awaiter, body, stats) = {
        let mut s = slot.borrow_mut();
        s.state = state;
        (
            core::mem::take(&mut s.dispose_hooks),
            s.awaiter.take(),
            s.body.take(),
            s.stats.clone(),
        )
    };
    match state {
        CoroutineState::Completed => bump(&stats, |s| s.completed += 1),
        CoroutineState::Disposed => bump(&stats, |s| s.disposed += 1),
        _ => {}
    }
    if run_hooks {
        for hook in hooks.into_iter().rev() {
            hook();
        }
    }
    drop(awaiter);
    drop(body);
}

/// Handle to a started coroutine.
#[derive(Clone)]
pub struct CoroutineHandle {
    slot: SlotRef,
}

impl fmt::Debug for CoroutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.slot.borrow();
        f.debug_struct("CoroutineHandle")
            .field("id", &s.id)
            .field("name", &s.name)
            .field("state", &s.state)
            .finish_non_exhaustive()
    }
}

impl CoroutineHandle {
    /// Returns the coroutine's id.
    #[must_use]
    pub fn id(&self) -> CoroutineId {
        self.slot.borrow().id
    }

    /// Returns the coroutine's display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.slot.borrow().name.clone()
    }

    /// Returns the coroutine's lifecycle state.
    #[must_use]
    pub fn state(&self) -> CoroutineState {
        self.slot.borrow().state
    }

    /// Returns `true` once the coroutine is no longer running.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state() != CoroutineState::Running
    }

    /// Disposes the coroutine.
    ///
    /// Dispose hooks run in reverse registration order. If called from the
    /// coroutine's own body, disposal happens when the body returns.
    pub fn cancel(&self) {
        dispose_slot(&self.slot);
    }

    /// Returns an awaiter that becomes ready when the coroutine completes,
    /// or aborted if it is disposed.
    ///
    /// From now on the coroutine is advanced by that awaiter instead of the
    /// root tick. Dropping the awaiter disposes the coroutine.
    ///
    /// # Panics
    ///
    /// Panics if the completion awaiter was already taken: a coroutine has
    /// exactly one driver.
    #[must_use]
    pub fn completion(&self) -> Awaiter {
        let mut s = self.slot.borrow_mut();
        assert!(
            s.root_driven,
            "completion of coroutine {} was already taken",
            s.name
        );
        s.root_driven = false;
        drop(s);
        Awaiter::from_kind(Kind::Coroutine(Nested(self.slot.clone())))
    }

    /// Registers `hook` on the coroutine from outside its body.
    ///
    /// Equivalent to the body awaiting
    /// [`awaiters::on_dispose`](super::awaiters::on_dispose). Ignored once the
    /// coroutine has finished.
    pub fn on_dispose(&self, hook: impl FnOnce() + 'static) {
        let mut s = self.slot.borrow_mut();
        if s.state == CoroutineState::Running {
            s.dispose_hooks.push(Box::new(hook));
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    use super::*;
    use crate::coroutine::awaiters::{delay, first_of, next_tick, on_dispose};
    use crate::error::Message;
    use crate::time::{Duration, HostTime};

    fn frame(index: u64) -> FrameContext {
        FrameContext::new(
            index,
            HostTime(index * 16_000),
            Duration::from_millis(16),
        )
    }

    /// A coroutine that waits one tick `steps` times, logging each resume.
    fn counter(log: Rc<RefCell<Vec<u64>>>, steps: u32) -> impl CoroutineBody {
        let mut left = steps;
        from_fn(move |r: Resume<'_>| {
            log.borrow_mut().push(r.frame.frame_index);
            if left == 0 {
                return Ok(Step::Done);
            }
            left -= 1;
            Ok(Step::Await(next_tick()))
        })
    }

    #[test]
    fn new_coroutine_first_runs_on_next_tick() {
        let sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        sched.tick(&frame(0)).unwrap();
        let handle = sched.start(counter(log.clone(), 2));
        assert!(log.borrow().is_empty());
        sched.tick(&frame(1)).unwrap();
        sched.tick(&frame(2)).unwrap();
        sched.tick(&frame(3)).unwrap();
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert_eq!(handle.state(), CoroutineState::Completed);
        assert!(sched.is_empty());
    }

    #[test]
    fn at_most_one_suspension_per_tick() {
        let sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _handle = sched.start(counter(log.clone(), 10));
        for i in 0..5 {
            sched.tick(&frame(i)).unwrap();
        }
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4], "one resume per frame");
    }

    #[test]
    #[should_panic(expected = "already ticked")]
    fn double_tick_panics() {
        let sched = Scheduler::new();
        sched.tick(&frame(4)).unwrap();
        let _ = sched.tick(&frame(4));
    }

    #[test]
    #[should_panic(expected = "missed tick")]
    fn skipped_frame_panics() {
        let sched = Scheduler::new();
        sched.tick(&frame(0)).unwrap();
        let _ = sched.tick(&frame(2));
    }

    #[test]
    fn cancel_runs_hooks_in_reverse_order() {
        let sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stage = 0;
        let hooks_log = log.clone();
        let handle = sched.start(from_fn(move |_r: Resume<'_>| {
            stage += 1;
            let log = hooks_log.clone();
            match stage {
                1 => Ok(Step::Await(on_dispose(move || log.borrow_mut().push("first")))),
                2 => Ok(Step::Await(on_dispose(move || log.borrow_mut().push("second")))),
                _ => Ok(Step::Await(delay(Duration::from_millis(1_000)))),
            }
        }));
        sched.tick(&frame(0)).unwrap();
        assert!(log.borrow().is_empty(), "hooks only run on dispose");
        assert!(!handle.is_finished());

        handle.cancel();
        assert_eq!(*log.borrow(), vec!["second", "first"]);
        assert_eq!(handle.state(), CoroutineState::Disposed);
        sched.tick(&frame(1)).unwrap();
        assert!(sched.is_empty());
    }

    #[test]
    fn hooks_do_not_run_on_completion() {
        let sched = Scheduler::new();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        let mut registered = false;
        let handle = sched.start(from_fn(move |_r: Resume<'_>| {
            if registered {
                return Ok(Step::Done);
            }
            registered = true;
            let flag = flag.clone();
            Ok(Step::Await(on_dispose(move || flag.set(true))))
        }));
        sched.tick(&frame(0)).unwrap();
        assert_eq!(handle.state(), CoroutineState::Completed);
        assert!(!ran.get());
    }

    #[test]
    fn cancel_from_inside_body_takes_effect_on_return() {
        let sched = Scheduler::new();
        let slot: Rc<RefCell<Option<CoroutineHandle>>> = Rc::new(RefCell::new(None));
        let me = slot.clone();
        let resumes = Rc::new(Cell::new(0));
        let counted = resumes.clone();
        let handle = sched.start(from_fn(move |_r: Resume<'_>| {
            counted.set(counted.get() + 1);
            if let Some(handle) = me.borrow().as_ref() {
                handle.cancel();
            }
            Ok(Step::Await(next_tick()))
        }));
        *slot.borrow_mut() = Some(handle.clone());
        sched.tick(&frame(0)).unwrap();
        assert_eq!(handle.state(), CoroutineState::Disposed);
        sched.tick(&frame(1)).unwrap();
        assert_eq!(resumes.get(), 1);
    }

    #[test]
    fn cancel_signal_disposes_at_next_evaluation() {
        let sched = Scheduler::new();
        let signal = CancelSignal::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = sched.start_with(
            CoroutineOptions {
                name: Some("signalled".into()),
                signal: Some(signal.clone()),
            },
            counter(log.clone(), 10),
        );
        sched.tick(&frame(0)).unwrap();
        signal.fire();
        sched.tick(&frame(1)).unwrap();
        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(handle.state(), CoroutineState::Disposed);
        assert_eq!(handle.name(), "signalled");
    }

    #[test]
    fn body_error_aborts_tick() {
        let sched = Scheduler::new();
        let handle = sched.start_with(
            CoroutineOptions {
                name: Some("faulty".into()),
                signal: None,
            },
            from_fn(|_r: Resume<'_>| Err(Message::boxed("boom"))),
        );
        let err = sched.tick(&frame(0)).unwrap_err();
        match err {
            FrameError::Coroutine { name, .. } => assert_eq!(name, "faulty"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(handle.state(), CoroutineState::Failed);
        // The scheduler stays usable.
        sched.tick(&frame(1)).unwrap();
    }

    #[test]
    fn completion_is_driven_by_the_awaiter() {
        let sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let inner_log = log.clone();
        let outer_log = log.clone();
        let mut waiting = false;
        let outer = sched.start(from_fn(move |r: Resume<'_>| {
            if waiting {
                outer_log.borrow_mut().push(100 + r.frame.frame_index);
                return Ok(Step::Done);
            }
            waiting = true;
            let inner = r.scheduler.start(counter(inner_log.clone(), 1));
            Ok(Step::Await(inner.completion()))
        }));
        for i in 0..4 {
            sched.tick(&frame(i)).unwrap();
        }
        // Inner runs on frames 1 and 2; outer resumes in frame 2 right after.
        assert_eq!(*log.borrow(), vec![1, 2, 102]);
        assert_eq!(outer.state(), CoroutineState::Completed);
    }

    #[test]
    fn nested_failure_fails_the_waiter() {
        let sched = Scheduler::new();
        let hook_ran = Rc::new(Cell::new(false));
        let flag = hook_ran.clone();
        let mut step = 0;
        let outer = sched.start(from_fn(move |r: Resume<'_>| {
            step += 1;
            match step {
                1 => {
                    let flag = flag.clone();
                    Ok(Step::Await(on_dispose(move || flag.set(true))))
                }
                2 => {
                    let inner = r.scheduler.start_with(
                        CoroutineOptions {
                            name: Some("inner".into()),
                            signal: None,
                        },
                        from_fn(|_r: Resume<'_>| Err(Message::boxed("boom"))),
                    );
                    Ok(Step::Await(inner.completion()))
                }
                _ => Ok(Step::Done),
            }
        }));
        sched.tick(&frame(0)).unwrap();
        assert_eq!(sched.len(), 2);

        let err = sched.tick(&frame(1)).unwrap_err();
        assert!(
            matches!(&err, FrameError::Coroutine { name, .. } if name == "inner"),
            "unexpected error: {err:?}"
        );
        assert_eq!(outer.state(), CoroutineState::Failed);
        assert!(hook_ran.get(), "the waiting coroutine ran its dispose hooks");
        assert!(sched.is_empty(), "no coroutine is left running");

        sched.tick(&frame(2)).unwrap();
        assert_eq!(outer.state(), CoroutineState::Failed);
    }

    #[test]
    #[should_panic(expected = "already taken")]
    fn completion_has_one_driver() {
        let sched = Scheduler::new();
        let handle = sched.start(from_fn(|_r: Resume<'_>| Ok(Step::Done)));
        let _first = handle.completion();
        let _second = handle.completion();
    }

    #[test]
    fn first_of_disposes_losers() {
        let sched = Scheduler::new();
        let resumed = Rc::new(RefCell::new(None));
        let out = resumed.clone();
        let loser_hook = Rc::new(Cell::new(false));
        let hook_flag = loser_hook.clone();
        let mut armed = false;
        sched.start(from_fn(move |r: Resume<'_>| {
            if armed {
                *out.borrow_mut() = Some((r.frame.frame_index, r.data.into_first_of().map(|d| d.0)));
                return Ok(Step::Done);
            }
            armed = true;
            let flag = hook_flag.clone();
            let mut registered = false;
            let loser = r.scheduler.start(from_fn(move |_r: Resume<'_>| {
                if registered {
                    return Ok(Step::Await(delay(Duration::from_millis(10_000))));
                }
                registered = true;
                let flag = flag.clone();
                Ok(Step::Await(on_dispose(move || flag.set(true))))
            }));
            Ok(Step::Await(first_of(vec![
                loser.completion(),
                delay(Duration::from_millis(32)),
            ])))
        }));
        for i in 0..4 {
            sched.tick(&frame(i)).unwrap();
        }
        assert_eq!(*resumed.borrow(), Some((2, Some(1))));
        assert!(loser_hook.get(), "the losing nested coroutine was disposed");
        assert!(sched.is_empty());
    }

    #[test]
    fn stats_count_lifecycle() {
        let sched = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        sched.start(counter(log.clone(), 0));
        let doomed = sched.start(counter(log, 5));
        sched.tick(&frame(0)).unwrap();
        let stats = sched.last_tick_stats();
        assert_eq!(stats.started, 2);
        assert_eq!(stats.resumed, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 1);
        doomed.cancel();
        sched.tick(&frame(1)).unwrap();
        assert_eq!(sched.last_tick_stats().active, 0);
    }
}
