// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Awaiter constructors.
//!
//! Input awaiters are edge-triggered on the frame's `pressed`/`released`
//! flags. Region awaiters are level-triggered: [`mouse_entered`] is ready on
//! the first evaluation where the pointer is inside the region.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::awaiter::{Awaiter, Completer, HitRegion, Kind};
use crate::input::{FrameContext, MouseButton};
use crate::time::Duration;

/// Ready on the next evaluation, i.e. the next frame.
#[must_use]
pub fn next_tick() -> Awaiter {
    Awaiter::from_kind(Kind::NextTick)
}

/// Ready once the accumulated frame deltas reach `duration`.
#[must_use]
pub fn delay(duration: Duration) -> Awaiter {
    Awaiter::from_kind(Kind::Delay {
        duration,
        elapsed: Duration::ZERO,
    })
}

/// Ready on the first frame for which `condition` returns `true`.
pub fn check(condition: impl FnMut(&FrameContext) -> bool + 'static) -> Awaiter {
    Awaiter::from_kind(Kind::Check(Box::new(condition)))
}

/// Ready when `button` goes down. Resumes with the pointer position.
#[must_use]
pub fn mouse_pressed(button: MouseButton) -> Awaiter {
    Awaiter::from_kind(Kind::MousePressed(button))
}

/// Ready when `button` goes up. Resumes with the pointer position.
#[must_use]
pub fn mouse_released(button: MouseButton) -> Awaiter {
    Awaiter::from_kind(Kind::MouseReleased(button))
}

/// Shorthand for `mouse_pressed(MouseButton::Left)`.
#[must_use]
pub fn left_mouse_pressed() -> Awaiter {
    mouse_pressed(MouseButton::Left)
}

/// Shorthand for `mouse_released(MouseButton::Left)`.
#[must_use]
pub fn left_mouse_released() -> Awaiter {
    mouse_released(MouseButton::Left)
}

/// Ready when the key with physical `code` goes down.
#[must_use]
pub fn key_pressed(code: &str) -> Awaiter {
    Awaiter::from_kind(Kind::KeyPressed(code.into()))
}

/// Ready when the key with physical `code` goes up.
#[must_use]
pub fn key_released(code: &str) -> Awaiter {
    Awaiter::from_kind(Kind::KeyReleased(code.into()))
}

/// Ready when any key goes down.
#[must_use]
pub fn any_key_pressed() -> Awaiter {
    Awaiter::from_kind(Kind::AnyKeyPressed)
}

/// Ready when a key other than `code` goes down.
#[must_use]
pub fn other_key_pressed(code: &str) -> Awaiter {
    Awaiter::from_kind(Kind::OtherKeyPressed(code.into()))
}

/// Ready when the pointer is inside `region`.
pub fn mouse_entered(region: impl HitRegion + 'static) -> Awaiter {
    Awaiter::from_kind(Kind::Entered(Box::new(region)))
}

/// Ready when the pointer is outside `region`.
pub fn mouse_exited(region: impl HitRegion + 'static) -> Awaiter {
    Awaiter::from_kind(Kind::Exited(Box::new(region)))
}

/// Ready as soon as one child is.
///
/// Children are evaluated in argument order and evaluation stops at the
/// first ready one, so earlier arguments win ties. The coroutine resumes
/// with [`AwaitData::FirstOf`](super::AwaitData::FirstOf); every other child
/// is disposed before the tick continues.
#[must_use]
pub fn first_of(children: Vec<Awaiter>) -> Awaiter {
    Awaiter::from_kind(Kind::FirstOf(children))
}

/// Ready once every child is.
///
/// Resumes with [`AwaitData::AllOf`](super::AwaitData::AllOf), aborted if
/// any child aborted.
#[must_use]
pub fn all_of(children: Vec<Awaiter>) -> Awaiter {
    Awaiter::from_kind(Kind::AllOf(
        children.into_iter().map(|c| (c, None)).collect(),
    ))
}

/// Registers `hook` to run if the awaiting coroutine is disposed.
///
/// The body is resumed again in the same tick. Hooks run in reverse
/// registration order and do not run when the coroutine completes normally.
///
/// # Panics
///
/// Evaluating this awaiter inside [`first_of`] or [`all_of`] panics.
pub fn on_dispose(hook: impl FnOnce() + 'static) -> Awaiter {
    Awaiter::from_kind(Kind::OnDispose(Some(Box::new(hook))))
}

/// An awaiter resolved from outside the frame loop.
///
/// The coroutine resumes with
/// [`AwaitData::Value`](super::AwaitData::Value) on the first frame after
/// [`Completer::complete`], or aborted after [`Completer::fail`].
#[must_use]
pub fn pending<T: 'static>() -> (Completer<T>, Awaiter) {
    Completer::new()
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    use kurbo::{Point, Rect};

    use super::*;
    use crate::coroutine::{AwaitData, CoroutineHandle, Resume, Scheduler, Step, from_fn};
    use crate::input::FrameContextFactory;
    use crate::time::HostTime;

    /// Drives a scheduler through frames produced by a real factory.
    struct Harness {
        factory: FrameContextFactory,
        scheduler: Scheduler,
        now: u64,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                factory: FrameContextFactory::default(),
                scheduler: Scheduler::new(),
                now: 0,
            }
        }

        fn frame(&mut self) -> u64 {
            let frame = self.factory.next_frame(HostTime(self.now));
            self.now += 16_000;
            self.scheduler.tick(&frame).unwrap();
            frame.dispose();
            frame.frame_index
        }
    }

    /// Starts a coroutine that awaits `make()` once and records the frame
    /// it resumed on plus whether it was aborted.
    fn await_once(
        scheduler: &Scheduler,
        make: impl FnOnce() -> Awaiter + 'static,
    ) -> (CoroutineHandle, Rc<RefCell<Option<(u64, bool, AwaitData)>>>) {
        let out = Rc::new(RefCell::new(None));
        let sink = out.clone();
        let mut make = Some(make);
        let handle = scheduler.start(from_fn(move |r: Resume<'_>| match make.take() {
            Some(make) => Ok(Step::Await(make())),
            None => {
                *sink.borrow_mut() = Some((r.frame.frame_index, r.aborted, r.data));
                Ok(Step::Done)
            }
        }));
        (handle, out)
    }

    /// A nested coroutine that completes on its `n`th resume.
    fn finishes_after(scheduler: &Scheduler, n: u32, disposed: Rc<Cell<u32>>) -> Awaiter {
        let mut seen = 0;
        let mut hooked = false;
        let handle = scheduler.start(from_fn(move |_r: Resume<'_>| {
            if !hooked {
                hooked = true;
                let disposed = disposed.clone();
                return Ok(Step::Await(on_dispose(move || {
                    disposed.set(disposed.get() + 1);
                })));
            }
            seen += 1;
            if seen >= n {
                Ok(Step::Done)
            } else {
                Ok(Step::Await(next_tick()))
            }
        }));
        handle.completion()
    }

    #[test]
    fn delay_accumulates_frame_deltas() {
        let mut h = Harness::new();
        let (_handle, out) = await_once(&h.scheduler, || delay(Duration::from_millis(40)));
        // Frame 0 suspends; deltas of 16 ms accumulate from frame 1 on.
        for _ in 0..4 {
            h.frame();
        }
        let (frame, aborted, _) = out.borrow_mut().take().unwrap();
        assert_eq!(frame, 3, "16 + 16 + 16 >= 40 on the third evaluation");
        assert!(!aborted);
    }

    #[test]
    fn first_of_resumes_with_earliest_and_disposes_nested_losers() {
        let mut h = Harness::new();
        let disposed = Rc::new(Cell::new(0));
        let sched = h.scheduler.clone();
        let hooks = disposed.clone();
        let (_handle, out) = await_once(&h.scheduler, move || {
            first_of(vec![
                finishes_after(&sched, 3, hooks.clone()),
                finishes_after(&sched, 5, hooks.clone()),
                finishes_after(&sched, 2, hooks),
            ])
        });
        // Frame 0 suspends on first_of; the nested coroutines are first
        // resumed on frame 1 and the third completes on its second resume.
        for _ in 0..6 {
            h.frame();
        }
        let (frame, aborted, data) = out.borrow_mut().take().unwrap();
        assert_eq!(frame, 2);
        assert!(!aborted);
        let (index, _) = data.into_first_of().unwrap();
        assert_eq!(index, 2);
        assert_eq!(disposed.get(), 2, "both losers were force-disposed");
        assert!(h.scheduler.is_empty());
    }

    #[test]
    fn first_of_prefers_argument_order_on_ties() {
        let mut h = Harness::new();
        let (_handle, out) = await_once(&h.scheduler, || {
            first_of(vec![delay(Duration::from_millis(5)), next_tick()])
        });
        h.frame();
        h.frame();
        let (_, _, data) = out.borrow_mut().take().unwrap();
        assert_eq!(data.into_first_of().map(|(i, _)| i), Some(0));
    }

    #[test]
    fn all_of_waits_for_every_child() {
        let mut h = Harness::new();
        let (_handle, out) = await_once(&h.scheduler, || {
            all_of(vec![next_tick(), delay(Duration::from_millis(32))])
        });
        for _ in 0..4 {
            h.frame();
        }
        let (frame, aborted, data) = out.borrow_mut().take().unwrap();
        assert_eq!(frame, 2);
        assert!(!aborted);
        match data {
            AwaitData::AllOf(all) => assert_eq!(all.len(), 2),
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn key_awaiters_report_the_key() {
        let mut h = Harness::new();
        let (_a, pressed) = await_once(&h.scheduler, || key_pressed("KeyZ"));
        let (_b, other) = await_once(&h.scheduler, || other_key_pressed("KeyZ"));
        h.frame();
        h.factory.key_down("KeyZ", "z");
        h.frame();
        assert!(pressed.borrow().is_some());
        assert!(other.borrow().is_none(), "the excluded key does not count");

        h.factory.key_down("KeyX", "x");
        h.frame();
        let (_, _, data) = other.borrow_mut().take().unwrap();
        assert_eq!(data.key().map(|k| k.key.clone()), Some(String::from("x")));
    }

    #[test]
    fn region_awaiters_follow_the_pointer() {
        let mut h = Harness::new();
        let region = Rect::new(10.0, 10.0, 20.0, 20.0);
        let (_a, entered) = await_once(&h.scheduler, move || mouse_entered(region));
        h.frame();
        h.frame();
        assert!(entered.borrow().is_none());
        h.factory.mouse_move(Point::new(15.0, 15.0));
        h.frame();
        let (_, _, data) = entered.borrow_mut().take().unwrap();
        assert_eq!(data.position(), Some(Point::new(15.0, 15.0)));

        let (_b, exited) = await_once(&h.scheduler, move || mouse_exited(region));
        h.frame();
        h.frame();
        assert!(exited.borrow().is_none());
        h.factory.mouse_move(Point::new(50.0, 15.0));
        h.frame();
        assert!(exited.borrow().is_some());
    }

    #[test]
    fn mouse_edges() {
        let mut h = Harness::new();
        let (_a, out) = await_once(&h.scheduler, left_mouse_released);
        h.frame();
        h.factory.mouse_down(MouseButton::Left);
        h.frame();
        assert!(out.borrow().is_none());
        h.factory.mouse_up(MouseButton::Left);
        h.frame();
        assert!(out.borrow().is_some());
    }

    #[test]
    fn pending_completes_with_value() {
        let mut h = Harness::new();
        let (completer, awaiter) = pending::<u32>();
        let mut awaiter = Some(awaiter);
        let (_handle, out) = await_once(&h.scheduler, move || awaiter.take().unwrap());
        h.frame();
        h.frame();
        assert!(out.borrow().is_none());
        completer.complete(7);
        h.frame();
        let (_, aborted, data) = out.borrow_mut().take().unwrap();
        assert!(!aborted);
        assert_eq!(data.into_value::<u32>(), Some(7));
    }

    #[test]
    fn pending_failure_resumes_aborted() {
        let mut h = Harness::new();
        let (completer, awaiter) = pending::<()>();
        let mut awaiter = Some(awaiter);
        let (_handle, out) = await_once(&h.scheduler, move || awaiter.take().unwrap());
        h.frame();
        completer.fail("image decode failed");
        h.frame();
        let (_, aborted, _) = out.borrow_mut().take().unwrap();
        assert!(aborted);
    }

    #[test]
    fn check_sees_frame_state() {
        let mut h = Harness::new();
        let (_handle, out) = await_once(&h.scheduler, || check(|f| f.frame_index >= 3));
        for _ in 0..5 {
            h.frame();
        }
        assert_eq!(out.borrow().as_ref().map(|o| o.0), Some(3));
    }

    #[test]
    fn dropping_a_completion_awaiter_disposes_the_coroutine() {
        let sched = Scheduler::new();
        let disposed = Rc::new(Cell::new(0));
        let awaiter = finishes_after(&sched, 10, disposed.clone());
        let mut factory = FrameContextFactory::default();
        let frame = factory.next_frame(HostTime(0));
        sched.tick(&frame).unwrap();
        // Never evaluated, so the hook was never registered.
        awaiter.dispose();
        assert_eq!(disposed.get(), 0);
        let frame = factory.next_frame(HostTime(16_000));
        sched.tick(&frame).unwrap();
        assert!(sched.is_empty());
    }
}
