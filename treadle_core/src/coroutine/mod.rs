// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-synchronous cooperative coroutines.
//!
//! A coroutine is a resumable state machine ([`CoroutineBody`]) that
//! suspends on an [`Awaiter`]. Once per frame, [`Scheduler::tick`] evaluates
//! the awaiter of every active coroutine against that frame's
//! [`FrameContext`](crate::input::FrameContext) and resumes the bodies whose
//! awaiter became ready, so a coroutine advances at most one step per frame.
//!
//! ```text
//!   Scheduler::start(body) ──► started list
//!                                  │ merged at the next tick
//!                                  ▼
//!   tick(frame) ──► for each root-driven coroutine:
//!                      awaiter.poll(frame) ── Pending ──► stay suspended
//!                            │
//!                      Ready / Aborted
//!                            ▼
//!                      body.resume(frame, data) ──► Step::Await(next) / Step::Done
//! ```
//!
//! Awaiters are built with the constructors in [`awaiters`]. A coroutine can
//! wait on another coroutine through [`CoroutineHandle::completion`]; the
//! nested coroutine is then advanced by the awaiter that holds it rather
//! than by the root tick, and disposing that awaiter disposes it.
//!
//! Cancellation is cooperative: [`CoroutineHandle::cancel`] disposes the
//! coroutine, running the hooks it registered with
//! [`awaiters::on_dispose`] in reverse order.

mod awaiter;
pub mod awaiters;
mod scheduler;

pub use awaiter::{Await, AwaitData, Awaiter, Completer, HitRegion, Readiness};
pub use scheduler::{
    CancelSignal, CoroutineBody, CoroutineHandle, CoroutineId, CoroutineOptions, CoroutineState,
    FnBody, Resume, Scheduler, Step, TickStats, from_fn,
};
