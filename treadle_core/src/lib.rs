// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-synchronous coroutines and a retained component engine for
//! canvas-style applications.
//!
//! `treadle_core` is `no_std` compatible (with `alloc`). It turns a stream
//! of raw host events and animation-frame callbacks into per-frame work:
//!
//! ```text
//!   host events ──► FrameContextFactory ──► FrameContext (one per frame)
//!                                               │
//!                 ┌─────────────────────────────┘
//!                 ▼
//!   Scheduler::tick ── resumes coroutines whose awaiter is ready
//!                 │        (coroutines mutate component properties)
//!                 ▼
//!   ComponentTree::handle_batched_updates ── size negotiation, positions
//!                 │
//!                 ▼
//!   ComponentTree::render ── redraw dirty bitmaps, children first
//!                 │
//!                 ▼
//!   FrameHandler::present ── composed image to the host surface
//! ```
//!
//! **[`input`]** — Raw event intake and immutable per-frame snapshots with
//! press/release edge detection.
//!
//! **[`coroutine`]** — Cooperative coroutines that suspend on awaiters and
//! advance at most once per frame, with first-of/all-of combinators and
//! cancellation hooks.
//!
//! **[`component`]** — Struct-of-arrays component tree with a batched
//! size-request / allocation / positioning protocol, per-component bitmaps,
//! hit testing, and colliders.
//!
//! **[`batch`]** — Deduplicating keyed queue used for deferred layout work.
//!
//! **[`dirty`]** — Render invalidation via `understory_dirty`. Marking a
//! component marks its ancestors.
//!
//! **[`render_loop`]** — The per-frame driver and its failure latch.
//!
//! **[`geometry`]** — Size helpers over `kurbo` and shared point storage.
//!
//! **[`time`]** — Microsecond host time and durations.
//!
//! **[`error`]** — [`FrameError`](error::FrameError), the recoverable
//! per-frame failure.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-component
//!   render events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod batch;
pub mod component;
pub mod coroutine;
pub mod dirty;
pub mod error;
pub mod geometry;
pub mod input;
pub mod render_loop;
pub mod time;
pub mod trace;
