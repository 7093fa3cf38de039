// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the [`RenderLoop`](crate::render_loop::RenderLoop) calls at each stage.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] is a convenience helper that collects phase
//! timestamps during a frame and produces a [`FrameSummary`] at the end.
//!
//! Diagnostic *logging* goes through the `tracing` crate instead; this
//! module is for structured, per-frame timing data.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates per-component render events and
//!   the corresponding `TraceSink` method.

use crate::coroutine::TickStats;
use crate::error::FrameError;
use crate::input::FrameContext;
use crate::time::{Duration, HostTime};

#[cfg(feature = "trace-rich")]
use crate::component::ComponentId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the frame loop is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Snapshotting input into a frame context.
    Input,
    /// Advancing coroutines.
    Coroutines,
    /// The host's draw handler.
    Draw,
    /// Flushing batched layout work.
    Layout,
    /// Redrawing component bitmaps.
    Render,
    /// Handing the composed images to the host.
    Present,
}

/// What kind of failure latched the render loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A coroutine body failed.
    Coroutine,
    /// A component failed to render.
    Render,
    /// The draw handler failed.
    Draw,
}

impl From<&FrameError> for FailureKind {
    fn from(error: &FrameError) -> Self {
        match error {
            FrameError::Coroutine { .. } => Self::Coroutine,
            FrameError::Render { .. } => Self::Render,
            FrameError::Draw(_) => Self::Draw,
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a frame starts processing.
#[derive(Clone, Copy, Debug)]
pub struct FrameTickEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Host time of the frame.
    pub now: HostTime,
    /// Time since the previous frame.
    pub delta: Duration,
    /// Smoothed frames per second.
    pub fps: f64,
}

impl From<&FrameContext> for FrameTickEvent {
    fn from(frame: &FrameContext) -> Self {
        Self {
            frame_index: frame.frame_index,
            now: frame.now,
            delta: frame.delta,
            fps: frame.smoothed_fps,
        }
    }
}

/// Marks the beginning of a frame-loop phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a frame-loop phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted after the coroutine scheduler ticked.
#[derive(Clone, Copy, Debug)]
pub struct CoroutineTickEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Lifecycle counters of the tick.
    pub stats: TickStats,
}

/// Emitted after a component tree flushed its batched layout work.
#[derive(Clone, Copy, Debug)]
pub struct BatchFlushEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Index of the tree in the render loop.
    pub tree: usize,
    /// Number of layout steps that ran.
    pub tasks: usize,
}

/// Emitted after a component tree's render pass.
#[derive(Clone, Copy, Debug)]
pub struct RenderPassEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Index of the tree in the render loop.
    pub tree: usize,
    /// Number of components redrawn.
    pub rendered: usize,
}

/// Emitted once when a failure latches the render loop.
#[derive(Clone, Copy, Debug)]
pub struct FailureEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// What failed.
    pub kind: FailureKind,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time of the frame.
    pub now: HostTime,
    /// Time since the previous frame.
    pub delta: Duration,
    /// Input phase duration in ticks (0 if not measured).
    pub input_ticks: u64,
    /// Coroutine phase duration in ticks (0 if not measured).
    pub coroutine_ticks: u64,
    /// Draw phase duration in ticks (0 if not measured).
    pub draw_ticks: u64,
    /// Layout phase duration in ticks (0 if not measured).
    pub layout_ticks: u64,
    /// Render phase duration in ticks (0 if not measured).
    pub render_ticks: u64,
    /// Present phase duration in ticks (0 if not measured).
    pub present_ticks: u64,
    /// Layout steps run across all trees.
    pub layout_tasks: usize,
    /// Components redrawn across all trees.
    pub rendered: usize,
    /// Whether the frame latched a failure.
    pub failed: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame starts processing.
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame-loop phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame-loop phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after the coroutine scheduler ticked.
    fn on_coroutine_tick(&mut self, e: &CoroutineTickEvent) {
        _ = e;
    }

    /// Called after a tree flushed its batched layout work.
    fn on_batch_flush(&mut self, e: &BatchFlushEvent) {
        _ = e;
    }

    /// Called after a tree's render pass.
    fn on_render_pass(&mut self, e: &RenderPassEvent) {
        _ = e;
    }

    /// Called when a failure latches the render loop.
    fn on_failure(&mut self, e: &FailureEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with the components a tree redrew, children first (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_components_rendered(&mut self, frame_index: u64, tree: usize, ids: &[ComponentId]) {
        _ = (frame_index, tree, ids);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Generates a `Tracer` method forwarding one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident => $sink_method:ident($ty:ty)) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$sink_method(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    forward!(
        /// Emits a [`FrameTickEvent`].
        frame_tick => on_frame_tick(FrameTickEvent)
    );
    forward!(
        /// Emits a [`PhaseBeginEvent`].
        phase_begin => on_phase_begin(PhaseBeginEvent)
    );
    forward!(
        /// Emits a [`PhaseEndEvent`].
        phase_end => on_phase_end(PhaseEndEvent)
    );
    forward!(
        /// Emits a [`CoroutineTickEvent`].
        coroutine_tick => on_coroutine_tick(CoroutineTickEvent)
    );
    forward!(
        /// Emits a [`BatchFlushEvent`].
        batch_flush => on_batch_flush(BatchFlushEvent)
    );
    forward!(
        /// Emits a [`RenderPassEvent`].
        render_pass => on_render_pass(RenderPassEvent)
    );
    forward!(
        /// Emits a [`FailureEvent`].
        failure => on_failure(FailureEvent)
    );
    forward!(
        /// Emits a [`FrameSummary`].
        frame_summary => on_frame_summary(FrameSummary)
    );

    /// Emits the components a tree redrew (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn components_rendered(&mut self, frame_index: u64, tree: usize, ids: &[ComponentId]) {
        if let Some(s) = &mut self.sink {
            s.on_components_rendered(frame_index, tree, ids);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

const PHASES: usize = 6;

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    tick: FrameTickEvent,
    phase_starts: [Option<HostTime>; PHASES],
    phase_ends: [Option<HostTime>; PHASES],
    layout_tasks: usize,
    rendered: usize,
    failed: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given tick.
    #[must_use]
    pub fn new(tick: &FrameTickEvent) -> Self {
        Self {
            tick: *tick,
            phase_starts: [None; PHASES],
            phase_ends: [None; PHASES],
            layout_tasks: 0,
            rendered: 0,
            failed: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Adds layout steps run by one tree.
    pub fn add_layout_tasks(&mut self, tasks: usize) {
        self.layout_tasks += tasks;
    }

    /// Adds components redrawn by one tree.
    pub fn add_rendered(&mut self, rendered: usize) {
        self.rendered += rendered;
    }

    /// Sets whether the frame latched a failure.
    pub fn set_failed(&mut self, failed: bool) {
        self.failed = failed;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.tick.frame_index,
            now: self.tick.now,
            delta: self.tick.delta,
            input_ticks: self.phase_duration(PhaseKind::Input),
            coroutine_ticks: self.phase_duration(PhaseKind::Coroutines),
            draw_ticks: self.phase_duration(PhaseKind::Draw),
            layout_ticks: self.phase_duration(PhaseKind::Layout),
            render_ticks: self.phase_duration(PhaseKind::Render),
            present_ticks: self.phase_duration(PhaseKind::Present),
            layout_tasks: self.layout_tasks,
            rendered: self.rendered,
            failed: self.failed,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).ticks(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Input => 0,
        PhaseKind::Coroutines => 1,
        PhaseKind::Draw => 2,
        PhaseKind::Layout => 3,
        PhaseKind::Render => 4,
        PhaseKind::Present => 5,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Message;

    fn sample_tick() -> FrameTickEvent {
        FrameTickEvent {
            frame_index: 42,
            now: HostTime(1_000_000),
            delta: Duration::from_millis(16),
            fps: 60.0,
        }
    }

    #[test]
    fn frame_tick_event_from_frame_context() {
        let frame = FrameContext::new(7, HostTime(100), Duration::from_micros(50));
        let evt = FrameTickEvent::from(&frame);
        assert_eq!(evt.frame_index, 7);
        assert_eq!(evt.now, HostTime(100));
        assert_eq!(evt.delta, Duration::from_micros(50));
    }

    #[test]
    fn failure_kind_from_error() {
        let err = FrameError::Draw(Message::boxed("no surface"));
        assert_eq!(FailureKind::from(&err), FailureKind::Draw);
        let err = FrameError::Render {
            name: "Label".into(),
            source: Message::boxed("glyph"),
        };
        assert_eq!(FailureKind::from(&err), FailureKind::Render);
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_frame_tick(&sample_tick());
        sink.on_coroutine_tick(&CoroutineTickEvent {
            frame_index: 42,
            stats: TickStats::default(),
        });
        sink.on_frame_summary(&FrameSummaryBuilder::new(&sample_tick()).finish());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_tick(&sample_tick());
        tracer.batch_flush(&BatchFlushEvent {
            frame_index: 42,
            tree: 0,
            tasks: 3,
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(&sample_tick());

        builder.phase_begin(PhaseKind::Input, HostTime(1_000_000));
        builder.phase_end(PhaseKind::Input, HostTime(1_000_010));
        builder.phase_begin(PhaseKind::Coroutines, HostTime(1_000_010));
        builder.phase_end(PhaseKind::Coroutines, HostTime(1_000_110));
        builder.phase_begin(PhaseKind::Layout, HostTime(1_000_200));
        builder.phase_end(PhaseKind::Layout, HostTime(1_000_600));
        builder.phase_begin(PhaseKind::Render, HostTime(1_000_600));
        builder.phase_end(PhaseKind::Render, HostTime(1_002_100));
        builder.add_layout_tasks(4);
        builder.add_layout_tasks(2);
        builder.add_rendered(3);

        let summary = builder.finish();
        assert_eq!(summary.input_ticks, 10);
        assert_eq!(summary.coroutine_ticks, 100);
        assert_eq!(summary.layout_ticks, 400);
        assert_eq!(summary.render_ticks, 1500);
        assert_eq!(summary.draw_ticks, 0, "draw was not measured");
        assert_eq!(summary.layout_tasks, 6);
        assert_eq!(summary.rendered, 3);
        assert!(!summary.failed);
        assert_eq!(summary.frame_index, 42);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            ticks: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_frame_tick(&mut self, e: &FrameTickEvent) {
                self.ticks.push(e.frame_index);
            }
        }

        let mut sink = RecordingSink { ticks: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame_tick(&sample_tick());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.ticks, &[42]);
    }
}
