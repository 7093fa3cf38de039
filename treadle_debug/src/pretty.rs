// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in milliseconds.

use std::io::Write;

use treadle_core::component::ComponentId;
use treadle_core::time::HostTime;
use treadle_core::trace::{
    BatchFlushEvent, CoroutineTickEvent, FailureEvent, FrameSummary, FrameTickEvent,
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, RenderPassEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn ms(t: HostTime) -> f64 {
    t.ticks() as f64 / 1000.0
}

fn ticks_ms(ticks: u64) -> f64 {
    ticks as f64 / 1000.0
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Input => "input",
        PhaseKind::Coroutines => "coro",
        PhaseKind::Draw => "draw",
        PhaseKind::Layout => "layout",
        PhaseKind::Render => "render",
        PhaseKind::Present => "present",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] frame={} now={:.3}ms delta={}µs fps={:.1}",
            e.frame_index,
            ms(e.now),
            e.delta.ticks(),
            e.fps,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.3}ms",
            e.frame_index,
            phase_name(e.phase),
            ms(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.3}ms",
            e.frame_index,
            phase_name(e.phase),
            ms(e.timestamp),
        );
    }

    fn on_coroutine_tick(&mut self, e: &CoroutineTickEvent) {
        let s = e.stats;
        let _ = writeln!(
            self.writer,
            "[coro] frame={} started={} resumed={} completed={} disposed={} active={}",
            e.frame_index, s.started, s.resumed, s.completed, s.disposed, s.active,
        );
    }

    fn on_batch_flush(&mut self, e: &BatchFlushEvent) {
        let _ = writeln!(
            self.writer,
            "[layout] frame={} tree={} tasks={}",
            e.frame_index, e.tree, e.tasks,
        );
    }

    fn on_render_pass(&mut self, e: &RenderPassEvent) {
        let _ = writeln!(
            self.writer,
            "[render] frame={} tree={} rendered={}",
            e.frame_index, e.tree, e.rendered,
        );
    }

    fn on_failure(&mut self, e: &FailureEvent) {
        let _ = writeln!(
            self.writer,
            "[FAILURE] frame={} kind={:?}",
            e.frame_index, e.kind,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let status = if s.failed { "FAILED" } else { "ok" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} input={:.3}ms coro={:.3}ms draw={:.3}ms layout={:.3}ms \
             render={:.3}ms present={:.3}ms tasks={} rendered={} status={status}",
            s.frame_index,
            ticks_ms(s.input_ticks),
            ticks_ms(s.coroutine_ticks),
            ticks_ms(s.draw_ticks),
            ticks_ms(s.layout_ticks),
            ticks_ms(s.render_ticks),
            ticks_ms(s.present_ticks),
            s.layout_tasks,
            s.rendered,
        );
    }

    fn on_components_rendered(&mut self, frame_index: u64, tree: usize, ids: &[ComponentId]) {
        let ids: Vec<u32> = ids.iter().map(|id| id.index()).collect();
        let _ = writeln!(
            self.writer,
            "[components] frame={frame_index} tree={tree} ids={ids:?}",
        );
    }
}
