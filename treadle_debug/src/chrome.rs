// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format export.
//!
//! [`ChromeTraceSink`] implements [`TraceSink`], collects events in memory,
//! and writes them as [Chrome Trace Event Format][format] JSON.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use treadle_core::component::ComponentId;
use treadle_core::trace::{
    BatchFlushEvent, CoroutineTickEvent, FailureEvent, FrameSummary, FrameTickEvent,
    PhaseBeginEvent, PhaseEndEvent, RenderPassEvent, TraceSink,
};

/// Collects trace events as Chrome Trace Event Format objects.
///
/// The output of [`write`](Self::write) is a complete JSON array, suitable
/// for loading into `chrome://tracing` or
/// [Perfetto](https://ui.perfetto.dev/). Host times are already
/// microseconds, the format's native unit.
///
/// Counter-style events (coroutine stats, layout and render counts) carry
/// the timestamp of the frame they belong to.
#[derive(Debug, Default)]
pub struct ChromeTraceSink {
    events: Vec<Value>,
    now: u64,
}

impl ChromeTraceSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected events.
    #[must_use]
    pub fn events(&self) -> &[Value] {
        &self.events
    }

    /// Writes the collected events as a JSON array.
    pub fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.events)?;
        Ok(())
    }

    fn instant(&mut self, name: &str, cat: &str, scope: &str, args: Value) {
        self.events.push(json!({
            "ph": "i",
            "name": name,
            "cat": cat,
            "ts": self.now,
            "pid": 0,
            "tid": 0,
            "s": scope,
            "args": args,
        }));
    }

    fn counter(&mut self, name: &str, args: Value) {
        self.events.push(json!({
            "ph": "C",
            "name": name,
            "ts": self.now,
            "pid": 0,
            "tid": 0,
            "args": args,
        }));
    }
}

impl TraceSink for ChromeTraceSink {
    fn on_frame_tick(&mut self, e: &FrameTickEvent) {
        self.now = e.now.ticks();
        self.instant(
            "FrameTick",
            "Frame",
            "g",
            json!({
                "frame_index": e.frame_index,
                "delta_us": e.delta.ticks(),
                "fps": e.fps,
            }),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.now = e.timestamp.ticks();
        self.events.push(json!({
            "ph": "B",
            "name": format!("{:?}", e.phase),
            "cat": "Frame",
            "ts": e.timestamp.ticks(),
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.now = e.timestamp.ticks();
        self.events.push(json!({
            "ph": "E",
            "name": format!("{:?}", e.phase),
            "cat": "Frame",
            "ts": e.timestamp.ticks(),
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }));
    }

    fn on_coroutine_tick(&mut self, e: &CoroutineTickEvent) {
        self.counter(
            "Coroutines",
            json!({
                "active": e.stats.active,
                "resumed": e.stats.resumed,
            }),
        );
    }

    fn on_batch_flush(&mut self, e: &BatchFlushEvent) {
        self.counter(
            &format!("Layout tree {}", e.tree),
            json!({ "tasks": e.tasks }),
        );
    }

    fn on_render_pass(&mut self, e: &RenderPassEvent) {
        self.counter(
            &format!("Render tree {}", e.tree),
            json!({ "rendered": e.rendered }),
        );
    }

    fn on_failure(&mut self, e: &FailureEvent) {
        self.instant(
            "Failure",
            "Frame",
            "g",
            json!({
                "frame_index": e.frame_index,
                "kind": format!("{:?}", e.kind),
            }),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.instant(
            "FrameSummary",
            "Summary",
            "g",
            json!({
                "frame_index": s.frame_index,
                "input_us": s.input_ticks,
                "coroutine_us": s.coroutine_ticks,
                "draw_us": s.draw_ticks,
                "layout_us": s.layout_ticks,
                "render_us": s.render_ticks,
                "present_us": s.present_ticks,
                "layout_tasks": s.layout_tasks,
                "rendered": s.rendered,
                "failed": s.failed,
            }),
        );
    }

    fn on_components_rendered(&mut self, frame_index: u64, tree: usize, ids: &[ComponentId]) {
        let ids: Vec<u32> = ids.iter().map(|id| id.index()).collect();
        self.instant(
            "ComponentsRendered",
            "Rich",
            "p",
            json!({
                "frame_index": frame_index,
                "tree": tree,
                "ids": ids,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use treadle_core::time::{Duration, HostTime};
    use treadle_core::trace::PhaseKind;

    use super::*;

    #[test]
    fn export_produces_valid_json() {
        let mut sink = ChromeTraceSink::new();
        sink.on_frame_tick(&FrameTickEvent {
            frame_index: 0,
            now: HostTime(1_000),
            delta: Duration::ZERO,
            fps: 0.0,
        });
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Layout,
            timestamp: HostTime(1_000),
        });
        sink.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::Layout,
            timestamp: HostTime(1_100),
        });

        let mut out = Vec::new();
        sink.write(&mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        // First event is an instant FrameTick.
        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "FrameTick");

        // Then a matched begin/end pair.
        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "Layout");
        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 1_100);
    }

    #[test]
    fn counters_use_the_frame_time() {
        let mut sink = ChromeTraceSink::new();
        sink.on_frame_tick(&FrameTickEvent {
            frame_index: 4,
            now: HostTime(64_000),
            delta: Duration::from_millis(16),
            fps: 62.5,
        });
        sink.on_render_pass(&RenderPassEvent {
            frame_index: 4,
            tree: 1,
            rendered: 3,
        });
        let render = &sink.events()[1];
        assert_eq!(render["ph"], "C");
        assert_eq!(render["name"], "Render tree 1");
        assert_eq!(render["ts"], 64_000);
        assert_eq!(render["args"]["rendered"], 3);
    }

    #[test]
    fn export_empty() {
        let mut out = Vec::new();
        ChromeTraceSink::new().write(&mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&String::from_utf8(out).unwrap()).unwrap();
        assert!(parsed.is_empty());
    }
}
