// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame driver tying input, coroutines and component trees
//! together.
//!
//! Each call to [`RenderLoop::frame`] runs one frame in a fixed order:
//!
//! ```text
//!   trigger check ── nothing relevant happened (OnInput) ──► Skipped
//!        │
//!        ▼
//!   input snapshot ──► Scheduler::tick ──► FrameHandler::draw
//!        ──► for each tree: handle_batched_updates, render
//!        ──► FrameHandler::present ──► frame dispose callbacks
//! ```
//!
//! The first [`FrameError`] latches the loop: it is logged, reported to the
//! trace sink, and every later frame only calls
//! [`FrameHandler::draw_failure`].

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::component::ComponentTree;
use crate::coroutine::Scheduler;
use crate::error::{BoxError, FrameError};
use crate::input::{FrameContext, FrameContextFactory, InputTriggers};
use crate::time::HostTime;
use crate::trace::{
    BatchFlushEvent, CoroutineTickEvent, FailureEvent, FailureKind, FrameSummaryBuilder,
    FrameTickEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RenderPassEvent, Tracer,
};

/// A component tree shared between the render loop and coroutines.
pub type SharedTree = Rc<RefCell<ComponentTree>>;

/// When the render loop processes a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTrigger {
    /// Every frame.
    Always,
    /// Only frames preceded by an input event of one of these kinds.
    OnInput(InputTriggers),
}

/// Configuration for [`RenderLoop`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderLoopConfig {
    /// When frames are processed.
    pub trigger: RenderTrigger,
    /// EMA factor for the smoothed FPS in frame contexts.
    pub fps_smoothing: f64,
}

impl RenderLoopConfig {
    /// Process every frame. Suits animated content.
    #[must_use]
    pub const fn continuous() -> Self {
        Self {
            trigger: RenderTrigger::Always,
            fps_smoothing: 0.1,
        }
    }

    /// Process a frame only after some input arrived. Suits static content
    /// that changes in response to the user.
    #[must_use]
    pub const fn on_input() -> Self {
        Self {
            trigger: RenderTrigger::OnInput(InputTriggers::ALL),
            fps_smoothing: 0.1,
        }
    }
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self::continuous()
    }
}

/// What a call to [`RenderLoop::frame`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameOutcome {
    /// The trigger did not fire; nothing ran.
    Skipped,
    /// The frame ran to completion.
    Rendered,
    /// A failure is latched; only failure drawing ran.
    Halted,
}

/// Host callbacks for one frame, drawing onto a surface of type `S`.
pub trait FrameHandler<S: ?Sized> {
    /// Draws the frame's immediate-mode content.
    fn draw(&mut self, frame: &FrameContext, surface: &mut S) -> Result<(), BoxError>;

    /// Presents the composed images of the attached trees.
    fn present(
        &mut self,
        frame: &FrameContext,
        surface: &mut S,
        trees: &[SharedTree],
    ) -> Result<(), BoxError> {
        _ = (frame, surface, trees);
        Ok(())
    }

    /// Draws in place of a frame once a failure is latched.
    fn draw_failure(&mut self, error: &FrameError, surface: &mut S);

    /// Reads the host clock for phase timing.
    ///
    /// The default returns the frame's start time, which reports every phase
    /// as taking no time.
    fn timestamp(&mut self, frame_start: HostTime) -> HostTime {
        frame_start
    }
}

/// Drives input snapshots, coroutines and component trees frame by frame.
pub struct RenderLoop {
    config: RenderLoopConfig,
    input: FrameContextFactory,
    scheduler: Scheduler,
    trees: Vec<SharedTree>,
    failure: Option<FrameError>,
}

impl fmt::Debug for RenderLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderLoop")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .field("trees", &self.trees.len())
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(RenderLoopConfig::default())
    }
}

impl RenderLoop {
    /// Creates a render loop.
    #[must_use]
    pub fn new(config: RenderLoopConfig) -> Self {
        Self {
            config,
            input: FrameContextFactory::new(config.fps_smoothing),
            scheduler: Scheduler::new(),
            trees: Vec::new(),
            failure: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RenderLoopConfig {
        &self.config
    }

    /// Returns the input factory, to feed raw host events into.
    pub fn input(&mut self) -> &mut FrameContextFactory {
        &mut self.input
    }

    /// Returns the coroutine scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Attaches a component tree and returns its index.
    ///
    /// Trees are flushed and rendered in attachment order.
    pub fn attach(&mut self, tree: SharedTree) -> usize {
        self.trees.push(tree);
        self.trees.len() - 1
    }

    /// Returns the attached trees.
    #[must_use]
    pub fn trees(&self) -> &[SharedTree] {
        &self.trees
    }

    /// Returns the latched failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&FrameError> {
        self.failure.as_ref()
    }

    /// Runs one frame at host time `now`.
    pub fn frame<S: ?Sized>(
        &mut self,
        now: HostTime,
        surface: &mut S,
        handler: &mut impl FrameHandler<S>,
        tracer: &mut Tracer<'_>,
    ) -> FrameOutcome {
        if let Some(error) = &self.failure {
            handler.draw_failure(error, surface);
            return FrameOutcome::Halted;
        }
        if let RenderTrigger::OnInput(triggers) = self.config.trigger {
            if !self.input.has_pending(triggers) {
                return FrameOutcome::Skipped;
            }
        }

        let input_start = handler.timestamp(now);
        let frame = self.input.next_frame(now);
        let tick = FrameTickEvent::from(&frame);
        tracer.frame_tick(&tick);
        let mut phases = Phases {
            frame_index: frame.frame_index,
            summary: FrameSummaryBuilder::new(&tick),
        };
        phases.begin(tracer, PhaseKind::Input, input_start);
        phases.end(tracer, PhaseKind::Input, handler.timestamp(now));

        let result = self.run(&frame, surface, handler, tracer, &mut phases, now);
        frame.dispose();

        let outcome = match result {
            Ok(()) => FrameOutcome::Rendered,
            Err(error) => {
                tracing::error!(
                    frame = frame.frame_index,
                    error = %error,
                    "frame failed; render loop halted"
                );
                tracer.failure(&FailureEvent {
                    frame_index: frame.frame_index,
                    kind: FailureKind::from(&error),
                });
                phases.summary.set_failed(true);
                handler.draw_failure(&error, surface);
                self.failure = Some(error);
                FrameOutcome::Halted
            }
        };
        tracer.frame_summary(&phases.summary.finish());
        outcome
    }

    fn run<S: ?Sized>(
        &mut self,
        frame: &FrameContext,
        surface: &mut S,
        handler: &mut impl FrameHandler<S>,
        tracer: &mut Tracer<'_>,
        phases: &mut Phases,
        now: HostTime,
    ) -> Result<(), FrameError> {
        phases.begin(tracer, PhaseKind::Coroutines, handler.timestamp(now));
        let ticked = self.scheduler.tick(frame);
        tracer.coroutine_tick(&CoroutineTickEvent {
            frame_index: frame.frame_index,
            stats: self.scheduler.last_tick_stats(),
        });
        phases.end(tracer, PhaseKind::Coroutines, handler.timestamp(now));
        ticked?;

        phases.begin(tracer, PhaseKind::Draw, handler.timestamp(now));
        handler.draw(frame, surface).map_err(FrameError::Draw)?;
        phases.end(tracer, PhaseKind::Draw, handler.timestamp(now));

        phases.begin(tracer, PhaseKind::Layout, handler.timestamp(now));
        for (index, tree) in self.trees.iter().enumerate() {
            let tasks = tree.borrow_mut().handle_batched_updates();
            tracer.batch_flush(&BatchFlushEvent {
                frame_index: frame.frame_index,
                tree: index,
                tasks,
            });
            phases.summary.add_layout_tasks(tasks);
        }
        phases.end(tracer, PhaseKind::Layout, handler.timestamp(now));

        phases.begin(tracer, PhaseKind::Render, handler.timestamp(now));
        for (index, tree) in self.trees.iter().enumerate() {
            let rendered = tree.borrow_mut().render()?;
            tracer.render_pass(&RenderPassEvent {
                frame_index: frame.frame_index,
                tree: index,
                rendered: rendered.len(),
            });
            #[cfg(feature = "trace-rich")]
            tracer.components_rendered(frame.frame_index, index, &rendered);
            phases.summary.add_rendered(rendered.len());
        }
        phases.end(tracer, PhaseKind::Render, handler.timestamp(now));

        phases.begin(tracer, PhaseKind::Present, handler.timestamp(now));
        handler
            .present(frame, surface, &self.trees)
            .map_err(FrameError::Draw)?;
        phases.end(tracer, PhaseKind::Present, handler.timestamp(now));
        Ok(())
    }
}

/// Reports phase boundaries to the tracer and the frame summary.
struct Phases {
    frame_index: u64,
    summary: FrameSummaryBuilder,
}

impl Phases {
    fn begin(&mut self, tracer: &mut Tracer<'_>, phase: PhaseKind, timestamp: HostTime) {
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
        self.summary.phase_begin(phase, timestamp);
    }

    fn end(&mut self, tracer: &mut Tracer<'_>, phase: PhaseKind, timestamp: HostTime) {
        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
        self.summary.phase_end(phase, timestamp);
    }
}
