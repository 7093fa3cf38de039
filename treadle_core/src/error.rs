// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recoverable frame failures.
//!
//! Misuse of the engine's API (ticking the same frame twice, exceeding a
//! component's child limit, using a stale handle) panics. Failures raised by
//! user code while a frame is processed are values: they surface as a
//! [`FrameError`] from the render loop, which latches them and switches to
//! failure drawing.

use alloc::boxed::Box;
use alloc::string::String;

/// Error type returned by user callbacks (coroutine bodies, component
/// rendering, draw handlers).
pub type BoxError = Box<dyn core::error::Error + 'static>;

/// A failure raised while processing one frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A coroutine body returned an error.
    #[error("coroutine `{name}` failed")]
    Coroutine {
        /// Display name of the failing coroutine.
        name: String,
        /// The error returned by the body.
        #[source]
        source: BoxError,
    },
    /// A component failed to render.
    #[error("component `{name}` failed to render")]
    Render {
        /// Display name of the failing component.
        name: String,
        /// The error returned by `render`.
        #[source]
        source: BoxError,
    },
    /// The frame's draw handler failed.
    #[error("draw handler failed")]
    Draw(#[source] BoxError),
}

/// A plain message error, for callbacks that have nothing richer to report.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Message(pub String);

impl Message {
    /// Boxes a message as a [`BoxError`].
    #[must_use]
    pub fn boxed(message: impl Into<String>) -> BoxError {
        Box::new(Self(message.into()))
    }
}
