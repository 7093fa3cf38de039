// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, Chrome trace export, tree inspection, and image export
//! for treadle diagnostics.
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`chrome::ChromeTraceSink`] — collects events and writes Chrome Trace
//!   Event Format JSON.
//! - [`inspector::Inspector`] — geometry snapshot of a component tree, with
//!   a text dump and an outline overlay.
//! - [`export`] — PNG encoding of component bitmaps.

pub mod chrome;
pub mod export;
pub mod inspector;
pub mod pretty;
