// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic components and interaction coroutines for treadle.
//!
//! This crate provides concrete [`Component`](treadle_core::component::Component)
//! kinds built on `treadle_core`'s layout protocol:
//!
//! - [`Rectangle`] — a filled leaf with a size request
//! - [`Label`] — a leaf sized by the tree's text measurer
//! - [`Padding`] — insets around a single child
//! - [`Flex`] — a row or column with gaps and grow factors
//! - [`Button`] — a single-child container with hover and press states,
//!   driven by a [`ButtonInteraction`] coroutine
//!
//! and [`KeyRepeat`], a coroutine that repeats an action while a key is
//! held.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod button;
mod flex;
mod key_repeat;
mod label;
mod padding;
mod rectangle;

pub use button::{Button, ButtonInteraction, ButtonState};
pub use flex::{Axis, Flex};
pub use key_repeat::{KeyRepeat, KeyRepeatConfig};
pub use label::Label;
pub use padding::Padding;
pub use rectangle::Rectangle;
