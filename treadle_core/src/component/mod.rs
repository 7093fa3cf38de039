// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained component tree: storage, layout, rendering, and hit testing.
//!
//! A [`ComponentTree`] stores components in struct-of-arrays form. The
//! engine owns each component's bitmap, allotted size, position, child table
//! and lifecycle; the boxed [`Component`] only describes what kind of node
//! it is: how big it wants to be, how it arranges its children, and how it
//! draws.
//!
//! # Lifecycle
//!
//! ```text
//!   insert ──► Unattached ── attached to the root ──► Initialising ──► Initialised
//!                                 (directly or via an initialised parent)
//! ```
//!
//! While a component is not initialised, property changes are remembered
//! and applied when it becomes initialised.
//!
//! # Frame work
//!
//! Property changes made through [`ComponentTree::update`] queue layout
//! work (see [`layout`]) and mark components for rendering. Once per frame
//! the host calls [`ComponentTree::handle_batched_updates`] and then
//! [`ComponentTree::render`], and reads the composed image from
//! [`ComponentTree::image`].
//!
//! # Example
//!
//! ```rust
//! use kurbo::Size;
//! use treadle_core::component::{Component, ComponentTree, RenderCx, SizeCx, SizeRequest};
//! use treadle_core::component::bitmap::Color;
//! use treadle_core::error::BoxError;
//!
//! #[derive(Debug)]
//! struct Swatch(Color);
//!
//! impl Component for Swatch {
//!     fn name(&self) -> &str {
//!         "Swatch"
//!     }
//!
//!     fn size_request(&self, _cx: &SizeCx<'_>) -> SizeRequest {
//!         SizeRequest::fixed(Size::new(8.0, 8.0))
//!     }
//!
//!     fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), BoxError> {
//!         cx.bitmap_mut().fill(self.0);
//!         Ok(())
//!     }
//! }
//!
//! let mut tree = ComponentTree::new();
//! let swatch = tree.insert(Swatch(Color::WHITE));
//! tree.set_root(swatch);
//! tree.handle_batched_updates();
//! tree.render().unwrap();
//! assert_eq!(tree.image().unwrap().size(), Size::new(8.0, 8.0));
//! ```

pub mod bitmap;
mod context;
mod hit;
mod id;
mod inspect;
pub mod layout;
mod prop;
mod render;
pub mod text;
mod tree;

use alloc::vec::Vec;
use core::any::Any;

use kurbo::{Point, Size};

pub use context::{InitCx, LayoutCx, RenderCx, SizeCx};
pub use hit::Collider;
pub use id::{ChildKey, ComponentId};
pub use inspect::Inspect;
pub use layout::{BatchKey, SizeRequest};
pub use prop::{Effects, Invalidation, Prop};
pub use tree::{ComponentTree, Lifecycle};

use crate::error::BoxError;

/// A kind of node in a [`ComponentTree`].
pub trait Component: Any {
    /// Display name, used by logs, errors, and inspectors.
    fn name(&self) -> &str;

    /// Maximum number of children. Read once, when the component is
    /// inserted.
    fn child_limit(&self) -> usize {
        0
    }

    /// Called once when the component becomes attached to the root.
    fn init(&mut self, cx: &mut InitCx<'_>) {
        let _ = cx;
    }

    /// Computes the size this component asks its parent for.
    fn size_request(&self, cx: &SizeCx<'_>) -> SizeRequest;

    /// Splits the allotted size among the children.
    ///
    /// The default gives every child its natural size.
    fn children_sizes(&self, cx: &LayoutCx<'_>) -> Vec<(ChildKey, Size)> {
        cx.child_requests()
            .map(|(key, request)| (key, request.natural()))
            .collect()
    }

    /// Returns the position of child `key` relative to this component.
    fn child_position(&self, key: ChildKey, cx: &LayoutCx<'_>) -> Point {
        let _ = (key, cx);
        Point::ZERO
    }

    /// Draws into the component's bitmap, which has been cleared.
    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), BoxError>;

    /// Opacity used when a parent composites this component. At zero the
    /// component is not rendered.
    fn opacity(&self) -> f64 {
        1.0
    }
}
