// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only access for debugging tools.

use alloc::vec::Vec;

use kurbo::Point;

use super::bitmap::Bitmap;
use super::id::ComponentId;
use super::tree::ComponentTree;

/// What an inspector may read from a component tree.
pub trait Inspect {
    /// The top-level component, if any.
    fn root(&self) -> Option<ComponentId>;
    /// Children of `id` in insertion (and paint) order.
    fn children(&self, id: ComponentId) -> Vec<ComponentId>;
    /// Display name of `id`.
    fn display_name(&self, id: ComponentId) -> &str;
    /// Top-left and bottom-right corners of `id`, once positioned.
    fn corners(&self, id: ComponentId) -> Option<(Point, Point)>;
    /// The last rendered bitmap of `id`.
    fn bitmap(&self, id: ComponentId) -> &Bitmap;
}

impl Inspect for ComponentTree {
    fn root(&self) -> Option<ComponentId> {
        Self::root(self)
    }

    fn children(&self, id: ComponentId) -> Vec<ComponentId> {
        Self::children(self, id).into_iter().map(|(_, c)| c).collect()
    }

    fn display_name(&self, id: ComponentId) -> &str {
        self.name(id)
    }

    fn corners(&self, id: ComponentId) -> Option<(Point, Point)> {
        self.rect(id).map(|r| (r.origin(), Point::new(r.x1, r.y1)))
    }

    fn bitmap(&self, id: ComponentId) -> &Bitmap {
        Self::bitmap(self, id)
    }
}
