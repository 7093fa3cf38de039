// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component tree inspection.
//!
//! [`Inspector`] walks anything implementing
//! [`Inspect`](treadle_core::component::Inspect) depth-first, in paint
//! order, and records one [`InspectedBox`] per component.

use std::fmt::Write as _;

use kurbo::{Point, Rect, Vec2};
use treadle_core::component::bitmap::{Bitmap, Color};
use treadle_core::component::{ComponentId, Inspect};

/// Outline colors, cycled by depth.
const PALETTE: [Color; 4] = [
    Color::rgb(0xe6, 0x19, 0x4b),
    Color::rgb(0x3c, 0xb4, 0x4b),
    Color::rgb(0x43, 0x63, 0xd8),
    Color::rgb(0xf5, 0x82, 0x31),
];

/// One component as seen by the [`Inspector`].
#[derive(Clone, Debug, PartialEq)]
pub struct InspectedBox {
    /// The component.
    pub id: ComponentId,
    /// Its display name.
    pub name: String,
    /// Its screen rectangle, or `None` if it is not positioned yet.
    pub rect: Option<Rect>,
    /// Distance from the root (the root is at depth 0).
    pub depth: usize,
}

/// A snapshot of a component tree's geometry.
#[derive(Clone, Debug, Default)]
pub struct Inspector {
    boxes: Vec<InspectedBox>,
}

impl Inspector {
    /// Collects every component reachable from the root.
    pub fn collect(tree: &impl Inspect) -> Self {
        let mut boxes = Vec::new();
        if let Some(root) = tree.root() {
            let mut stack = vec![(root, 0)];
            while let Some((id, depth)) = stack.pop() {
                boxes.push(InspectedBox {
                    id,
                    name: tree.display_name(id).to_owned(),
                    rect: tree.corners(id).map(|(p0, p1)| Rect::from_points(p0, p1)),
                    depth,
                });
                // Reversed so the first child is visited first.
                stack.extend(tree.children(id).into_iter().rev().map(|c| (c, depth + 1)));
            }
        }
        Self { boxes }
    }

    /// Returns the boxes in depth-first paint order.
    #[must_use]
    pub fn boxes(&self) -> &[InspectedBox] {
        &self.boxes
    }

    /// Returns the deepest box containing `point`.
    #[must_use]
    pub fn hit(&self, point: Point) -> Option<&InspectedBox> {
        self.boxes
            .iter()
            .rev()
            .find(|b| b.rect.is_some_and(|r| r.contains(point)))
    }

    /// Renders an indented, one-line-per-component dump.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for b in &self.boxes {
            let indent = "  ".repeat(b.depth);
            let _ = match b.rect {
                Some(r) => writeln!(
                    out,
                    "{indent}{} #{} ({}, {}) {}x{}",
                    b.name,
                    b.id.index(),
                    r.x0,
                    r.y0,
                    r.width(),
                    r.height()
                ),
                None => writeln!(out, "{indent}{} #{} (unpositioned)", b.name, b.id.index()),
            };
        }
        out
    }

    /// Returns a copy of `image` with every box outlined, colored by depth.
    ///
    /// `image` is taken to be the root's composed bitmap, so boxes are drawn
    /// relative to the root's top-left corner.
    #[must_use]
    pub fn overlay(&self, image: &Bitmap) -> Bitmap {
        let mut out = image.clone();
        let origin = self
            .boxes
            .first()
            .and_then(|b| b.rect)
            .map_or(Vec2::ZERO, |r| r.origin().to_vec2());
        for b in &self.boxes {
            if let Some(rect) = b.rect {
                out.stroke_rect(rect - origin, 1.0, PALETTE[b.depth % PALETTE.len()]);
            }
        }
        out
    }
}
