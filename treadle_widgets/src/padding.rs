// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Insets, Point, Size};
use treadle_core::component::bitmap::Color;
use treadle_core::component::{
    ChildKey, Component, Effects, Invalidation, LayoutCx, Prop, RenderCx, SizeCx, SizeRequest,
};
use treadle_core::error::BoxError;

/// Insets around a single child, with an optional background.
///
/// The child is attached under [`Padding::CHILD`]. It is allotted the
/// padding's size minus the insets and placed at the top-left inset.
#[derive(Debug)]
pub struct Padding {
    insets: Prop<Insets>,
    background: Prop<Option<Color>>,
}

impl Padding {
    /// The key of the padded child.
    pub const CHILD: ChildKey = ChildKey(0);

    /// Creates padding with the given insets.
    #[must_use]
    pub fn new(insets: impl Into<Insets>) -> Self {
        Self {
            insets: Prop::new(
                insets.into(),
                Effects::RESIZE | Effects::REALLOCATE | Effects::RENDER,
            ),
            background: Prop::new(None, Effects::RENDER),
        }
    }

    /// Creates the same inset on every side.
    #[must_use]
    pub fn uniform(inset: f64) -> Self {
        Self::new(Insets::uniform(inset))
    }

    /// Builder-style background.
    #[must_use]
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Prop::new(Some(color), Effects::RENDER);
        self
    }

    /// Returns the insets.
    #[must_use]
    pub fn insets(&self) -> Insets {
        *self.insets.get()
    }

    /// Sets the insets.
    pub fn set_insets(&mut self, insets: impl Into<Insets>, inv: &mut Invalidation) {
        self.insets.set(insets.into(), inv);
    }

    /// Sets or removes the background.
    pub fn set_background(&mut self, color: Option<Color>, inv: &mut Invalidation) {
        self.background.set(color, inv);
    }

    fn extra(&self) -> Size {
        let insets = self.insets.get();
        Size::new(insets.x_value(), insets.y_value())
    }
}

impl Component for Padding {
    fn name(&self) -> &str {
        "Padding"
    }

    fn child_limit(&self) -> usize {
        1
    }

    fn size_request(&self, cx: &SizeCx<'_>) -> SizeRequest {
        let extra = self.extra();
        if cx.child_count() == 0 {
            return SizeRequest::fixed(extra);
        }
        let (_, child) = cx.single_child();
        SizeRequest::new(child.min + extra, child.preferred.map(|p| p + extra))
    }

    fn children_sizes(&self, cx: &LayoutCx<'_>) -> Vec<(ChildKey, Size)> {
        let (key, _) = cx.single_child();
        let extra = self.extra();
        let size = cx.size();
        let inner = Size::new(
            (size.width - extra.width).max(0.0),
            (size.height - extra.height).max(0.0),
        );
        vec![(key, inner)]
    }

    fn child_position(&self, _key: ChildKey, _cx: &LayoutCx<'_>) -> Point {
        let insets = self.insets.get();
        Point::new(insets.x0, insets.y0)
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), BoxError> {
        if let Some(color) = *self.background.get() {
            cx.bitmap_mut().fill(color);
        }
        cx.draw_children();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use treadle_core::component::{ComponentId, ComponentTree};

    use super::*;
    use crate::Rectangle;

    fn padded(insets: Insets, child: Rectangle) -> (ComponentTree, ComponentId, ComponentId) {
        let mut tree = ComponentTree::new();
        let pad = tree.insert(Padding::new(insets).with_background(Color::WHITE));
        let rect = tree.insert(child);
        tree.add_child(pad, Padding::CHILD, rect);
        tree.set_root(pad);
        tree.handle_batched_updates();
        (tree, pad, rect)
    }

    fn black(width: f64, height: f64) -> Rectangle {
        Rectangle::new(Size::new(width, height), Color::BLACK)
    }

    #[test]
    fn wraps_the_child() {
        let (tree, pad, rect) = padded(Insets::new(1.0, 2.0, 3.0, 4.0), black(10.0, 4.0));
        assert_eq!(tree.size(pad), Size::new(14.0, 10.0));
        assert_eq!(tree.size(rect), Size::new(10.0, 4.0));
        assert_eq!(tree.position(rect), Point::new(1.0, 2.0));
    }

    #[test]
    fn inset_change_reallocates_at_constant_size() {
        let flexible = Rectangle::with_request(
            SizeRequest::new(Size::ZERO, Some(Size::new(10.0, 4.0))),
            Color::BLACK,
        );
        let (mut tree, pad, rect) = padded(Insets::uniform(2.0), flexible);
        tree.set_size(Size::new(14.0, 8.0));
        tree.handle_batched_updates();
        assert_eq!(tree.size(pad), Size::new(14.0, 8.0));

        // The larger request is clamped, so the padding keeps its size.
        tree.update::<Padding, _>(pad, |p, inv| p.set_insets(Insets::uniform(3.0), inv));
        tree.handle_batched_updates();
        assert_eq!(tree.size(pad), Size::new(14.0, 8.0));
        assert_eq!(tree.size(rect), Size::new(8.0, 2.0));
        assert_eq!(tree.position(rect), Point::new(3.0, 3.0));
    }

    #[test]
    fn empty_padding_requests_its_insets() {
        let mut tree = ComponentTree::new();
        let pad = tree.insert(Padding::uniform(3.0));
        tree.set_root(pad);
        tree.handle_batched_updates();
        assert_eq!(tree.size(pad), Size::new(6.0, 6.0));
    }

    #[test]
    fn renders_background_then_child() {
        let (mut tree, _, _) = padded(Insets::uniform(2.0), black(10.0, 4.0));
        tree.render().unwrap();
        let image = tree.image().unwrap();
        assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(2, 2), Some([0, 0, 0, 255]));
        assert_eq!(image.pixel(12, 6), Some([255, 255, 255, 255]));
    }

    #[test]
    #[should_panic(expected = "child limit")]
    fn holds_one_child() {
        let (mut tree, pad, _) = padded(Insets::uniform(1.0), black(1.0, 1.0));
        let other = tree.insert(black(1.0, 1.0));
        tree.add_child(pad, ChildKey(1), other);
    }
}
