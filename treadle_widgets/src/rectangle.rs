// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Rect, Size};
use treadle_core::component::bitmap::Color;
use treadle_core::component::{
    Component, Effects, Invalidation, Prop, RenderCx, SizeCx, SizeRequest,
};
use treadle_core::error::BoxError;

/// A filled rectangle, optionally outlined.
#[derive(Debug)]
pub struct Rectangle {
    request: Prop<SizeRequest>,
    fill: Prop<Color>,
    outline: Prop<Option<(f64, Color)>>,
    opacity: Prop<f64>,
}

impl Rectangle {
    /// Creates a rectangle of exactly `size`.
    #[must_use]
    pub fn new(size: Size, fill: Color) -> Self {
        Self::with_request(SizeRequest::fixed(size), fill)
    }

    /// Creates a rectangle with an arbitrary size request.
    #[must_use]
    pub fn with_request(request: SizeRequest, fill: Color) -> Self {
        Self {
            request: Prop::new(request, Effects::RESIZE | Effects::RENDER),
            fill: Prop::new(fill, Effects::RENDER),
            outline: Prop::new(None, Effects::RENDER),
            opacity: Prop::new(1.0, Effects::RENDER),
        }
    }

    /// Returns the fill color.
    #[must_use]
    pub fn fill(&self) -> Color {
        *self.fill.get()
    }

    /// Sets the size request.
    pub fn set_request(&mut self, request: SizeRequest, inv: &mut Invalidation) {
        self.request.set(request, inv);
    }

    /// Sets a fixed size.
    pub fn set_size(&mut self, size: Size, inv: &mut Invalidation) {
        self.set_request(SizeRequest::fixed(size), inv);
    }

    /// Sets the fill color.
    pub fn set_fill(&mut self, fill: Color, inv: &mut Invalidation) {
        self.fill.set(fill, inv);
    }

    /// Sets or removes a `width`-pixel outline.
    pub fn set_outline(&mut self, outline: Option<(f64, Color)>, inv: &mut Invalidation) {
        self.outline.set(outline, inv);
    }

    /// Sets the opacity used when the parent composites this rectangle.
    pub fn set_opacity(&mut self, opacity: f64, inv: &mut Invalidation) {
        self.opacity.set(opacity, inv);
    }
}

impl Component for Rectangle {
    fn name(&self) -> &str {
        "Rectangle"
    }

    fn size_request(&self, _cx: &SizeCx<'_>) -> SizeRequest {
        *self.request.get()
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), BoxError> {
        let bounds = Rect::from_origin_size((0.0, 0.0), cx.size());
        let bitmap = cx.bitmap_mut();
        bitmap.fill(*self.fill.get());
        if let Some((width, color)) = *self.outline.get() {
            bitmap.stroke_rect(bounds, width, color);
        }
        Ok(())
    }

    fn opacity(&self) -> f64 {
        *self.opacity.get()
    }
}

#[cfg(test)]
mod tests {
    use treadle_core::component::ComponentTree;

    use super::*;

    #[test]
    fn renders_fill_and_outline() {
        let mut tree = ComponentTree::new();
        let rect = tree.insert(Rectangle::new(Size::new(6.0, 6.0), Color::BLACK));
        tree.update::<Rectangle, _>(rect, |r, inv| {
            r.set_outline(Some((1.0, Color::WHITE)), inv);
        });
        tree.set_root(rect);
        tree.handle_batched_updates();
        tree.render().unwrap();

        let image = tree.image().unwrap();
        assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(3, 3), Some([0, 0, 0, 255]));
    }

    #[test]
    fn fill_change_renders_without_layout() {
        let mut tree = ComponentTree::new();
        let rect = tree.insert(Rectangle::new(Size::new(2.0, 2.0), Color::BLACK));
        tree.set_root(rect);
        tree.handle_batched_updates();
        tree.render().unwrap();

        tree.update::<Rectangle, _>(rect, |r, inv| r.set_fill(Color::WHITE, inv));
        assert!(!tree.has_pending_updates(), "a fill change does not resize");
        assert_eq!(tree.render().unwrap(), [rect]);
        assert_eq!(tree.get::<Rectangle>(rect).fill(), Color::WHITE);
    }
}
