// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Rect;
use treadle_core::component::bitmap::Color;
use treadle_core::component::{
    Component, Effects, Invalidation, Prop, RenderCx, SizeCx, SizeRequest,
};
use treadle_core::error::BoxError;

/// A single line of text, sized by the tree's text measurer.
///
/// Glyphs are drawn as solid cells: one block per non-whitespace character,
/// spanning the advance the measurer reports for it. Hosts that need real
/// glyphs render them into the same cells.
#[derive(Debug)]
pub struct Label {
    text: Prop<String>,
    font_size: Prop<f64>,
    color: Prop<Color>,
}

impl Label {
    /// Default font size, in pixels.
    pub const DEFAULT_FONT_SIZE: f64 = 16.0;

    /// Creates a black label.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Prop::new(text.into(), Effects::RESIZE | Effects::RENDER),
            font_size: Prop::new(Self::DEFAULT_FONT_SIZE, Effects::RESIZE | Effects::RENDER),
            color: Prop::new(Color::BLACK, Effects::RENDER),
        }
    }

    /// Builder-style font size.
    #[must_use]
    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = Prop::new(font_size, Effects::RESIZE | Effects::RENDER);
        self
    }

    /// Builder-style text color.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Prop::new(color, Effects::RENDER);
        self
    }

    /// Returns the text.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.get()
    }

    /// Replaces the text.
    pub fn set_text(&mut self, text: impl Into<String>, inv: &mut Invalidation) {
        self.text.set(text.into(), inv);
    }

    /// Sets the font size.
    pub fn set_font_size(&mut self, font_size: f64, inv: &mut Invalidation) {
        self.font_size.set(font_size, inv);
    }

    /// Sets the text color.
    pub fn set_color(&mut self, color: Color, inv: &mut Invalidation) {
        self.color.set(color, inv);
    }
}

impl Component for Label {
    fn name(&self) -> &str {
        "Label"
    }

    fn size_request(&self, cx: &SizeCx<'_>) -> SizeRequest {
        SizeRequest::fixed(cx.measure_text(self.text.get(), *self.font_size.get()))
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), BoxError> {
        let text = self.text.get();
        let font_size = *self.font_size.get();
        let height = cx.size().height;
        // Cells leave a quarter of the line free above and an eighth below.
        let (top, bottom) = (height * 0.25, height * 0.875);

        let mut cells = Vec::new();
        for (start, ch) in text.char_indices() {
            if ch.is_whitespace() {
                continue;
            }
            let end = start + ch.len_utf8();
            let x0 = cx.measure_text(&text[..start], font_size).width;
            let x1 = cx.measure_text(&text[..end], font_size).width;
            // One pixel of tracking between cells.
            cells.push(Rect::new(x0, top, (x1 - 1.0).max(x0), bottom));
        }

        let color = *self.color.get();
        let bitmap = cx.bitmap_mut();
        for cell in cells {
            bitmap.fill_rect(cell, color);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;
    use treadle_core::component::ComponentTree;

    use super::*;

    #[test]
    fn requests_measured_text() {
        let mut tree = ComponentTree::new();
        let label = tree.insert(Label::new("abcd").with_font_size(10.0));
        tree.set_root(label);
        tree.handle_batched_updates();
        // Half-em advance and 1.25 line height by default.
        assert_eq!(tree.size(label), Size::new(20.0, 12.5));
    }

    #[test]
    fn text_change_resizes() {
        let mut tree = ComponentTree::new();
        let label = tree.insert(Label::new("ab").with_font_size(10.0));
        tree.set_root(label);
        tree.handle_batched_updates();
        tree.render().unwrap();

        tree.update::<Label, _>(label, |l, inv| l.set_text("abcdef", inv));
        assert!(tree.has_pending_updates());
        tree.handle_batched_updates();
        assert_eq!(tree.size(label).width, 30.0);
        assert_eq!(tree.get::<Label>(label).text(), "abcdef");
        assert_eq!(tree.render().unwrap(), [label]);
    }

    #[test]
    fn draws_cells_and_skips_spaces() {
        let mut tree = ComponentTree::new();
        let label = tree.insert(Label::new("a b").with_font_size(16.0));
        tree.set_root(label);
        tree.handle_batched_updates();
        tree.render().unwrap();

        // Cells are 8 px wide and span y 5..17.5 on a 20 px line.
        let image = tree.image().unwrap();
        assert_eq!(image.pixel(2, 10), Some([0, 0, 0, 255]));
        assert_eq!(image.pixel(10, 10), Some([0, 0, 0, 0]), "space");
        assert_eq!(image.pixel(18, 10), Some([0, 0, 0, 255]));
        assert_eq!(image.pixel(2, 1), Some([0, 0, 0, 0]), "above the cell");
    }
}
