// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text measurement.

use kurbo::Size;

/// Measures laid-out text for size requests.
///
/// A tree owns one measurer, reachable from every layout and render
/// context. Hosts install one backed by their font stack.
pub trait TextMeasure {
    /// Returns the extent of `text` set at `font_size`.
    fn measure(&self, text: &str, font_size: f64) -> Size;
}

/// Fixed-advance measurement, one line, no shaping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceMeasure {
    /// Advance per character, in ems.
    pub advance: f64,
    /// Line height, in ems.
    pub line_height: f64,
}

impl MonospaceMeasure {
    /// Half-em advance, 1.25 line height.
    pub const DEFAULT: Self = Self {
        advance: 0.5,
        line_height: 1.25,
    };
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TextMeasure for MonospaceMeasure {
    fn measure(&self, text: &str, font_size: f64) -> Size {
        let chars = text.chars().count() as f64;
        Size::new(
            chars * self.advance * font_size,
            self.line_height * font_size,
        )
    }
}
