// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Point, Size};
use treadle_core::component::{
    ChildKey, Component, Effects, Invalidation, LayoutCx, Prop, RenderCx, SizeCx, SizeRequest,
};
use treadle_core::error::BoxError;

/// The main axis of a [`Flex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Children left to right.
    Row,
    /// Children top to bottom.
    Column,
}

impl Axis {
    fn main(self, size: Size) -> f64 {
        match self {
            Self::Row => size.width,
            Self::Column => size.height,
        }
    }

    fn cross(self, size: Size) -> f64 {
        match self {
            Self::Row => size.height,
            Self::Column => size.width,
        }
    }

    fn pack(self, main: f64, cross: f64) -> Size {
        match self {
            Self::Row => Size::new(main, cross),
            Self::Column => Size::new(cross, main),
        }
    }
}

/// Children laid out along one axis, in insertion order.
///
/// Every child starts at its natural size. Space beyond the sum of natural
/// sizes and gaps goes to children with a grow factor, in proportion to it;
/// a shortfall shrinks every child toward its minimum in proportion to how
/// far it can shrink. Children are packed at the start of the main axis and
/// keep their natural cross size.
#[derive(Debug)]
pub struct Flex {
    axis: Axis,
    gap: Prop<f64>,
    grow: Prop<BTreeMap<ChildKey, f64>>,
}

impl Flex {
    /// Creates a flex container along `axis`.
    #[must_use]
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            gap: Prop::new(0.0, Effects::RESIZE | Effects::REALLOCATE | Effects::RENDER),
            grow: Prop::new(BTreeMap::new(), Effects::REALLOCATE | Effects::RENDER),
        }
    }

    /// Shorthand for `Flex::new(Axis::Row)`.
    #[must_use]
    pub fn row() -> Self {
        Self::new(Axis::Row)
    }

    /// Shorthand for `Flex::new(Axis::Column)`.
    #[must_use]
    pub fn column() -> Self {
        Self::new(Axis::Column)
    }

    /// Builder-style gap between adjacent children.
    ///
    /// # Panics
    ///
    /// Panics if `gap` is negative or not finite.
    #[must_use]
    pub fn with_gap(mut self, gap: f64) -> Self {
        check_gap(gap);
        self.gap = Prop::new(gap, self.gap.effects());
        self
    }

    /// Builder-style grow factor for child `key`.
    #[must_use]
    pub fn with_grow(mut self, key: ChildKey, factor: f64) -> Self {
        let mut grow = self.grow.get().clone();
        grow.insert(key, factor);
        self.grow = Prop::new(grow, self.grow.effects());
        self
    }

    /// Returns the main axis.
    #[must_use]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Returns the gap.
    #[must_use]
    pub fn gap(&self) -> f64 {
        *self.gap.get()
    }

    /// Sets the gap.
    ///
    /// # Panics
    ///
    /// Panics if `gap` is negative or not finite.
    pub fn set_gap(&mut self, gap: f64, inv: &mut Invalidation) {
        check_gap(gap);
        self.gap.set(gap, inv);
    }

    /// Returns the grow factor of child `key` (zero by default).
    #[must_use]
    pub fn grow(&self, key: ChildKey) -> f64 {
        self.grow.get().get(&key).copied().unwrap_or(0.0)
    }

    /// Sets the grow factor of child `key`.
    ///
    /// # Panics
    ///
    /// Panics if `factor` is negative or not finite.
    pub fn set_grow(&mut self, key: ChildKey, factor: f64, inv: &mut Invalidation) {
        assert!(
            factor.is_finite() && factor >= 0.0,
            "invalid grow factor {factor}"
        );
        let mut grow = self.grow.get().clone();
        grow.insert(key, factor);
        self.grow.set(grow, inv);
    }

    fn gaps(&self, count: usize) -> f64 {
        *self.gap.get() * count.saturating_sub(1) as f64
    }
}

fn check_gap(gap: f64) {
    assert!(gap.is_finite() && gap >= 0.0, "invalid gap {gap}");
}

impl Component for Flex {
    fn name(&self) -> &str {
        "Flex"
    }

    fn child_limit(&self) -> usize {
        usize::MAX
    }

    fn size_request(&self, cx: &SizeCx<'_>) -> SizeRequest {
        let gaps = self.gaps(cx.child_count());
        let (mut min_main, mut min_cross) = (gaps, 0.0_f64);
        let (mut pref_main, mut pref_cross) = (gaps, 0.0_f64);
        for (_, request) in cx.child_requests() {
            let natural = request.natural();
            min_main += self.axis.main(request.min);
            min_cross = min_cross.max(self.axis.cross(request.min));
            pref_main += self.axis.main(natural);
            pref_cross = pref_cross.max(self.axis.cross(natural));
        }
        SizeRequest::new(
            self.axis.pack(min_main, min_cross),
            Some(self.axis.pack(pref_main, pref_cross)),
        )
    }

    fn children_sizes(&self, cx: &LayoutCx<'_>) -> Vec<(ChildKey, Size)> {
        let axis = self.axis;
        let requests: Vec<(ChildKey, SizeRequest)> = cx.child_requests().collect();
        let available = axis.main(cx.size()) - self.gaps(requests.len());
        let natural: f64 = requests.iter().map(|(_, r)| axis.main(r.natural())).sum();
        let extra = available - natural;

        let total_grow: f64 = requests.iter().map(|&(key, _)| self.grow(key)).sum();
        let shrinkable: f64 = requests
            .iter()
            .map(|(_, r)| axis.main(r.natural()) - axis.main(r.min))
            .sum();

        requests
            .iter()
            .map(|&(key, request)| {
                let natural = request.natural();
                let mut main = axis.main(natural);
                if extra > 0.0 && total_grow > 0.0 {
                    main += extra * self.grow(key) / total_grow;
                } else if extra < 0.0 && shrinkable > 0.0 {
                    let ratio = (-extra / shrinkable).min(1.0);
                    main -= (main - axis.main(request.min)) * ratio;
                }
                (key, axis.pack(main, axis.cross(natural)))
            })
            .collect()
    }

    fn child_position(&self, key: ChildKey, cx: &LayoutCx<'_>) -> Point {
        let gap = *self.gap.get();
        let mut offset = 0.0;
        for (k, _) in cx.child_requests() {
            if k == key {
                break;
            }
            offset += self.axis.main(cx.child_size(k)) + gap;
        }
        match self.axis {
            Axis::Row => Point::new(offset, 0.0),
            Axis::Column => Point::new(0.0, offset),
        }
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), BoxError> {
        cx.draw_children();
        Ok(())
    }
}
