// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing and pointer colliders.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;

use kurbo::{Point, Rect, Size};

use super::id::{ComponentId, INVALID};
use super::tree::ComponentTree;
use crate::coroutine::HitRegion;

#[derive(Default)]
struct ColliderState {
    origin: Cell<Option<Point>>,
    size: Cell<Size>,
    rect: Cell<Option<Rect>>,
}

/// A shared, always-current view of a component's screen rectangle.
///
/// The tree updates every collider of a component when its position or size
/// changes; the rectangle itself is derived on first use after a change.
/// Pass one to [`mouse_entered`](crate::coroutine::awaiters::mouse_entered)
/// or [`mouse_exited`](crate::coroutine::awaiters::mouse_exited).
#[derive(Clone, Default)]
pub struct Collider {
    state: Rc<ColliderState>,
}

impl fmt::Debug for Collider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Collider").field(&self.rect()).finish()
    }
}

impl Collider {
    /// Returns the current rectangle, or `None` before the component is
    /// positioned.
    #[must_use]
    pub fn rect(&self) -> Option<Rect> {
        if let Some(rect) = self.state.rect.get() {
            return Some(rect);
        }
        let rect = Rect::from_origin_size(self.state.origin.get()?, self.state.size.get());
        self.state.rect.set(Some(rect));
        Some(rect)
    }

    fn update(&self, origin: Option<Point>, size: Size) {
        if self.state.origin.get() != origin || self.state.size.get() != size {
            self.state.origin.set(origin);
            self.state.size.set(size);
            self.state.rect.set(None);
        }
    }
}

impl HitRegion for Collider {
    fn contains(&self, point: Point) -> bool {
        self.rect().is_some_and(|r| r.contains(point))
    }
}

impl ComponentTree {
    /// Returns the collider of `id`, creating it on first request.
    pub fn collider(&mut self, id: ComponentId) -> Collider {
        let idx = self.validate(id);
        let i = idx as usize;
        if let Some(collider) = &self.collider[i] {
            return collider.clone();
        }
        let collider = Collider::default();
        collider.update(self.position[i], self.size[i]);
        self.collider[i] = Some(collider.clone());
        collider
    }

    /// Returns the screen rectangle of `id`, or `None` before it is
    /// positioned.
    #[must_use]
    pub fn rect(&self, id: ComponentId) -> Option<Rect> {
        let i = self.validate(id) as usize;
        Some(Rect::from_origin_size(self.position[i]?, self.size[i]))
    }

    /// Returns the deepest, topmost component containing `point`.
    ///
    /// Later children are drawn over earlier ones, so they are tested first.
    #[must_use]
    pub fn component_under(&self, point: Point) -> Option<ComponentId> {
        if self.root == INVALID {
            return None;
        }
        self.hit(self.root, point).map(ComponentId)
    }

    fn hit(&self, idx: u32, point: Point) -> Option<u32> {
        let i = idx as usize;
        for &(_, child) in self.children[i].iter().rev() {
            if let Some(found) = self.hit(child, point) {
                return Some(found);
            }
        }
        let origin = self.position[i]?;
        Rect::from_origin_size(origin, self.size[i])
            .contains(point)
            .then_some(idx)
    }

    pub(crate) fn sync_collider(&self, idx: u32) {
        let i = idx as usize;
        if let Some(collider) = &self.collider[i] {
            collider.update(self.position[i], self.size[i]);
        }
    }
}
