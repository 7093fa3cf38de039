// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batched size negotiation and positioning.
//!
//! Layout runs in three kinds of steps, each queued in the tree's
//! [`Batch`](crate::batch::Batch) under a [`BatchKey`] so that many
//! property changes in one frame collapse into one recomputation per node:
//!
//! ```text
//!   SizeRequest(c) ── request changed ──► SizeRequest(parent) + Allocate(parent)
//!                                          (RootLayout at the top)
//!   RootLayout     ──► allot the root, place it at the origin
//!   Allocate(p)    ──► set_allotted_size(child) for every child ──► Reposition(p)
//!   Reposition(p)  ──► child position = position(p) + child_position(key)
//!                      ── changed ──► Reposition(child), render p
//! ```
//!
//! [`ComponentTree::handle_batched_updates`] drains the batch, including
//! steps scheduled while it drains, until nothing is left.

use alloc::boxed::Box;
use alloc::vec::Vec;

use kurbo::{Point, Size};

use super::context::{LayoutCx, SizeCx};
use super::id::{ChildKey, ComponentId, INVALID};
use super::prop::Effects;
use super::tree::ComponentTree;
use crate::geometry::{clamp_size, is_valid_size, size_le};

/// What a component asks of its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SizeRequest {
    /// The component must not be allotted less than this.
    pub min: Size,
    /// The size the component would like, if it has a preference.
    pub preferred: Option<Size>,
}

impl SizeRequest {
    /// Creates a request.
    ///
    /// # Panics
    ///
    /// Panics if a size is negative or not finite, or if `preferred` is
    /// smaller than `min` in either dimension.
    #[must_use]
    pub fn new(min: Size, preferred: Option<Size>) -> Self {
        assert!(is_valid_size(min), "invalid minimum size {min:?}");
        if let Some(p) = preferred {
            assert!(is_valid_size(p), "invalid preferred size {p:?}");
            assert!(size_le(min, p), "preferred size {p:?} is below minimum {min:?}");
        }
        Self { min, preferred }
    }

    /// A request whose minimum and preference are both `size`.
    #[must_use]
    pub fn fixed(size: Size) -> Self {
        Self::new(size, Some(size))
    }

    /// Returns the preferred size, or the minimum without a preference.
    #[must_use]
    pub fn natural(&self) -> Size {
        self.preferred.unwrap_or(self.min)
    }
}

/// Distinctness keys of batched layout work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BatchKey {
    /// Recompute a component's size request.
    SizeRequest(ComponentId),
    /// Allot sizes to a component's children.
    Allocate(ComponentId),
    /// Recompute the positions of a component's children.
    Reposition(ComponentId),
    /// Allot and place the root.
    RootLayout,
    /// A user callback queued with [`ComponentTree::schedule`].
    Custom(u64),
}

pub(crate) type TreeCallback = Box<dyn FnOnce(&mut ComponentTree)>;

impl ComponentTree {
    /// Sets the largest size the root may be allotted.
    ///
    /// # Panics
    ///
    /// Panics if a dimension is negative or NaN. Infinity is allowed.
    pub fn set_size(&mut self, max: Size) {
        assert!(
            max.width >= 0.0 && max.height >= 0.0,
            "invalid maximum size {max:?}"
        );
        if self.max_size != max {
            self.max_size = max;
            self.batch.schedule(BatchKey::RootLayout, None);
        }
    }

    /// Returns the largest size the root may be allotted.
    #[must_use]
    pub fn max_size(&self) -> Size {
        self.max_size
    }

    /// Sets the absolute position of the root.
    pub fn set_origin(&mut self, origin: Point) {
        if self.origin != origin {
            self.origin = origin;
            self.batch.schedule(BatchKey::RootLayout, None);
        }
    }

    /// Returns the absolute position of the root.
    #[must_use]
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Queues `callback` to run during the next
    /// [`handle_batched_updates`](Self::handle_batched_updates).
    ///
    /// Scheduling the same `key` again before then replaces the callback.
    pub fn schedule(&mut self, key: u64, callback: impl FnOnce(&mut Self) + 'static) {
        self.batch
            .schedule(BatchKey::Custom(key), Some(Box::new(callback)));
    }

    /// Returns `true` if layout work is queued.
    #[must_use]
    pub fn has_pending_updates(&self) -> bool {
        !self.batch.is_empty()
    }

    /// Runs queued layout work until none is left and returns how many
    /// steps ran.
    pub fn handle_batched_updates(&mut self) -> usize {
        let mut ran = 0;
        while let Some((key, callback)) = self.batch.pop() {
            match key {
                BatchKey::SizeRequest(id) => self.recompute_request(id.0),
                BatchKey::Allocate(id) => self.allocate(id.0),
                BatchKey::Reposition(id) => self.reposition(id.0),
                BatchKey::RootLayout => self.root_layout(),
                BatchKey::Custom(_) => {
                    if let Some(callback) = callback {
                        callback(self);
                    }
                }
            }
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(tasks = ran, "flushed batched layout updates");
        }
        ran
    }

    /// Allots `size` to `id`.
    ///
    /// Layout calls this for every child a parent sizes; hosts rarely need
    /// to. A change resizes (and clears) the bitmap, marks the component for
    /// redraw, and schedules its children's allocation and its own
    /// repositioning within its parent.
    ///
    /// # Panics
    ///
    /// Panics if a dimension is negative or not finite.
    pub fn set_allotted_size(&mut self, id: ComponentId, size: Size) {
        let idx = self.validate(id);
        self.allot(idx, size);
    }

    fn allot(&mut self, idx: u32, size: Size) {
        let i = idx as usize;
        assert!(
            is_valid_size(size),
            "invalid size {size:?} allotted to `{}`",
            self.names[i]
        );
        if self.size[i] == size {
            return;
        }
        self.size[i] = size;
        self.bitmap[i].resize(size);
        self.sync_collider(idx);
        self.apply_effects(idx, Effects::RENDER);
        self.batch
            .schedule(BatchKey::Allocate(ComponentId(idx)), None);
        let parent = self.parent[i];
        if parent != INVALID {
            self.batch
                .schedule(BatchKey::Reposition(ComponentId(parent)), None);
        }
    }

    fn recompute_request(&mut self, idx: u32) {
        let i = idx as usize;
        let request = self
            .component_ref(idx)
            .size_request(&SizeCx { tree: self, idx });
        assert!(
            is_valid_size(request.min)
                && request
                    .preferred
                    .is_none_or(|p| is_valid_size(p) && size_le(request.min, p)),
            "`{}` returned an invalid size request {request:?}",
            self.names[i]
        );
        if self.request[i] == Some(request) {
            return;
        }
        self.request[i] = Some(request);

        let parent = self.parent[i];
        if parent != INVALID {
            let slot = self.children[parent as usize]
                .iter()
                .position(|&(_, c)| c == idx)
                .unwrap_or_else(|| unreachable!("child is listed by its parent"));
            self.child_requests[parent as usize][slot] = request;
            let parent = ComponentId(parent);
            self.batch.schedule(BatchKey::SizeRequest(parent), None);
            self.batch.schedule(BatchKey::Allocate(parent), None);
        } else if self.root == idx {
            self.batch.schedule(BatchKey::RootLayout, None);
        }
    }

    fn root_layout(&mut self) {
        let root = self.root;
        if root == INVALID {
            return;
        }
        let request = self.request[root as usize].unwrap_or_default();
        let size = clamp_size(request.natural(), request.min, self.max_size);
        self.allot(root, size);
        let origin = self.origin;
        self.place(root, origin);
    }

    fn allocate(&mut self, idx: u32) {
        if self.children[idx as usize].is_empty() {
            return;
        }
        let sizes = self
            .component_ref(idx)
            .children_sizes(&LayoutCx { tree: self, idx });
        for (key, size) in sizes {
            let child = self.children[idx as usize][self.child_slot(idx, key)].1;
            self.allot(child, size);
        }
        self.batch
            .schedule(BatchKey::Reposition(ComponentId(idx)), None);
    }

    fn reposition(&mut self, idx: u32) {
        let Some(origin) = self.position[idx as usize] else {
            return;
        };
        let children: Vec<(ChildKey, u32)> = self.children[idx as usize].clone();
        for (key, child) in children {
            let offset = self
                .component_ref(idx)
                .child_position(key, &LayoutCx { tree: self, idx });
            let c = child as usize;
            let mut changed = false;
            if self.offset[c] != offset {
                self.offset[c] = offset;
                changed = true;
            }
            changed |= self.place(child, origin + offset.to_vec2());
            if changed {
                self.apply_effects(idx, Effects::RENDER);
            }
        }
    }

    /// Moves `idx` to the absolute `position`; returns whether it moved.
    fn place(&mut self, idx: u32, position: Point) -> bool {
        let i = idx as usize;
        if self.position[i] == Some(position) {
            return false;
        }
        self.position[i] = Some(position);
        self.sync_collider(idx);
        self.batch
            .schedule(BatchKey::Reposition(ComponentId(idx)), None);
        true
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use super::*;
    use crate::component::test_support::{Boxy, Group};

    fn row_of_two() -> (ComponentTree, ComponentId, ComponentId, ComponentId) {
        let mut tree = ComponentTree::new();
        let group = tree.insert(Group::row(2));
        let a = tree.insert(Boxy::new(20.0, 20.0));
        let b = tree.insert(Boxy::new(30.0, 10.0));
        tree.add_child(group, ChildKey(0), a);
        tree.add_child(group, ChildKey(1), b);
        tree.set_root(group);
        (tree, group, a, b)
    }

    #[test]
    fn flush_negotiates_sizes_and_positions() {
        let (mut tree, group, a, b) = row_of_two();
        assert!(tree.handle_batched_updates() > 0);
        assert_eq!(tree.size(group), Size::new(50.0, 20.0));
        assert_eq!(tree.size(a), Size::new(20.0, 20.0));
        assert_eq!(tree.size(b), Size::new(30.0, 10.0));
        assert_eq!(tree.position(group), Point::ZERO);
        assert_eq!(tree.position(a), Point::ZERO);
        assert_eq!(tree.position(b), Point::new(20.0, 0.0));
    }

    #[test]
    fn negotiation_is_idempotent() {
        let (mut tree, group, a, b) = row_of_two();
        tree.handle_batched_updates();
        assert_eq!(tree.handle_batched_updates(), 0, "nothing left to do");

        let before = [tree.size(group), tree.size(a), tree.size(b)];
        tree.request_resize(a);
        tree.request_resize(b);
        tree.request_resize(group);
        assert_eq!(
            tree.handle_batched_updates(),
            3,
            "unchanged requests do not cascade"
        );
        assert_eq!(before, [tree.size(group), tree.size(a), tree.size(b)]);
    }

    #[test]
    fn resize_cascades_to_siblings() {
        let (mut tree, group, a, b) = row_of_two();
        tree.handle_batched_updates();
        tree.update::<Boxy, _>(a, |boxy, inv| boxy.set_size(Size::new(25.0, 40.0), inv));
        tree.handle_batched_updates();
        assert_eq!(tree.size(a), Size::new(25.0, 40.0));
        assert_eq!(tree.size(group), Size::new(55.0, 40.0));
        assert_eq!(tree.position(b), Point::new(25.0, 0.0));
    }

    #[test]
    fn root_is_clamped_to_max_but_not_below_min() {
        let mut tree = ComponentTree::new();
        let root = tree.insert(Boxy::with_request(SizeRequest::new(
            Size::new(40.0, 10.0),
            Some(Size::new(200.0, 30.0)),
        )));
        tree.set_root(root);
        tree.set_size(Size::new(100.0, 20.0));
        tree.handle_batched_updates();
        assert_eq!(tree.size(root), Size::new(100.0, 20.0));

        tree.set_size(Size::new(10.0, 5.0));
        tree.handle_batched_updates();
        assert_eq!(tree.size(root), Size::new(40.0, 10.0), "minimum wins");
    }

    #[test]
    fn origin_moves_the_whole_tree() {
        let (mut tree, group, _, b) = row_of_two();
        tree.handle_batched_updates();
        tree.set_origin(Point::new(5.0, 7.0));
        tree.handle_batched_updates();
        assert_eq!(tree.position(group), Point::new(5.0, 7.0));
        assert_eq!(tree.position(b), Point::new(25.0, 7.0));
    }

    #[test]
    fn allotted_size_round_trips_through_the_bitmap() {
        let (mut tree, _, a, _) = row_of_two();
        tree.handle_batched_updates();
        for size in [Size::new(12.5, 3.25), Size::new(0.0, 0.0), Size::new(7.0, 9.0)] {
            tree.set_allotted_size(a, size);
            assert_eq!(tree.bitmap(a).size(), size);
            assert_eq!(tree.size(a), size);
        }
    }

    #[test]
    fn custom_callbacks_are_deduplicated() {
        let (mut tree, _, _, _) = row_of_two();
        tree.handle_batched_updates();
        let runs = Rc::new(Cell::new(0));
        for _ in 0..5 {
            let runs = runs.clone();
            tree.schedule(9, move |_| runs.set(runs.get() + 1));
        }
        assert!(tree.has_pending_updates());
        assert_eq!(tree.handle_batched_updates(), 1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn callbacks_scheduled_while_flushing_run_in_the_same_flush() {
        let (mut tree, _, a, _) = row_of_two();
        tree.handle_batched_updates();
        tree.schedule(1, move |tree| tree.request_resize(a));
        assert_eq!(tree.handle_batched_updates(), 2);
        assert!(!tree.has_pending_updates());
    }

    #[test]
    #[should_panic(expected = "below minimum")]
    fn inverted_request_panics() {
        let _ = SizeRequest::new(Size::new(10.0, 10.0), Some(Size::new(5.0, 20.0)));
    }

    #[test]
    #[should_panic(expected = "invalid size")]
    fn negative_allotment_panics() {
        let (mut tree, _, a, _) = row_of_two();
        tree.set_allotted_size(a, Size::new(-1.0, 0.0));
    }
}
