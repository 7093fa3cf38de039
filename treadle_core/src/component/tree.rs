// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays component storage, lifecycle, and property updates.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::fmt;

use kurbo::{Point, Size};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::bitmap::Bitmap;
use super::context::InitCx;
use super::hit::Collider;
use super::id::{ChildKey, ComponentId, INVALID};
use super::layout::{BatchKey, SizeRequest, TreeCallback};
use super::prop::{Effects, Invalidation};
use super::text::{MonospaceMeasure, TextMeasure};
use super::Component;
use crate::batch::Batch;
use crate::dirty;

/// Lifecycle of a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Inserted but not reachable from the root.
    Unattached,
    /// Attached; `init` is running.
    Initialising,
    /// Steady state: property changes schedule layout and render work.
    Initialised,
}

/// A retained tree of components plus the root adapter that connects it to
/// the host.
///
/// Components are addressed by [`ComponentId`] handles. Each component
/// occupies a slot in parallel arrays that hold the engine-owned state: its
/// bitmap, allotted size, resolved position, children, cached child size
/// requests, and lifecycle. The boxed [`Component`] holds only the node
/// kind's own properties.
///
/// Trees are append-only: components cannot be detached once attached.
pub struct ComponentTree {
    // -- Components --
    pub(crate) components: Vec<Option<Box<dyn Component>>>,
    pub(crate) names: Vec<String>,
    pub(crate) child_limit: Vec<usize>,
    pub(crate) lifecycle: Vec<Lifecycle>,
    pub(crate) deferred: Vec<Effects>,

    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) children: Vec<Vec<(ChildKey, u32)>>,

    // -- Layout --
    /// Per-parent cache of child size requests, parallel to `children`.
    pub(crate) child_requests: Vec<Vec<SizeRequest>>,
    pub(crate) request: Vec<Option<SizeRequest>>,
    pub(crate) size: Vec<Size>,
    /// Position relative to the parent.
    pub(crate) offset: Vec<Point>,
    /// Absolute position, `None` until the first layout pass reaches it.
    pub(crate) position: Vec<Option<Point>>,

    // -- Rendering --
    pub(crate) bitmap: Vec<Bitmap>,
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) collider: Vec<Option<Collider>>,

    // -- Root adapter --
    pub(crate) root: u32,
    pub(crate) origin: Point,
    pub(crate) max_size: Size,

    // -- Deferred work --
    pub(crate) batch: Batch<BatchKey, Option<TreeCallback>>,
    pub(crate) text: Box<dyn TextMeasure>,
}

impl fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTree")
            .field("len", &self.components.len())
            .field("root", &(self.root != INVALID).then_some(ComponentId(self.root)))
            .field("origin", &self.origin)
            .field("max_size", &self.max_size)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

impl Default for ComponentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentTree {
    /// Creates an empty tree with monospace text measurement and an
    /// unbounded maximum size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            names: Vec::new(),
            child_limit: Vec::new(),
            lifecycle: Vec::new(),
            deferred: Vec::new(),
            parent: Vec::new(),
            children: Vec::new(),
            child_requests: Vec::new(),
            request: Vec::new(),
            size: Vec::new(),
            offset: Vec::new(),
            position: Vec::new(),
            bitmap: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            collider: Vec::new(),
            root: INVALID,
            origin: Point::ZERO,
            max_size: Size::new(f64::INFINITY, f64::INFINITY),
            batch: Batch::new(),
            text: Box::new(MonospaceMeasure::DEFAULT),
        }
    }

    /// Replaces the text measurer.
    ///
    /// Size requests computed with the old measurer are not invalidated.
    pub fn set_text_measure(&mut self, measure: impl TextMeasure + 'static) {
        self.text = Box::new(measure);
    }

    /// Returns the text measurer.
    #[must_use]
    pub fn text_measure(&self) -> &dyn TextMeasure {
        &*self.text
    }

    // -- Allocation API --

    /// Inserts an unattached component and returns its handle.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "component counts never approach u32::MAX"
    )]
    pub fn insert(&mut self, component: impl Component) -> ComponentId {
        let idx = self.components.len() as u32;
        self.names.push(String::from(component.name()));
        self.child_limit.push(component.child_limit());
        self.components.push(Some(Box::new(component)));
        self.lifecycle.push(Lifecycle::Unattached);
        self.deferred.push(Effects::NONE);
        self.parent.push(INVALID);
        self.children.push(Vec::new());
        self.child_requests.push(Vec::new());
        self.request.push(None);
        self.size.push(Size::ZERO);
        self.offset.push(Point::ZERO);
        self.position.push(None);
        self.bitmap.push(Bitmap::default());
        self.collider.push(None);
        ComponentId(idx)
    }

    /// Returns the number of components, attached or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if no component was inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    // -- Topology API --

    /// Attaches `child` to `parent` under `key`.
    ///
    /// If `parent` is already attached, `child` is initialised immediately;
    /// otherwise it waits until `parent` is.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is at its child limit, already has a child with
    /// `key`, or if `child` already has a parent or is the root.
    pub fn add_child(&mut self, parent: ComponentId, key: ChildKey, child: ComponentId) {
        let p = self.validate(parent);
        let c = self.validate(child);
        assert!(p != c, "a component cannot be its own child");
        assert!(
            self.parent[c as usize] == INVALID && self.root != c,
            "`{}` is already attached",
            self.names[c as usize]
        );
        let limit = self.child_limit[p as usize];
        assert!(
            self.children[p as usize].len() < limit,
            "child limit of `{}` exceeded ({limit})",
            self.names[p as usize]
        );
        assert!(
            !self.children[p as usize].iter().any(|&(k, _)| k == key),
            "`{}` already has a child with {key:?}",
            self.names[p as usize]
        );

        self.parent[c as usize] = p;
        self.children[p as usize].push((key, c));
        self.child_requests[p as usize].push(SizeRequest::default());

        // The parent's bitmap composites the child's, so it depends on it.
        let _ = self.dirty.add_dependency(p, c, dirty::RENDER);

        if self.lifecycle[p as usize] != Lifecycle::Unattached {
            self.initialise(c);
        }
    }

    /// Installs `child` as the single top-level component and initialises
    /// it.
    ///
    /// # Panics
    ///
    /// Panics if the tree already has a root or if `child` has a parent.
    pub fn set_root(&mut self, child: ComponentId) {
        let c = self.validate(child);
        assert!(self.root == INVALID, "tree already has a root");
        assert!(
            self.parent[c as usize] == INVALID,
            "`{}` is already attached",
            self.names[c as usize]
        );
        self.root = c;
        self.initialise(c);
        self.batch.schedule(BatchKey::RootLayout, None);
    }

    /// Returns the top-level component, if one is installed.
    #[must_use]
    pub fn root(&self) -> Option<ComponentId> {
        (self.root != INVALID).then_some(ComponentId(self.root))
    }

    /// Returns the parent of `id`, or `None` for the root and unattached
    /// components.
    #[must_use]
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        let p = self.parent[self.validate(id) as usize];
        (p != INVALID).then_some(ComponentId(p))
    }

    /// Returns the children of `id` with their keys, in insertion order.
    #[must_use]
    pub fn children(&self, id: ComponentId) -> Vec<(ChildKey, ComponentId)> {
        self.children[self.validate(id) as usize]
            .iter()
            .map(|&(key, c)| (key, ComponentId(c)))
            .collect()
    }

    /// Returns the child of `parent` attached under `key`.
    ///
    /// # Panics
    ///
    /// Panics if there is no such child.
    #[must_use]
    pub fn child(&self, parent: ComponentId, key: ChildKey) -> ComponentId {
        let p = self.validate(parent);
        ComponentId(self.children[p as usize][self.child_slot(p, key)].1)
    }

    // -- Property getters --

    /// Returns the display name of `id`.
    #[must_use]
    pub fn name(&self, id: ComponentId) -> &str {
        &self.names[self.validate(id) as usize]
    }

    /// Returns the lifecycle state of `id`.
    #[must_use]
    pub fn lifecycle(&self, id: ComponentId) -> Lifecycle {
        self.lifecycle[self.validate(id) as usize]
    }

    /// Returns the component behind `id` as a trait object.
    #[must_use]
    pub fn component(&self, id: ComponentId) -> &dyn Component {
        self.component_ref(self.validate(id))
    }

    /// Returns the component behind `id` as its concrete type.
    ///
    /// # Panics
    ///
    /// Panics if the component is not a `C`.
    #[must_use]
    pub fn get<C: Component>(&self, id: ComponentId) -> &C {
        let idx = self.validate(id);
        let any: &dyn Any = self.component_ref(idx);
        any.downcast_ref::<C>().unwrap_or_else(|| {
            panic!(
                "`{}` is not a {}",
                self.names[idx as usize],
                type_name::<C>()
            )
        })
    }

    /// Returns the allotted size of `id`.
    #[must_use]
    pub fn size(&self, id: ComponentId) -> Size {
        self.size[self.validate(id) as usize]
    }

    /// Returns the last computed size request of `id`.
    #[must_use]
    pub fn size_request(&self, id: ComponentId) -> Option<SizeRequest> {
        self.request[self.validate(id) as usize]
    }

    /// Returns the absolute position of `id`, if layout has reached it.
    #[must_use]
    pub fn try_position(&self, id: ComponentId) -> Option<Point> {
        self.position[self.validate(id) as usize]
    }

    /// Returns the absolute position of `id`.
    ///
    /// # Panics
    ///
    /// Panics if layout has not resolved the position yet.
    #[must_use]
    pub fn position(&self, id: ComponentId) -> Point {
        let idx = self.validate(id);
        self.position[idx as usize].unwrap_or_else(|| {
            panic!(
                "position of `{}` is not resolved yet",
                self.names[idx as usize]
            )
        })
    }

    /// Returns the bitmap of `id`.
    #[must_use]
    pub fn bitmap(&self, id: ComponentId) -> &Bitmap {
        &self.bitmap[self.validate(id) as usize]
    }

    // -- Mutation API --

    /// Runs `f` on the component behind `id` and applies the effects it
    /// records.
    ///
    /// Before the component is initialised, effects are remembered and
    /// applied once it is.
    ///
    /// # Panics
    ///
    /// Panics if the component is not a `C`.
    pub fn update<C: Component, R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut C, &mut Invalidation) -> R,
    ) -> R {
        let idx = self.validate(id);
        let mut invalidation = Invalidation::default();
        let result = {
            let component = self.components[idx as usize]
                .as_deref_mut()
                .unwrap_or_else(|| panic!("component {id:?} is busy"));
            let any: &mut dyn Any = component;
            let Some(concrete) = any.downcast_mut::<C>() else {
                panic!(
                    "`{}` is not a {}",
                    self.names[idx as usize],
                    type_name::<C>()
                );
            };
            f(concrete, &mut invalidation)
        };
        self.apply_effects(idx, invalidation.effects());
        result
    }

    /// Marks `id` for redraw.
    pub fn request_render(&mut self, id: ComponentId) {
        let idx = self.validate(id);
        self.apply_effects(idx, Effects::RENDER);
    }

    /// Schedules a size-request recomputation for `id`.
    pub fn request_resize(&mut self, id: ComponentId) {
        let idx = self.validate(id);
        self.apply_effects(idx, Effects::RESIZE);
    }

    // -- Internals --

    pub(crate) fn validate(&self, id: ComponentId) -> u32 {
        assert!(
            (id.0 as usize) < self.components.len(),
            "stale or foreign {id:?}"
        );
        id.0
    }

    pub(crate) fn component_ref(&self, idx: u32) -> &dyn Component {
        self.components[idx as usize]
            .as_deref()
            .unwrap_or_else(|| panic!("component {} is busy", self.names[idx as usize]))
    }

    /// Returns the position of `key` in `parent`'s child table.
    pub(crate) fn child_slot(&self, parent: u32, key: ChildKey) -> usize {
        self.children[parent as usize]
            .iter()
            .position(|&(k, _)| k == key)
            .unwrap_or_else(|| {
                panic!(
                    "`{}` has no child with {key:?}",
                    self.names[parent as usize]
                )
            })
    }

    /// Applies `effects` to `idx`, or defers them until it is initialised.
    pub(crate) fn apply_effects(&mut self, idx: u32, effects: Effects) {
        if effects.is_empty() {
            return;
        }
        if self.lifecycle[idx as usize] != Lifecycle::Initialised {
            self.deferred[idx as usize] |= effects;
            return;
        }
        let id = ComponentId(idx);
        if effects.contains(Effects::RESIZE) {
            self.batch.schedule(BatchKey::SizeRequest(id), None);
        }
        if effects.contains(Effects::RENDER) {
            self.dirty.mark_with(idx, dirty::RENDER, &EagerPolicy);
        }
        if effects.contains(Effects::REPOSITION) {
            self.batch.schedule(BatchKey::Reposition(id), None);
        }
        if effects.contains(Effects::REALLOCATE) {
            self.batch.schedule(BatchKey::Allocate(id), None);
        }
    }

    /// Runs the initialising cascade for `idx`.
    fn initialise(&mut self, idx: u32) {
        let i = idx as usize;
        self.lifecycle[i] = Lifecycle::Initialising;

        // Children attached while this component was unattached.
        let pending: Vec<u32> = self.children[i].iter().map(|&(_, c)| c).collect();
        for c in pending {
            if self.lifecycle[c as usize] == Lifecycle::Unattached {
                self.initialise(c);
            }
        }

        let Some(mut component) = self.components[i].take() else {
            panic!("component {} is busy", self.names[i]);
        };
        component.init(&mut InitCx { tree: self, idx });
        self.components[i] = Some(component);

        self.lifecycle[i] = Lifecycle::Initialised;
        tracing::trace!(component = %self.names[i], "component initialised");
        let deferred = core::mem::take(&mut self.deferred[i]);
        self.apply_effects(idx, deferred | Effects::RESIZE | Effects::RENDER);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::component::test_support::{Boxy, Group};

    #[test]
    fn insert_starts_unattached() {
        let mut tree = ComponentTree::new();
        let id = tree.insert(Boxy::new(10.0, 10.0));
        assert_eq!(tree.lifecycle(id), Lifecycle::Unattached);
        assert_eq!(tree.name(id), "Boxy");
        assert_eq!(tree.try_position(id), None);
        assert_eq!(tree.parent(id), None);
    }

    #[test]
    fn attaching_cascades_initialisation() {
        let mut tree = ComponentTree::new();
        let group = tree.insert(Group::row(2));
        let a = tree.insert(Boxy::new(1.0, 1.0));
        tree.add_child(group, ChildKey(0), a);
        assert_eq!(tree.lifecycle(a), Lifecycle::Unattached, "parent is pending");

        tree.set_root(group);
        assert_eq!(tree.lifecycle(group), Lifecycle::Initialised);
        assert_eq!(tree.lifecycle(a), Lifecycle::Initialised);

        let b = tree.insert(Boxy::new(1.0, 1.0));
        tree.add_child(group, ChildKey(1), b);
        assert_eq!(tree.lifecycle(b), Lifecycle::Initialised, "attached parent");
        assert_eq!(
            tree.children(group),
            vec![(ChildKey(0), a), (ChildKey(1), b)]
        );
        assert_eq!(tree.child(group, ChildKey(1)), b);
        assert_eq!(tree.parent(b), Some(group));
    }

    #[test]
    #[should_panic(expected = "child limit")]
    fn child_limit_is_enforced() {
        let mut tree = ComponentTree::new();
        let group = tree.insert(Group::row(1));
        let a = tree.insert(Boxy::new(1.0, 1.0));
        let b = tree.insert(Boxy::new(1.0, 1.0));
        tree.add_child(group, ChildKey(0), a);
        tree.add_child(group, ChildKey(1), b);
    }

    #[test]
    #[should_panic(expected = "already has a child")]
    fn duplicate_keys_panic() {
        let mut tree = ComponentTree::new();
        let group = tree.insert(Group::row(2));
        let a = tree.insert(Boxy::new(1.0, 1.0));
        let b = tree.insert(Boxy::new(1.0, 1.0));
        tree.add_child(group, ChildKey(0), a);
        tree.add_child(group, ChildKey(0), b);
    }

    #[test]
    #[should_panic(expected = "already attached")]
    fn reparenting_panics() {
        let mut tree = ComponentTree::new();
        let g1 = tree.insert(Group::row(1));
        let g2 = tree.insert(Group::row(1));
        let a = tree.insert(Boxy::new(1.0, 1.0));
        tree.add_child(g1, ChildKey(0), a);
        tree.add_child(g2, ChildKey(0), a);
    }

    #[test]
    #[should_panic(expected = "not resolved")]
    fn unresolved_position_panics() {
        let mut tree = ComponentTree::new();
        let a = tree.insert(Boxy::new(1.0, 1.0));
        let _ = tree.position(a);
    }

    #[test]
    #[should_panic(expected = "stale or foreign")]
    fn foreign_id_panics() {
        let mut other = ComponentTree::new();
        other.insert(Boxy::new(1.0, 1.0));
        let foreign = other.insert(Boxy::new(1.0, 1.0));
        let tree = ComponentTree::new();
        let _ = tree.name(foreign);
    }

    #[test]
    fn update_before_init_is_deferred() {
        let mut tree = ComponentTree::new();
        let a = tree.insert(Boxy::new(1.0, 1.0));
        tree.update::<Boxy, _>(a, |b, inv| b.set_size(Size::new(5.0, 5.0), inv));
        assert!(tree.batch.is_empty(), "nothing scheduled while unattached");
        assert!(tree.deferred[a.0 as usize].contains(Effects::RESIZE));

        tree.set_root(a);
        assert!(tree.deferred[a.0 as usize].is_empty());
        assert!(tree.batch.contains(&BatchKey::SizeRequest(a)));
    }

    #[test]
    fn get_downcasts() {
        let mut tree = ComponentTree::new();
        let a = tree.insert(Boxy::new(3.0, 4.0));
        assert_eq!(tree.get::<Boxy>(a).size(), Size::new(3.0, 4.0));
    }

    #[test]
    #[should_panic(expected = "is not a")]
    fn wrong_type_panics() {
        let mut tree = ComponentTree::new();
        let a = tree.insert(Boxy::new(3.0, 4.0));
        let _ = tree.get::<Group>(a);
    }

    #[test]
    fn init_can_build_children() {
        let mut tree = ComponentTree::new();
        let g = tree.insert(Group::row(4).with_initial_children(3));
        tree.set_root(g);
        assert_eq!(tree.children(g).len(), 3);
        for (_, c) in tree.children(g) {
            assert_eq!(tree.lifecycle(c), Lifecycle::Initialised);
        }
    }
}
