// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contexts handed to [`Component`](super::Component) callbacks.

use alloc::vec::Vec;

use kurbo::{Point, Size};

use super::bitmap::Bitmap;
use super::id::{ChildKey, ComponentId};
use super::layout::SizeRequest;
use super::tree::ComponentTree;
use super::Component;

/// Child-table accessors shared by the request and allocation contexts.
macro_rules! child_table_accessors {
    () => {
        /// Returns the id of the component being asked.
        #[must_use]
        pub fn id(&self) -> ComponentId {
            ComponentId(self.idx)
        }

        /// Returns the number of children.
        #[must_use]
        pub fn child_count(&self) -> usize {
            self.tree.children[self.idx as usize].len()
        }

        /// Returns every child key with its cached size request, in
        /// insertion order.
        pub fn child_requests(&self) -> impl Iterator<Item = (ChildKey, SizeRequest)> + '_ {
            let i = self.idx as usize;
            self.tree.children[i]
                .iter()
                .map(|&(key, _)| key)
                .zip(self.tree.child_requests[i].iter().copied())
        }

        /// Returns the cached size request of child `key`.
        ///
        /// # Panics
        ///
        /// Panics if there is no child with that key.
        #[must_use]
        pub fn child_request(&self, key: ChildKey) -> SizeRequest {
            let pos = self.tree.child_slot(self.idx, key);
            self.tree.child_requests[self.idx as usize][pos]
        }

        /// Returns the key and cached request of the only child.
        ///
        /// # Panics
        ///
        /// Panics unless the component has exactly one child.
        #[must_use]
        pub fn single_child(&self) -> (ChildKey, SizeRequest) {
            let count = self.child_count();
            assert!(
                count == 1,
                "`{}` expects exactly one child, found {count}",
                self.tree.names[self.idx as usize]
            );
            let i = self.idx as usize;
            (self.tree.children[i][0].0, self.tree.child_requests[i][0])
        }

        /// Measures `text` with the tree's text measurer.
        #[must_use]
        pub fn measure_text(&self, text: &str, font_size: f64) -> Size {
            self.tree.text.measure(text, font_size)
        }
    };
}

/// Context for [`Component::size_request`].
pub struct SizeCx<'a> {
    pub(crate) tree: &'a ComponentTree,
    pub(crate) idx: u32,
}

impl SizeCx<'_> {
    child_table_accessors!();
}

impl core::fmt::Debug for SizeCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SizeCx")
            .field("idx", &self.idx)
            .finish_non_exhaustive()
    }
}

/// Context for [`Component::children_sizes`] and
/// [`Component::child_position`].
pub struct LayoutCx<'a> {
    pub(crate) tree: &'a ComponentTree,
    pub(crate) idx: u32,
}

impl LayoutCx<'_> {
    child_table_accessors!();

    /// Returns the size allotted to the component.
    #[must_use]
    pub fn size(&self) -> Size {
        self.tree.size[self.idx as usize]
    }

    /// Returns the size allotted to child `key` so far.
    #[must_use]
    pub fn child_size(&self, key: ChildKey) -> Size {
        let pos = self.tree.child_slot(self.idx, key);
        let child = self.tree.children[self.idx as usize][pos].1;
        self.tree.size[child as usize]
    }
}

impl core::fmt::Debug for LayoutCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutCx")
            .field("idx", &self.idx)
            .finish_non_exhaustive()
    }
}

/// Context for [`Component::init`].
///
/// Components that build their children lazily do so here.
pub struct InitCx<'a> {
    pub(crate) tree: &'a mut ComponentTree,
    pub(crate) idx: u32,
}

impl InitCx<'_> {
    /// Returns the id of the component being initialised.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        ComponentId(self.idx)
    }

    /// Inserts `component` and attaches it as child `key`. It is
    /// initialised immediately.
    pub fn add_child(&mut self, key: ChildKey, component: impl Component) -> ComponentId {
        let child = self.tree.insert(component);
        self.tree.add_child(ComponentId(self.idx), key, child);
        child
    }

    /// Measures `text` with the tree's text measurer.
    #[must_use]
    pub fn measure_text(&self, text: &str, font_size: f64) -> Size {
        self.tree.text.measure(text, font_size)
    }
}

impl core::fmt::Debug for InitCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InitCx")
            .field("idx", &self.idx)
            .finish_non_exhaustive()
    }
}

/// Context for [`Component::render`].
///
/// The component's bitmap is cleared before `render` is called; children
/// have already been rendered into theirs.
pub struct RenderCx<'a> {
    pub(crate) tree: &'a ComponentTree,
    pub(crate) idx: u32,
    pub(crate) bitmap: &'a mut Bitmap,
}

impl RenderCx<'_> {
    /// Returns the id of the component being rendered.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        ComponentId(self.idx)
    }

    /// Returns the allotted size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.bitmap.size()
    }

    /// Returns the component's own bitmap.
    pub fn bitmap_mut(&mut self) -> &mut Bitmap {
        self.bitmap
    }

    /// Returns the child keys in insertion order.
    #[must_use]
    pub fn child_keys(&self) -> Vec<ChildKey> {
        self.tree.children[self.idx as usize]
            .iter()
            .map(|&(key, _)| key)
            .collect()
    }

    /// Composites child `key`'s bitmap at its position, with its opacity.
    ///
    /// # Panics
    ///
    /// Panics if there is no child with that key.
    pub fn draw_child(&mut self, key: ChildKey) {
        let pos = self.tree.child_slot(self.idx, key);
        let child = self.tree.children[self.idx as usize][pos].1 as usize;
        let opacity = self.tree.components[child]
            .as_deref()
            .map_or(1.0, |c| c.opacity());
        let offset: Point = self.tree.offset[child];
        self.bitmap.draw(&self.tree.bitmap[child], offset, opacity);
    }

    /// Composites every child in insertion order.
    pub fn draw_children(&mut self) {
        for key in self.child_keys() {
            self.draw_child(key);
        }
    }

    /// Measures `text` with the tree's text measurer.
    #[must_use]
    pub fn measure_text(&self, text: &str, font_size: f64) -> Size {
        self.tree.text.measure(text, font_size)
    }
}

impl core::fmt::Debug for RenderCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderCx")
            .field("idx", &self.idx)
            .field("size", &self.bitmap.size())
            .finish_non_exhaustive()
    }
}
