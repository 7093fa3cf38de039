// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry helpers on top of [`kurbo`].
//!
//! Points, vectors, sizes and rectangles are plain `kurbo` values. This
//! module adds the few helpers the engine needs (component-wise size
//! clamping, rotation) and [`PointStore`], which lets several handles share
//! one mutable point.
//!
//! # Shared points
//!
//! Editors frequently need two views of the same point (a curve's end
//! point and the next curve's start point, say) where moving one moves the
//! other. [`PointStore`] keeps one canonical cell per logical point; a
//! [`PointHandle`] is an index that resolves through a link table to that
//! cell. [`PointStore::link`] redirects a handle to another handle's cell.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Size, Vec2};

/// Clamps `size` component-wise into `[min, max]`.
///
/// `min` wins when the bounds cross, since a component must never be
/// allotted less than its minimum.
#[must_use]
pub fn clamp_size(size: Size, min: Size, max: Size) -> Size {
    Size::new(
        size.width.min(max.width).max(min.width),
        size.height.min(max.height).max(min.height),
    )
}

/// Returns `true` if both components of `size` are finite and non-negative.
#[must_use]
pub fn is_valid_size(size: Size) -> bool {
    size.width.is_finite() && size.height.is_finite() && size.width >= 0.0 && size.height >= 0.0
}

/// Component-wise `a <= b`.
#[must_use]
pub fn size_le(a: Size, b: Size) -> bool {
    a.width <= b.width && a.height <= b.height
}

/// Rotates `v` by `angle` radians counter-clockwise.
#[must_use]
pub fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = (angle.sin(), angle.cos());
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// A handle to a point in a [`PointStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointHandle(u32);

/// Arena of shared mutable points.
///
/// Each handle maps to a canonical cell. Linked handles map to the same
/// cell, so a write through one is observed through all of them.
#[derive(Clone, Debug, Default)]
pub struct PointStore {
    cells: Vec<Point>,
    /// Handle index → cell index.
    links: Vec<u32>,
}

impl PointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a point with its own cell and returns its handle.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "point stores never approach u32::MAX entries"
    )]
    pub fn insert(&mut self, point: Point) -> PointHandle {
        let cell = self.cells.len() as u32;
        self.cells.push(point);
        let handle = self.links.len() as u32;
        self.links.push(cell);
        PointHandle(handle)
    }

    /// Returns the current value of the point behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this store.
    #[must_use]
    pub fn get(&self, handle: PointHandle) -> Point {
        self.cells[self.cell(handle)]
    }

    /// Writes the point behind `handle` (and every handle linked to it).
    pub fn set(&mut self, handle: PointHandle, point: Point) {
        let cell = self.cell(handle);
        self.cells[cell] = point;
    }

    /// Moves the point behind `handle` by `delta`.
    pub fn translate(&mut self, handle: PointHandle, delta: Vec2) {
        let cell = self.cell(handle);
        self.cells[cell] += delta;
    }

    /// Makes `follower` resolve to `leader`'s cell.
    ///
    /// Every handle that already shared `follower`'s cell moves along with
    /// it, so links compose transitively. The follower's old value is
    /// discarded.
    pub fn link(&mut self, leader: PointHandle, follower: PointHandle) {
        let to = self.link_of(leader);
        let from = self.link_of(follower);
        if to == from {
            return;
        }
        for cell in &mut self.links {
            if *cell == from {
                *cell = to;
            }
        }
    }

    /// Returns `true` if both handles resolve to the same cell.
    #[must_use]
    pub fn is_linked(&self, a: PointHandle, b: PointHandle) -> bool {
        self.cell(a) == self.cell(b)
    }

    /// Returns the number of handles issued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if no handles were issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn cell(&self, handle: PointHandle) -> usize {
        self.link_of(handle) as usize
    }

    fn link_of(&self, handle: PointHandle) -> u32 {
        assert!(
            (handle.0 as usize) < self.links.len(),
            "foreign PointHandle: {handle:?}"
        );
        self.links[handle.0 as usize]
    }
}
