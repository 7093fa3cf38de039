// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component and child identity types.

use core::fmt;

/// Sentinel value indicating "no component" in index fields.
pub(crate) const INVALID: u32 = u32::MAX;

/// A handle to a component in a [`ComponentTree`](super::ComponentTree).
///
/// Trees are append-only, so a handle stays valid for the tree's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// The identifier a parent associates with one of its children.
///
/// Keys are chosen by the parent and only need to be unique among its own
/// children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChildKey(pub u32);
