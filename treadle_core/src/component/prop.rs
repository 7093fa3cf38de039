// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-tracked component properties.
//!
//! A [`Prop`] pairs a value with the [`Effects`] a change to it has. Setting
//! a prop to a value equal to the current one is a no-op; otherwise the
//! effects are recorded in an [`Invalidation`] that
//! [`ComponentTree::update`](super::ComponentTree::update) applies once the
//! closure returns.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// A set of invalidation effects.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Effects(u8);

impl Effects {
    /// No effect.
    pub const NONE: Self = Self(0);
    /// The component's size request must be recomputed.
    pub const RESIZE: Self = Self(1);
    /// The component's bitmap must be redrawn.
    pub const RENDER: Self = Self(1 << 1);
    /// The component's children must be repositioned.
    pub const REPOSITION: Self = Self(1 << 2);
    /// The component's allotted size must be split among its children
    /// again.
    pub const REALLOCATE: Self = Self(1 << 3);

    /// Returns `true` if every effect in `other` is in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` for the empty set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Effects {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Effects {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Effects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        if self.contains(Self::RESIZE) {
            set.entry(&"RESIZE");
        }
        if self.contains(Self::RENDER) {
            set.entry(&"RENDER");
        }
        if self.contains(Self::REPOSITION) {
            set.entry(&"REPOSITION");
        }
        if self.contains(Self::REALLOCATE) {
            set.entry(&"REALLOCATE");
        }
        set.finish()
    }
}

/// Effects collected while a component is being updated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invalidation {
    effects: Effects,
}

impl Invalidation {
    /// Records `effects`.
    pub fn add(&mut self, effects: Effects) {
        self.effects |= effects;
    }

    /// Returns everything recorded so far.
    #[must_use]
    pub const fn effects(&self) -> Effects {
        self.effects
    }
}

/// A value that records effects when it changes.
pub struct Prop<T> {
    value: T,
    effects: Effects,
    eq: fn(&T, &T) -> bool,
}

impl<T: fmt::Debug> fmt::Debug for Prop<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prop")
            .field("value", &self.value)
            .field("effects", &self.effects)
            .finish_non_exhaustive()
    }
}

impl<T: PartialEq> Prop<T> {
    /// Creates a prop compared with `PartialEq`.
    pub fn new(value: T, effects: Effects) -> Self {
        Self::with_eq(value, effects, T::eq)
    }
}

impl<T> Prop<T> {
    /// Creates a prop with a custom equality.
    pub fn with_eq(value: T, effects: Effects, eq: fn(&T, &T) -> bool) -> Self {
        Self { value, effects, eq }
    }

    /// Returns the current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Returns the effects a change has.
    pub fn effects(&self) -> Effects {
        self.effects
    }

    /// Replaces the value if it differs, recording the effects.
    ///
    /// Returns whether the value changed.
    pub fn set(&mut self, value: T, invalidation: &mut Invalidation) -> bool {
        if (self.eq)(&self.value, &value) {
            return false;
        }
        self.value = value;
        invalidation.add(self.effects);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_value_is_a_no_op() {
        let mut prop = Prop::new(3, Effects::RESIZE | Effects::RENDER);
        let mut inv = Invalidation::default();
        assert!(!prop.set(3, &mut inv));
        assert!(inv.effects().is_empty());
        assert!(prop.set(4, &mut inv));
        assert_eq!(*prop.get(), 4);
        assert!(inv.effects().contains(Effects::RESIZE));
        assert!(inv.effects().contains(Effects::RENDER));
        assert!(!inv.effects().contains(Effects::REPOSITION));
    }

    #[test]
    fn custom_equality() {
        let mut prop = Prop::with_eq(1.0_f64, Effects::RENDER, |a, b| (a - b).abs() < 0.5);
        let mut inv = Invalidation::default();
        assert!(!prop.set(1.2, &mut inv), "within tolerance");
        assert!(prop.set(2.0, &mut inv));
        assert_eq!(inv.effects(), Effects::RENDER);
    }
}
