// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Component trees track render invalidation with [`understory_dirty`].
//!
//! # Propagation semantics
//!
//! [`RENDER`] has a dependency edge from every parent to each of its
//! children, and is marked with
//! [`EagerPolicy`](understory_dirty::EagerPolicy). Marking a component dirty
//! therefore marks all of its ancestors, since a parent composites its
//! children's bitmaps into its own.
//!
//! # Consumption
//!
//! [`ComponentTree::render`](crate::component::ComponentTree::render) drains
//! the channel in dependency order, so every child is redrawn before the
//! parent that composites it.

use understory_dirty::Channel;

/// Bitmap content is stale and must be redrawn.
pub const RENDER: Channel = Channel::new(0);
