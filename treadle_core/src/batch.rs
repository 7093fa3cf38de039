// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deduplicating deferred-work queue.
//!
//! A [`Batch`] maps a *distinctness key* to a pending callback. Scheduling
//! the same key twice before the batch is drained keeps a single entry: the
//! newer callback replaces the older one but the entry keeps its original
//! queue position. Entries are handed out in insertion order.
//!
//! Every component tree owns exactly one batch; layout recomputations are
//! keyed by "which recomputation, for which node" so that many property
//! writes in one tick collapse into one recomputation per node.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};

/// A deduplicating FIFO of keyed callbacks.
pub struct Batch<K, F = Box<dyn FnOnce()>> {
    order: VecDeque<K>,
    entries: BTreeMap<K, F>,
}

impl<K, F> core::fmt::Debug for Batch<K, F>
where
    K: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Batch")
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl<K: Ord + Clone, F> Default for Batch<K, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, F> Batch<K, F> {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            entries: BTreeMap::new(),
        }
    }

    /// Queues `callback` under `key`.
    ///
    /// Returns `true` if the key was not already queued. If it was, the
    /// callback replaces the queued one and the queue position is kept.
    pub fn schedule(&mut self, key: K, callback: F) -> bool {
        if self.entries.insert(key.clone(), callback).is_some() {
            return false;
        }
        self.order.push_back(key);
        true
    }

    /// Removes and returns the oldest entry.
    pub fn pop(&mut self) -> Option<(K, F)> {
        let key = self.order.pop_front()?;
        let callback = self.entries.remove(&key)?;
        Some((key, callback))
    }

    /// Returns `true` if `key` is currently queued.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops every queued entry without running it.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

impl<K: Ord + Clone> Batch<K, Box<dyn FnOnce()>> {
    /// Runs every queued callback once, in insertion order, and returns how
    /// many ran.
    pub fn trigger(&mut self) -> usize {
        let mut ran = 0;
        while let Some((_, callback)) = self.pop() {
            callback();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    use super::*;

    #[test]
    fn same_key_runs_once() {
        let runs = Rc::new(Cell::new(0));
        let mut batch: Batch<&'static str> = Batch::new();
        for _ in 0..10 {
            let runs = runs.clone();
            batch.schedule("recompute-parent", Box::new(move || runs.set(runs.get() + 1)));
        }
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.trigger(), 1);
        assert_eq!(runs.get(), 1, "ten writes collapse into one recomputation");
        assert!(batch.is_empty());
    }

    #[test]
    fn insertion_order_is_kept_and_later_callback_wins() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut batch: Batch<u32> = Batch::new();
        let push = |tag: &'static str| {
            let log = log.clone();
            Box::new(move || log.borrow_mut().push(tag)) as Box<dyn FnOnce()>
        };

        assert!(batch.schedule(2, push("first-2")));
        assert!(batch.schedule(1, push("1")));
        assert!(!batch.schedule(2, push("second-2")));
        batch.trigger();

        assert_eq!(*log.borrow(), vec!["second-2", "1"]);
    }

    #[test]
    fn pop_and_contains() {
        let mut batch: Batch<u8, u8> = Batch::new();
        batch.schedule(5, 50);
        batch.schedule(3, 30);
        assert!(batch.contains(&3));
        assert_eq!(batch.pop(), Some((5, 50)));
        assert_eq!(batch.pop(), Some((3, 30)));
        assert_eq!(batch.pop(), None);
        assert!(!batch.contains(&3));
    }

    #[test]
    fn key_can_be_requeued_after_it_ran() {
        let mut batch: Batch<u8, ()> = Batch::new();
        assert!(batch.schedule(1, ()));
        let _ = batch.pop();
        assert!(batch.schedule(1, ()), "a drained key is a fresh entry");
    }

    #[test]
    fn clear_drops_entries() {
        let mut batch: Batch<u8, ()> = Batch::new();
        batch.schedule(1, ());
        batch.schedule(2, ());
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.pop(), None);
    }
}
