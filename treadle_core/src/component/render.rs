// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render pass.

use alloc::vec::Vec;

use super::bitmap::Bitmap;
use super::context::RenderCx;
use super::id::{ComponentId, INVALID};
use super::tree::ComponentTree;
use crate::dirty;
use crate::error::FrameError;

impl ComponentTree {
    /// Redraws every component marked for rendering, children before the
    /// parents that composite them, and returns the redrawn components in
    /// that order.
    ///
    /// A component whose [`opacity`](super::Component::opacity) is zero is
    /// skipped and stays marked.
    ///
    /// On failure the remaining components stay marked, so a later pass
    /// retries them.
    pub fn render(&mut self) -> Result<Vec<ComponentId>, FrameError> {
        let order: Vec<u32> = self.dirty.drain(dirty::RENDER).deterministic().run().collect();
        let mut rendered = Vec::with_capacity(order.len());
        for (n, &idx) in order.iter().enumerate() {
            let i = idx as usize;
            let Some(mut component) = self.components[i].take() else {
                continue;
            };
            if component.opacity() == 0.0 {
                self.components[i] = Some(component);
                self.dirty.mark(idx, dirty::RENDER);
                continue;
            }

            let mut bitmap = core::mem::take(&mut self.bitmap[i]);
            bitmap.clear();
            let result = component.render(&mut RenderCx {
                tree: self,
                idx,
                bitmap: &mut bitmap,
            });
            self.bitmap[i] = bitmap;
            self.components[i] = Some(component);

            if let Err(source) = result {
                for &rest in &order[n..] {
                    self.dirty.mark(rest, dirty::RENDER);
                }
                let name = self.names[i].clone();
                tracing::debug!(component = %name, "component failed to render");
                return Err(FrameError::Render { name, source });
            }
            tracing::trace!(component = %self.names[i], "component rendered");
            rendered.push(ComponentId(idx));
        }
        Ok(rendered)
    }

    /// Returns the root's bitmap, the composed image of the whole tree.
    #[must_use]
    pub fn image(&self) -> Option<&Bitmap> {
        (self.root != INVALID).then(|| &self.bitmap[self.root as usize])
    }
}
