// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scenery Compose: render-tree linearization with merged-picture caching.
//!
//! A render tree of composite containers and painted leaves is flattened into a stack-shaped
//! instruction list, then replayed into a scene builder:
//!
//! - [`RenderTreeNode::compose`] appends instructions to a [`Recorder`]: each
//!   [`CompositeNode`] opens its [`CompositeAttributes`] as scopes around its children, each
//!   [`PaintNode`] appends one draw.
//! - [`Recorder::finish`] walks the list once. Consecutive paint nodes are drawn into a single
//!   picture, looked up in and stored into a [`CacheContext`] so unchanged runs are reused on
//!   the next frame. Entries unused for [`PICTURE_UNUSED_LIFECYCLE_THRESHOLD`] frames are
//!   dropped.
//! - [`DrawContextSubmitter`] runs both steps for one presentation target and keeps at most one
//!   scene in flight.
//!
//! ## Example
//!
//! ```
//! use kurbo::{Rect, Size};
//! use scenery_compose::{CacheContext, CompositeNode, LayerKind, PaintNode, Recorder};
//! use scenery_graph::{IdAllocator, Paint};
//!
//! let ids = IdAllocator::new();
//! let root = CompositeNode::new(&ids);
//! root.attributes_mut().set_opacity(0.5).unwrap();
//! for x in [0.0, 20.0] {
//!     let leaf = PaintNode::new(&ids);
//!     leaf.update(Rect::new(x, 0.0, x + 10.0, 10.0), |canvas| {
//!         canvas.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
//!     });
//!     root.append_child(leaf);
//! }
//!
//! let mut cache = CacheContext::new();
//! let mut recorder = Recorder::new();
//! root.compose(&mut recorder);
//! let scene = recorder.finish(Size::new(100.0, 100.0), &mut cache, None);
//!
//! // Root offset, then the opacity scope holding one merged picture.
//! let opacity = &scene.root().children()[0].children()[0];
//! assert_eq!(opacity.kind(), &LayerKind::Opacity(0.5));
//! assert_eq!(opacity.children().len(), 1);
//! assert_eq!(scene.pictures()[0].cull_rect(), Rect::new(0.0, 0.0, 30.0, 10.0));
//! ```
//!
//! Like the scenegraph it builds on, the render tree is single-threaded.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod attributes;
mod cache;
mod error;
mod logger;
mod recorder;
mod render_tree;
mod scene;
mod submitter;

pub use attributes::CompositeAttributes;
pub use cache::{CacheContext, PICTURE_UNUSED_LIFECYCLE_THRESHOLD};
pub use error::ComposeError;
pub use logger::{Logger, TextLogger};
pub use recorder::{Opcode, RecordInst, Recorder};
pub use render_tree::{
    CompositeNode, PaintNode, RenderTreeNode, RenderTreeNodeType, VideoTextureNode,
};
pub use scene::{Layer, LayerKind, LayerTreeBuilder, Scene, SceneBuilder, VideoBuffer};
pub use submitter::{DrawContext, DrawContextSubmitter, SubmittedEvent};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::Cell;
    use kurbo::{Rect, Size, Vec2};
    use scenery_graph::{
        Canvas, ColorMaterial, Draw, Group, IdAllocator, Mat3, RectGeometry, RenderContext,
    };

    // A paint node whose callback renders a scenegraph subtree.
    fn scenegraph_leaf(ids: &IdAllocator, group: &Group, draws: &Rc<Cell<u32>>) -> PaintNode {
        let bounds = group.revalidate(None, &Mat3::IDENTITY).unwrap();
        let leaf = PaintNode::new(ids);
        let group = group.clone();
        let draws = Rc::clone(draws);
        let origin = bounds.origin().to_vec2();
        leaf.update(bounds, move |canvas: &mut Canvas| {
            draws.set(draws.get() + 1);
            canvas.translate(-origin);
            group.render(canvas, &RenderContext::new());
        });
        leaf
    }

    #[test]
    fn scenegraph_content_is_cached_until_repainted() {
        let ids = IdAllocator::new();
        let geometry = RectGeometry::from_rect(&ids, Rect::new(10.0, 10.0, 20.0, 20.0));
        let draw = Draw::new(&ids, geometry.clone(), ColorMaterial::new(&ids));
        let group = Group::with_children(&ids, [draw]);
        let draws = Rc::new(Cell::new(0));
        let leaf = scenegraph_leaf(&ids, &group, &draws);

        let root = CompositeNode::new(&ids);
        root.attributes_mut().set_offset(Vec2::new(5.0, 0.0));
        root.append_child(leaf.clone());
        let tree = RenderTreeNode::from(root.clone());

        let mut cache = CacheContext::new();
        for _ in 0..3 {
            let mut recorder = Recorder::new();
            tree.compose(&mut recorder);
            let scene = recorder.finish(Size::new(50.0, 50.0), &mut cache, None);
            assert_eq!(scene.pictures().len(), 1);
        }
        assert_eq!(draws.get(), 1);

        geometry.set_rect(Rect::new(10.0, 10.0, 30.0, 30.0));
        root.remove_child(&leaf.into());
        root.append_child(scenegraph_leaf(&ids, &group, &draws));
        let mut recorder = Recorder::new();
        tree.compose(&mut recorder);
        let scene = recorder.finish(Size::new(50.0, 50.0), &mut cache, None);
        assert_eq!(draws.get(), 2);
        assert_eq!(scene.pictures()[0].cull_rect(), Rect::new(0.0, 0.0, 20.0, 20.0));
        assert_eq!(cache.len(), 2);
    }
}
