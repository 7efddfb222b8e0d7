// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render leaf that replays a picture recorded by a user callback.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;
use kurbo::{Rect, Vec2};

use crate::attribute::{
    AttributeStateGroup, AttributeStateGroupOp, NodeAttribute, StatefulAttribute,
};
use crate::canvas::{Canvas, Picture, PictureRecorder};
use crate::node::Property;
use crate::render::{RenderContext, RenderData, RenderKind, RenderNode, with_scoped_context};
use crate::types::{IdAllocator, NodeTraits};

/// Callback drawing the content of a [`PictureNode`] into a recording canvas.
///
/// The second argument is the node's draw bounds. Callbacks compare by identity.
#[derive(Clone)]
pub struct DrawCallback(Rc<dyn Fn(&mut Canvas, Rect)>);

impl DrawCallback {
    /// Wrap `f`.
    pub fn new(f: impl Fn(&mut Canvas, Rect) + 'static) -> Self {
        Self(Rc::new(f))
    }

    fn call(&self, canvas: &mut Canvas, bounds: Rect) {
        (self.0)(canvas, bounds);
    }
}

impl Default for DrawCallback {
    fn default() -> Self {
        Self::new(|_, _| {})
    }
}

impl PartialEq for DrawCallback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DrawCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DrawCallback")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

pub(crate) struct PictureData {
    draw_bounds: NodeAttribute<Rect>,
    draw_callback: NodeAttribute<DrawCallback>,
    offset: Property<Vec2>,
    apply_clip: Cell<bool>,
    cached: RefCell<Option<Picture>>,
}

impl PictureData {
    pub(crate) fn on_revalidate(&self) -> Rect {
        self.draw_bounds.get() + self.offset.get()
    }

    fn attributes(&self) -> AttributeStateGroup<'_> {
        let members: [&dyn StatefulAttribute; 2] = [&self.draw_bounds, &self.draw_callback];
        AttributeStateGroup::new(members, AttributeStateGroupOp::Or)
    }

    fn picture(&self) -> Picture {
        let attributes = self.attributes();
        if attributes.has_changed() {
            self.cached.replace(None);
            attributes.update_change_state();
        }
        if let Some(picture) = self.cached.borrow().clone() {
            return picture;
        }

        let bounds = self.draw_bounds.get();
        let mut recorder = PictureRecorder::begin_recording(bounds);
        self.draw_callback.get().call(recorder.canvas(), bounds);
        let picture = recorder.finish_recording();
        self.cached.replace(Some(picture.clone()));
        picture
    }

    pub(crate) fn on_render(&self, canvas: &mut Canvas, ctx: &RenderContext) {
        let picture = self.picture();
        let offset = self.offset.get();
        with_scoped_context(canvas, ctx, |scope, canvas| {
            let draw_bounds = self.draw_bounds.get();
            scope.set_isolation(canvas, draw_bounds + offset, true);
            canvas.save();
            canvas.translate(offset);
            if self.apply_clip.get() {
                canvas.clip_rect(draw_bounds, true);
            }
            canvas.draw_picture(&picture);
        });
    }
}

typed_handle!(
    /// Leaf replaying a picture recorded by a [`DrawCallback`].
    ///
    /// The picture is recorded on first render and reused until the draw bounds or the
    /// callback change. Its bounds are the draw bounds moved by the offset.
    ///
    /// ```
    /// use kurbo::{Rect, Vec2};
    /// use scenery_graph::{
    ///     Canvas, DrawCallback, IdAllocator, Mat3, Paint, PictureNode, RenderContext,
    /// };
    ///
    /// let ids = IdAllocator::new();
    /// let node = PictureNode::new(&ids);
    /// node.set_draw_bounds(Rect::new(0.0, 0.0, 8.0, 8.0));
    /// node.set_draw_callback(DrawCallback::new(|canvas, bounds| {
    ///     canvas.draw_rect(bounds, &Paint::default());
    /// }));
    /// node.set_offset(Vec2::new(2.0, 0.0));
    /// assert_eq!(
    ///     node.revalidate(None, &Mat3::IDENTITY).unwrap(),
    ///     Rect::new(2.0, 0.0, 10.0, 8.0)
    /// );
    /// node.render(&mut Canvas::new(), &RenderContext::new());
    /// ```
    PictureNode: RenderNode,
    PictureData,
    RenderData { kind: RenderKind::Picture(data), .. } => data
);

impl PictureNode {
    /// Create a node with empty draw bounds and a callback that draws nothing.
    pub fn new(ids: &IdAllocator) -> Self {
        Self(RenderNode::new(
            ids,
            NodeTraits::empty(),
            RenderKind::Picture(PictureData {
                draw_bounds: NodeAttribute::new("draw-bounds", Rect::ZERO),
                draw_callback: NodeAttribute::new("draw-callback", DrawCallback::default()),
                offset: Property::new(Vec2::ZERO),
                apply_clip: Cell::new(true),
                cached: RefCell::new(None),
            }),
        ))
    }

    /// Area the callback draws into, in local coordinates.
    pub fn draw_bounds(&self) -> Rect {
        self.data().draw_bounds.get()
    }

    /// Set the area the callback draws into.
    pub fn set_draw_bounds(&self, bounds: Rect) {
        if self.data().draw_bounds.set(bounds) {
            self.invalidate(true);
        }
    }

    /// Set the callback; the picture is re-recorded on the next render.
    pub fn set_draw_callback(&self, callback: DrawCallback) {
        self.data().draw_callback.set(callback);
    }

    /// Position of the picture's origin in the parent.
    pub fn offset(&self) -> Vec2 {
        self.data().offset.get()
    }

    /// Move the picture.
    pub fn set_offset(&self, offset: Vec2) {
        self.data().offset.set(self, offset);
    }

    /// Whether drawing is clipped to the draw bounds.
    pub fn apply_clip(&self) -> bool {
        self.data().apply_clip.get()
    }

    /// Clip (or not) drawing to the draw bounds. Defaults to `true`.
    pub fn set_apply_clip(&self, apply_clip: bool) {
        self.data().apply_clip.set(apply_clip);
    }
}
