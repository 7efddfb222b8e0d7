// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render nodes: the part of the graph that produces pixels.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect};

use crate::canvas::Canvas;
use crate::damage::InvalidationRecorder;
use crate::draw::DrawData;
use crate::effect::{ImageFilterEffectData, OpacityData, TransformEffectData};
use crate::error::NodeError;
use crate::filter::ImageFilter;
use crate::group::GroupData;
use crate::image::ImageNodeData;
use crate::matrix::Mat3;
use crate::node::{Node, NodeKind, Property};
use crate::paint::{Color4f, PaintRecord};
use crate::picture::PictureData;
use crate::types::{IdAllocator, NodeTraits, NodeType};
use crate::util::rect_is_empty;

/// Payload shared by every render node.
pub(crate) struct RenderData {
    pub(crate) visible: Property<bool>,
    pub(crate) kind: RenderKind,
}

pub(crate) enum RenderKind {
    Group(GroupData),
    Draw(DrawData),
    Image(ImageNodeData),
    Opacity(OpacityData),
    ImageFilterEffect(ImageFilterEffectData),
    TransformEffect(TransformEffectData),
    Picture(PictureData),
}

impl RenderData {
    pub(crate) fn node_type(&self) -> NodeType {
        match &self.kind {
            RenderKind::Group(_) => NodeType::Group,
            RenderKind::Draw(_) => NodeType::Draw,
            RenderKind::Image(_) => NodeType::Image,
            RenderKind::Opacity(_) => NodeType::OpacityEffect,
            RenderKind::ImageFilterEffect(_) => NodeType::ImageFilterEffect,
            RenderKind::TransformEffect(_) => NodeType::TransformEffect,
            RenderKind::Picture(_) => NodeType::Picture,
        }
    }

    pub(crate) fn on_revalidate(
        &self,
        node: &Node,
        recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        match &self.kind {
            RenderKind::Group(data) => data.on_revalidate(recorder, ctm),
            RenderKind::Draw(data) => data.on_revalidate(node, recorder, ctm),
            RenderKind::Image(data) => Ok(data.on_revalidate()),
            RenderKind::Opacity(data) => data.on_revalidate(recorder, ctm),
            RenderKind::ImageFilterEffect(data) => data.on_revalidate(recorder, ctm),
            RenderKind::TransformEffect(data) => data.on_revalidate(recorder, ctm),
            RenderKind::Picture(data) => Ok(data.on_revalidate()),
        }
    }
}

base_handle!(
    /// Handle to any render node.
    ///
    /// Every concrete render handle converts into a `RenderNode` with `into()`.
    RenderNode,
    Render,
    RenderData
);

impl RenderNode {
    pub(crate) fn new(ids: &IdAllocator, traits: NodeTraits, kind: RenderKind) -> Self {
        Self(Node::new_rc(
            ids,
            traits,
            NodeKind::Render(RenderData {
                visible: Property::new(true),
                kind,
            }),
        ))
    }

    /// Whether the node is drawn and hit-tested.
    pub fn visible(&self) -> bool {
        self.kind().visible.get()
    }

    /// Show or hide the node.
    pub fn set_visible(&self, visible: bool) {
        self.kind().visible.set(self, visible);
    }

    /// Draw the node into `canvas`.
    ///
    /// # Panics
    ///
    /// Panics if the node has not been revalidated since its last invalidation.
    #[track_caller]
    pub fn render(&self, canvas: &mut Canvas, ctx: &RenderContext) {
        self.assert_revalidated();
        if !self.visible() || rect_is_empty(self.bounds()) {
            return;
        }
        match &self.kind().kind {
            RenderKind::Group(data) => data.on_render(self.bounds(), canvas, ctx),
            RenderKind::Draw(data) => data.on_render(canvas, ctx),
            RenderKind::Image(data) => data.on_render(canvas, ctx),
            RenderKind::Opacity(data) => data.on_render(canvas, ctx),
            RenderKind::ImageFilterEffect(data) => data.on_render(canvas, ctx),
            RenderKind::TransformEffect(data) => data.on_render(canvas, ctx),
            RenderKind::Picture(data) => data.on_render(canvas, ctx),
        }
    }

    /// Topmost node under `point`, in the node's local coordinates.
    ///
    /// Only leaves are reported; containers return the leaf that was hit.
    ///
    /// # Panics
    ///
    /// Panics if the node has not been revalidated since its last invalidation.
    #[track_caller]
    pub fn node_at(&self, point: Point) -> Option<Self> {
        self.assert_revalidated();
        if !self.visible() || !self.bounds().contains(point) {
            return None;
        }
        match &self.kind().kind {
            RenderKind::Group(data) => data.on_node_at(point),
            RenderKind::Draw(data) => data.on_node_at(point).then(|| self.clone()),
            RenderKind::Image(_) | RenderKind::Picture(_) => Some(self.clone()),
            RenderKind::Opacity(data) => data.on_node_at(point),
            RenderKind::ImageFilterEffect(data) => data.on_node_at(point),
            RenderKind::TransformEffect(data) => data.on_node_at(point),
        }
    }
}

/// Attributes inherited while rendering a subtree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderContext {
    opacity: f32,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

impl RenderContext {
    /// Context of a root render call: fully opaque.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated opacity.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// True if content drawn under this context must be composited as a unit.
    pub fn requires_isolation(&self) -> bool {
        (self.opacity * 255.0).round() != 255.0
    }

    /// Apply the inherited attributes to `record`.
    pub fn modulate_paint(&self, record: &mut PaintRecord) {
        record.color = record.color.mul_alpha(self.opacity);
    }

    fn layer_paint(&self) -> PaintRecord {
        let mut record = PaintRecord {
            color: Color4f::BLACK,
            ..PaintRecord::default()
        };
        self.modulate_paint(&mut record);
        record
    }
}

/// Render context scoped to one node; restores the canvas it started on.
pub(crate) struct ScopedRenderContext {
    restore_count: usize,
    ctx: RenderContext,
}

impl ScopedRenderContext {
    pub(crate) fn new(canvas: &Canvas, ctx: &RenderContext) -> Self {
        Self {
            restore_count: canvas.save_count(),
            ctx: *ctx,
        }
    }

    pub(crate) fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Multiply the inherited opacity by `opacity` (in `0..=1`).
    pub(crate) fn modulate_opacity(&mut self, opacity: f32) -> &mut Self {
        debug_assert!(
            (0.0..=1.0).contains(&opacity),
            "opacity {opacity} out of range"
        );
        self.ctx.opacity *= opacity.clamp(0.0, 1.0);
        self
    }

    /// Fold the inherited attributes into a layer over `bounds` when `isolation` is set and
    /// the context needs one.
    pub(crate) fn set_isolation(
        &mut self,
        canvas: &mut Canvas,
        bounds: Rect,
        isolation: bool,
    ) -> &mut Self {
        if isolation && self.ctx.requires_isolation() {
            let paint = self.ctx.layer_paint().instantiate_paint();
            canvas.save_layer(Some(bounds), Some(paint));
            self.ctx = RenderContext::default();
        }
        self
    }

    /// Open a layer over `bounds` that runs `filter` on restore, folding in the inherited
    /// attributes.
    pub(crate) fn set_filter_isolation(
        &mut self,
        canvas: &mut Canvas,
        bounds: Rect,
        filter: Option<&ImageFilter>,
    ) -> &mut Self {
        if let Some(filter) = filter {
            let mut record = self.ctx.layer_paint();
            record.image_filter = Some(filter.clone());
            canvas.save_layer(Some(bounds), Some(record.instantiate_paint()));
            self.ctx = RenderContext::default();
        }
        self
    }

    pub(crate) fn restore(self, canvas: &mut Canvas) {
        canvas.restore_to_count(self.restore_count);
    }
}

/// Run `f` in a fresh scope derived from `ctx`, then restore the canvas.
pub(crate) fn with_scoped_context<R>(
    canvas: &mut Canvas,
    ctx: &RenderContext,
    f: impl FnOnce(&mut ScopedRenderContext, &mut Canvas) -> R,
) -> R {
    let mut scope = ScopedRenderContext::new(canvas, ctx);
    let out = f(&mut scope, canvas);
    scope.restore(canvas);
    out
}
