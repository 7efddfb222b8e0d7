// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effects: render nodes that wrap a single child.

use core::cell::{Cell, RefCell};
use kurbo::{Point, Rect};

use crate::canvas::Canvas;
use crate::damage::InvalidationRecorder;
use crate::error::NodeError;
use crate::filter::{ImageFilter, MapDirection};
use crate::matrix::Mat3;
use crate::node::{Node, NodeKind, Property};
use crate::render::{RenderContext, RenderData, RenderKind, RenderNode, with_scoped_context};
use crate::transform::Transform;
use crate::types::{IdAllocator, NodeTraits};
use crate::util::rect_is_empty;

pub(crate) struct OpacityData {
    child: RenderNode,
    opacity: Property<f32>,
}

impl OpacityData {
    pub(crate) fn on_revalidate(
        &self,
        recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        // Invisible subtrees are left stale until they can be seen again.
        if self.opacity.get() <= 0.0 {
            return Ok(Rect::ZERO);
        }
        self.child.revalidate(recorder, ctm)
    }

    pub(crate) fn on_render(&self, canvas: &mut Canvas, ctx: &RenderContext) {
        let opacity = self.opacity.get();
        if opacity <= 0.0 {
            return;
        }
        if opacity >= 1.0 {
            self.child.render(canvas, ctx);
            return;
        }
        with_scoped_context(canvas, ctx, |scope, canvas| {
            scope.modulate_opacity(opacity);
            self.child.render(canvas, scope.context());
        });
    }

    pub(crate) fn on_node_at(&self, point: Point) -> Option<RenderNode> {
        if self.opacity.get() <= 0.0 {
            return None;
        }
        self.child.node_at(point)
    }
}

typed_handle!(
    /// Multiplies the opacity of its child.
    ///
    /// At `0` the child is neither revalidated, drawn, nor hit-tested; at `1` or more it is
    /// passed through untouched.
    OpacityEffect: RenderNode,
    OpacityData,
    RenderData { kind: RenderKind::Opacity(data), .. } => data
);

impl OpacityEffect {
    /// Wrap `child` with `opacity`.
    pub fn new(ids: &IdAllocator, child: impl Into<RenderNode>, opacity: f32) -> Self {
        let child = child.into();
        let node = RenderNode::new(
            ids,
            NodeTraits::empty(),
            RenderKind::Opacity(OpacityData {
                child: child.clone(),
                opacity: Property::new(opacity),
            }),
        );
        node.node().observe_child(&child);
        Self(node)
    }

    /// Wrapped node.
    pub fn child(&self) -> &RenderNode {
        &self.data().child
    }

    /// Current opacity.
    pub fn opacity(&self) -> f32 {
        self.data().opacity.get()
    }

    /// Set the opacity.
    pub fn set_opacity(&self, opacity: f32) {
        self.data().opacity.set(self, opacity);
    }
}

/// Payload of an [`ImageFilterNode`].
pub(crate) struct ImageFilterData {
    filter: Property<Option<ImageFilter>>,
    crop_cache: RefCell<Option<(Rect, ImageFilter)>>,
}

base_handle!(
    /// Holder of an optional image filter, shared by the effects that apply it.
    ImageFilterNode,
    ImageFilter,
    ImageFilterData
);

impl ImageFilterNode {
    /// Create a holder of `filter`.
    pub fn new(ids: &IdAllocator, filter: Option<ImageFilter>) -> Self {
        Self(Node::new_rc(
            ids,
            NodeTraits::BUBBLE_DAMAGE,
            NodeKind::ImageFilter(ImageFilterData {
                filter: Property::new(filter),
                crop_cache: RefCell::new(None),
            }),
        ))
    }

    /// Current filter.
    pub fn filter(&self) -> Option<ImageFilter> {
        self.kind().filter.get()
    }

    /// Replace the filter.
    pub fn set_filter(&self, filter: Option<ImageFilter>) {
        if self.kind().filter.set(self, filter) {
            self.kind().crop_cache.replace(None);
        }
    }

    /// The filter restricted to `crop`.
    ///
    /// An empty `crop` yields the plain filter. The cropped filter is cached and reused while
    /// `crop` stays the same.
    pub fn resolve_cropped_filter(&self, crop: Rect) -> Option<ImageFilter> {
        let filter = self.filter()?;
        if rect_is_empty(crop) {
            return Some(filter);
        }
        let data = self.kind();
        let cached = data
            .crop_cache
            .borrow()
            .as_ref()
            .filter(|(rect, _)| *rect == crop)
            .map(|(_, cropped)| cropped.clone());
        if cached.is_some() {
            return cached;
        }
        let cropped = ImageFilter::crop(crop, Some(filter));
        data.crop_cache.replace(Some((crop, cropped.clone())));
        Some(cropped)
    }
}

/// Area an [`ImageFilterEffect`] crops its filter output to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterCropping {
    /// Filter output may extend past the content.
    #[default]
    None,
    /// Filter output is cropped to the content bounds.
    Content,
}

pub(crate) struct ImageFilterEffectData {
    child: RenderNode,
    filter: ImageFilterNode,
    cropping: Property<FilterCropping>,
    resolved: RefCell<Option<ImageFilter>>,
}

impl ImageFilterEffectData {
    pub(crate) fn on_revalidate(
        &self,
        mut recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        self.filter.revalidate(recorder.as_deref_mut(), ctm)?;
        let content = self.child.revalidate(recorder, ctm)?;

        let filter = match self.cropping.get() {
            FilterCropping::None => self.filter.filter(),
            FilterCropping::Content => self.filter.resolve_cropped_filter(content),
        };
        let bounds = match &filter {
            Some(filter) => {
                filter.filter_bounds(content, &Mat3::IDENTITY, MapDirection::Forward)
            }
            None => content,
        };
        self.resolved.replace(filter);
        Ok(bounds)
    }

    pub(crate) fn on_render(&self, canvas: &mut Canvas, ctx: &RenderContext) {
        with_scoped_context(canvas, ctx, |scope, canvas| {
            let resolved = self.resolved.borrow();
            scope.set_filter_isolation(canvas, self.child.bounds(), resolved.as_ref());
            self.child.render(canvas, scope.context());
        });
    }

    pub(crate) fn on_node_at(&self, point: Point) -> Option<RenderNode> {
        self.child.node_at(point)
    }
}

typed_handle!(
    /// Applies an image filter to its child.
    ///
    /// The filter can grow or shrink the child's footprint, so this node reports damage for
    /// its own bounds only and ignores damage from its subtree.
    ImageFilterEffect: RenderNode,
    ImageFilterEffectData,
    RenderData { kind: RenderKind::ImageFilterEffect(data), .. } => data
);

impl ImageFilterEffect {
    /// Apply `filter` to `child`; the effect observes both.
    pub fn new(ids: &IdAllocator, child: impl Into<RenderNode>, filter: ImageFilterNode) -> Self {
        let child = child.into();
        let node = RenderNode::new(
            ids,
            NodeTraits::OVERRIDE_DAMAGE,
            RenderKind::ImageFilterEffect(ImageFilterEffectData {
                child: child.clone(),
                filter: filter.clone(),
                cropping: Property::new(FilterCropping::None),
                resolved: RefCell::new(None),
            }),
        );
        node.node().observe_child(&child);
        node.node().observe_child(&filter);
        Self(node)
    }

    /// Wrapped node.
    pub fn child(&self) -> &RenderNode {
        &self.data().child
    }

    /// Filter holder.
    pub fn filter(&self) -> &ImageFilterNode {
        &self.data().filter
    }

    /// Current cropping mode.
    pub fn cropping(&self) -> FilterCropping {
        self.data().cropping.get()
    }

    /// Set the cropping mode.
    pub fn set_cropping(&self, cropping: FilterCropping) {
        self.data().cropping.set(self, cropping);
    }
}

#[derive(Clone, Copy, Debug)]
enum InverseCache {
    Stale,
    Singular,
    Valid(Mat3),
}

pub(crate) struct TransformEffectData {
    child: RenderNode,
    transform: Transform,
    inverse: Cell<InverseCache>,
}

impl TransformEffectData {
    pub(crate) fn on_revalidate(
        &self,
        mut recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        self.inverse.set(InverseCache::Stale);
        self.transform.revalidate(recorder.as_deref_mut(), ctm)?;
        let matrix = self.transform.matrix();
        let bounds = self
            .child
            .revalidate(recorder, &Mat3::concat(ctm, &matrix))?;
        Ok(matrix.map_rect(bounds))
    }

    pub(crate) fn on_render(&self, canvas: &mut Canvas, ctx: &RenderContext) {
        let count = canvas.save();
        canvas.concat(&self.transform.matrix());
        self.child.render(canvas, ctx);
        canvas.restore_to_count(count);
    }

    pub(crate) fn on_node_at(&self, point: Point) -> Option<RenderNode> {
        let inverse = match self.inverse.get() {
            InverseCache::Stale => {
                let inverse = match self.transform.matrix().invert() {
                    Some(inverse) => InverseCache::Valid(inverse),
                    None => InverseCache::Singular,
                };
                self.inverse.set(inverse);
                inverse
            }
            cached => cached,
        };
        match inverse {
            InverseCache::Valid(inverse) => self.child.node_at(inverse.map_point(point)),
            InverseCache::Stale | InverseCache::Singular => None,
        }
    }
}

typed_handle!(
    /// Draws its child through a transform.
    ///
    /// ```
    /// use kurbo::{Point, Rect};
    /// use scenery_graph::{
    ///     ColorMaterial, Draw, IdAllocator, Mat3, MatrixTransform, RectGeometry, TransformEffect,
    /// };
    ///
    /// let ids = IdAllocator::new();
    /// let square = Draw::new(
    ///     &ids,
    ///     RectGeometry::from_rect(&ids, Rect::new(0.0, 0.0, 5.0, 5.0)),
    ///     ColorMaterial::new(&ids),
    /// );
    /// let matrix = MatrixTransform::new(&ids, Mat3::translate(10.0, 10.0));
    /// let moved = TransformEffect::new(&ids, square, matrix);
    /// assert_eq!(
    ///     moved.revalidate(None, &Mat3::IDENTITY).unwrap(),
    ///     Rect::new(10.0, 10.0, 15.0, 15.0)
    /// );
    /// assert!(moved.node_at(Point::new(10.0, 10.0)).is_some());
    /// assert!(moved.node_at(Point::new(0.0, 0.0)).is_none());
    /// ```
    TransformEffect: RenderNode,
    TransformEffectData,
    RenderData { kind: RenderKind::TransformEffect(data), .. } => data
);

impl TransformEffect {
    /// Draw `child` through `transform`; the effect observes both.
    pub fn new(
        ids: &IdAllocator,
        child: impl Into<RenderNode>,
        transform: impl Into<Transform>,
    ) -> Self {
        let (child, transform) = (child.into(), transform.into());
        let node = RenderNode::new(
            ids,
            NodeTraits::empty(),
            RenderKind::TransformEffect(TransformEffectData {
                child: child.clone(),
                transform: transform.clone(),
                inverse: Cell::new(InverseCache::Stale),
            }),
        );
        node.node().observe_child(&child);
        node.node().observe_child(&transform);
        Self(node)
    }

    /// Wrapped node.
    pub fn child(&self) -> &RenderNode {
        &self.data().child
    }

    /// Applied transform.
    pub fn transform(&self) -> &Transform {
        &self.data().transform
    }
}
