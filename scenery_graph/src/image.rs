// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster image leaf.

use kurbo::{Point, Rect};

use crate::canvas::{Canvas, Image};
use crate::node::Property;
use crate::paint::{PaintRecord, Sampling};
use crate::render::{RenderContext, RenderData, RenderKind, RenderNode};
use crate::types::{IdAllocator, NodeTraits};

pub(crate) struct ImageNodeData {
    image: Property<Option<Image>>,
    sampling: Property<Sampling>,
    anti_alias: Property<bool>,
}

impl ImageNodeData {
    pub(crate) fn on_revalidate(&self) -> Rect {
        self.image
            .borrow()
            .as_ref()
            .map_or(Rect::ZERO, Image::bounds)
    }

    pub(crate) fn on_render(&self, canvas: &mut Canvas, ctx: &RenderContext) {
        let Some(image) = self.image.get() else {
            return;
        };
        let mut record = PaintRecord {
            anti_alias: self.anti_alias.get(),
            ..PaintRecord::default()
        };
        ctx.modulate_paint(&mut record);
        canvas.draw_image(
            &image,
            Point::ZERO,
            self.sampling.get(),
            &record.instantiate_paint(),
        );
    }
}

typed_handle!(
    /// Leaf drawing a raster image at the origin.
    ///
    /// Its bounds are the image size; any point inside them hits.
    ImageNode: RenderNode,
    ImageNodeData,
    RenderData { kind: RenderKind::Image(data), .. } => data
);

impl ImageNode {
    /// Create a node showing `image`.
    pub fn new(ids: &IdAllocator, image: Option<Image>) -> Self {
        Self(RenderNode::new(
            ids,
            NodeTraits::empty(),
            RenderKind::Image(ImageNodeData {
                image: Property::new(image),
                sampling: Property::new(Sampling::default()),
                anti_alias: Property::new(true),
            }),
        ))
    }

    /// Displayed image.
    pub fn image(&self) -> Option<Image> {
        self.data().image.get()
    }

    /// Replace the image.
    pub fn set_image(&self, image: Option<Image>) {
        self.data().image.set(self, image);
    }

    /// Sampling used when the image is scaled.
    pub fn sampling(&self) -> Sampling {
        self.data().sampling.get()
    }

    /// Set the sampling.
    pub fn set_sampling(&self, sampling: Sampling) {
        self.data().sampling.set(self, sampling);
    }

    /// Anti-aliased edges.
    pub fn anti_alias(&self) -> bool {
        self.data().anti_alias.get()
    }

    /// Enable or disable anti-aliasing.
    pub fn set_anti_alias(&self, anti_alias: bool) {
        self.data().anti_alias.set(self, anti_alias);
    }
}
