// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Materials: paint attributes resolved into a [`PaintRecord`] per frame.

use crate::node::{Node, NodeKind, Property};
use crate::paint::{
    BlendMode, Color4f, PaintRecord, PaintStyle, PathEffect, StrokeCap, StrokeJoin,
};
use crate::types::{IdAllocator, NodeTraits};

pub(crate) enum MaterialKind {
    Color(ColorData),
}

impl MaterialKind {
    fn common(&self) -> &MaterialProps {
        match self {
            Self::Color(data) => &data.props,
        }
    }
}

/// Attributes every material carries.
struct MaterialProps {
    anti_alias: Property<bool>,
    opacity: Property<f32>,
    blend_mode: Property<BlendMode>,
    stroke_width: Property<f64>,
    stroke_miter: Property<f64>,
    style: Property<PaintStyle>,
    stroke_join: Property<StrokeJoin>,
    stroke_cap: Property<StrokeCap>,
    path_effect: Property<Option<PathEffect>>,
}

impl Default for MaterialProps {
    fn default() -> Self {
        Self {
            anti_alias: Property::new(false),
            opacity: Property::new(1.0),
            blend_mode: Property::new(BlendMode::SrcOver),
            stroke_width: Property::new(1.0),
            stroke_miter: Property::new(4.0),
            style: Property::new(PaintStyle::Fill),
            stroke_join: Property::new(StrokeJoin::Miter),
            stroke_cap: Property::new(StrokeCap::Square),
            path_effect: Property::new(None),
        }
    }
}

base_handle!(
    /// Handle to any material node.
    Material,
    Material,
    MaterialKind
);

impl Material {
    /// Resolve the current attributes.
    ///
    /// # Panics
    ///
    /// Panics if the material has not been revalidated since its last change.
    #[track_caller]
    pub fn make_paint_record(&self) -> PaintRecord {
        self.assert_revalidated();
        let props = self.kind().common();
        let color = match self.kind() {
            MaterialKind::Color(data) => data.color.get(),
        };
        PaintRecord {
            color: color.mul_alpha(props.opacity.get()),
            style: props.style.get(),
            stroke_width: props.stroke_width.get(),
            stroke_miter: props.stroke_miter.get(),
            stroke_join: props.stroke_join.get(),
            stroke_cap: props.stroke_cap.get(),
            blend_mode: props.blend_mode.get(),
            anti_alias: props.anti_alias.get(),
            path_effect: props.path_effect.get(),
            image_filter: None,
        }
    }

    /// Anti-aliased edges.
    pub fn anti_alias(&self) -> bool {
        self.kind().common().anti_alias.get()
    }

    /// Enable or disable anti-aliasing.
    pub fn set_anti_alias(&self, anti_alias: bool) {
        self.kind().common().anti_alias.set(self, anti_alias);
    }

    /// Opacity multiplied into the color alpha.
    pub fn opacity(&self) -> f32 {
        self.kind().common().opacity.get()
    }

    /// Set the opacity multiplied into the color alpha.
    pub fn set_opacity(&self, opacity: f32) {
        self.kind().common().opacity.set(self, opacity);
    }

    /// Compositing mode.
    pub fn blend_mode(&self) -> BlendMode {
        self.kind().common().blend_mode.get()
    }

    /// Set the compositing mode.
    pub fn set_blend_mode(&self, blend_mode: BlendMode) {
        self.kind().common().blend_mode.set(self, blend_mode);
    }

    /// Painting style.
    pub fn style(&self) -> PaintStyle {
        self.kind().common().style.get()
    }

    /// Set the painting style.
    pub fn set_style(&self, style: PaintStyle) {
        self.kind().common().style.set(self, style);
    }

    /// Stroke width.
    pub fn stroke_width(&self) -> f64 {
        self.kind().common().stroke_width.get()
    }

    /// Set the stroke width.
    pub fn set_stroke_width(&self, width: f64) {
        self.kind().common().stroke_width.set(self, width);
    }

    /// Miter limit.
    pub fn stroke_miter(&self) -> f64 {
        self.kind().common().stroke_miter.get()
    }

    /// Set the miter limit.
    pub fn set_stroke_miter(&self, miter: f64) {
        self.kind().common().stroke_miter.set(self, miter);
    }

    /// Corner treatment.
    pub fn stroke_join(&self) -> StrokeJoin {
        self.kind().common().stroke_join.get()
    }

    /// Set the corner treatment.
    pub fn set_stroke_join(&self, join: StrokeJoin) {
        self.kind().common().stroke_join.set(self, join);
    }

    /// End treatment.
    pub fn stroke_cap(&self) -> StrokeCap {
        self.kind().common().stroke_cap.get()
    }

    /// Set the end treatment.
    pub fn set_stroke_cap(&self, cap: StrokeCap) {
        self.kind().common().stroke_cap.set(self, cap);
    }

    /// Path effect.
    pub fn path_effect(&self) -> Option<PathEffect> {
        self.kind().common().path_effect.get()
    }

    /// Set or clear the path effect.
    pub fn set_path_effect(&self, effect: Option<PathEffect>) {
        self.kind().common().path_effect.set(self, effect);
    }
}

pub(crate) struct ColorData {
    props: MaterialProps,
    color: Property<Color4f>,
}

typed_handle!(
    /// Solid color material.
    ColorMaterial: Material,
    ColorData,
    MaterialKind::Color(data) => data
);

impl ColorMaterial {
    /// Create an opaque black fill material.
    pub fn new(ids: &IdAllocator) -> Self {
        Self::with_color(ids, Color4f::BLACK)
    }

    /// Create a fill material of `color`.
    pub fn with_color(ids: &IdAllocator, color: Color4f) -> Self {
        Self(Material(Node::new_rc(
            ids,
            NodeTraits::BUBBLE_DAMAGE,
            NodeKind::Material(MaterialKind::Color(ColorData {
                props: MaterialProps::default(),
                color: Property::new(color),
            })),
        )))
    }

    /// Paint color.
    pub fn color(&self) -> Color4f {
        self.data().color.get()
    }

    /// Set the paint color.
    pub fn set_color(&self, color: Color4f) {
        self.data().color.set(self, color);
    }
}
