// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint attributes: the resolved [`PaintRecord`] produced by materials and the
//! immutable [`Paint`] consumed by the canvas.

use alloc::vec::Vec;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Cap, Join, Rect, Stroke};

use crate::filter::{ImageFilter, MapDirection};
use crate::matrix::Mat3;

/// Non-premultiplied RGBA color with `f32` channels in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color4f {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color4f {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with its alpha multiplied by `factor`.
    #[must_use]
    pub fn mul_alpha(self, factor: f32) -> Self {
        Self {
            a: self.a * factor,
            ..self
        }
    }

    /// True if alpha is zero.
    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// True if alpha rounds to full coverage at 8 bits.
    pub fn is_opaque(&self) -> bool {
        (self.a * 255.0).round() >= 255.0
    }
}

impl Default for Color4f {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Porter-Duff and separable blend modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs, reason = "standard blend mode names")]
pub enum BlendMode {
    Clear,
    Src,
    Dst,
    #[default]
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcATop,
    DstATop,
    Xor,
    Plus,
    Modulate,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Multiply,
}

/// How geometry is painted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaintStyle {
    /// Interior only.
    #[default]
    Fill,
    /// Outline only.
    Stroke,
    /// Interior and outline.
    StrokeAndFill,
}

/// Corner treatment of stroked outlines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokeJoin {
    /// Sharp corners, limited by the miter limit.
    #[default]
    Miter,
    /// Rounded corners.
    Round,
    /// Cut corners.
    Bevel,
}

/// End treatment of open stroked contours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StrokeCap {
    /// Flat, ends exactly at the endpoint.
    Butt,
    /// Half-disc past the endpoint.
    Round,
    /// Half-square past the endpoint.
    #[default]
    Square,
}

/// Image sampling quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Sampling {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    #[default]
    Linear,
    /// Bicubic.
    Cubic,
}

/// Path effect applied before stroking or filling.
#[derive(Clone, Debug, PartialEq)]
pub enum PathEffect {
    /// On/off dash intervals starting at `phase`.
    Dash {
        /// Alternating on and off lengths.
        intervals: Vec<f64>,
        /// Offset into the pattern.
        phase: f64,
    },
    /// Random displacement of path segments. Its output cannot be bounded cheaply.
    Discrete {
        /// Length of the displaced segments.
        segment_length: f64,
        /// Maximum displacement.
        deviation: f64,
        /// Random seed.
        seed: u32,
    },
}

impl PathEffect {
    /// True if the effect never grows the geometry it is applied to.
    pub fn can_compute_fast_bounds(&self) -> bool {
        matches!(self, Self::Dash { .. })
    }
}

/// Resolved paint attributes.
///
/// Materials produce a record per frame, render contexts modulate it, and
/// [`PaintRecord::instantiate_paint`] freezes it into a [`Paint`].
#[derive(Clone, Debug, PartialEq)]
pub struct PaintRecord {
    /// Fill or stroke color.
    pub color: Color4f,
    /// Painting style.
    pub style: PaintStyle,
    /// Stroke width; `0` draws a hairline.
    pub stroke_width: f64,
    /// Miter limit, as a multiple of half the stroke width.
    pub stroke_miter: f64,
    /// Corner treatment.
    pub stroke_join: StrokeJoin,
    /// End treatment.
    pub stroke_cap: StrokeCap,
    /// Compositing mode.
    pub blend_mode: BlendMode,
    /// Anti-aliased edges.
    pub anti_alias: bool,
    /// Optional path effect.
    pub path_effect: Option<PathEffect>,
    /// Optional image filter (layer paints only).
    pub image_filter: Option<ImageFilter>,
}

impl Default for PaintRecord {
    fn default() -> Self {
        Self {
            color: Color4f::BLACK,
            style: PaintStyle::Fill,
            stroke_width: 1.0,
            stroke_miter: 4.0,
            stroke_join: StrokeJoin::Miter,
            stroke_cap: StrokeCap::Square,
            blend_mode: BlendMode::SrcOver,
            anti_alias: false,
            path_effect: None,
            image_filter: None,
        }
    }
}

impl PaintRecord {
    /// True if the color covers fully.
    pub fn is_opaque(&self) -> bool {
        self.color.is_opaque()
    }

    /// Freeze the record.
    pub fn instantiate_paint(&self) -> Paint {
        Paint {
            record: self.clone(),
        }
    }
}

/// Immutable paint handed to the canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    record: PaintRecord,
}

impl Default for Paint {
    fn default() -> Self {
        PaintRecord::default().instantiate_paint()
    }
}

impl Paint {
    /// Paint color.
    pub fn color(&self) -> Color4f {
        self.record.color
    }

    /// Alpha of the paint color.
    pub fn alpha(&self) -> f32 {
        self.record.color.a
    }

    /// Painting style.
    pub fn style(&self) -> PaintStyle {
        self.record.style
    }

    /// Stroke width.
    pub fn stroke_width(&self) -> f64 {
        self.record.stroke_width
    }

    /// Compositing mode.
    pub fn blend_mode(&self) -> BlendMode {
        self.record.blend_mode
    }

    /// Anti-aliasing flag.
    pub fn anti_alias(&self) -> bool {
        self.record.anti_alias
    }

    /// Image filter, if any.
    pub fn image_filter(&self) -> Option<&ImageFilter> {
        self.record.image_filter.as_ref()
    }

    /// Path effect, if any.
    pub fn path_effect(&self) -> Option<&PathEffect> {
        self.record.path_effect.as_ref()
    }

    /// True if drawing with this paint cannot change any pixel.
    pub fn nothing_to_draw(&self) -> bool {
        match self.record.blend_mode {
            BlendMode::Dst => true,
            BlendMode::SrcOver
            | BlendMode::SrcATop
            | BlendMode::DstOut
            | BlendMode::DstOver
            | BlendMode::Plus => {
                self.record.color.is_transparent() && self.record.image_filter.is_none()
            }
            _ => false,
        }
    }

    /// True if [`Paint::compute_fast_bounds`] gives a conservative answer.
    pub fn can_compute_fast_bounds(&self) -> bool {
        self.record
            .path_effect
            .as_ref()
            .is_none_or(PathEffect::can_compute_fast_bounds)
    }

    /// Conservative bounds of drawing geometry with `bounds` using this paint.
    ///
    /// Strokes outset by half the width, scaled by the miter limit for miter joins and
    /// by √2 for square caps; hairlines outset by one unit.
    pub fn compute_fast_bounds(&self, bounds: Rect) -> Rect {
        let mut out = bounds;
        if self.record.style != PaintStyle::Fill {
            let radius = self.stroke_inflation_radius();
            out = out.inflate(radius, radius);
        }
        if let Some(filter) = &self.record.image_filter {
            out = filter.filter_bounds(out, &Mat3::IDENTITY, MapDirection::Forward);
        }
        out
    }

    fn stroke_inflation_radius(&self) -> f64 {
        let r = &self.record;
        if r.stroke_width <= 0.0 {
            return 1.0;
        }
        let mut multiplier: f64 = 1.0;
        if r.stroke_join == StrokeJoin::Miter {
            multiplier = multiplier.max(r.stroke_miter);
        }
        if r.stroke_cap == StrokeCap::Square {
            multiplier = multiplier.max(core::f64::consts::SQRT_2);
        }
        r.stroke_width / 2.0 * multiplier
    }

    /// Kurbo stroke style matching this paint, used to build stroke outlines.
    pub fn to_stroke(&self) -> Stroke {
        let r = &self.record;
        let join = match r.stroke_join {
            StrokeJoin::Miter => Join::Miter,
            StrokeJoin::Round => Join::Round,
            StrokeJoin::Bevel => Join::Bevel,
        };
        let cap = match r.stroke_cap {
            StrokeCap::Butt => Cap::Butt,
            StrokeCap::Round => Cap::Round,
            StrokeCap::Square => Cap::Square,
        };
        // Hairlines hit-test as one unit wide.
        let width = if r.stroke_width <= 0.0 {
            1.0
        } else {
            r.stroke_width
        };
        let stroke = Stroke::new(width)
            .with_join(join)
            .with_miter_limit(r.stroke_miter)
            .with_caps(cap);
        match &r.path_effect {
            Some(PathEffect::Dash { intervals, phase }) => {
                stroke.with_dashes(*phase, intervals.iter().copied())
            }
            _ => stroke,
        }
    }
}
