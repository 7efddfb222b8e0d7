// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attributes a composite node applies around its children.

use kurbo::{BezPath, PathEl, Point, Rect, RoundedRect, Vec2};
use scenery_graph::{BlendMode, ImageFilter};

use crate::error::ComposeError;
use crate::recorder::Recorder;

#[derive(Clone, Debug, PartialEq)]
enum Clip {
    None,
    Rect(Rect),
    RRect(RoundedRect),
    Path(BezPath),
}

#[derive(Clone, Debug, PartialEq)]
struct BackdropFilter {
    filter: ImageFilter,
    blend_mode: BlendMode,
    bounds_clip: bool,
}

/// Offset, rotation, clip, filters, and opacity of a [`CompositeNode`](crate::CompositeNode).
///
/// At most one clip is active; setting a clip replaces the previous one. Unset attributes
/// emit nothing.
///
/// ```
/// use kurbo::{Rect, Vec2};
/// use scenery_compose::CompositeAttributes;
///
/// let mut attrs = CompositeAttributes::new();
/// attrs.set_offset(Vec2::new(4.0, 0.0));
/// attrs.set_rect_clip(Rect::new(0.0, 0.0, 10.0, 10.0));
/// attrs.set_opacity(0.5).unwrap();
/// assert!(attrs.set_opacity(-1.0).is_err());
/// assert!(attrs.has_transform() && attrs.has_clipping() && attrs.has_opacity());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeAttributes {
    offset: Vec2,
    rotate: Option<(f64, Point)>,
    clip: Clip,
    clip_anti_alias: bool,
    image_filter: Option<ImageFilter>,
    backdrop_filter: Option<BackdropFilter>,
    opacity: Option<f32>,
}

impl Default for CompositeAttributes {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeAttributes {
    /// No attributes set.
    pub const fn new() -> Self {
        Self {
            offset: Vec2::ZERO,
            rotate: None,
            clip: Clip::None,
            clip_anti_alias: false,
            image_filter: None,
            backdrop_filter: None,
            opacity: None,
        }
    }

    /// True if an offset or a rotation is set.
    pub fn has_transform(&self) -> bool {
        self.has_offset() || self.has_rotate()
    }

    /// True if the offset is not zero.
    pub fn has_offset(&self) -> bool {
        self.offset != Vec2::ZERO
    }

    /// True if a non-zero rotation is set.
    pub fn has_rotate(&self) -> bool {
        self.rotate.is_some_and(|(rad, _)| rad != 0.0)
    }

    /// True if a clip is set.
    pub fn has_clipping(&self) -> bool {
        self.clip != Clip::None
    }

    /// True if an image filter is set.
    pub fn has_image_filter(&self) -> bool {
        self.image_filter.is_some()
    }

    /// True if a backdrop filter is set.
    pub fn has_backdrop_filter(&self) -> bool {
        self.backdrop_filter.is_some()
    }

    /// True if an opacity is set.
    pub fn has_opacity(&self) -> bool {
        self.opacity.is_some()
    }

    /// Translate the children.
    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Rotate the children by `rad` around `pivot`.
    pub fn set_rotate(&mut self, rad: f64, pivot: Point) {
        self.rotate = Some((rad, pivot));
    }

    /// Clip the children to `rect`.
    pub fn set_rect_clip(&mut self, rect: Rect) {
        self.clip = Clip::Rect(rect);
    }

    /// Clip the children to `rrect`.
    pub fn set_rrect_clip(&mut self, rrect: RoundedRect) {
        self.clip = Clip::RRect(rrect);
    }

    /// Clip the children to `path`.
    ///
    /// An empty path leaves the current clip unchanged. Every contour that draws something must
    /// end with a close element.
    pub fn set_path_clip(&mut self, path: BezPath) -> Result<(), ComposeError> {
        if path.elements().is_empty() {
            return Ok(());
        }
        if let Some(contour) = first_open_contour(&path) {
            return Err(ComposeError::OpenClipPath { contour });
        }
        self.clip = Clip::Path(path);
        Ok(())
    }

    /// Anti-alias clip edges. Defaults to `false`.
    pub fn set_clip_anti_alias(&mut self, anti_alias: bool) {
        self.clip_anti_alias = anti_alias;
    }

    /// Filter the children.
    pub fn set_image_filter(&mut self, filter: ImageFilter) {
        self.image_filter = Some(filter);
    }

    /// Filter what lies behind the children, blending the result with `blend_mode`.
    pub fn set_backdrop_filter(
        &mut self,
        filter: ImageFilter,
        blend_mode: BlendMode,
        bounds_clip: bool,
    ) {
        self.backdrop_filter = Some(BackdropFilter {
            filter,
            blend_mode,
            bounds_clip,
        });
    }

    /// Multiply the alpha of the children. Negative values are rejected.
    pub fn set_opacity(&mut self, opacity: f32) -> Result<(), ComposeError> {
        if opacity < 0.0 || opacity.is_nan() {
            return Err(ComposeError::InvalidOpacity(opacity));
        }
        self.opacity = Some(opacity);
        Ok(())
    }

    /// Clear every attribute.
    pub fn reset_all(&mut self) {
        *self = Self::new();
    }

    /// Clear the offset.
    pub fn reset_offset(&mut self) {
        self.offset = Vec2::ZERO;
    }

    /// Clear the rotation.
    pub fn reset_rotate(&mut self) {
        self.rotate = None;
    }

    /// Clear the clip.
    pub fn reset_clip(&mut self) {
        self.clip = Clip::None;
    }

    /// Clear the image filter.
    pub fn reset_image_filter(&mut self) {
        self.image_filter = None;
    }

    /// Clear the backdrop filter.
    pub fn reset_backdrop_filter(&mut self) {
        self.backdrop_filter = None;
    }

    /// Clear the opacity.
    pub fn reset_opacity(&mut self) {
        self.opacity = None;
    }

    /// Record the attributes around `f`.
    ///
    /// Scopes are pushed in the order offset, rotation, clip, image filter, backdrop filter,
    /// opacity, and popped once each after `f` returns.
    pub fn make_scope(&self, recorder: &mut Recorder, f: impl FnOnce(&mut Recorder)) {
        let mut pushed = 0;
        if self.has_offset() {
            recorder.push_offset(self.offset);
            pushed += 1;
        }
        if let Some((rad, pivot)) = self.rotate.filter(|(rad, _)| *rad != 0.0) {
            recorder.push_rotate(rad, pivot);
            pushed += 1;
        }
        match &self.clip {
            Clip::None => {}
            Clip::Rect(rect) => recorder.push_rect_clip(*rect, self.clip_anti_alias),
            Clip::RRect(rrect) => recorder.push_rrect_clip(*rrect, self.clip_anti_alias),
            Clip::Path(path) => recorder.push_path_clip(path.clone(), self.clip_anti_alias),
        }
        if self.has_clipping() {
            pushed += 1;
        }
        if let Some(filter) = &self.image_filter {
            recorder.push_image_filter(filter.clone());
            pushed += 1;
        }
        if let Some(backdrop) = &self.backdrop_filter {
            recorder.push_backdrop_filter(
                backdrop.filter.clone(),
                backdrop.blend_mode,
                backdrop.bounds_clip,
            );
            pushed += 1;
        }
        if let Some(opacity) = self.opacity {
            recorder.push_opacity(opacity);
            pushed += 1;
        }

        f(recorder);

        for _ in 0..pushed {
            recorder.pop();
        }
    }
}

/// Index of the first contour that draws without being closed.
fn first_open_contour(path: &BezPath) -> Option<usize> {
    let mut contour = 0;
    let mut open = false;
    for el in path.elements() {
        match el {
            PathEl::MoveTo(_) if open => return Some(contour),
            PathEl::MoveTo(_) => {}
            PathEl::ClosePath => {
                open = false;
                contour += 1;
            }
            PathEl::LineTo(_) | PathEl::QuadTo(..) | PathEl::CurveTo(..) => open = true,
        }
    }
    open.then_some(contour)
}
