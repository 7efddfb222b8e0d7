// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image filter descriptions and their bounds mapping.

use alloc::rc::Rc;
use kurbo::{Rect, Vec2};

use crate::matrix::Mat3;
use crate::paint::Color4f;
use crate::util::rect_union;

/// Direction of a bounds query through a filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapDirection {
    /// Source content bounds to output bounds.
    Forward,
    /// Output bounds to the source area needed to produce them.
    Reverse,
}

/// Immutable, cheaply clonable image filter graph.
///
/// Filters take an optional input; `None` means the content the filter is applied to.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageFilter(Rc<FilterKind>);

#[derive(Clone, Debug, PartialEq)]
enum FilterKind {
    Blur {
        sigma: Vec2,
        input: Option<ImageFilter>,
    },
    Offset {
        offset: Vec2,
        input: Option<ImageFilter>,
    },
    DropShadow {
        offset: Vec2,
        sigma: Vec2,
        color: Color4f,
        input: Option<ImageFilter>,
    },
    Crop {
        rect: Rect,
        input: Option<ImageFilter>,
    },
    Compose {
        outer: ImageFilter,
        inner: ImageFilter,
    },
}

impl ImageFilter {
    /// Gaussian blur with per-axis standard deviation.
    pub fn blur(sigma_x: f64, sigma_y: f64, input: Option<Self>) -> Self {
        Self(Rc::new(FilterKind::Blur {
            sigma: Vec2::new(sigma_x, sigma_y),
            input,
        }))
    }

    /// Translation of the input.
    pub fn offset(dx: f64, dy: f64, input: Option<Self>) -> Self {
        Self(Rc::new(FilterKind::Offset {
            offset: Vec2::new(dx, dy),
            input,
        }))
    }

    /// Input composited over its own blurred, offset, tinted silhouette.
    pub fn drop_shadow(offset: Vec2, sigma: Vec2, color: Color4f, input: Option<Self>) -> Self {
        Self(Rc::new(FilterKind::DropShadow {
            offset,
            sigma,
            color,
            input,
        }))
    }

    /// Input restricted to `rect`.
    pub fn crop(rect: Rect, input: Option<Self>) -> Self {
        Self(Rc::new(FilterKind::Crop { rect, input }))
    }

    /// `outer(inner(content))`.
    pub fn compose(outer: Self, inner: Self) -> Self {
        Self(Rc::new(FilterKind::Compose { outer, inner }))
    }

    /// Shadow color of a drop-shadow filter.
    pub fn shadow_color(&self) -> Option<Color4f> {
        match &*self.0 {
            FilterKind::DropShadow { color, .. } => Some(*color),
            _ => None,
        }
    }

    /// True if both handles share the same filter object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Maps `src` through the filter.
    ///
    /// `ctm` scales filter parameters (sigmas, offsets, crop rectangles) into the space
    /// of `src`.
    pub fn filter_bounds(&self, src: Rect, ctm: &Mat3, direction: MapDirection) -> Rect {
        match direction {
            MapDirection::Forward => {
                let input = input_bounds(self.input(), src, ctm, direction);
                self.on_filter_node_bounds(input, ctm, direction)
            }
            MapDirection::Reverse => {
                let own = self.on_filter_node_bounds(src, ctm, direction);
                input_bounds(self.input(), own, ctm, direction)
            }
        }
    }

    fn input(&self) -> Option<&Self> {
        match &*self.0 {
            FilterKind::Blur { input, .. }
            | FilterKind::Offset { input, .. }
            | FilterKind::DropShadow { input, .. }
            | FilterKind::Crop { input, .. } => input.as_ref(),
            FilterKind::Compose { inner, .. } => Some(inner),
        }
    }

    fn on_filter_node_bounds(&self, src: Rect, ctm: &Mat3, direction: MapDirection) -> Rect {
        let sign = match direction {
            MapDirection::Forward => 1.0,
            MapDirection::Reverse => -1.0,
        };
        match &*self.0 {
            FilterKind::Blur { sigma, .. } => {
                let outset = blur_outset(*sigma, ctm);
                src.inflate(outset.x, outset.y)
            }
            FilterKind::Offset { offset, .. } => src + ctm.map_vector(*offset) * sign,
            FilterKind::DropShadow { offset, sigma, .. } => {
                let outset = blur_outset(*sigma, ctm);
                let shadow = (src + ctm.map_vector(*offset) * sign).inflate(outset.x, outset.y);
                rect_union(src, shadow)
            }
            FilterKind::Crop { rect, .. } => src.intersect(ctm.map_rect(*rect)),
            FilterKind::Compose { outer, .. } => outer.filter_bounds(src, ctm, direction),
        }
    }
}

fn input_bounds(input: Option<&ImageFilter>, src: Rect, ctm: &Mat3, dir: MapDirection) -> Rect {
    match input {
        Some(filter) => filter.filter_bounds(src, ctm, dir),
        None => src,
    }
}

/// Three standard deviations cover the visible extent of a gaussian.
fn blur_outset(sigma: Vec2, ctm: &Mat3) -> Vec2 {
    let mapped = ctm.map_vector(sigma);
    Vec2::new(mapped.x.abs() * 3.0, mapped.y.abs() * 3.0)
}
