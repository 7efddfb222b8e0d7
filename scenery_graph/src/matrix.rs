// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 3×3 matrix with perspective.
//!
//! Kurbo's [`Affine`] only covers the top two rows; transform nodes may carry a
//! projective bottom row, so they use [`Mat3`] and convert at the edges.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Point, Rect, Vec2};

/// A column-major 3×3 matrix stored as `[[f64; 3]; 3]`.
///
/// Entry `(row, col)` lives at `cols[col][row]`. Points are column vectors `(x, y, 1)`
/// multiplied on the right, so `a * b` applied to a point applies `b` first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3 {
    /// Three columns, each `[x, y, w]`.
    pub cols: [[f64; 3]; 3],
}

impl Mat3 {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Creates a matrix from three rows.
    #[inline]
    #[must_use]
    pub const fn from_rows(r0: [f64; 3], r1: [f64; 3], r2: [f64; 3]) -> Self {
        Self {
            cols: [[r0[0], r1[0], r2[0]], [r0[1], r1[1], r2[1]], [r0[2], r1[2], r2[2]]],
        }
    }

    /// Creates a translation.
    #[inline]
    #[must_use]
    pub const fn translate(x: f64, y: f64) -> Self {
        Self {
            cols: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [x, y, 1.0]],
        }
    }

    /// Creates a non-uniform scale.
    #[inline]
    #[must_use]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            cols: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Creates a rotation by `rad` radians about `center`.
    #[must_use]
    pub fn rotate(center: Point, rad: f64) -> Self {
        let (s, c) = (rad.sin(), rad.cos());
        let t = 1.0 - c;
        Self::from_rows(
            [c, -s, s * center.y + t * center.x],
            [s, c, -s * center.x + t * center.y],
            [0.0, 0.0, 1.0],
        )
    }

    /// Lifts a kurbo affine.
    #[must_use]
    pub fn from_affine(affine: Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self {
            cols: [[a, b, 0.0], [c, d, 0.0], [e, f, 1.0]],
        }
    }

    /// The affine part of the matrix, or `None` if it carries perspective.
    #[must_use]
    pub fn to_affine(&self) -> Option<Affine> {
        if self.has_perspective() {
            return None;
        }
        let c = &self.cols;
        Some(Affine::new([c[0][0], c[0][1], c[1][0], c[1][1], c[2][0], c[2][1]]))
    }

    /// Entry at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is not below 3.
    #[inline]
    #[must_use]
    pub const fn at(&self, row: usize, col: usize) -> f64 {
        self.cols[col][row]
    }

    /// `a × b`: applying the result equals applying `b`, then `a`.
    #[inline]
    #[must_use]
    pub fn concat(a: &Self, b: &Self) -> Self {
        *a * *b
    }

    /// `self = self × m`.
    pub fn pre_concat(&mut self, m: &Self) -> &mut Self {
        *self = *self * *m;
        self
    }

    /// `self = m × self`.
    pub fn post_concat(&mut self, m: &Self) -> &mut Self {
        *self = *m * *self;
        self
    }

    /// True unless the bottom row is `[0, 0, 1]`.
    #[must_use]
    pub fn has_perspective(&self) -> bool {
        let c = &self.cols;
        !(c[0][2] == 0.0 && c[1][2] == 0.0 && c[2][2] == 1.0)
    }

    /// True if every entry is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Transposed matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let c = &self.cols;
        Self::from_rows(c[0], c[1], c[2])
    }

    /// Determinant.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let [[a, d, g], [b, e, h], [c, f, i]] = self.cols;
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// Inverse matrix, or `None` when the matrix is singular.
    ///
    /// ```
    /// use scenery_graph::Mat3;
    ///
    /// assert!(Mat3::scale(0.0, 1.0).invert().is_none());
    /// assert_eq!(Mat3::translate(2.0, 3.0).invert(), Some(Mat3::translate(-2.0, -3.0)));
    /// ```
    #[must_use]
    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let [[a, d, g], [b, e, h], [c, f, i]] = self.cols;
        let inv_det = 1.0 / det;
        let inverse = Self::from_rows(
            [
                (e * i - f * h) * inv_det,
                (c * h - b * i) * inv_det,
                (b * f - c * e) * inv_det,
            ],
            [
                (f * g - d * i) * inv_det,
                (a * i - c * g) * inv_det,
                (c * d - a * f) * inv_det,
            ],
            [
                (d * h - e * g) * inv_det,
                (b * g - a * h) * inv_det,
                (a * e - b * d) * inv_det,
            ],
        );
        inverse.is_finite().then_some(inverse)
    }

    /// Maps a point with the perspective divide.
    #[must_use]
    pub fn map_point(&self, p: Point) -> Point {
        let c = &self.cols;
        let x = p.x * c[0][0] + p.y * c[1][0] + c[2][0];
        let y = p.x * c[0][1] + p.y * c[1][1] + c[2][1];
        let w = p.x * c[0][2] + p.y * c[1][2] + c[2][2];
        Point::new(x / w, y / w)
    }

    /// Maps a point with the bottom row ignored.
    #[must_use]
    pub fn map_affine_point(&self, p: Point) -> Point {
        let c = &self.cols;
        Point::new(
            p.x * c[0][0] + p.y * c[1][0] + c[2][0],
            p.x * c[0][1] + p.y * c[1][1] + c[2][1],
        )
    }

    /// Maps a vector (no translation, no perspective).
    #[must_use]
    pub fn map_vector(&self, v: Vec2) -> Vec2 {
        let c = &self.cols;
        Vec2::new(v.x * c[0][0] + v.y * c[1][0], v.x * c[0][1] + v.y * c[1][1])
    }

    /// Bounding box of the four mapped corners of `rect`.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        let p0 = self.map_point(Point::new(rect.x0, rect.y0));
        let p1 = self.map_point(Point::new(rect.x1, rect.y0));
        let p2 = self.map_point(Point::new(rect.x0, rect.y1));
        let p3 = self.map_point(Point::new(rect.x1, rect.y1));
        let min_x = p0.x.min(p1.x).min(p2.x).min(p3.x);
        let min_y = p0.y.min(p1.y).min(p2.y).min(p3.y);
        let max_x = p0.x.max(p1.x).max(p2.x).max(p3.x);
        let max_y = p0.y.max(p1.y).max(p2.y).max(p3.y);
        Rect::new(min_x, min_y, max_x, max_y)
    }
}

impl Default for Mat3 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Affine> for Mat3 {
    fn from(affine: Affine) -> Self {
        Self::from_affine(affine)
    }
}

impl Mul for Mat3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 3]; 3];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2];
            }
        }
        Self { cols: out }
    }
}
