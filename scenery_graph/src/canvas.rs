// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording canvas, pictures, and raster image handles.
//!
//! Nothing here rasterizes: a [`Canvas`] appends [`DrawOp`]s and tracks the save stack, and a
//! [`PictureRecorder`] freezes the ops into a shareable [`Picture`] for a backend to replay.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;
use kurbo::{BezPath, Point, Rect, RoundedRect, Vec2};

use crate::matrix::Mat3;
use crate::paint::{Paint, Sampling};

/// One recorded canvas call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Push the matrix/clip state.
    Save,
    /// Push the state and start an offscreen layer composited with `paint` on restore.
    SaveLayer {
        /// Optional bounds hint of the layer.
        bounds: Option<Rect>,
        /// Paint used to composite the layer.
        paint: Option<Paint>,
    },
    /// Pop the last save.
    Restore,
    /// Pre-concatenate the current matrix.
    Concat(Mat3),
    /// Intersect the clip with a rectangle.
    ClipRect {
        /// Clip shape.
        rect: Rect,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Intersect the clip with a rounded rectangle.
    ClipRRect {
        /// Clip shape.
        rrect: RoundedRect,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Intersect the clip with a path.
    ClipPath {
        /// Clip shape.
        path: BezPath,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Paint a rectangle.
    DrawRect {
        /// Shape.
        rect: Rect,
        /// Paint.
        paint: Paint,
    },
    /// Paint a path.
    DrawPath {
        /// Shape.
        path: BezPath,
        /// Paint.
        paint: Paint,
    },
    /// Paint an image with its top-left corner at `origin`.
    DrawImage {
        /// Image.
        image: Image,
        /// Top-left corner.
        origin: Point,
        /// Sampling.
        sampling: Sampling,
        /// Paint.
        paint: Paint,
    },
    /// Replay a picture.
    DrawPicture(Picture),
    /// Fill the clip with a paint.
    DrawPaint(Paint),
}

/// Canvas that records its calls.
#[derive(Clone, Debug)]
pub struct Canvas {
    ops: Vec<DrawOp>,
    // One matrix per save level; never empty.
    matrices: Vec<Mat3>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Create an empty canvas with save count `1`.
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            matrices: alloc::vec![Mat3::IDENTITY],
        }
    }

    /// Recorded ops.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Take the recorded ops.
    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }

    /// Current depth of the save stack; a fresh canvas reports `1`.
    pub fn save_count(&self) -> usize {
        self.matrices.len()
    }

    /// Current total matrix.
    pub fn total_matrix(&self) -> Mat3 {
        self.matrices.last().copied().unwrap_or_default()
    }

    /// Push the state. Returns the save count before the push.
    pub fn save(&mut self) -> usize {
        self.ops.push(DrawOp::Save);
        self.push_level()
    }

    /// Push the state and open a layer. Returns the save count before the push.
    pub fn save_layer(&mut self, bounds: Option<Rect>, paint: Option<Paint>) -> usize {
        self.ops.push(DrawOp::SaveLayer { bounds, paint });
        self.push_level()
    }

    fn push_level(&mut self) -> usize {
        let count = self.save_count();
        let top = self.total_matrix();
        self.matrices.push(top);
        count
    }

    /// Pop one level. Restoring the base level is ignored.
    pub fn restore(&mut self) {
        if self.matrices.len() > 1 {
            self.matrices.pop();
            self.ops.push(DrawOp::Restore);
        }
    }

    /// Pop levels until the save count equals `count` (at least `1`).
    pub fn restore_to_count(&mut self, count: usize) {
        let count = count.max(1);
        while self.save_count() > count {
            self.restore();
        }
    }

    /// Pre-concatenate `m` onto the current matrix.
    pub fn concat(&mut self, m: &Mat3) {
        if let Some(top) = self.matrices.last_mut() {
            top.pre_concat(m);
        }
        self.ops.push(DrawOp::Concat(*m));
    }

    /// Translate the current matrix.
    pub fn translate(&mut self, v: Vec2) {
        self.concat(&Mat3::translate(v.x, v.y));
    }

    /// Intersect the clip with a rectangle.
    pub fn clip_rect(&mut self, rect: Rect, anti_alias: bool) {
        self.ops.push(DrawOp::ClipRect { rect, anti_alias });
    }

    /// Intersect the clip with a rounded rectangle.
    pub fn clip_rrect(&mut self, rrect: RoundedRect, anti_alias: bool) {
        self.ops.push(DrawOp::ClipRRect { rrect, anti_alias });
    }

    /// Intersect the clip with a path.
    pub fn clip_path(&mut self, path: BezPath, anti_alias: bool) {
        self.ops.push(DrawOp::ClipPath { path, anti_alias });
    }

    /// Paint a rectangle.
    pub fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.ops.push(DrawOp::DrawRect {
            rect,
            paint: paint.clone(),
        });
    }

    /// Paint a path.
    pub fn draw_path(&mut self, path: BezPath, paint: &Paint) {
        self.ops.push(DrawOp::DrawPath {
            path,
            paint: paint.clone(),
        });
    }

    /// Paint an image.
    pub fn draw_image(&mut self, image: &Image, origin: Point, sampling: Sampling, paint: &Paint) {
        self.ops.push(DrawOp::DrawImage {
            image: image.clone(),
            origin,
            sampling,
            paint: paint.clone(),
        });
    }

    /// Replay a picture.
    pub fn draw_picture(&mut self, picture: &Picture) {
        self.ops.push(DrawOp::DrawPicture(picture.clone()));
    }

    /// Fill the clip.
    pub fn draw_paint(&mut self, paint: &Paint) {
        self.ops.push(DrawOp::DrawPaint(paint.clone()));
    }
}

/// Immutable recorded picture. Clones share the recording.
#[derive(Clone)]
pub struct Picture(Rc<PictureData>);

struct PictureData {
    cull: Rect,
    ops: Vec<DrawOp>,
}

impl Picture {
    /// Bounds the recording was started with.
    pub fn cull_rect(&self) -> Rect {
        self.0.cull
    }

    /// Recorded ops.
    pub fn ops(&self) -> &[DrawOp] {
        &self.0.ops
    }

    /// True if both handles share the same recording.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Picture {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Picture")
            .field("cull", &self.0.cull)
            .field("ops", &self.0.ops.len())
            .finish()
    }
}

/// Records canvas calls into a [`Picture`].
///
/// ```
/// use kurbo::Rect;
/// use scenery_graph::{Paint, PictureRecorder};
///
/// let mut recorder = PictureRecorder::begin_recording(Rect::new(0.0, 0.0, 10.0, 10.0));
/// recorder.canvas().draw_rect(Rect::new(1.0, 1.0, 4.0, 4.0), &Paint::default());
/// let picture = recorder.finish_recording();
/// assert_eq!(picture.ops().len(), 1);
/// ```
#[derive(Debug)]
pub struct PictureRecorder {
    cull: Rect,
    canvas: Canvas,
}

impl PictureRecorder {
    /// Start recording into a fresh canvas bounded by `cull`.
    pub fn begin_recording(cull: Rect) -> Self {
        Self {
            cull,
            canvas: Canvas::new(),
        }
    }

    /// Recording canvas.
    pub fn canvas(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Freeze the recording.
    pub fn finish_recording(self) -> Picture {
        Picture(Rc::new(PictureData {
            cull: self.cull,
            ops: self.canvas.into_ops(),
        }))
    }
}

/// Handle of a decoded raster image. Clones share the pixels.
#[derive(Clone)]
pub struct Image(Rc<ImageData>);

struct ImageData {
    width: u32,
    height: u32,
}

impl Image {
    /// Create an image handle of the given pixel size.
    pub fn new(width: u32, height: u32) -> Self {
        Self(Rc::new(ImageData { width, height }))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.0.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.0.height
    }

    /// `(0, 0, width, height)`.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.0.width), f64::from(self.0.height))
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.0.width)
            .field("height", &self.0.height)
            .finish()
    }
}
