// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-builder contract and a reference builder producing a layer tree.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;
use kurbo::{BezPath, Point, Rect, RoundedRect, Size, Vec2};
use scenery_graph::{BlendMode, ImageFilter, Picture, Sampling};

/// Handle of a decoded video frame. Clones share the frame.
///
/// The frame is released when the last handle is dropped, so a consumer should not keep one
/// longer than it needs to.
#[derive(Clone)]
pub struct VideoBuffer(Rc<VideoFrame>);

struct VideoFrame {
    width: u32,
    height: u32,
}

impl VideoBuffer {
    /// Create a frame handle of the given pixel size.
    pub fn new(width: u32, height: u32) -> Self {
        Self(Rc::new(VideoFrame { width, height }))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.0.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.0.height
    }

    /// True if both handles share the same frame.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles on this frame.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl PartialEq for VideoBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for VideoBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoBuffer")
            .field("width", &self.0.width)
            .field("height", &self.0.height)
            .finish()
    }
}

/// Sink of a linearized render tree.
///
/// Every `push_*` opens a scope closed by the matching [`SceneBuilder::pop`].
pub trait SceneBuilder {
    /// What [`SceneBuilder::build`] produces.
    type Scene;

    /// Translate the content of the scope.
    fn push_offset(&mut self, offset: Vec2);
    /// Rotate the content of the scope by `rad` around `pivot`.
    fn push_rotate(&mut self, rad: f64, pivot: Point);
    /// Multiply the alpha of the scope.
    fn push_opacity(&mut self, alpha: f32);
    /// Filter the content of the scope.
    fn push_image_filter(&mut self, filter: &ImageFilter);
    /// Filter what lies behind the scope and blend the result back.
    fn push_backdrop_filter(
        &mut self,
        filter: &ImageFilter,
        blend_mode: BlendMode,
        bounds_clip: bool,
    );
    /// Clip the scope to a rectangle.
    fn push_rect_clip(&mut self, rect: Rect, anti_alias: bool);
    /// Clip the scope to a rounded rectangle.
    fn push_rrect_clip(&mut self, rrect: RoundedRect, anti_alias: bool);
    /// Clip the scope to a closed path.
    fn push_path_clip(&mut self, path: &BezPath, anti_alias: bool);
    /// Close the innermost scope.
    fn pop(&mut self);
    /// Draw `picture` with its origin at `origin`.
    fn add_picture(&mut self, picture: &Picture, apply_clip: bool, origin: Point);
    /// Draw a video frame into `rect`.
    fn add_video_buffer(&mut self, buffer: &VideoBuffer, rect: Rect, sampling: Sampling);
    /// Finish building.
    fn build(self) -> Self::Scene;
}

/// What one [`Layer`] does.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerKind {
    /// Root container of a scene.
    Root,
    /// Translation.
    Offset(Vec2),
    /// Rotation around a pivot.
    Rotate {
        /// Angle in radians.
        rad: f64,
        /// Center of the rotation.
        pivot: Point,
    },
    /// Alpha multiplier.
    Opacity(f32),
    /// Filter over the content.
    ImageFilter(ImageFilter),
    /// Filter over the backdrop.
    BackdropFilter {
        /// Filter.
        filter: ImageFilter,
        /// How the filtered backdrop is blended back.
        blend_mode: BlendMode,
        /// Whether the filter is limited to the layer bounds.
        bounds_clip: bool,
    },
    /// Rectangular clip.
    RectClip {
        /// Clip shape.
        rect: Rect,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Rounded rectangular clip.
    RRectClip {
        /// Clip shape.
        rrect: RoundedRect,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Path clip.
    PathClip {
        /// Clip shape.
        path: BezPath,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Picture leaf.
    Picture {
        /// Drawn picture.
        picture: Picture,
        /// Whether drawing is clipped to the picture's cull rectangle.
        apply_clip: bool,
        /// Position of the picture's origin.
        origin: Point,
    },
    /// Video frame leaf.
    VideoBuffer {
        /// Drawn frame.
        buffer: VideoBuffer,
        /// Destination rectangle.
        rect: Rect,
        /// Sampling.
        sampling: Sampling,
    },
}

/// Node of a built [`Scene`].
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    kind: LayerKind,
    children: Vec<Layer>,
}

impl Layer {
    fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    /// What the layer does.
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Layers nested inside this one, in drawing order.
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Self)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

/// Layer tree produced by a [`LayerTreeBuilder`].
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    viewport: Size,
    root: Layer,
}

impl Scene {
    /// Size of the surface the scene targets.
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Root layer; its kind is [`LayerKind::Root`].
    pub fn root(&self) -> &Layer {
        &self.root
    }

    /// Pictures of the scene in drawing order.
    pub fn pictures(&self) -> Vec<&Picture> {
        let mut out = Vec::new();
        self.root.visit(&mut |layer| {
            if let LayerKind::Picture { picture, .. } = &layer.kind {
                out.push(picture);
            }
        });
        out
    }

    /// Number of layers, the root included.
    pub fn layer_count(&self) -> usize {
        let mut count = 0;
        self.root.visit(&mut |_| count += 1);
        count
    }
}

/// Reference [`SceneBuilder`] that nests [`Layer`]s the way the scopes were pushed.
#[derive(Debug)]
pub struct LayerTreeBuilder {
    viewport: Size,
    // Open scopes, outermost first; never empty.
    stack: Vec<Layer>,
}

impl LayerTreeBuilder {
    /// Start a scene for a surface of size `viewport`.
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            stack: alloc::vec![Layer::new(LayerKind::Root)],
        }
    }

    /// Number of scopes opened and not yet closed.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    fn push(&mut self, kind: LayerKind) {
        self.stack.push(Layer::new(kind));
    }

    fn add(&mut self, kind: LayerKind) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(Layer::new(kind));
        }
    }

    fn close_top(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(layer) = self.stack.pop()
            && let Some(parent) = self.stack.last_mut()
        {
            parent.children.push(layer);
        }
    }
}

impl SceneBuilder for LayerTreeBuilder {
    type Scene = Scene;

    fn push_offset(&mut self, offset: Vec2) {
        self.push(LayerKind::Offset(offset));
    }

    fn push_rotate(&mut self, rad: f64, pivot: Point) {
        self.push(LayerKind::Rotate { rad, pivot });
    }

    fn push_opacity(&mut self, alpha: f32) {
        self.push(LayerKind::Opacity(alpha));
    }

    fn push_image_filter(&mut self, filter: &ImageFilter) {
        self.push(LayerKind::ImageFilter(filter.clone()));
    }

    fn push_backdrop_filter(
        &mut self,
        filter: &ImageFilter,
        blend_mode: BlendMode,
        bounds_clip: bool,
    ) {
        self.push(LayerKind::BackdropFilter {
            filter: filter.clone(),
            blend_mode,
            bounds_clip,
        });
    }

    fn push_rect_clip(&mut self, rect: Rect, anti_alias: bool) {
        self.push(LayerKind::RectClip { rect, anti_alias });
    }

    fn push_rrect_clip(&mut self, rrect: RoundedRect, anti_alias: bool) {
        self.push(LayerKind::RRectClip { rrect, anti_alias });
    }

    fn push_path_clip(&mut self, path: &BezPath, anti_alias: bool) {
        self.push(LayerKind::PathClip {
            path: path.clone(),
            anti_alias,
        });
    }

    fn pop(&mut self) {
        if self.depth() == 0 {
            tracing::warn!("pop without a matching push");
            return;
        }
        self.close_top();
    }

    fn add_picture(&mut self, picture: &Picture, apply_clip: bool, origin: Point) {
        self.add(LayerKind::Picture {
            picture: picture.clone(),
            apply_clip,
            origin,
        });
    }

    fn add_video_buffer(&mut self, buffer: &VideoBuffer, rect: Rect, sampling: Sampling) {
        self.add(LayerKind::VideoBuffer {
            buffer: buffer.clone(),
            rect,
            sampling,
        });
    }

    fn build(mut self) -> Scene {
        if self.depth() > 0 {
            tracing::warn!(open = self.depth(), "closing scopes left open");
        }
        while self.depth() > 0 {
            self.close_top();
        }
        let root = self
            .stack
            .pop()
            .unwrap_or_else(|| Layer::new(LayerKind::Root));
        Scene {
            viewport: self.viewport,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenery_graph::PictureRecorder;

    #[test]
    fn scopes_nest_layers() {
        let picture =
            PictureRecorder::begin_recording(Rect::new(0.0, 0.0, 1.0, 1.0)).finish_recording();
        let mut builder = LayerTreeBuilder::new(Size::new(100.0, 50.0));
        builder.push_offset(Vec2::new(5.0, 5.0));
        builder.push_opacity(0.5);
        builder.add_picture(&picture, true, Point::ZERO);
        builder.pop();
        builder.add_picture(&picture, false, Point::new(1.0, 1.0));
        builder.pop();
        assert_eq!(builder.depth(), 0);

        let scene = builder.build();
        assert_eq!(scene.viewport(), Size::new(100.0, 50.0));
        let offset = &scene.root().children()[0];
        assert_eq!(offset.kind(), &LayerKind::Offset(Vec2::new(5.0, 5.0)));
        assert_eq!(offset.children().len(), 2);
        assert_eq!(offset.children()[0].kind(), &LayerKind::Opacity(0.5));
        assert_eq!(scene.pictures().len(), 2);
        assert_eq!(scene.layer_count(), 5);
    }

    #[test]
    fn unbalanced_scopes_are_closed_on_build() {
        let mut builder = LayerTreeBuilder::new(Size::ZERO);
        builder.pop();
        builder.push_rect_clip(Rect::new(0.0, 0.0, 1.0, 1.0), false);
        builder.push_rotate(1.0, Point::ZERO);
        let scene = builder.build();
        let clip = &scene.root().children()[0];
        assert!(matches!(clip.kind(), LayerKind::RectClip { .. }));
        assert!(matches!(clip.children()[0].kind(), LayerKind::Rotate { .. }));
    }

    #[test]
    fn video_handles_are_shared() {
        let buffer = VideoBuffer::new(4, 2);
        let mut builder = LayerTreeBuilder::new(Size::ZERO);
        builder.add_video_buffer(&buffer, Rect::new(0.0, 0.0, 4.0, 2.0), Sampling::Linear);
        assert_eq!(buffer.handle_count(), 2);
        drop(builder);
        assert_eq!(buffer.handle_count(), 1);
    }
}
