// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stack-structured instruction list and its linearization into a scene.

use alloc::vec::Vec;
use kurbo::{BezPath, Point, Rect, RoundedRect, Size, Vec2};
use scenery_graph::{BlendMode, ImageFilter, PictureRecorder, Sampling, rect_union};

use crate::cache::CacheContext;
use crate::logger::{InstructionLog, Logger};
use crate::render_tree::PaintNode;
use crate::scene::{LayerTreeBuilder, Scene, SceneBuilder, VideoBuffer};

/// Operation of a [`RecordInst`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs, reason = "named after the instructions")]
pub enum Opcode {
    PushOffset,
    PushRotate,
    PushBackdropFilter,
    PushImageFilter,
    PushRectClip,
    PushRRectClip,
    PushPathClip,
    PushOpacity,
    Pop,
    IsolateLayer,
    DrawPaintNode,
    DrawVideoTexture,
    DrawStaticTexture,
}

impl Opcode {
    /// Name used in instruction logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::PushOffset => "PushOffset",
            Self::PushRotate => "PushRotate",
            Self::PushBackdropFilter => "PushBackdropFilter",
            Self::PushImageFilter => "PushImageFilter",
            Self::PushRectClip => "PushRectClip",
            Self::PushRRectClip => "PushRRectClip",
            Self::PushPathClip => "PushPathClip",
            Self::PushOpacity => "PushOpacity",
            Self::Pop => "Pop",
            Self::IsolateLayer => "IsolateLayer",
            Self::DrawPaintNode => "DrawPaintNode",
            Self::DrawVideoTexture => "DrawVideoTexture",
            Self::DrawStaticTexture => "DrawStaticTexture",
        }
    }

    /// True for the instructions that open a scope.
    pub const fn is_push(self) -> bool {
        matches!(
            self,
            Self::PushOffset
                | Self::PushRotate
                | Self::PushBackdropFilter
                | Self::PushImageFilter
                | Self::PushRectClip
                | Self::PushRRectClip
                | Self::PushPathClip
                | Self::PushOpacity
        )
    }
}

/// One recorded instruction with its operands.
#[derive(Clone, Debug)]
pub enum RecordInst {
    /// Translate the scope.
    PushOffset(Vec2),
    /// Rotate the scope by `rad` around `pivot`.
    PushRotate {
        /// Angle in radians.
        rad: f64,
        /// Center of the rotation.
        pivot: Point,
    },
    /// Filter the backdrop of the scope.
    PushBackdropFilter {
        /// Filter.
        filter: ImageFilter,
        /// How the filtered backdrop is blended back.
        blend_mode: BlendMode,
        /// Whether the filter is limited to the scope bounds.
        bounds_clip: bool,
    },
    /// Filter the content of the scope.
    PushImageFilter(ImageFilter),
    /// Clip the scope to a rectangle.
    PushRectClip {
        /// Clip shape.
        rect: Rect,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Clip the scope to a rounded rectangle.
    PushRRectClip {
        /// Clip shape.
        rrect: RoundedRect,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Clip the scope to a closed path.
    PushPathClip {
        /// Clip shape.
        path: BezPath,
        /// Anti-aliased clip edges.
        anti_alias: bool,
    },
    /// Multiply the alpha of the scope.
    PushOpacity(f32),
    /// Close the innermost scope.
    Pop,
    /// Marks where a composite node wants its own layer; has no scene output yet.
    IsolateLayer,
    /// Paint a leaf; consecutive leaves share one picture.
    DrawPaintNode(PaintNode),
    /// Draw a video frame.
    DrawVideoTexture {
        /// Frame; the instruction owns this handle.
        buffer: VideoBuffer,
        /// Destination rectangle.
        rect: Rect,
        /// Sampling.
        sampling: Sampling,
    },
    /// Reserved. Linearizing it panics.
    DrawStaticTexture,
}

impl RecordInst {
    /// Operation of the instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::PushOffset(_) => Opcode::PushOffset,
            Self::PushRotate { .. } => Opcode::PushRotate,
            Self::PushBackdropFilter { .. } => Opcode::PushBackdropFilter,
            Self::PushImageFilter(_) => Opcode::PushImageFilter,
            Self::PushRectClip { .. } => Opcode::PushRectClip,
            Self::PushRRectClip { .. } => Opcode::PushRRectClip,
            Self::PushPathClip { .. } => Opcode::PushPathClip,
            Self::PushOpacity(_) => Opcode::PushOpacity,
            Self::Pop => Opcode::Pop,
            Self::IsolateLayer => Opcode::IsolateLayer,
            Self::DrawPaintNode(_) => Opcode::DrawPaintNode,
            Self::DrawVideoTexture { .. } => Opcode::DrawVideoTexture,
            Self::DrawStaticTexture => Opcode::DrawStaticTexture,
        }
    }

    /// Number of operands the instruction carries.
    pub fn operand_count(&self) -> usize {
        match self {
            Self::Pop | Self::IsolateLayer | Self::DrawStaticTexture => 0,
            Self::PushOffset(_)
            | Self::PushImageFilter(_)
            | Self::PushOpacity(_)
            | Self::DrawPaintNode(_) => 1,
            Self::PushRotate { .. }
            | Self::PushRectClip { .. }
            | Self::PushRRectClip { .. }
            | Self::PushPathClip { .. } => 2,
            Self::PushBackdropFilter { .. } | Self::DrawVideoTexture { .. } => 3,
        }
    }

    fn paint_node(&self) -> Option<&PaintNode> {
        match self {
            Self::DrawPaintNode(node) => Some(node),
            _ => None,
        }
    }
}

/// Append-only list of instructions describing one frame of a render tree.
///
/// Appending never validates; every push must be matched by a later [`Recorder::pop`] at
/// the same depth.
///
/// ```
/// use kurbo::{Rect, Size, Vec2};
/// use scenery_compose::{CacheContext, PaintNode, Recorder};
/// use scenery_graph::{IdAllocator, Paint};
///
/// let ids = IdAllocator::new();
/// let mut cache = CacheContext::new();
/// let leaves: Vec<PaintNode> = (0..3)
///     .map(|i| {
///         let leaf = PaintNode::new(&ids);
///         let x = f64::from(i) * 10.0;
///         leaf.update(Rect::new(x, 0.0, x + 5.0, 5.0), |canvas| {
///             canvas.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::default());
///         });
///         leaf
///     })
///     .collect();
///
/// let mut recorder = Recorder::new();
/// recorder.push_offset(Vec2::new(1.0, 1.0));
/// for leaf in &leaves {
///     recorder.draw_paint_node(leaf.clone());
/// }
/// recorder.pop();
///
/// // Three leaves, one picture.
/// let scene = recorder.finish(Size::new(64.0, 64.0), &mut cache, None);
/// assert_eq!(scene.pictures().len(), 1);
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    insts: Vec<RecordInst>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded instructions, in order.
    pub fn instructions(&self) -> &[RecordInst] {
        &self.insts
    }

    /// Append a raw instruction.
    pub fn push(&mut self, inst: RecordInst) {
        self.insts.push(inst);
    }

    /// Close the innermost scope.
    pub fn pop(&mut self) {
        self.push(RecordInst::Pop);
    }

    /// Open a translated scope.
    pub fn push_offset(&mut self, offset: Vec2) {
        self.push(RecordInst::PushOffset(offset));
    }

    /// Open a scope rotated by `rad` around `pivot`.
    pub fn push_rotate(&mut self, rad: f64, pivot: Point) {
        self.push(RecordInst::PushRotate { rad, pivot });
    }

    /// Open a scope with its alpha multiplied by `alpha`.
    pub fn push_opacity(&mut self, alpha: f32) {
        self.push(RecordInst::PushOpacity(alpha));
    }

    /// Open a scope filtering its backdrop.
    pub fn push_backdrop_filter(
        &mut self,
        filter: ImageFilter,
        blend_mode: BlendMode,
        bounds_clip: bool,
    ) {
        self.push(RecordInst::PushBackdropFilter {
            filter,
            blend_mode,
            bounds_clip,
        });
    }

    /// Open a scope filtering its content.
    pub fn push_image_filter(&mut self, filter: ImageFilter) {
        self.push(RecordInst::PushImageFilter(filter));
    }

    /// Open a scope clipped to `rect`.
    pub fn push_rect_clip(&mut self, rect: Rect, anti_alias: bool) {
        self.push(RecordInst::PushRectClip { rect, anti_alias });
    }

    /// Open a scope clipped to `rrect`.
    pub fn push_rrect_clip(&mut self, rrect: RoundedRect, anti_alias: bool) {
        self.push(RecordInst::PushRRectClip { rrect, anti_alias });
    }

    /// Open a scope clipped to `path`.
    pub fn push_path_clip(&mut self, path: BezPath, anti_alias: bool) {
        self.push(RecordInst::PushPathClip { path, anti_alias });
    }

    /// Paint `node`.
    pub fn draw_paint_node(&mut self, node: PaintNode) {
        self.push(RecordInst::DrawPaintNode(node));
    }

    /// Draw a video frame into `rect`. The recorder owns `buffer` from now on.
    pub fn draw_video_texture(&mut self, buffer: VideoBuffer, rect: Rect, sampling: Sampling) {
        self.push(RecordInst::DrawVideoTexture {
            buffer,
            rect,
            sampling,
        });
    }

    /// Mark an isolated layer.
    pub fn isolate_layer(&mut self) {
        self.push(RecordInst::IsolateLayer);
    }

    /// Linearize into a layer-tree [`Scene`] of size `viewport`.
    ///
    /// See [`Recorder::finish_with`].
    pub fn finish(
        self,
        viewport: Size,
        cache: &mut CacheContext,
        logger: Option<&mut dyn Logger>,
    ) -> Scene {
        self.finish_with(LayerTreeBuilder::new(viewport), cache, logger)
    }

    /// Linearize into `builder`.
    ///
    /// Instructions map one to one onto builder calls inside an implicit root offset scope,
    /// except runs of consecutive [`RecordInst::DrawPaintNode`], which are drawn into one
    /// picture shared through `cache`. The cache ages once per call. Video frames are
    /// released when the recorder is dropped at the end of the call.
    ///
    /// # Panics
    ///
    /// Panics on [`RecordInst::DrawStaticTexture`].
    #[tracing::instrument(level = "debug", skip_all, fields(instructions = self.insts.len()))]
    pub fn finish_with<B: SceneBuilder>(
        self,
        mut builder: B,
        cache: &mut CacheContext,
        logger: Option<&mut dyn Logger>,
    ) -> B::Scene {
        let mut log = InstructionLog::new(logger);
        builder.push_offset(Vec2::ZERO);

        let mut depth = 0_usize;
        let mut pictures = 0_usize;
        let mut i = 0;
        while i < self.insts.len() {
            if self.insts[i].paint_node().is_some() {
                pictures += 1;
                i = self.draw_ordered_paint(i, pictures, cache, &mut builder, &mut log);
                continue;
            }

            let inst = &self.insts[i];
            let opcode = inst.opcode();
            log.begin(i, opcode.name(), inst.operand_count());
            match inst {
                RecordInst::Pop => builder.pop(),
                RecordInst::PushOffset(offset) => builder.push_offset(*offset),
                RecordInst::PushRotate { rad, pivot } => builder.push_rotate(*rad, *pivot),
                RecordInst::PushBackdropFilter {
                    filter,
                    blend_mode,
                    bounds_clip,
                } => builder.push_backdrop_filter(filter, *blend_mode, *bounds_clip),
                RecordInst::PushImageFilter(filter) => builder.push_image_filter(filter),
                RecordInst::PushRectClip { rect, anti_alias } => {
                    builder.push_rect_clip(*rect, *anti_alias);
                }
                RecordInst::PushRRectClip { rrect, anti_alias } => {
                    builder.push_rrect_clip(*rrect, *anti_alias);
                }
                RecordInst::PushPathClip { path, anti_alias } => {
                    builder.push_path_clip(path, *anti_alias);
                }
                RecordInst::PushOpacity(alpha) => builder.push_opacity(*alpha),
                RecordInst::IsolateLayer => {}
                RecordInst::DrawVideoTexture {
                    buffer,
                    rect,
                    sampling,
                } => builder.add_video_buffer(buffer, *rect, *sampling),
                RecordInst::DrawStaticTexture => {
                    panic!("instruction {i}: static textures are not supported")
                }
                RecordInst::DrawPaintNode(_) => unreachable!("paint runs are drawn above"),
            }
            if opcode.is_push() {
                depth += 1;
            } else if opcode == Opcode::Pop {
                depth = depth.saturating_sub(1);
            }
            log.annotate(format_args!("depth={depth}"));
            log.end();
            i += 1;
        }

        if depth != 0 {
            tracing::warn!(depth, "recorded scopes are not balanced");
        }
        cache.checkpoint();
        builder.pop();
        builder.build()
    }

    /// Draw the run of paint nodes starting at `start` as one picture and return the index
    /// after the run.
    fn draw_ordered_paint<B: SceneBuilder>(
        &self,
        start: usize,
        picture_index: usize,
        cache: &mut CacheContext,
        builder: &mut B,
        log: &mut InstructionLog<'_>,
    ) -> usize {
        let run: Vec<PaintNode> = self.insts[start..]
            .iter()
            .map_while(RecordInst::paint_node)
            .cloned()
            .collect();
        let end = start + run.len();
        let union = run
            .iter()
            .map(PaintNode::bounds)
            .fold(Rect::ZERO, rect_union);

        if let Some(picture) = cache.find_merged_picture(&run) {
            tracing::trace!(start, len = run.len(), "merged picture cache hit");
            for (k, node) in (start..end).zip(&run) {
                log_paint_node(log, k, picture_index, node, true);
            }
            builder.add_picture(&picture, true, union.origin());
            return end;
        }

        tracing::trace!(start, len = run.len(), "merged picture cache miss");
        let mut recorder = PictureRecorder::begin_recording(Rect::from_origin_size(
            Point::ZERO,
            union.size(),
        ));
        let canvas = recorder.canvas();
        for (k, node) in (start..end).zip(&run) {
            log_paint_node(log, k, picture_index, node, false);
            let count = canvas.save();
            canvas.translate(node.bounds().origin() - union.origin());
            node.paint(canvas);
            canvas.restore_to_count(count);
        }
        let picture = recorder.finish_recording();
        builder.add_picture(&picture, true, union.origin());
        cache.create_merged_picture(picture, &run);
        end
    }
}

fn log_paint_node(
    log: &mut InstructionLog<'_>,
    index: usize,
    picture_index: usize,
    node: &PaintNode,
    cache_hit: bool,
) {
    log.begin(index, Opcode::DrawPaintNode.name(), 1);
    log.annotate(format_args!("Picture#{picture_index}"));
    if cache_hit {
        log.annotate(format_args!("CacheHit"));
    }
    log.annotate(format_args!("id={}", node.id()));
    log.annotate(format_args!("dirty={}", node.is_dirty()));
    let b = node.bounds();
    log.annotate(format_args!(
        "bounds=({},{},{},{})",
        b.x0,
        b.y0,
        b.width(),
        b.height()
    ));
    log.end();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::TextLogger;
    use crate::scene::LayerKind;
    use alloc::rc::Rc;
    use core::cell::Cell;
    use scenery_graph::{DrawOp, IdAllocator, Paint, Picture};

    struct Leaves {
        nodes: Vec<PaintNode>,
        paints: Rc<Cell<u32>>,
    }

    fn leaves(ids: &IdAllocator, n: usize) -> Leaves {
        let paints = Rc::new(Cell::new(0));
        let nodes = (0..n)
            .map(|i| {
                let node = PaintNode::new(ids);
                let x = 10.0 * i as f64;
                let paints = Rc::clone(&paints);
                node.update(Rect::new(x + 2.0, 3.0, x + 7.0, 8.0), move |canvas| {
                    paints.set(paints.get() + 1);
                    canvas.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::default());
                });
                node
            })
            .collect();
        Leaves { nodes, paints }
    }

    fn record(nodes: &[PaintNode]) -> Recorder {
        let mut recorder = Recorder::new();
        for node in nodes {
            node.compose(&mut recorder);
        }
        recorder
    }

    fn only_picture(scene: &Scene) -> Picture {
        let pictures = scene.pictures();
        assert_eq!(pictures.len(), 1, "one merged picture");
        pictures[0].clone()
    }

    #[test]
    fn unchanged_run_reuses_the_merged_picture() {
        let ids = IdAllocator::new();
        let leaves = leaves(&ids, 3);
        let mut cache = CacheContext::new();

        let first = record(&leaves.nodes).finish(Size::new(100.0, 100.0), &mut cache, None);
        assert_eq!(leaves.paints.get(), 3);
        assert!(leaves.nodes.iter().all(|n| !n.is_dirty()));

        let second = record(&leaves.nodes).finish(Size::new(100.0, 100.0), &mut cache, None);
        assert_eq!(leaves.paints.get(), 3, "no new recording");
        assert!(only_picture(&first).ptr_eq(&only_picture(&second)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn dirty_node_forces_a_new_picture() {
        let ids = IdAllocator::new();
        let leaves = leaves(&ids, 3);
        let mut cache = CacheContext::new();

        let first = record(&leaves.nodes).finish(Size::ZERO, &mut cache, None);
        leaves.nodes[1].mark_dirty();
        let second = record(&leaves.nodes).finish(Size::ZERO, &mut cache, None);
        assert!(!only_picture(&first).ptr_eq(&only_picture(&second)));
        assert_eq!(leaves.paints.get(), 6);
        assert_eq!(cache.len(), 1, "the repaint replaces the entry");
    }

    #[test]
    fn repainted_run_is_reused_on_the_next_frame() {
        let ids = IdAllocator::new();
        let leaves = leaves(&ids, 3);
        let mut cache = CacheContext::new();

        let first = record(&leaves.nodes).finish(Size::ZERO, &mut cache, None);
        leaves.nodes[0].mark_dirty();
        let second = record(&leaves.nodes).finish(Size::ZERO, &mut cache, None);
        let third = record(&leaves.nodes).finish(Size::ZERO, &mut cache, None);

        let third = only_picture(&third);
        assert!(third.ptr_eq(&only_picture(&second)));
        assert!(!third.ptr_eq(&only_picture(&first)));
        assert_eq!(leaves.paints.get(), 6);
    }

    #[test]
    fn leaves_paint_at_their_offset_in_the_union() {
        let ids = IdAllocator::new();
        let leaves = leaves(&ids, 2);
        let mut cache = CacheContext::new();
        let scene = record(&leaves.nodes).finish(Size::ZERO, &mut cache, None);

        let root_offset = &scene.root().children()[0];
        assert_eq!(root_offset.kind(), &LayerKind::Offset(Vec2::ZERO));
        match root_offset.children()[0].kind() {
            LayerKind::Picture {
                picture,
                apply_clip,
                origin,
            } => {
                assert!(*apply_clip);
                assert_eq!(*origin, Point::new(2.0, 3.0));
                assert_eq!(picture.cull_rect(), Rect::new(0.0, 0.0, 15.0, 5.0));
                let translations: Vec<Vec2> = picture
                    .ops()
                    .iter()
                    .filter_map(|op| match op {
                        DrawOp::Concat(m) => Some(m.map_point(Point::ZERO).to_vec2()),
                        _ => None,
                    })
                    .collect();
                assert_eq!(translations, [Vec2::ZERO, Vec2::new(10.0, 0.0)]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn scopes_split_paint_runs() {
        let ids = IdAllocator::new();
        let leaves = leaves(&ids, 3);
        let mut recorder = Recorder::new();
        recorder.draw_paint_node(leaves.nodes[0].clone());
        recorder.draw_paint_node(leaves.nodes[1].clone());
        recorder.push_image_filter(ImageFilter::blur(1.0, 1.0, None));
        recorder.draw_paint_node(leaves.nodes[2].clone());
        recorder.pop();

        let mut cache = CacheContext::new();
        let scene = recorder.finish(Size::ZERO, &mut cache, None);
        assert_eq!(scene.pictures().len(), 2);
        assert_eq!(cache.len(), 2);
        let root_offset = &scene.root().children()[0];
        assert!(matches!(
            root_offset.children()[1].kind(),
            LayerKind::ImageFilter(_)
        ));
    }

    #[test]
    fn logger_sees_every_instruction() {
        let ids = IdAllocator::new();
        let leaves = leaves(&ids, 2);
        let mut recorder = Recorder::new();
        recorder.push_opacity(0.5);
        for node in &leaves.nodes {
            recorder.draw_paint_node(node.clone());
        }
        recorder.pop();

        let mut cache = CacheContext::new();
        let mut log = TextLogger::new();
        let _ = recorder.clone().finish(Size::ZERO, &mut cache, Some(&mut log));
        let text = log.take();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "#0 PushOpacity(1) depth=1");
        assert!(lines[1].starts_with("#1 DrawPaintNode(1) Picture#1 id=#"));
        assert!(lines[2].ends_with("bounds=(12,3,5,5)"));
        assert_eq!(lines[3], "#3 Pop(0) depth=0");

        let _ = recorder.finish(Size::ZERO, &mut cache, Some(&mut log));
        assert!(log.as_str().lines().nth(1).is_some_and(|l| l.contains("CacheHit")));
    }

    #[test]
    fn video_frames_are_forwarded_and_released() {
        let frame = VideoBuffer::new(8, 8);
        let mut recorder = Recorder::new();
        recorder.draw_video_texture(frame.clone(), Rect::new(0.0, 0.0, 8.0, 8.0), Sampling::Cubic);
        let scene = recorder.finish(Size::ZERO, &mut CacheContext::new(), None);
        assert_eq!(frame.handle_count(), 2, "one handle held by the scene");
        drop(scene);
        assert_eq!(frame.handle_count(), 1);
    }

    #[test]
    #[should_panic(expected = "static textures are not supported")]
    fn static_texture_is_reserved() {
        let mut recorder = Recorder::new();
        recorder.push(RecordInst::DrawStaticTexture);
        let _ = recorder.finish(Size::ZERO, &mut CacheContext::new(), None);
    }

    #[test]
    fn operand_counts() {
        assert_eq!(RecordInst::Pop.operand_count(), 0);
        assert_eq!(RecordInst::PushOpacity(1.0).operand_count(), 1);
        assert_eq!(
            RecordInst::PushRotate {
                rad: 1.0,
                pivot: Point::ZERO
            }
            .operand_count(),
            2
        );
        assert!(Opcode::PushPathClip.is_push());
        assert!(!Opcode::IsolateLayer.is_push());
    }
}
