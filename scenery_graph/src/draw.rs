// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry painted with a material.

use kurbo::{Point, Rect, Shape, StrokeOpts};

use crate::canvas::Canvas;
use crate::damage::InvalidationRecorder;
use crate::error::NodeError;
use crate::geometry::Geometry;
use crate::material::Material;
use crate::matrix::Mat3;
use crate::node::Node;
use crate::paint::{Paint, PaintStyle};
use crate::render::{RenderContext, RenderData, RenderKind, RenderNode};
use crate::types::{IdAllocator, NodeTraits};

/// Flattening tolerance of stroke outlines built for hit-testing.
const STROKE_HIT_TOLERANCE: f64 = 0.1;

pub(crate) struct DrawData {
    geometry: Geometry,
    material: Material,
}

impl DrawData {
    pub(crate) fn on_revalidate(
        &self,
        node: &Node,
        mut recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        let bounds = self.geometry.revalidate(recorder.as_deref_mut(), ctm)?;
        self.material.revalidate(recorder, ctm)?;

        let paint = self.material.make_paint_record().instantiate_paint();
        if !paint.can_compute_fast_bounds() {
            return Err(NodeError::FastBounds {
                id: node.id(),
                ty: node.node_type(),
            });
        }
        Ok(paint.compute_fast_bounds(bounds))
    }

    pub(crate) fn on_render(&self, canvas: &mut Canvas, ctx: &RenderContext) {
        let mut record = self.material.make_paint_record();
        ctx.modulate_paint(&mut record);
        let paint = record.instantiate_paint();
        let skip = paint.nothing_to_draw()
            || (paint.style() == PaintStyle::Stroke && paint.stroke_width() <= 0.0);
        if !skip {
            self.geometry.draw(canvas, &paint);
        }
    }

    pub(crate) fn on_node_at(&self, point: Point) -> bool {
        let paint = self.material.make_paint_record().instantiate_paint();
        if paint.color().is_transparent() {
            return false;
        }
        match paint.style() {
            PaintStyle::Fill => self.geometry.contains(point),
            PaintStyle::Stroke => self.stroke_contains(&paint, point),
            PaintStyle::StrokeAndFill => {
                self.geometry.contains(point) || self.stroke_contains(&paint, point)
            }
        }
    }

    fn stroke_contains(&self, paint: &Paint, point: Point) -> bool {
        let outline = kurbo::stroke(
            self.geometry.as_path().iter(),
            &paint.to_stroke(),
            &StrokeOpts::default(),
            STROKE_HIT_TOLERANCE,
        );
        outline.contains(point)
    }
}

typed_handle!(
    /// Leaf painting a geometry with a material.
    ///
    /// Bounds are the geometry bounds grown by the stroke, if any.
    Draw: RenderNode,
    DrawData,
    RenderData { kind: RenderKind::Draw(data), .. } => data
);

impl Draw {
    /// Create a draw node; it observes both `geometry` and `material`.
    pub fn new(
        ids: &IdAllocator,
        geometry: impl Into<Geometry>,
        material: impl Into<Material>,
    ) -> Self {
        let (geometry, material) = (geometry.into(), material.into());
        let node = RenderNode::new(
            ids,
            NodeTraits::empty(),
            RenderKind::Draw(DrawData {
                geometry: geometry.clone(),
                material: material.clone(),
            }),
        );
        node.node().observe_child(&geometry);
        node.node().observe_child(&material);
        Self(node)
    }

    /// Painted geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.data().geometry
    }

    /// Paint source.
    pub fn material(&self) -> &Material {
        &self.data().material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawOp;
    use crate::paint::{Color4f, PathEffect};
    use crate::{ColorMaterial, RectGeometry};

    fn setup(style: PaintStyle) -> (IdAllocator, RectGeometry, ColorMaterial, Draw) {
        let ids = IdAllocator::new();
        let geometry = RectGeometry::from_rect(&ids, Rect::new(0.0, 0.0, 10.0, 10.0));
        let material = ColorMaterial::new(&ids);
        material.set_style(style);
        let draw = Draw::new(&ids, geometry.clone(), material.clone());
        (ids, geometry, material, draw)
    }

    #[test]
    fn fill_bounds_match_geometry() {
        let (_ids, _, _, draw) = setup(PaintStyle::Fill);
        let bounds = draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn stroke_bounds_grow_by_join() {
        let (_ids, _, material, draw) = setup(PaintStyle::Stroke);
        material.set_stroke_width(2.0);
        material.set_stroke_join(crate::StrokeJoin::Round);
        material.set_stroke_cap(crate::StrokeCap::Butt);
        let bounds = draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert_eq!(bounds, Rect::new(-1.0, -1.0, 11.0, 11.0));
    }

    #[test]
    fn material_change_invalidates_with_damage() {
        let (_ids, _, material, draw) = setup(PaintStyle::Fill);
        draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        material.set_color(Color4f::WHITE);
        assert!(draw.has_invalid() && draw.has_damage());
    }

    #[test]
    fn unbounded_path_effect_fails_and_stays_invalid() {
        let (_ids, _, material, draw) = setup(PaintStyle::Stroke);
        material.set_path_effect(Some(PathEffect::Discrete {
            segment_length: 4.0,
            deviation: 2.0,
            seed: 7,
        }));
        let err = draw.revalidate(None, &Mat3::IDENTITY).unwrap_err();
        assert!(matches!(err, NodeError::FastBounds { id, .. } if id == draw.id()));
        assert!(draw.has_invalid(), "a failed revalidation keeps the node stale");
    }

    #[test]
    fn hit_test_honours_style() {
        let (_ids, _, material, draw) = setup(PaintStyle::Fill);
        draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert!(draw.node_at(Point::new(5.0, 5.0)).is_some());

        material.set_style(PaintStyle::Stroke);
        material.set_stroke_width(2.0);
        draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert!(draw.node_at(Point::new(5.0, 5.0)).is_none(), "interior misses");
        assert!(draw.node_at(Point::new(0.5, 5.0)).is_some(), "edge hits");
        assert!(draw.node_at(Point::new(-0.5, 5.0)).is_some(), "outer half hits");

        material.set_color(Color4f::TRANSPARENT);
        draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert!(draw.node_at(Point::new(0.5, 5.0)).is_none());
    }

    #[test]
    fn zero_width_stroke_draws_nothing() {
        let (_ids, _, material, draw) = setup(PaintStyle::Stroke);
        material.set_stroke_width(0.0);
        draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        let mut canvas = Canvas::new();
        draw.render(&mut canvas, &RenderContext::new());
        assert!(canvas.ops().is_empty());

        material.set_style(PaintStyle::Fill);
        draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        draw.render(&mut canvas, &RenderContext::new());
        assert!(matches!(canvas.ops(), [DrawOp::DrawRect { .. }]));
    }
}
