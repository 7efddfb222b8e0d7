// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scenery Graph: a Kurbo-native retained scenegraph with cycle-safe invalidation.
//!
//! Scenery Graph keeps a tree of render nodes, geometry, materials, transforms, and filters,
//! and answers three questions per frame with as little work as possible:
//!
//! - What are the bounds of each node? ([`Node::revalidate`])
//! - Which device-space rectangles changed since the last frame? ([`InvalidationRecorder`])
//! - What should be drawn, and what is under a point? ([`RenderNode::render`],
//!   [`RenderNode::node_at`])
//!
//! ## Invalidation model
//!
//! Every node caches its bounds. Setting a property that changes the value invalidates the
//! node and, through observation edges, everything that depends on it. Damage travels upwards
//! until it reaches the first node that produces pixels; geometry, materials, transforms, and
//! filter holders carry [`NodeTraits::BUBBLE_DAMAGE`] and never absorb it. Image filter
//! effects carry [`NodeTraits::OVERRIDE_DAMAGE`]: their output is not a function of their
//! child's bounds, so they report their own old and new bounds and hide their subtree's
//! damage.
//!
//! Revalidation walks down from the root, recomputes only stale nodes, and records damage into
//! an optional [`InvalidationRecorder`]. Observation edges may form cycles; traversals stop
//! when they meet a node that is already on the stack.
//!
//! Rendering and hit-testing a stale node is a contract violation and panics with
//! [`NodeError::NotRevalidated`]. A paint whose bounds cannot be computed cheaply makes
//! revalidation fail with [`NodeError::FastBounds`].
//!
//! ## API overview
//!
//! - [`Node`]: identity, traits, bounds, and the invalidation state shared by every node.
//! - Render nodes: [`Group`], [`Draw`], [`ImageNode`], [`PictureNode`], [`OpacityEffect`],
//!   [`ImageFilterEffect`], [`TransformEffect`]. All convert into [`RenderNode`].
//! - Leaves referenced by render nodes: [`RectGeometry`] ([`Geometry`]),
//!   [`ColorMaterial`] ([`Material`]), [`MatrixTransform`] ([`Transform`]),
//!   [`ImageFilterNode`].
//! - [`Canvas`], [`Picture`], [`PictureRecorder`]: a recording canvas that render nodes draw
//!   into.
//! - [`Mat3`]: 3×3 matrix with perspective used for transform nodes.
//!
//! ## Example
//!
//! ```
//! use kurbo::Rect;
//! use scenery_graph::{
//!     Canvas, Color4f, ColorMaterial, Draw, Group, IdAllocator, InvalidationRecorder, Mat3,
//!     RectGeometry, RenderContext,
//! };
//!
//! let ids = IdAllocator::new();
//! let red = ColorMaterial::with_color(&ids, Color4f::new(1.0, 0.0, 0.0, 1.0));
//! let rect = RectGeometry::from_rect(&ids, Rect::new(0.0, 0.0, 10.0, 10.0));
//! let root = Group::new(&ids);
//! root.add_child(Draw::new(&ids, rect.clone(), red));
//!
//! // First frame: everything is new.
//! let mut damage = InvalidationRecorder::new();
//! root.revalidate(Some(&mut damage), &Mat3::IDENTITY).unwrap();
//! root.render(&mut Canvas::new(), &RenderContext::new());
//!
//! // Move the rectangle: the old and the new area are damaged.
//! damage.clear();
//! rect.set_rect(Rect::new(20.0, 0.0, 30.0, 10.0));
//! root.revalidate(Some(&mut damage), &Mat3::IDENTITY).unwrap();
//! assert_eq!(damage.union_rect(), Some(Rect::new(0.0, 0.0, 30.0, 10.0)));
//! ```
//!
//! The graph is single-threaded: nodes use `Rc` and interior mutability, and must be built and
//! traversed from one thread.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[macro_use]
mod node;

mod attribute;
mod canvas;
mod damage;
mod draw;
mod effect;
mod error;
mod filter;
mod geometry;
mod group;
mod image;
mod material;
mod matrix;
mod paint;
mod picture;
mod render;
mod transform;
mod types;
mod util;

pub use attribute::{
    AttributeStateGroup, AttributeStateGroupOp, NodeAttribute, StatefulAttribute,
};
pub use canvas::{Canvas, DrawOp, Image, Picture, PictureRecorder};
pub use damage::InvalidationRecorder;
pub use draw::Draw;
pub use effect::{
    FilterCropping, ImageFilterEffect, ImageFilterNode, OpacityEffect, TransformEffect,
};
pub use error::NodeError;
pub use filter::{ImageFilter, MapDirection};
pub use geometry::{Geometry, PathDirection, RectGeometry};
pub use group::Group;
pub use image::ImageNode;
pub use material::{ColorMaterial, Material};
pub use matrix::Mat3;
pub use node::Node;
pub use paint::{
    BlendMode, Color4f, Paint, PaintRecord, PaintStyle, PathEffect, Sampling, StrokeCap,
    StrokeJoin,
};
pub use picture::{DrawCallback, PictureNode};
pub use render::{RenderContext, RenderNode};
pub use transform::{MatrixTransform, Transform};
pub use types::{IdAllocator, NodeId, NodeTraits, NodeType};
pub use util::{rect_is_empty, rect_union, rects_overlap};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use kurbo::{Point, Rect};

    fn colored(ids: &IdAllocator, r: Rect, color: Color4f) -> (RectGeometry, Draw) {
        let geometry = RectGeometry::from_rect(ids, r);
        let draw = Draw::new(ids, geometry.clone(), ColorMaterial::with_color(ids, color));
        (geometry, draw)
    }

    #[test]
    fn overlapping_children_require_isolation() {
        let ids = IdAllocator::new();
        let red = Color4f::new(1.0, 0.0, 0.0, 1.0);
        let blue = Color4f::new(0.0, 0.0, 1.0, 1.0);
        let (_, a) = colored(&ids, Rect::new(0.0, 0.0, 10.0, 10.0), red);
        let (second, b) = colored(&ids, Rect::new(20.0, 20.0, 30.0, 30.0), blue);
        let group = Group::with_children(&ids, [a, b]);

        let mut recorder = InvalidationRecorder::new();
        let bounds = group
            .revalidate(Some(&mut recorder), &Mat3::IDENTITY)
            .unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 30.0, 30.0));
        assert!(!group.requires_isolation());

        second.set_rect(Rect::new(5.0, 5.0, 15.0, 15.0));
        let bounds = group
            .revalidate(Some(&mut recorder), &Mat3::IDENTITY)
            .unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 15.0, 15.0));
        assert!(group.requires_isolation());
    }

    #[test]
    fn damage_flows_from_a_leaf_through_nested_effects() {
        let ids = IdAllocator::new();
        let (geometry, draw) = colored(&ids, Rect::new(0.0, 0.0, 10.0, 10.0), Color4f::BLACK);
        let matrix = MatrixTransform::new(&ids, Mat3::scale(2.0, 2.0));
        let scaled = TransformEffect::new(&ids, draw, matrix);
        let root = Group::with_children(&ids, [OpacityEffect::new(&ids, scaled, 0.5)]);
        root.revalidate(None, &Mat3::IDENTITY).unwrap();

        let mut recorder = InvalidationRecorder::new();
        geometry.set_rect(Rect::new(10.0, 0.0, 20.0, 10.0));
        assert!(root.has_invalid());
        assert!(!root.has_damage(), "the draw node absorbed the damage");
        let bounds = root
            .revalidate(Some(&mut recorder), &Mat3::translate(100.0, 0.0))
            .unwrap();
        assert_eq!(bounds, Rect::new(20.0, 0.0, 40.0, 20.0));
        let rects: Vec<Rect> = recorder.take();
        assert_eq!(
            rects,
            [
                Rect::new(100.0, 0.0, 120.0, 20.0),
                Rect::new(120.0, 0.0, 140.0, 20.0)
            ],
            "old and new leaf bounds in device space"
        );
    }

    #[test]
    fn hit_test_reports_the_leaf_under_nested_transforms() {
        let ids = IdAllocator::new();
        let (_, draw) = colored(&ids, Rect::new(0.0, 0.0, 5.0, 5.0), Color4f::BLACK);
        let outer = MatrixTransform::new(&ids, Mat3::translate(10.0, 0.0));
        let inner = MatrixTransform::new(&ids, Mat3::scale(2.0, 2.0));
        let both = Transform::concat(&ids, outer, inner);
        let effect = TransformEffect::new(&ids, draw.clone(), both);
        effect.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert_eq!(effect.bounds(), Rect::new(10.0, 0.0, 20.0, 10.0));

        let hit = effect.node_at(Point::new(19.0, 9.0)).expect("inside");
        assert!(hit.ptr_eq(&draw.into()));
        assert!(effect.node_at(Point::new(9.0, 1.0)).is_none());
    }

    #[test]
    fn invisible_nodes_are_skipped() {
        let ids = IdAllocator::new();
        let (_, draw) = colored(&ids, Rect::new(0.0, 0.0, 5.0, 5.0), Color4f::BLACK);
        let group = Group::with_children(&ids, [draw.clone()]);
        group.revalidate(None, &Mat3::IDENTITY).unwrap();

        draw.set_visible(false);
        assert!(group.has_invalid(), "visibility changes damage the parent");
        group.revalidate(None, &Mat3::IDENTITY).unwrap();
        let mut canvas = Canvas::new();
        group.render(&mut canvas, &RenderContext::new());
        assert!(canvas.ops().is_empty());
        assert!(group.node_at(Point::new(1.0, 1.0)).is_none());
    }

    #[test]
    #[should_panic(expected = "has not been revalidated")]
    fn rendering_a_stale_tree_panics() {
        let ids = IdAllocator::new();
        let group = Group::new(&ids);
        group.render(&mut Canvas::new(), &RenderContext::new());
    }
}
