// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered container of render nodes.

use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell};
use kurbo::{Point, Rect};

use crate::canvas::Canvas;
use crate::damage::InvalidationRecorder;
use crate::error::NodeError;
use crate::matrix::Mat3;
use crate::render::{RenderContext, RenderData, RenderKind, RenderNode, with_scoped_context};
use crate::types::{IdAllocator, NodeTraits};
use crate::util::{rect_union, rects_overlap};

pub(crate) struct GroupData {
    children: RefCell<Vec<RenderNode>>,
    requires_isolation: Cell<bool>,
}

impl GroupData {
    pub(crate) fn on_revalidate(
        &self,
        mut recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        let mut bounds = Rect::ZERO;
        let mut isolation = false;
        for child in self.children.borrow().iter() {
            let child_bounds = child.revalidate(recorder.as_deref_mut(), ctm)?;
            isolation = isolation || rects_overlap(child_bounds, bounds);
            bounds = rect_union(bounds, child_bounds);
        }
        self.requires_isolation.set(isolation);
        Ok(bounds)
    }

    pub(crate) fn on_render(&self, bounds: Rect, canvas: &mut Canvas, ctx: &RenderContext) {
        with_scoped_context(canvas, ctx, |scope, canvas| {
            scope.set_isolation(canvas, bounds, self.requires_isolation.get());
            for child in self.children.borrow().iter() {
                child.render(canvas, scope.context());
            }
        });
    }

    pub(crate) fn on_node_at(&self, point: Point) -> Option<RenderNode> {
        self.children
            .borrow()
            .iter()
            .find_map(|child| child.node_at(point))
    }
}

typed_handle!(
    /// Ordered container of render nodes.
    ///
    /// Children are drawn in order; hit-testing reports the first child that is hit. A child
    /// appears at most once.
    ///
    /// ```
    /// use kurbo::{Point, Rect};
    /// use scenery_graph::{ColorMaterial, Draw, Group, IdAllocator, Mat3, RectGeometry};
    ///
    /// let ids = IdAllocator::new();
    /// let square =
    ///     |r| Draw::new(&ids, RectGeometry::from_rect(&ids, r), ColorMaterial::new(&ids));
    /// let group = Group::new(&ids);
    /// group.add_child(square(Rect::new(0.0, 0.0, 10.0, 10.0)));
    /// group.add_child(square(Rect::new(20.0, 0.0, 30.0, 10.0)));
    ///
    /// let bounds = group.revalidate(None, &Mat3::IDENTITY).unwrap();
    /// assert_eq!(bounds, Rect::new(0.0, 0.0, 30.0, 10.0));
    /// assert!(!group.requires_isolation());
    /// assert!(group.node_at(Point::new(15.0, 5.0)).is_none());
    /// ```
    Group: RenderNode,
    GroupData,
    RenderData { kind: RenderKind::Group(data), .. } => data
);

impl Group {
    /// Create an empty group.
    pub fn new(ids: &IdAllocator) -> Self {
        Self(RenderNode::new(
            ids,
            NodeTraits::empty(),
            RenderKind::Group(GroupData {
                children: RefCell::new(Vec::new()),
                requires_isolation: Cell::new(true),
            }),
        ))
    }

    /// Create a group holding `children`, in order.
    pub fn with_children(
        ids: &IdAllocator,
        children: impl IntoIterator<Item = impl Into<RenderNode>>,
    ) -> Self {
        let group = Self::new(ids);
        for child in children {
            group.add_child(child);
        }
        group
    }

    /// Append `child`; adding a child that is already present does nothing.
    pub fn add_child(&self, child: impl Into<RenderNode>) {
        let child = child.into();
        {
            let mut children = self.data().children.borrow_mut();
            if children.iter().any(|c| c.ptr_eq(&child)) {
                return;
            }
            self.node().observe_child(&child);
            children.push(child);
        }
        self.invalidate(true);
    }

    /// Remove `child` if present.
    pub fn remove_child(&self, child: &RenderNode) {
        {
            let mut children = self.data().children.borrow_mut();
            let Some(index) = children.iter().position(|c| c.ptr_eq(child)) else {
                return;
            };
            self.node().unobserve_child(child);
            children.remove(index);
        }
        self.invalidate(true);
    }

    /// Remove every child.
    pub fn clear(&self) {
        {
            let mut children = self.data().children.borrow_mut();
            if children.is_empty() {
                return;
            }
            for child in children.drain(..) {
                self.node().unobserve_child(&child);
            }
        }
        self.invalidate(true);
    }

    /// Children in draw order.
    pub fn children(&self) -> Ref<'_, [RenderNode]> {
        Ref::map(self.data().children.borrow(), Vec::as_slice)
    }

    /// True if children overlapped at the last revalidation, or if the group was never
    /// revalidated.
    pub fn requires_isolation(&self) -> bool {
        self.data().requires_isolation.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorMaterial, Draw, RectGeometry};

    fn square(ids: &IdAllocator, r: Rect) -> Draw {
        Draw::new(ids, RectGeometry::from_rect(ids, r), ColorMaterial::new(ids))
    }

    #[test]
    fn duplicate_child_is_ignored() {
        let ids = IdAllocator::new();
        let group = Group::new(&ids);
        let a = square(&ids, Rect::new(0.0, 0.0, 1.0, 1.0));
        group.add_child(a.clone());
        group.revalidate(None, &Mat3::IDENTITY).unwrap();

        group.add_child(a.clone());
        assert_eq!(group.children().len(), 1);
        assert!(!group.has_invalid(), "duplicate add must not invalidate");
        assert_eq!(a.observer_count(), 1);
    }

    #[test]
    fn first_child_wins_hit_test() {
        let ids = IdAllocator::new();
        let a = square(&ids, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = square(&ids, Rect::new(5.0, 5.0, 15.0, 15.0));
        let group = Group::with_children(&ids, [a.clone(), b.clone()]);
        group.revalidate(None, &Mat3::IDENTITY).unwrap();

        let hit = group.node_at(Point::new(7.0, 7.0)).expect("overlap is hit");
        assert!(hit.ptr_eq(&a.clone().into()), "list order is hit priority");
        let hit = group.node_at(Point::new(12.0, 12.0)).expect("b alone is hit");
        assert!(hit.ptr_eq(&b.into()));
    }

    #[test]
    fn remove_and_clear_invalidate_and_unobserve() {
        let ids = IdAllocator::new();
        let a = square(&ids, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = square(&ids, Rect::new(20.0, 0.0, 30.0, 10.0));
        let group = Group::with_children(&ids, [a.clone(), b.clone()]);
        group.revalidate(None, &Mat3::IDENTITY).unwrap();

        let a_node: RenderNode = a.clone().into();
        group.remove_child(&a_node);
        assert!(group.has_invalid());
        assert_eq!(a.observer_count(), 0);
        assert_eq!(
            group.revalidate(None, &Mat3::IDENTITY).unwrap(),
            Rect::new(20.0, 0.0, 30.0, 10.0)
        );

        // Removing an absent child is a no-op.
        group.remove_child(&a_node);
        assert!(!group.has_invalid());

        group.clear();
        assert!(group.children().is_empty());
        assert_eq!(b.observer_count(), 0);
        assert_eq!(group.revalidate(None, &Mat3::IDENTITY).unwrap(), Rect::ZERO);
    }

    #[test]
    fn isolated_render_opens_a_layer_when_translucent() {
        use crate::canvas::DrawOp;

        let ids = IdAllocator::new();
        let group = Group::with_children(
            &ids,
            [
                square(&ids, Rect::new(0.0, 0.0, 10.0, 10.0)),
                square(&ids, Rect::new(5.0, 5.0, 15.0, 15.0)),
            ],
        );
        group.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert!(group.requires_isolation());

        let mut canvas = Canvas::new();
        group.render(&mut canvas, &RenderContext::new());
        assert!(
            !canvas.ops().iter().any(|op| matches!(op, DrawOp::SaveLayer { .. })),
            "opaque context draws children directly"
        );

        let mut canvas = Canvas::new();
        let opacity = crate::OpacityEffect::new(&ids, group.clone(), 0.5);
        opacity.revalidate(None, &Mat3::IDENTITY).unwrap();
        opacity.render(&mut canvas, &RenderContext::new());
        let DrawOp::SaveLayer {
            paint: Some(paint), ..
        } = &canvas.ops()[0]
        else {
            panic!("expected an isolation layer, got {:?}", canvas.ops());
        };
        assert_eq!(paint.alpha(), 0.5);
        let draws: alloc::vec::Vec<_> = canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::DrawRect { paint, .. } => Some(paint.alpha()),
                _ => None,
            })
            .collect();
        assert_eq!(draws, [1.0, 1.0], "children draw opaque inside the layer");
        assert_eq!(canvas.save_count(), 1);
    }
}
