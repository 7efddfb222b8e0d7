// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node state machine: observation edges, invalidation, and revalidation.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell};
use core::fmt;
use kurbo::Rect;

use crate::damage::InvalidationRecorder;
use crate::effect::ImageFilterData;
use crate::error::NodeError;
use crate::geometry::GeometryKind;
use crate::material::MaterialKind;
use crate::matrix::Mat3;
use crate::render::RenderData;
use crate::transform::TransformKind;
use crate::types::{IdAllocator, NodeFlags, NodeId, NodeTraits, NodeType};

/// Declares a handle over every node of one [`NodeKind`] family.
macro_rules! base_handle {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $kind:ty) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(pub(crate) alloc::rc::Rc<$crate::node::Node>);

        impl $name {
            /// Shared node state.
            pub fn node(&self) -> &alloc::rc::Rc<$crate::node::Node> {
                &self.0
            }

            /// True if both handles refer to the same node.
            pub fn ptr_eq(&self, other: &Self) -> bool {
                alloc::rc::Rc::ptr_eq(&self.0, &other.0)
            }

            pub(crate) fn kind(&self) -> &$kind {
                match &self.0.kind {
                    $crate::node::NodeKind::$variant(kind) => kind,
                    _ => unreachable!(concat!(
                        "`",
                        stringify!($name),
                        "` over a foreign node kind"
                    )),
                }
            }
        }

        impl core::ops::Deref for $name {
            type Target = $crate::node::Node;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

/// Declares a handle over one concrete kind inside a [`base_handle!`] family.
macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident: $base:ident, $data:ty, $pat:pat => $bind:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(pub(crate) $base);

        impl $name {
            pub(crate) fn data(&self) -> &$data {
                match self.0.kind() {
                    $pat => $bind,
                    #[allow(unreachable_patterns, reason = "some families have a single kind")]
                    _ => unreachable!(concat!(
                        "`",
                        stringify!($name),
                        "` over a foreign node kind"
                    )),
                }
            }
        }

        impl core::ops::Deref for $name {
            type Target = $base;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$name> for $base {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }
    };
}

/// Node payload, one variant per family.
pub(crate) enum NodeKind {
    Render(RenderData),
    Geometry(GeometryKind),
    Material(MaterialKind),
    Transform(TransformKind),
    ImageFilter(ImageFilterData),
}

/// Base unit of the scenegraph.
///
/// A node owns an identity, fixed [`NodeTraits`], cached bounds, and the list of nodes that
/// observe it. Nodes are shared through typed handles ([`Group`](crate::Group),
/// [`Draw`](crate::Draw), ...) which all dereference to `Node`.
///
/// ## State machine
///
/// Every node starts invalidated with pending damage. [`Node::invalidate`] marks the node
/// and everything observing it stale; [`Node::revalidate`] recomputes bounds bottom-up and
/// clears the state. Observation edges may form cycles; both traversals short-circuit when
/// they re-enter a node.
pub struct Node {
    id: NodeId,
    traits: NodeTraits,
    flags: Cell<NodeFlags>,
    bounds: Cell<Rect>,
    observers: RefCell<Vec<Weak<Node>>>,
    pub(crate) kind: NodeKind,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type", &self.node_type())
            .field("traits", &self.traits)
            .field("flags", &self.flags.get())
            .field("bounds", &self.bounds.get())
            .finish_non_exhaustive()
    }
}

/// Marks a node as being traversed; the mark is dropped on every exit path.
struct TraversalGuard<'a> {
    node: &'a Node,
}

impl<'a> TraversalGuard<'a> {
    fn enter(node: &'a Node) -> Option<Self> {
        let flags = node.flags.get();
        if flags.contains(NodeFlags::IN_TRAVERSAL) {
            return None;
        }
        node.flags.set(flags | NodeFlags::IN_TRAVERSAL);
        Some(Self { node })
    }
}

impl Drop for TraversalGuard<'_> {
    fn drop(&mut self) {
        let flags = self.node.flags.get();
        self.node.flags.set(flags.difference(NodeFlags::IN_TRAVERSAL));
    }
}

impl Node {
    pub(crate) fn new_rc(ids: &IdAllocator, traits: NodeTraits, kind: NodeKind) -> Rc<Self> {
        Rc::new(Self {
            id: ids.allocate(),
            traits,
            flags: Cell::new(NodeFlags::INVALIDATED | NodeFlags::DAMAGE),
            bounds: Cell::new(Rect::ZERO),
            observers: RefCell::new(Vec::new()),
            kind,
        })
    }

    /// Identity of the node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Concrete kind of the node.
    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Render(data) => data.node_type(),
            NodeKind::Geometry(GeometryKind::Rect(_)) => NodeType::Rect,
            NodeKind::Material(MaterialKind::Color(_)) => NodeType::MaterialColor,
            NodeKind::Transform(kind) => kind.node_type(),
            NodeKind::ImageFilter(_) => NodeType::ImageFilter,
        }
    }

    /// Damage traits fixed at construction.
    pub fn traits(&self) -> NodeTraits {
        self.traits
    }

    /// Bounds computed by the last revalidation.
    ///
    /// Stale while [`Node::has_invalid`] is true.
    pub fn bounds(&self) -> Rect {
        self.bounds.get()
    }

    /// True if the node needs a revalidation.
    pub fn has_invalid(&self) -> bool {
        self.flags.get().contains(NodeFlags::INVALIDATED)
    }

    /// True if the node will emit damage on its next revalidation.
    pub fn has_damage(&self) -> bool {
        self.flags.get().contains(NodeFlags::DAMAGE)
    }

    /// Number of live nodes observing this one.
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Mark this node and its observers stale.
    ///
    /// With `damage`, the first observer (starting with this node) without
    /// [`NodeTraits::BUBBLE_DAMAGE`] takes the damage; nodes above it are invalidated
    /// without damage.
    pub fn invalidate(&self, damage: bool) {
        let Some(_guard) = TraversalGuard::enter(self) else {
            tracing::trace!(node = self.id.get(), "invalidation cycle short-circuited");
            return;
        };

        let mut flags = self.flags.get();
        if flags.contains(NodeFlags::INVALIDATED) && (!damage || flags.contains(NodeFlags::DAMAGE))
        {
            return;
        }

        let mut damage = damage;
        if damage && !self.traits.contains(NodeTraits::BUBBLE_DAMAGE) {
            flags |= NodeFlags::DAMAGE;
            damage = false;
        }
        self.flags.set(flags | NodeFlags::INVALIDATED);

        for observer in self.observers.borrow().iter() {
            if let Some(observer) = observer.upgrade() {
                observer.invalidate(damage);
            }
        }
    }

    /// Recompute bounds under `ctm` if stale, recording damage into `recorder`.
    ///
    /// A node with pending damage (or [`NodeTraits::OVERRIDE_DAMAGE`]) records its previous
    /// bounds, and its new bounds if they differ. Override-damage nodes hide the recorder from
    /// their descendants so only their own bounds are reported. All state flags are cleared on
    /// success; on error the node stays invalidated.
    ///
    /// Re-entering a node that is already being revalidated returns its stale bounds.
    pub fn revalidate(
        &self,
        recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        let Some(_guard) = TraversalGuard::enter(self) else {
            tracing::trace!(node = self.id.get(), "revalidation cycle short-circuited");
            return Ok(self.bounds.get());
        };

        if !self.has_invalid() {
            return Ok(self.bounds.get());
        }

        let override_damage = self.traits.contains(NodeTraits::OVERRIDE_DAMAGE);
        let bounds = match recorder {
            Some(recorder) if self.has_damage() || override_damage => {
                let prev = self.bounds.get();
                let bounds = if override_damage {
                    self.on_revalidate(None, ctm)?
                } else {
                    self.on_revalidate(Some(&mut *recorder), ctm)?
                };
                recorder.add(prev, ctm);
                if bounds != prev {
                    recorder.add(bounds, ctm);
                }
                bounds
            }
            recorder => self.on_revalidate(recorder, ctm)?,
        };

        self.bounds.set(bounds);
        let flags = self.flags.get();
        self.flags
            .set(flags.difference(NodeFlags::INVALIDATED | NodeFlags::DAMAGE));
        Ok(bounds)
    }

    fn on_revalidate(
        &self,
        recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        match &self.kind {
            NodeKind::Render(data) => data.on_revalidate(self, recorder, ctm),
            NodeKind::Geometry(kind) => Ok(kind.on_revalidate()),
            NodeKind::Transform(kind) => kind.on_revalidate(recorder, ctm),
            NodeKind::Material(_) | NodeKind::ImageFilter(_) => Ok(Rect::ZERO),
        }
    }

    /// Register `self` as an observer of `child`.
    pub(crate) fn observe_child(self: &Rc<Self>, child: &Self) {
        let mut observers = child.observers.borrow_mut();
        observers.retain(|w| w.strong_count() > 0);
        observers.push(Rc::downgrade(self));
    }

    /// Remove `self` from the observers of `child`.
    pub(crate) fn unobserve_child(self: &Rc<Self>, child: &Self) {
        let me = Rc::as_ptr(self);
        child
            .observers
            .borrow_mut()
            .retain(|w| w.strong_count() > 0 && w.as_ptr() != me);
    }

    /// Panics with [`NodeError::NotRevalidated`] if the node is stale.
    #[track_caller]
    pub(crate) fn assert_revalidated(&self) {
        if self.has_invalid() {
            panic!(
                "{}",
                NodeError::NotRevalidated {
                    id: self.id,
                    ty: self.node_type(),
                }
            );
        }
    }
}

/// Storage of an observed property: a write that changes the value invalidates the owner.
pub(crate) struct Property<T>(RefCell<T>);

impl<T> Property<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self(RefCell::new(value))
    }

    pub(crate) fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }
}

impl<T: PartialEq> Property<T> {
    /// Store `value`; returns true (after invalidating `owner`) if it differs from the old one.
    pub(crate) fn set(&self, owner: &Node, value: T) -> bool {
        if *self.0.borrow() == value {
            return false;
        }
        self.0.replace(value);
        owner.invalidate(true);
        true
    }
}

impl<T: Clone> Property<T> {
    pub(crate) fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ColorMaterial, Draw, Group, IdAllocator, MatrixTransform, RectGeometry, RenderNode,
        Transform, TransformEffect,
    };

    fn rect_draw(ids: &IdAllocator, r: Rect) -> Draw {
        let geometry = RectGeometry::new(ids);
        geometry.set_rect(r);
        Draw::new(ids, geometry, ColorMaterial::new(ids))
    }

    #[test]
    fn new_nodes_start_invalidated_with_damage() {
        let ids = IdAllocator::new();
        let draw = rect_draw(&ids, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(draw.has_invalid());
        assert!(draw.has_damage());
        assert_eq!(draw.bounds(), Rect::ZERO);
    }

    #[test]
    fn invalidate_twice_is_idempotent() {
        let ids = IdAllocator::new();
        let draw = rect_draw(&ids, Rect::new(0.0, 0.0, 10.0, 10.0));
        let group = Group::new(&ids);
        group.add_child(draw.clone());
        group.revalidate(None, &Mat3::IDENTITY).unwrap();

        for damage in [false, true] {
            draw.invalidate(damage);
            let state = || {
                (
                    draw.has_invalid(),
                    draw.has_damage(),
                    group.has_invalid(),
                    group.has_damage(),
                )
            };
            let once = state();
            draw.invalidate(damage);
            let twice = state();
            assert_eq!(once, twice, "second invalidate(damage={damage}) changed state");
        }
    }

    #[test]
    fn revalidate_clears_state_in_both_branches() {
        let ids = IdAllocator::new();
        let draw = rect_draw(&ids, Rect::new(0.0, 0.0, 10.0, 10.0));

        // damage-generating branch
        let mut recorder = InvalidationRecorder::new();
        draw.revalidate(Some(&mut recorder), &Mat3::IDENTITY).unwrap();
        assert!(!draw.has_invalid() && !draw.has_damage());

        // no-damage branch
        draw.invalidate(false);
        assert!(draw.has_invalid() && !draw.has_damage());
        draw.revalidate(Some(&mut recorder), &Mat3::IDENTITY).unwrap();
        assert!(!draw.has_invalid());

        // no recorder at all
        draw.invalidate(true);
        draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert!(!draw.has_invalid() && !draw.has_damage());
    }

    #[test]
    fn observation_cycle_terminates() {
        let ids = IdAllocator::new();
        let a = Group::new(&ids);
        let b = Group::new(&ids);
        a.add_child(b.clone());
        b.add_child(a.clone());

        a.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert!(!a.has_invalid() && !b.has_invalid());

        a.invalidate(true);
        assert!(a.has_invalid() && b.has_invalid());
        let bounds = a.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert_eq!(bounds, Rect::ZERO);

        // Break the strong cycle so both groups are released.
        a.clear();
        b.clear();
    }

    #[test]
    fn damage_is_absorbed_by_first_non_bubbling_observer() {
        let ids = IdAllocator::new();
        let leaf = MatrixTransform::new(&ids, Mat3::IDENTITY);
        let mid = Transform::inverse(&ids, leaf.clone());
        let root = TransformEffect::new(
            &ids,
            rect_draw(&ids, Rect::new(0.0, 0.0, 5.0, 5.0)),
            mid.clone(),
        );
        root.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert!(!leaf.has_invalid() && !mid.has_invalid() && !root.has_invalid());

        leaf.invalidate(true);
        assert!(leaf.has_invalid() && mid.has_invalid() && root.has_invalid());
        assert!(!leaf.has_damage(), "leaf bubbles damage");
        assert!(!mid.has_damage(), "mid bubbles damage");
        assert!(root.has_damage(), "root absorbs damage");
    }

    #[test]
    fn damage_records_old_and_new_bounds() {
        let ids = IdAllocator::new();
        let geometry = RectGeometry::new(&ids);
        geometry.set_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        let draw = Draw::new(&ids, geometry.clone(), ColorMaterial::new(&ids));
        let mut recorder = InvalidationRecorder::new();
        draw.revalidate(Some(&mut recorder), &Mat3::IDENTITY).unwrap();
        // Every node starts with damage; the empty previous bounds are not recorded.
        assert!(!recorder.is_empty());
        assert_eq!(recorder.union_rect(), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));

        recorder.clear();
        geometry.set_rect(Rect::new(5.0, 0.0, 15.0, 10.0));
        draw.revalidate(Some(&mut recorder), &Mat3::translate(100.0, 0.0))
            .unwrap();
        assert_eq!(
            recorder.rects(),
            &[
                Rect::new(100.0, 0.0, 110.0, 10.0),
                Rect::new(105.0, 0.0, 115.0, 10.0)
            ]
        );
    }

    #[test]
    fn revalidate_without_invalidation_is_a_no_op() {
        let ids = IdAllocator::new();
        let draw = rect_draw(&ids, Rect::new(0.0, 0.0, 10.0, 10.0));
        draw.revalidate(None, &Mat3::IDENTITY).unwrap();
        let mut recorder = InvalidationRecorder::new();
        let bounds = draw.revalidate(Some(&mut recorder), &Mat3::IDENTITY).unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(recorder.is_empty());
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let ids = IdAllocator::new();
        let draw = rect_draw(&ids, Rect::new(0.0, 0.0, 1.0, 1.0));
        {
            let group = Group::new(&ids);
            group.add_child(draw.clone());
            assert_eq!(draw.observer_count(), 1);
        }
        assert_eq!(draw.observer_count(), 0);
        // Invalidation through a dead edge is harmless.
        draw.invalidate(true);
        let as_render: RenderNode = draw.into();
        assert!(as_render.has_invalid());
    }
}
