// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scenegraph: node identifiers, type tags, traits and state flags.

use core::cell::Cell;
use core::fmt;

/// Identifier of a node.
///
/// Identifiers are handed out by an [`IdAllocator`] in strictly increasing order and are never
/// reused by the allocator that produced them. Comparing two identifiers from the same
/// allocator tells which node was constructed first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Raw value of the identifier.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allocator of [`NodeId`]s.
///
/// Every node constructor takes an allocator, so identity assignment is explicit and
/// deterministic: two scenes built from fresh allocators get the same identifiers.
///
/// ```
/// use scenery_graph::IdAllocator;
///
/// let ids = IdAllocator::new();
/// let a = ids.allocate();
/// let b = ids.allocate();
/// assert!(a < b);
/// assert_eq!(a.get(), 1);
/// ```
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: Cell<u64>,
}

impl IdAllocator {
    /// Create an allocator whose first identifier is `1`.
    pub const fn new() -> Self {
        Self { last: Cell::new(0) }
    }

    /// Hand out the next identifier.
    pub fn allocate(&self) -> NodeId {
        let next = self.last.get() + 1;
        self.last.set(next);
        NodeId(next)
    }
}

/// Concrete kind of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Ordered container of render nodes.
    Group,
    /// Rectangle geometry.
    Rect,
    /// Raster image leaf.
    Image,
    /// Geometry painted with a material.
    Draw,
    /// Solid color material.
    MaterialColor,
    /// Opacity modulation of a single child.
    OpacityEffect,
    /// Image filter applied to a single child.
    ImageFilterEffect,
    /// Matrix applied to a single child.
    TransformEffect,
    /// Holder of an image filter, observed by an [`NodeType::ImageFilterEffect`].
    ImageFilter,
    /// Plain matrix transform.
    Matrix,
    /// Product of two transforms.
    Concat,
    /// Inverse of a transform.
    Inverse,
    /// Leaf replaying a recorded picture.
    Picture,
}

bitflags::bitflags! {
    /// Traits fixed at construction that tune how a node takes part in damage accounting.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeTraits: u8 {
        /// Descendant damage is not forwarded; the node reports its own old/new bounds instead.
        const OVERRIDE_DAMAGE = 0b0000_0001;
        /// The node never absorbs damage; it keeps travelling to observers.
        const BUBBLE_DAMAGE   = 0b0000_0010;
    }
}

bitflags::bitflags! {
    /// Mutable per-node state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub(crate) struct NodeFlags: u8 {
        /// Cached bounds are stale.
        const INVALIDATED  = 0b0000_0001;
        /// The node must emit a damage rectangle on its next revalidation.
        const DAMAGE       = 0b0000_0010;
        /// An `invalidate`/`revalidate` call on this node is on the stack.
        const IN_TRAVERSAL = 0b0000_0100;
    }
}
