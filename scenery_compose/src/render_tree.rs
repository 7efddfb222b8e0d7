// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render tree handed to the compositor: composite containers, painted leaves, and video
//! frames.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell, RefMut};
use core::fmt;
use kurbo::Rect;
use scenery_graph::{Canvas, IdAllocator, NodeId, Sampling};

use crate::attributes::CompositeAttributes;
use crate::recorder::Recorder;
use crate::scene::VideoBuffer;

/// Kind of a [`RenderTreeNode`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RenderTreeNodeType {
    /// [`CompositeNode`].
    Composite,
    /// [`PaintNode`].
    Paint,
    /// [`VideoTextureNode`].
    VideoTexture,
}

/// Any node of the render tree.
#[derive(Clone, Debug)]
pub enum RenderTreeNode {
    /// Container applying [`CompositeAttributes`].
    Composite(CompositeNode),
    /// Leaf painted by a callback.
    Paint(PaintNode),
    /// Leaf showing a video frame.
    VideoTexture(VideoTextureNode),
}

impl RenderTreeNode {
    /// Identity of the node.
    pub fn id(&self) -> NodeId {
        match self {
            Self::Composite(node) => node.id(),
            Self::Paint(node) => node.id(),
            Self::VideoTexture(node) => node.id(),
        }
    }

    /// Kind of the node.
    pub fn node_type(&self) -> RenderTreeNodeType {
        match self {
            Self::Composite(_) => RenderTreeNodeType::Composite,
            Self::Paint(_) => RenderTreeNodeType::Paint,
            Self::VideoTexture(_) => RenderTreeNodeType::VideoTexture,
        }
    }

    /// True if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Composite(a), Self::Composite(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Self::Paint(a), Self::Paint(b)) => a.ptr_eq(b),
            (Self::VideoTexture(a), Self::VideoTexture(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }

    /// Append the instructions drawing this subtree to `recorder`.
    pub fn compose(&self, recorder: &mut Recorder) {
        match self {
            Self::Composite(node) => node.compose(recorder),
            Self::Paint(node) => node.compose(recorder),
            Self::VideoTexture(node) => node.compose(recorder),
        }
    }
}

impl From<CompositeNode> for RenderTreeNode {
    fn from(node: CompositeNode) -> Self {
        Self::Composite(node)
    }
}

impl From<PaintNode> for RenderTreeNode {
    fn from(node: PaintNode) -> Self {
        Self::Paint(node)
    }
}

impl From<VideoTextureNode> for RenderTreeNode {
    fn from(node: VideoTextureNode) -> Self {
        Self::VideoTexture(node)
    }
}

struct CompositeInner {
    id: NodeId,
    children: RefCell<Vec<RenderTreeNode>>,
    attributes: RefCell<CompositeAttributes>,
}

/// Ordered container whose children are composed inside its attribute scopes.
///
/// ```
/// use kurbo::{Rect, Vec2};
/// use scenery_compose::{CompositeNode, PaintNode, Recorder};
/// use scenery_graph::IdAllocator;
///
/// let ids = IdAllocator::new();
/// let root = CompositeNode::new(&ids);
/// root.attributes_mut().set_offset(Vec2::new(10.0, 0.0));
/// let leaf = PaintNode::new(&ids);
/// leaf.update(Rect::new(0.0, 0.0, 4.0, 4.0), |_| {});
/// root.append_child(leaf.clone());
/// root.append_child(leaf);
/// assert_eq!(root.children().len(), 1);
///
/// let mut recorder = Recorder::new();
/// root.compose(&mut recorder);
/// assert_eq!(recorder.instructions().len(), 3);
/// ```
#[derive(Clone)]
pub struct CompositeNode(Rc<CompositeInner>);

impl CompositeNode {
    /// Create an empty container without attributes.
    pub fn new(ids: &IdAllocator) -> Self {
        Self(Rc::new(CompositeInner {
            id: ids.allocate(),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(CompositeAttributes::new()),
        }))
    }

    /// Identity of the node.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// Attributes applied around the children.
    pub fn attributes(&self) -> Ref<'_, CompositeAttributes> {
        self.0.attributes.borrow()
    }

    /// Mutable access to the attributes.
    pub fn attributes_mut(&self) -> RefMut<'_, CompositeAttributes> {
        self.0.attributes.borrow_mut()
    }

    /// Append `child`; a child that is already present is not added again.
    pub fn append_child(&self, child: impl Into<RenderTreeNode>) {
        let child = child.into();
        let mut children = self.0.children.borrow_mut();
        if !children.iter().any(|c| c.ptr_eq(&child)) {
            children.push(child);
        }
    }

    /// Remove `child` if present.
    pub fn remove_child(&self, child: &RenderTreeNode) {
        self.0.children.borrow_mut().retain(|c| !c.ptr_eq(child));
    }

    /// True if the node has no children.
    pub fn is_empty(&self) -> bool {
        self.0.children.borrow().is_empty()
    }

    /// Remove every child.
    pub fn clear_children(&self) {
        self.0.children.borrow_mut().clear();
    }

    /// Children in composition order.
    pub fn children(&self) -> Ref<'_, [RenderTreeNode]> {
        Ref::map(self.0.children.borrow(), Vec::as_slice)
    }

    /// Append the instructions drawing this subtree to `recorder`.
    pub fn compose(&self, recorder: &mut Recorder) {
        let attributes = self.0.attributes.borrow();
        attributes.make_scope(recorder, |recorder| {
            for child in self.0.children.borrow().iter() {
                child.compose(recorder);
            }
        });
    }
}

impl fmt::Debug for CompositeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeNode")
            .field("id", &self.0.id)
            .field("children", &self.0.children.borrow().len())
            .field("attributes", &*self.0.attributes.borrow())
            .finish()
    }
}

type PaintCallback = Rc<dyn Fn(&mut Canvas)>;

struct PaintInner {
    id: NodeId,
    bounds: Cell<Rect>,
    callback: RefCell<Option<PaintCallback>>,
    dirty: Cell<bool>,
}

/// Leaf painted by a callback into its own bounds.
///
/// The callback draws with the bounds' origin at `(0, 0)`. Updating the node marks it dirty
/// until it is painted again.
#[derive(Clone)]
pub struct PaintNode(Rc<PaintInner>);

impl PaintNode {
    /// Create a clean node with empty bounds and no callback.
    pub fn new(ids: &IdAllocator) -> Self {
        Self(Rc::new(PaintInner {
            id: ids.allocate(),
            bounds: Cell::new(Rect::ZERO),
            callback: RefCell::new(None),
            dirty: Cell::new(false),
        }))
    }

    /// Identity of the node.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// True if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Area painted by the node, in the coordinates of its parent.
    pub fn bounds(&self) -> Rect {
        self.0.bounds.get()
    }

    /// True if the node changed since it was last painted.
    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    /// Replace the bounds and the callback, and mark the node dirty.
    pub fn update(&self, bounds: Rect, callback: impl Fn(&mut Canvas) + 'static) {
        self.0.bounds.set(bounds);
        self.0.callback.replace(Some(Rc::new(callback)));
        self.0.dirty.set(true);
    }

    /// Mark the node dirty without changing it.
    pub fn mark_dirty(&self) {
        self.0.dirty.set(true);
    }

    /// Run the callback into `canvas` and clear the dirty flag.
    ///
    /// A node that was never updated paints nothing and stays as it is.
    pub fn paint(&self, canvas: &mut Canvas) {
        let callback = self.0.callback.borrow().clone();
        if let Some(callback) = callback {
            callback(canvas);
            self.0.dirty.set(false);
        }
    }

    /// Append the instruction drawing this node to `recorder`.
    pub fn compose(&self, recorder: &mut Recorder) {
        recorder.draw_paint_node(self.clone());
    }
}

impl fmt::Debug for PaintNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintNode")
            .field("id", &self.0.id)
            .field("bounds", &self.0.bounds.get())
            .field("dirty", &self.0.dirty.get())
            .finish_non_exhaustive()
    }
}

struct VideoInner {
    id: NodeId,
    texture: RefCell<Option<(VideoBuffer, Rect)>>,
    sampling: Cell<Sampling>,
}

/// Leaf showing one video frame.
///
/// The node holds at most one frame and gives it to the recorder the next time it is
/// composed, so each frame is shown once. A tree that is composed but never submitted drops
/// the frame with the recorder.
#[derive(Clone)]
pub struct VideoTextureNode(Rc<VideoInner>);

impl VideoTextureNode {
    /// Create a node without a frame.
    pub fn new(ids: &IdAllocator) -> Self {
        Self(Rc::new(VideoInner {
            id: ids.allocate(),
            texture: RefCell::new(None),
            sampling: Cell::new(Sampling::Linear),
        }))
    }

    /// Identity of the node.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// True if a frame is waiting to be composed.
    pub fn has_texture(&self) -> bool {
        self.0.texture.borrow().is_some()
    }

    /// Sampling used for the next frame.
    pub fn sampling(&self) -> Sampling {
        self.0.sampling.get()
    }

    /// Replace the pending frame.
    ///
    /// The previous frame is released. `None` only releases it. Without `rect` the frame is
    /// drawn at its pixel size at the origin.
    pub fn update(&self, texture: Option<VideoBuffer>, sampling: Sampling, rect: Option<Rect>) {
        let Some(texture) = texture else {
            self.0.texture.replace(None);
            return;
        };
        let rect = rect.unwrap_or_else(|| {
            Rect::new(0.0, 0.0, f64::from(texture.width()), f64::from(texture.height()))
        });
        self.0.texture.replace(Some((texture, rect)));
        self.0.sampling.set(sampling);
    }

    /// Hand the pending frame, if any, to `recorder`.
    pub fn compose(&self, recorder: &mut Recorder) {
        if let Some((buffer, rect)) = self.0.texture.take() {
            recorder.draw_video_texture(buffer, rect, self.0.sampling.get());
        }
    }
}

impl fmt::Debug for VideoTextureNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoTextureNode")
            .field("id", &self.0.id)
            .field("texture", &*self.0.texture.borrow())
            .field("sampling", &self.0.sampling.get())
            .finish()
    }
}
