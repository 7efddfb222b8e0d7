// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame submission with at most one scene in flight.

use kurbo::Size;

use crate::cache::CacheContext;
use crate::logger::Logger;
use crate::recorder::Recorder;
use crate::render_tree::RenderTreeNode;
use crate::scene::Scene;

/// Presentation target receiving built scenes.
pub trait DrawContext {
    /// Current size of the target surface.
    fn viewport(&self) -> Size;

    /// Take ownership of `scene` and start presenting it.
    ///
    /// Presentation completes asynchronously; the owner of the
    /// [`DrawContextSubmitter`] reports completion with
    /// [`DrawContextSubmitter::notify_submitted`]. With `capture`, the presented frame should
    /// also be captured.
    fn submit_scene(&mut self, scene: Scene, capture: bool);
}

/// Completion of a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedEvent<C> {
    /// Serial returned by the matching [`DrawContextSubmitter::submit`].
    pub serial: u64,
    /// Value passed to the matching `submit`.
    pub closure: C,
}

/// Composes render trees into scenes for one [`DrawContext`].
///
/// The submitter owns the merged-picture cache of its target. A submission made while a
/// previous one is still pending is rejected rather than queued.
///
/// ```
/// use kurbo::{Rect, Size};
/// use scenery_compose::{DrawContext, DrawContextSubmitter, PaintNode, RenderTreeNode, Scene};
/// use scenery_graph::IdAllocator;
///
/// #[derive(Default)]
/// struct Target(Vec<Scene>);
///
/// impl DrawContext for Target {
///     fn viewport(&self) -> Size {
///         Size::new(320.0, 240.0)
///     }
///     fn submit_scene(&mut self, scene: Scene, _capture: bool) {
///         self.0.push(scene);
///     }
/// }
///
/// let ids = IdAllocator::new();
/// let leaf = PaintNode::new(&ids);
/// leaf.update(Rect::new(0.0, 0.0, 8.0, 8.0), |_| {});
/// let root = RenderTreeNode::from(leaf);
///
/// let mut submitter = DrawContextSubmitter::new(Target::default());
/// assert_eq!(submitter.submit(&root, "first", false), Some(1));
/// assert_eq!(submitter.submit(&root, "second", false), None);
/// let done = submitter.notify_submitted().unwrap();
/// assert_eq!((done.serial, done.closure), (1, "first"));
/// assert_eq!(submitter.submit(&root, "third", false), Some(2));
/// assert_eq!(submitter.context().0.len(), 2);
/// ```
#[derive(Debug)]
pub struct DrawContextSubmitter<D, C = ()> {
    context: D,
    cache: CacheContext,
    serial: u64,
    pending: Option<C>,
}

impl<D: DrawContext, C> DrawContextSubmitter<D, C> {
    /// Create a submitter for `context` with an empty cache.
    pub fn new(context: D) -> Self {
        Self {
            context,
            cache: CacheContext::new(),
            serial: 0,
            pending: None,
        }
    }

    /// Presentation target.
    pub fn context(&self) -> &D {
        &self.context
    }

    /// Mutable presentation target.
    pub fn context_mut(&mut self) -> &mut D {
        &mut self.context
    }

    /// Merged-picture cache of the target.
    pub fn cache(&self) -> &CacheContext {
        &self.cache
    }

    /// Serial of the last accepted submission, `0` before the first.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// True while a submission awaits [`DrawContextSubmitter::notify_submitted`].
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Compose `root`, build its scene, and hand it to the target.
    ///
    /// Returns the serial of the submission, or `None` without doing anything if a previous
    /// submission is still pending. `closure` is given back in the matching
    /// [`SubmittedEvent`].
    pub fn submit(&mut self, root: &RenderTreeNode, closure: C, capture: bool) -> Option<u64> {
        self.submit_with_logger(root, closure, capture, None)
    }

    /// [`DrawContextSubmitter::submit`] reporting the linearization to `logger`.
    pub fn submit_with_logger(
        &mut self,
        root: &RenderTreeNode,
        closure: C,
        capture: bool,
        logger: Option<&mut dyn Logger>,
    ) -> Option<u64> {
        if self.is_pending() {
            tracing::debug!(serial = self.serial, "submission rejected, previous frame pending");
            return None;
        }
        let mut recorder = Recorder::new();
        root.compose(&mut recorder);
        let scene = recorder.finish(self.context.viewport(), &mut self.cache, logger);
        self.context.submit_scene(scene, capture);

        self.serial += 1;
        self.pending = Some(closure);
        tracing::debug!(serial = self.serial, "scene submitted");
        Some(self.serial)
    }

    /// Report that the pending submission completed.
    ///
    /// Returns `None` if nothing was pending.
    pub fn notify_submitted(&mut self) -> Option<SubmittedEvent<C>> {
        let closure = self.pending.take()?;
        Some(SubmittedEvent {
            serial: self.serial,
            closure,
        })
    }
}
