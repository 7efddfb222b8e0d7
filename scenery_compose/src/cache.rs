// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pictures merged from runs of paint nodes, kept across frames.
//!
//! Each paint node expects to draw on a layer of its own, so a naive linearization emits one
//! picture per leaf even when nothing separates consecutive leaves. The recorder instead draws
//! such a run into a single picture and stores it here keyed by the ordered node identities,
//! so an unchanged run is not recorded again on the next frame.

use alloc::vec::Vec;
use scenery_graph::{NodeId, Picture};

use crate::render_tree::PaintNode;

/// Checkpoints an entry may go unmatched before it is dropped.
pub const PICTURE_UNUSED_LIFECYCLE_THRESHOLD: u32 = 8;

#[derive(Debug)]
struct MergedPicture {
    picture: Picture,
    node_ids: Vec<NodeId>,
    unused_lifecycle: u32,
    used_this_frame: bool,
}

impl MergedPicture {
    fn matches(&self, run: &[PaintNode]) -> bool {
        self.node_ids.len() == run.len()
            && self
                .node_ids
                .iter()
                .zip(run)
                .all(|(id, node)| *id == node.id() && !node.is_dirty())
    }

    fn mark_used(&mut self) {
        self.unused_lifecycle = 0;
        self.used_this_frame = true;
    }

    fn is_expired(&self) -> bool {
        self.unused_lifecycle >= PICTURE_UNUSED_LIFECYCLE_THRESHOLD
    }
}

/// Merged-picture cache of one presentation target.
///
/// Entries match a run of paint nodes with the same identities in the same order, none of them
/// dirty. An entry that goes unmatched for [`PICTURE_UNUSED_LIFECYCLE_THRESHOLD`] consecutive
/// checkpoints is dropped.
#[derive(Debug, Default)]
pub struct CacheContext {
    entries: Vec<MergedPicture>,
}

impl CacheContext {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached pictures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Picture previously merged from `run`, marking it used this frame.
    pub fn find_merged_picture(&mut self, run: &[PaintNode]) -> Option<Picture> {
        let entry = self.entries.iter_mut().find(|e| e.matches(run))?;
        entry.mark_used();
        Some(entry.picture.clone())
    }

    /// Store `picture` as the merge of `run`.
    ///
    /// An entry already stored for the same node sequence is replaced, so a repainted run never
    /// falls back to its previous picture. The new entry is not counted as used; it ages from
    /// the next checkpoint on like any other entry.
    pub fn create_merged_picture(&mut self, picture: Picture, run: &[PaintNode]) {
        let entry = MergedPicture {
            picture,
            node_ids: run.iter().map(PaintNode::id).collect(),
            unused_lifecycle: 0,
            used_this_frame: false,
        };
        match self.entries.iter_mut().find(|e| e.node_ids == entry.node_ids) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// End a frame: age the entries not used since the previous checkpoint, reset the usage
    /// flags, and drop expired entries. Returns the number of dropped entries.
    pub fn checkpoint(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain_mut(|entry| {
            if !entry.used_this_frame {
                entry.unused_lifecycle += 1;
            }
            entry.used_this_frame = false;
            !entry.is_expired()
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, kept = self.entries.len(), "merged pictures evicted");
        }
        evicted
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
