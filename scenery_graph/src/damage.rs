// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage accumulated by [`Node::revalidate`](crate::Node::revalidate).

use alloc::vec::Vec;
use kurbo::Rect;

use crate::matrix::Mat3;
use crate::util::{rect_is_empty, rect_union};

/// Collects the device-space rectangles that changed during a revalidation pass.
///
/// Pass `Some(&mut recorder)` to the root's `revalidate` to collect damage, or `None`
/// to only recompute bounds.
#[derive(Clone, Debug, Default)]
pub struct InvalidationRecorder {
    rects: Vec<Rect>,
}

impl InvalidationRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `bounds`, expressed in the space described by `ctm`.
    ///
    /// Empty rectangles carry no pixels and are dropped.
    pub fn add(&mut self, bounds: Rect, ctm: &Mat3) {
        if rect_is_empty(bounds) {
            return;
        }
        self.rects.push(ctm.map_rect(bounds));
    }

    /// Recorded rectangles, in insertion order.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Number of recorded rectangles.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Union of all recorded rectangles. Returns `None` if empty.
    pub fn union_rect(&self) -> Option<Rect> {
        let mut it = self.rects.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, rect_union))
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Take the recorded rectangles, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<Rect> {
        core::mem::take(&mut self.rects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_through_ctm_and_skips_empty() {
        let mut rec = InvalidationRecorder::new();
        rec.add(Rect::ZERO, &Mat3::IDENTITY);
        assert!(rec.is_empty());
        rec.add(Rect::new(0.0, 0.0, 10.0, 10.0), &Mat3::translate(5.0, 5.0));
        assert_eq!(rec.rects(), &[Rect::new(5.0, 5.0, 15.0, 15.0)]);
    }

    #[test]
    fn union_of_recorded() {
        let mut rec = InvalidationRecorder::new();
        assert_eq!(rec.union_rect(), None);
        rec.add(Rect::new(0.0, 0.0, 10.0, 10.0), &Mat3::IDENTITY);
        rec.add(Rect::new(20.0, 20.0, 30.0, 30.0), &Mat3::IDENTITY);
        assert_eq!(rec.union_rect(), Some(Rect::new(0.0, 0.0, 30.0, 30.0)));
        assert_eq!(rec.take().len(), 2);
        assert!(rec.is_empty());
    }
}
