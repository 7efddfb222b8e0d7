// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle helpers shared by the node variants.

use kurbo::Rect;

/// True if `r` covers no area (including inverted rectangles).
#[inline]
pub fn rect_is_empty(r: Rect) -> bool {
    !(r.x0 < r.x1 && r.y0 < r.y1)
}

/// Union that treats empty rectangles as the identity.
pub fn rect_union(a: Rect, b: Rect) -> Rect {
    match (rect_is_empty(a), rect_is_empty(b)) {
        (true, _) => b,
        (_, true) => a,
        _ => a.union(b),
    }
}

/// True if the two rectangles share a non-empty area.
#[inline]
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    !rect_is_empty(a.intersect(b))
}
