// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry leaves: shapes that draw nodes paint and clip with.

use kurbo::{BezPath, Point, Rect};

use crate::canvas::Canvas;
use crate::node::{Node, NodeKind, Property};
use crate::paint::Paint;
use crate::types::{IdAllocator, NodeTraits};

/// Winding direction of a generated path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PathDirection {
    /// Clockwise (in a y-down coordinate system).
    #[default]
    Cw,
    /// Counter-clockwise.
    Ccw,
}

pub(crate) enum GeometryKind {
    Rect(RectData),
}

impl GeometryKind {
    pub(crate) fn on_revalidate(&self) -> Rect {
        match self {
            Self::Rect(data) => data.rect.get(),
        }
    }
}

base_handle!(
    /// Handle to any geometry node.
    ///
    /// Queries require the geometry to be revalidated; calling them on a stale geometry
    /// panics.
    Geometry,
    Geometry,
    GeometryKind
);

impl Geometry {
    /// Draw the shape with `paint`.
    #[track_caller]
    pub fn draw(&self, canvas: &mut Canvas, paint: &Paint) {
        self.assert_revalidated();
        match self.kind() {
            GeometryKind::Rect(data) => canvas.draw_rect(data.rect.get(), paint),
        }
    }

    /// Intersect the canvas clip with the shape.
    #[track_caller]
    pub fn clip(&self, canvas: &mut Canvas, anti_alias: bool) {
        self.assert_revalidated();
        match self.kind() {
            GeometryKind::Rect(data) => canvas.clip_rect(data.rect.get(), anti_alias),
        }
    }

    /// True if `point` is inside the filled shape.
    #[track_caller]
    pub fn contains(&self, point: Point) -> bool {
        self.assert_revalidated();
        if !self.bounds().contains(point) {
            return false;
        }
        match self.kind() {
            GeometryKind::Rect(_) => true,
        }
    }

    /// Outline of the shape.
    #[track_caller]
    pub fn as_path(&self) -> BezPath {
        self.assert_revalidated();
        match self.kind() {
            GeometryKind::Rect(data) => data.path(),
        }
    }
}

pub(crate) struct RectData {
    rect: Property<Rect>,
    direction: Property<PathDirection>,
    initial_point_index: Property<usize>,
}

impl RectData {
    fn path(&self) -> BezPath {
        let r = self.rect.get();
        let corners = match self.direction.get() {
            PathDirection::Cw => [
                Point::new(r.x0, r.y0),
                Point::new(r.x1, r.y0),
                Point::new(r.x1, r.y1),
                Point::new(r.x0, r.y1),
            ],
            PathDirection::Ccw => [
                Point::new(r.x0, r.y0),
                Point::new(r.x0, r.y1),
                Point::new(r.x1, r.y1),
                Point::new(r.x1, r.y0),
            ],
        };
        let start = self.initial_point_index.get() % corners.len();
        let mut path = BezPath::new();
        path.move_to(corners[start]);
        for i in 1..corners.len() {
            path.line_to(corners[(start + i) % corners.len()]);
        }
        path.close_path();
        path
    }
}

typed_handle!(
    /// Axis-aligned rectangle.
    ///
    /// ```
    /// use kurbo::{Point, Rect};
    /// use scenery_graph::{IdAllocator, Mat3, RectGeometry};
    ///
    /// let ids = IdAllocator::new();
    /// let rect = RectGeometry::new(&ids);
    /// rect.set_rect(Rect::new(0.0, 0.0, 10.0, 5.0));
    /// rect.revalidate(None, &Mat3::IDENTITY).unwrap();
    /// assert!(rect.contains(Point::new(2.0, 2.0)));
    /// assert!(!rect.contains(Point::new(12.0, 2.0)));
    /// ```
    RectGeometry: Geometry,
    RectData,
    GeometryKind::Rect(data) => data
);

impl RectGeometry {
    /// Create an empty rectangle.
    pub fn new(ids: &IdAllocator) -> Self {
        Self(Geometry(Node::new_rc(
            ids,
            NodeTraits::BUBBLE_DAMAGE,
            NodeKind::Geometry(GeometryKind::Rect(RectData {
                rect: Property::new(Rect::ZERO),
                direction: Property::new(PathDirection::Cw),
                initial_point_index: Property::new(0),
            })),
        )))
    }

    /// Create a rectangle covering `rect`.
    pub fn from_rect(ids: &IdAllocator, rect: Rect) -> Self {
        let geometry = Self::new(ids);
        geometry.set_rect(rect);
        geometry
    }

    /// The rectangle.
    pub fn rect(&self) -> Rect {
        self.data().rect.get()
    }

    /// Replace the rectangle.
    pub fn set_rect(&self, rect: Rect) {
        self.data().rect.set(self, rect);
    }

    /// Winding of [`Geometry::as_path`].
    pub fn direction(&self) -> PathDirection {
        self.data().direction.get()
    }

    /// Set the winding of [`Geometry::as_path`].
    pub fn set_direction(&self, direction: PathDirection) {
        self.data().direction.set(self, direction);
    }

    /// Corner [`Geometry::as_path`] starts at, counted from the top-left in path order.
    pub fn initial_point_index(&self) -> usize {
        self.data().initial_point_index.get()
    }

    /// Set the starting corner; taken modulo 4.
    pub fn set_initial_point_index(&self, index: usize) {
        self.data().initial_point_index.set(self, index);
    }
}
