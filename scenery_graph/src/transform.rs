// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform nodes: matrices and their compositions.

use core::cell::Cell;
use kurbo::Rect;

use crate::damage::InvalidationRecorder;
use crate::error::NodeError;
use crate::matrix::Mat3;
use crate::node::{Node, NodeKind, Property};
use crate::types::{IdAllocator, NodeTraits, NodeType};

pub(crate) enum TransformKind {
    Matrix(MatrixData),
    Concat {
        a: Transform,
        b: Transform,
        composed: Cell<Mat3>,
    },
    Inverse {
        transform: Transform,
        inverse: Cell<Mat3>,
    },
}

impl TransformKind {
    pub(crate) fn node_type(&self) -> NodeType {
        match self {
            Self::Matrix(_) => NodeType::Matrix,
            Self::Concat { .. } => NodeType::Concat,
            Self::Inverse { .. } => NodeType::Inverse,
        }
    }

    pub(crate) fn on_revalidate(
        &self,
        mut recorder: Option<&mut InvalidationRecorder>,
        ctm: &Mat3,
    ) -> Result<Rect, NodeError> {
        match self {
            Self::Matrix(_) => {}
            Self::Concat { a, b, composed } => {
                a.revalidate(recorder.as_deref_mut(), ctm)?;
                b.revalidate(recorder, ctm)?;
                composed.set(Mat3::concat(&a.matrix(), &b.matrix()));
            }
            Self::Inverse { transform, inverse } => {
                transform.revalidate(recorder, ctm)?;
                inverse.set(transform.matrix().invert().unwrap_or(Mat3::IDENTITY));
            }
        }
        Ok(Rect::ZERO)
    }
}

base_handle!(
    /// Handle to any transform node.
    Transform,
    Transform,
    TransformKind
);

impl Transform {
    fn new(ids: &IdAllocator, kind: TransformKind) -> Self {
        Self(Node::new_rc(
            ids,
            NodeTraits::BUBBLE_DAMAGE,
            NodeKind::Transform(kind),
        ))
    }

    /// `a × b`: applying the result applies `b`, then `a`.
    pub fn concat(ids: &IdAllocator, a: impl Into<Self>, b: impl Into<Self>) -> Self {
        let (a, b) = (a.into(), b.into());
        let node = Self::new(
            ids,
            TransformKind::Concat {
                a: a.clone(),
                b: b.clone(),
                composed: Cell::new(Mat3::IDENTITY),
            },
        );
        node.0.observe_child(&a);
        node.0.observe_child(&b);
        node
    }

    /// Inverse of `transform`, or identity while it is singular.
    pub fn inverse(ids: &IdAllocator, transform: impl Into<Self>) -> Self {
        let transform = transform.into();
        let node = Self::new(
            ids,
            TransformKind::Inverse {
                transform: transform.clone(),
                inverse: Cell::new(Mat3::IDENTITY),
            },
        );
        node.0.observe_child(&transform);
        node
    }

    /// Current matrix.
    ///
    /// # Panics
    ///
    /// Panics if a computed transform (concat or inverse) has not been revalidated.
    #[track_caller]
    pub fn matrix(&self) -> Mat3 {
        match self.kind() {
            TransformKind::Matrix(data) => data.matrix.get(),
            TransformKind::Concat { composed, .. } => {
                self.assert_revalidated();
                composed.get()
            }
            TransformKind::Inverse { inverse, .. } => {
                self.assert_revalidated();
                inverse.get()
            }
        }
    }
}

pub(crate) struct MatrixData {
    matrix: Property<Mat3>,
}

typed_handle!(
    /// Transform holding a settable matrix.
    MatrixTransform: Transform,
    MatrixData,
    TransformKind::Matrix(data) => data
);

impl MatrixTransform {
    /// Create a transform holding `matrix`.
    pub fn new(ids: &IdAllocator, matrix: Mat3) -> Self {
        Self(Transform::new(
            ids,
            TransformKind::Matrix(MatrixData {
                matrix: Property::new(matrix),
            }),
        ))
    }

    /// Replace the matrix.
    pub fn set_matrix(&self, matrix: Mat3) {
        self.data().matrix.set(self, matrix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_applies_right_operand_first() {
        let ids = IdAllocator::new();
        let t = MatrixTransform::new(&ids, Mat3::translate(10.0, 0.0));
        let s = MatrixTransform::new(&ids, Mat3::scale(2.0, 2.0));
        let ts = Transform::concat(&ids, t.clone(), s.clone());
        let bounds = ts.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert_eq!(bounds, Rect::ZERO, "transforms carry no footprint");
        let p = ts.matrix().map_point(kurbo::Point::new(1.0, 1.0));
        assert_eq!(p, kurbo::Point::new(12.0, 2.0));

        s.set_matrix(Mat3::IDENTITY);
        assert!(ts.has_invalid(), "concat observes its operands");
        ts.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert_eq!(ts.matrix(), Mat3::translate(10.0, 0.0));
    }

    #[test]
    fn inverse_falls_back_to_identity() {
        let ids = IdAllocator::new();
        let m = MatrixTransform::new(&ids, Mat3::scale(0.0, 1.0));
        let inv = Transform::inverse(&ids, m.clone());
        inv.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert_eq!(inv.matrix(), Mat3::IDENTITY);

        m.set_matrix(Mat3::scale(2.0, 4.0));
        inv.revalidate(None, &Mat3::IDENTITY).unwrap();
        assert_eq!(inv.matrix(), Mat3::scale(0.5, 0.25));
    }

    #[test]
    #[should_panic(expected = "has not been revalidated")]
    fn stale_concat_panics() {
        let ids = IdAllocator::new();
        let a = MatrixTransform::new(&ids, Mat3::IDENTITY);
        let b = MatrixTransform::new(&ids, Mat3::IDENTITY);
        let _ = Transform::concat(&ids, a, b).matrix();
    }
}
