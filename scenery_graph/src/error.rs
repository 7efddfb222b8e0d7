// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node errors.

use crate::types::{NodeId, NodeType};

/// Error raised by a node that was driven outside of its contract.
///
/// [`NodeError::FastBounds`] is returned from [`Node::revalidate`](crate::Node::revalidate)
/// and can be propagated with `?`. [`NodeError::NotRevalidated`] is only ever used as the
/// message of a panic: reading render state from a stale node is a caller bug.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    /// The node was queried or rendered while its bounds were stale.
    #[error("node {id} ({ty:?}) has not been revalidated")]
    NotRevalidated {
        /// Offending node.
        id: NodeId,
        /// Its concrete kind.
        ty: NodeType,
    },
    /// The paint of a draw node cannot bound its output cheaply (for example a discrete path
    /// effect).
    #[error("node {id} ({ty:?}) cannot compute the fast bounds of its paint")]
    FastBounds {
        /// Offending node.
        id: NodeId,
        /// Its concrete kind.
        ty: NodeType,
    },
}

impl NodeError {
    /// Node that raised the error.
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::NotRevalidated { id, .. } | Self::FastBounds { id, .. } => *id,
        }
    }
}
