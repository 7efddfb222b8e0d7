// Copyright 2025 the Scenery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition errors.

/// Error returned when a composite attribute is given a value it cannot represent.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ComposeError {
    /// Opacity must not be negative.
    #[error("invalid opacity value {0}")]
    InvalidOpacity(f32),
    /// Every contour of a clip path must be closed.
    #[error("contour {contour} of the clip path is not closed")]
    OpenClipPath {
        /// Index of the first open contour.
        contour: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages() {
        assert_eq!(
            ComposeError::InvalidOpacity(-0.5).to_string(),
            "invalid opacity value -0.5"
        );
        assert_eq!(
            ComposeError::OpenClipPath { contour: 1 }.to_string(),
            "contour 1 of the clip path is not closed"
        );
    }
}
