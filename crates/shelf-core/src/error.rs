//! Error types for the planogram arena and the layout host.
//!
//! [`ModelError`] covers misuse of the arena (dangling IDs, facings that
//! would drop below one, malformed segment layouts). [`HostError`] is what
//! a [`LayoutHost`](crate::LayoutHost) reports when it cannot recompute
//! derived geometry.

use std::error::Error;
use std::fmt;

use crate::id::{FixtureId, PositionId, ProductId};

/// Errors from planogram arena operations.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// No fixture with this ID exists in the planogram.
    UnknownFixture(FixtureId),
    /// No position with this ID exists (it may have been removed).
    UnknownPosition(PositionId),
    /// No product with this ID exists.
    UnknownProduct(ProductId),
    /// A facing count of zero was requested. Facings are always positive.
    InvalidFacings {
        /// The position whose facings were being changed, if it exists yet.
        position: Option<PositionId>,
        /// The rejected facing count.
        requested: u32,
    },
    /// A length (width, single-facing width, coordinate) was NaN,
    /// infinite, or not strictly positive where required.
    InvalidDimension {
        /// Which dimension was rejected.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A new segment overlaps an existing one.
    OverlappingSegment {
        /// Left edge of the rejected segment.
        left: f64,
        /// Right edge of the rejected segment.
        right: f64,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFixture(id) => write!(f, "unknown fixture {id}"),
            Self::UnknownPosition(id) => write!(f, "unknown position {id}"),
            Self::UnknownProduct(id) => write!(f, "unknown product {id}"),
            Self::InvalidFacings {
                position,
                requested,
            } => {
                write!(f, "facings must be at least 1, got {requested}")?;
                if let Some(id) = position {
                    write!(f, " for position {id}")?;
                }
                Ok(())
            }
            Self::InvalidDimension { what, value } => {
                write!(f, "{what} must be finite and positive, got {value}")
            }
            Self::OverlappingSegment { left, right } => {
                write!(
                    f,
                    "segment [{left:.3}, {right:.3}) overlaps an existing segment"
                )
            }
        }
    }
}

impl Error for ModelError {}

/// Errors reported by a [`LayoutHost`](crate::LayoutHost) during recompute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    /// The host could not complete the layout pass.
    LayoutFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The host was asked to lay out a fixture it does not know about.
    UnknownFixture(FixtureId),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LayoutFailed { reason } => write!(f, "layout failed: {reason}"),
            Self::UnknownFixture(id) => write!(f, "host has no fixture {id}"),
        }
    }
}

impl Error for HostError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_facings_mentions_position_when_known() {
        let err = ModelError::InvalidFacings {
            position: Some(PositionId(4)),
            requested: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("at least 1"));
        assert!(msg.contains("position 4"));

        let anonymous = ModelError::InvalidFacings {
            position: None,
            requested: 0,
        };
        assert!(!anonymous.to_string().contains("position"));
    }

    #[test]
    fn host_error_display() {
        let err = HostError::LayoutFailed {
            reason: "fixture graph cyclic".to_string(),
        };
        assert_eq!(err.to_string(), "layout failed: fixture graph cyclic");
        assert_eq!(
            HostError::UnknownFixture(FixtureId(2)).to_string(),
            "host has no fixture 2"
        );
    }
}
