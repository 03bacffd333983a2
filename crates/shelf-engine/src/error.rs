//! Fatal errors for a reconciliation run.
//!
//! Recoverable outcomes (a placement that found no target fixture, a
//! split whose post-condition failed, a cascade rejection) never surface
//! here; they are handled by falling through to the next strategy and are
//! recorded in the [`DecisionLog`](crate::DecisionLog).

use std::error::Error;
use std::fmt;

use shelf_core::{HostError, ModelError, PositionId};

use crate::config::ConfigError;

/// A position still spanning a boundary when convergence was given up.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossingItem {
    /// The crossing position.
    pub position: PositionId,
    /// The product's UPC.
    pub upc: String,
    /// Left edge of the footprint.
    pub left: f64,
    /// Right edge of the footprint.
    pub right: f64,
}

/// Errors that abort the reconciliation of one document.
#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileError {
    /// A boundary still had crossing positions after the bounded
    /// detect/resolve rounds and the final check.
    Convergence {
        /// Index of the boundary (between segment `boundary` and `boundary + 1`).
        boundary: usize,
        /// X coordinate of the boundary.
        at: f64,
        /// Every position still crossing it.
        remaining: Vec<CrossingItem>,
    },
    /// The layout host failed to recompute geometry.
    Host(HostError),
    /// The planogram arena rejected an operation.
    Model(ModelError),
    /// The configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Convergence {
                boundary,
                at,
                remaining,
            } => {
                write!(
                    f,
                    "boundary {boundary} at x={at:.3} did not converge: {} position(s) still crossing",
                    remaining.len()
                )?;
                for (i, item) in remaining.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { ", " };
                    write!(
                        f,
                        "{sep}{} [{:.3}, {:.3}]",
                        item.upc, item.left, item.right
                    )?;
                }
                Ok(())
            }
            Self::Host(e) => write!(f, "layout host: {e}"),
            Self::Model(e) => write!(f, "planogram: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Host(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Convergence { .. } => None,
        }
    }
}

impl From<HostError> for ReconcileError {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

impl From<ModelError> for ReconcileError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<ConfigError> for ReconcileError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
