//! Core types for the Shelf reconciliation engine.
//!
//! This is the leaf crate of the workspace. It defines the planogram
//! arena (segments, fixtures, positions, products addressed by stable
//! typed IDs), the pure geometry queries the engine is built on, the
//! error types for arena and host failures, and the [`LayoutHost`]
//! contract through which derived geometry is recomputed.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod id;
pub mod layout;
pub mod model;
pub mod planogram;
pub mod traits;

pub use error::{HostError, ModelError};
pub use geometry::{crosses_boundary, days_of_supply, overlap_percentage, shelf_level};
pub use id::{FixtureId, PositionId, ProductId, SegmentId};
pub use layout::RankLayout;
pub use model::{CombineMode, Facings, Fixture, MerchDirection, Position, Product, Segment};
pub use planogram::{Planogram, SPLIT_POLICY_DESCRIPTOR};
pub use traits::LayoutHost;
