//! Segment-boundary reconciliation for Shelf planograms.
//!
//! Provides the [`Reconciler`] that walks a planogram's segment boundaries
//! left to right, clearing every position that straddles one by splitting
//! or relocating it, rescuing products the resolution displaced, and then
//! spending leftover width in the last two segments on extra facings.
//!
//! All geometry is recomputed through a caller-supplied
//! [`LayoutHost`](shelf_core::LayoutHost); the engine never computes
//! world coordinates itself.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod cross_zone;
pub mod decision;
pub mod error;
pub mod fill;
pub mod metrics;
pub mod overlap;
pub mod reconciler;
pub mod rescue;
pub mod scenario;
pub mod selection;
pub mod session;
pub mod snapshot;
pub mod split_items;
pub mod strategy;

pub use config::{
    ConfigError, FillConfig, InflationConfig, PolicySource, ReconcileConfig, SnapshotKey,
    SplitPolicy, ToleranceConfig,
};
pub use context::ReconcileContext;
pub use decision::{
    Decision, DecisionLog, InflationPhase, RescueMethod, RevertCause, SplitItemAction,
};
pub use error::{CrossingItem, ReconcileError};
pub use metrics::ReconcileMetrics;
pub use overlap::{crossing_counts, crossings, total_crossings, Resolution};
pub use reconciler::{FixtureOverflow, ReconcileReport, Reconciler};
pub use scenario::{classify, Classification, Scenario};
pub use selection::{Candidate, Selection, SelectionReason};
pub use session::Session;
pub use snapshot::{Displacement, MissingProduct, ShelfRoster, Snapshot};
pub use split_items::{detect_split_items, SplitItem};
pub use strategy::PlacementFailure;
