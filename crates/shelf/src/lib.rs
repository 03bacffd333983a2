//! Shelf: segment-boundary reconciliation for retail planograms.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Shelf sub-crates. For most users, adding `shelf` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use shelf::prelude::*;
//!
//! // Two one-metre segments, one shelf at 0.5m.
//! let mut plano = Planogram::new();
//! plano.add_segment("S0", 0.0, 1.0).unwrap();
//! plano.add_segment("S1", 1.0, 1.0).unwrap();
//! let left = plano.add_fixture("F0", 0.0, 0.5, 1.0).unwrap();
//! plano.add_fixture("F1", 1.0, 0.5, 1.0).unwrap();
//!
//! // Three facings pushed across the boundary by a manual offset.
//! let cola = plano.add_product("012345678905", 0.1, 7.0).unwrap();
//! let pos = plano.add_position(cola, left, 3, 0.1).unwrap();
//! plano.set_offset(pos, 0.85).unwrap();
//!
//! let mut host = RankLayout::new();
//! host.layout_all(&mut plano).unwrap();
//!
//! let report = Reconciler::default().run(&mut plano, &mut host).unwrap();
//! assert_eq!(report.metrics.boundaries_processed, 1);
//! // Items crossing into the last segment move whole rather than split.
//! assert_eq!(report.metrics.relocations, 1);
//! assert!(!plano.contains_position(pos));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `shelf-core` | IDs, the planogram arena, geometry, layout host contract |
//! | [`engine`] | `shelf-engine` | Reconciler, phases, config, decision log |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Planogram arena, IDs, geometry and the layout host (`shelf-core`).
///
/// [`types::Planogram`] owns every entity; [`types::LayoutHost`] is the
/// extension point for whatever computes world coordinates.
pub use shelf_core as types;

/// Reconciliation engine (`shelf-engine`).
///
/// [`engine::Reconciler`] runs the whole pipeline; the phase modules are
/// public for callers that drive a [`engine::Session`] themselves.
pub use shelf_engine as engine;

/// Common imports for typical Shelf usage.
///
/// ```rust
/// use shelf::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use shelf_core::{
        CombineMode, Facings, FixtureId, HostError, LayoutHost, MerchDirection, ModelError,
        Planogram, PositionId, ProductId, RankLayout, SegmentId,
    };

    // Engine
    pub use shelf_engine::{
        Decision, DecisionLog, ReconcileConfig, ReconcileError, ReconcileMetrics,
        ReconcileReport, Reconciler, SplitPolicy,
    };
}
