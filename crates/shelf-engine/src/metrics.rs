//! Per-run counters for the reconciliation engine.
//!
//! [`ReconcileMetrics`] is filled in as phases execute and returned in the
//! [`ReconcileReport`](crate::ReconcileReport). Counters are cumulative
//! for one document.

/// Counters and timings collected during one reconciliation run.
///
/// Durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct ReconcileMetrics {
    /// Wall-clock time for the whole run, in microseconds.
    pub total_us: u64,
    /// Per-phase execution times: `(phase, microseconds)`.
    pub phase_us: Vec<(String, u64)>,
    /// Boundaries fully processed (converged and rescued).
    pub boundaries_processed: u32,
    /// Detect/resolve rounds that found at least one crossing.
    pub overlap_rounds: u32,
    /// Crossing positions handed to the dispatcher.
    pub overlaps_resolved: u32,
    /// Successful split-facings placements.
    pub splits: u32,
    /// Splits undone because the post-condition failed.
    pub splits_reverted: u32,
    /// Whole-item relocations.
    pub relocations: u32,
    /// Facing inflations that were kept.
    pub inflations_committed: u32,
    /// Facing inflations that were undone.
    pub inflations_reverted: u32,
    /// Products found outside their original segment after a boundary.
    pub displacements: u32,
    /// Displacements answered by inflating a neighbour.
    pub rescues_by_inflation: u32,
    /// Displacements answered by relocating the product.
    pub rescues_by_relocation: u32,
    /// Facings added by cross-zone inflation.
    pub cross_zone_facings: u32,
    /// Facings added by the last-zone fill.
    pub fill_facings: u32,
    /// Fell-back splits tidied under the allow policy.
    pub split_items_allowed: u32,
    /// Fell-back splits folded back under the prevent policy.
    pub split_items_prevented: u32,
    /// Calls made to the layout host.
    pub recompute_calls: u64,
}
