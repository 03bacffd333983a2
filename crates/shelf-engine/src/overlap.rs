//! Per-boundary detect/resolve loop.
//!
//! Boundaries are processed left to right. For boundary `i`:
//!
//! 1. Zone `i` is locked (its fixtures stop combining with neighbours) so
//!    later layout passes cannot re-merge settled zones. Zone 0 is locked
//!    once by the orchestrator before the first boundary.
//! 2. Up to `max_overlap_rounds` rounds detect every position crossing the
//!    boundary and dispatch each, in discovery order, to a split or a
//!    whole-item relocation into zone `i + 1`.
//! 3. A final check runs; anything still crossing aborts the document with
//!    [`ReconcileError::Convergence`].
//! 4. Products that changed zone relative to the original snapshot are
//!    rescued, and the boundary is converged again. This repeats, bounded,
//!    for products a rescue displaced in turn.

use indexmap::IndexSet;
use shelf_core::{crosses_boundary, CombineMode, Planogram, PositionId};
use tracing::{debug, info, info_span, warn};

use crate::config::ToleranceConfig;
use crate::decision::Decision;
use crate::error::{CrossingItem, ReconcileError};
use crate::rescue::rescue_displaced;
use crate::scenario::{classify, Scenario};
use crate::session::Session;
use crate::snapshot::{compare, Displacement, ProductKey, Snapshot};
use crate::strategy::{relocate_whole_item, split_facings, PlacementFailure};

// ── Detection ──────────────────────────────────────────────────────

/// Positions crossing the boundary at `at`, in discovery order.
pub fn crossings(plano: &Planogram, at: f64, tol: &ToleranceConfig) -> Vec<PositionId> {
    plano
        .positions()
        .filter(|p| crosses_boundary(p.left(), p.right(), at, tol.boundary))
        .map(|p| p.id)
        .collect()
}

/// Like [`crossings`], with the detail reported in a convergence error.
pub fn crossing_items(plano: &Planogram, at: f64, tol: &ToleranceConfig) -> Vec<CrossingItem> {
    plano
        .positions()
        .filter(|p| crosses_boundary(p.left(), p.right(), at, tol.boundary))
        .map(|p| CrossingItem {
            position: p.id,
            upc: plano
                .product(p.product)
                .map(|prod| prod.upc.clone())
                .unwrap_or_default(),
            left: p.left(),
            right: p.right(),
        })
        .collect()
}

/// Crossing count at each boundary, left to right.
pub fn crossing_counts(plano: &Planogram, tol: &ToleranceConfig) -> Vec<usize> {
    (0..plano.segment_count().saturating_sub(1))
        .filter_map(|i| plano.boundary(i))
        .map(|at| crossings(plano, at, tol).len())
        .collect()
}

/// Crossing count summed over every boundary.
pub fn total_crossings(plano: &Planogram, tol: &ToleranceConfig) -> usize {
    crossing_counts(plano, tol).iter().sum()
}

// ── Resolution ─────────────────────────────────────────────────────

/// What happened to one crossing position.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Facings were split; `kept` stays left, `moved` is new.
    Split {
        /// The original position.
        kept: PositionId,
        /// The new position in the next segment.
        moved: PositionId,
    },
    /// The whole item now lives at `to`.
    Relocated {
        /// The new position.
        to: PositionId,
    },
    /// Neither strategy could place it; it still crosses.
    Unresolved(PlacementFailure),
}

/// Classify a position crossing boundary `boundary` and resolve it.
///
/// Splitting is attempted first when feasible and the destination is not
/// the last segment; a failed split falls through to relocating the whole
/// item into segment `boundary + 1`.
pub fn resolve_crossing(
    s: &mut Session<'_>,
    position: PositionId,
    boundary: usize,
    round: u32,
) -> Result<Resolution, ReconcileError> {
    let next = boundary + 1;
    let Some(at) = s.plano.boundary(boundary) else {
        return Ok(Resolution::Unresolved(PlacementFailure::MissingSegment {
            segment: next,
        }));
    };
    let class = classify(s.plano.position(position)?, at, &s.config.tolerances);
    let upc = s.upc_of(position);
    debug!(
        upc = %upc,
        boundary,
        round,
        scenario = ?class.scenario,
        pct_left = class.percentage_left,
        "crossing"
    );
    s.ctx.metrics.overlaps_resolved += 1;
    s.ctx.log.record(Decision::OverlapDetected {
        boundary,
        round,
        position,
        upc: upc.clone(),
        scenario: class.scenario,
    });

    let terminal = s.last_segment() == Some(next);
    if let Scenario::SplitFacings { left, .. } = class.scenario {
        if !terminal {
            match split_facings(s, position, next, left, boundary, at)? {
                Ok(moved) => {
                    return Ok(Resolution::Split {
                        kept: position,
                        moved,
                    })
                }
                Err(failure) => debug!(upc = %upc, %failure, "split failed, relocating"),
            }
        }
    }

    match relocate_whole_item(s, position, next)? {
        Ok(to) => Ok(Resolution::Relocated { to }),
        Err(failure) => {
            warn!(upc = %upc, boundary, %failure, "could not relocate crossing item");
            s.ctx.log.record(Decision::RelocationFailed {
                upc,
                position,
                failure: failure.clone(),
            });
            Ok(Resolution::Unresolved(failure))
        }
    }
}

/// Run the bounded detect/resolve loop for one boundary, then the final
/// check. Errors with [`ReconcileError::Convergence`] if anything still
/// crosses.
pub fn converge_boundary(s: &mut Session<'_>, boundary: usize) -> Result<(), ReconcileError> {
    let Some(at) = s.plano.boundary(boundary) else {
        return Ok(());
    };
    let config = s.config;
    let tol = &config.tolerances;

    for round in 0..config.max_overlap_rounds {
        s.settle()?;
        let found = crossings(s.plano, at, tol);
        if found.is_empty() {
            break;
        }
        s.ctx.metrics.overlap_rounds += 1;
        debug!(boundary, round, count = found.len(), "resolving crossings");
        for id in found {
            // Earlier resolutions in this round may have moved or removed it.
            let still = s
                .plano
                .position(id)
                .map(|p| crosses_boundary(p.left(), p.right(), at, tol.boundary))
                .unwrap_or(false);
            if still {
                resolve_crossing(s, id, boundary, round)?;
            }
        }
    }

    s.settle()?;
    let remaining = crossing_items(s.plano, at, tol);
    if remaining.is_empty() {
        Ok(())
    } else {
        Err(ReconcileError::Convergence {
            boundary,
            at,
            remaining,
        })
    }
}

/// Stop every fixture in `segment` from combining with its neighbours and
/// recompute. Returns the number of fixtures locked.
pub fn lock_zone(s: &mut Session<'_>, segment: usize) -> Result<usize, ReconcileError> {
    let fixtures = s.plano.fixtures_in_segment(segment);
    for id in &fixtures {
        s.plano.set_can_combine(*id, CombineMode::No)?;
    }
    s.settle()?;
    debug!(segment, fixtures = fixtures.len(), "zone locked");
    s.ctx.log.record(Decision::ZoneLocked {
        segment,
        fixtures: fixtures.len(),
    });
    Ok(fixtures.len())
}

/// Log each displacement and count it.
fn record_displacements(s: &mut Session<'_>, boundary: usize, displaced: &[Displacement]) {
    for d in displaced {
        let upc = s.upc(d.key.product);
        debug!(upc = %upc, from = d.from.segment, to = d.to.segment, "displaced");
        s.ctx.metrics.displacements += 1;
        s.ctx.log.record(Decision::Displaced {
            boundary,
            product: d.key.product,
            upc,
            from_segment: d.from.segment,
            to_segment: d.to.segment,
        });
    }
}

/// Fully process boundary `boundary`: lock, converge, compare against the
/// original snapshot, rescue displaced products, converge again.
///
/// A rescue can itself push another product out of its zone, so the
/// compare/rescue step repeats for products not yet handled, up to
/// `max_rescue_passes` times. Displacements found after the last pass are
/// logged but left alone.
pub fn process_boundary(s: &mut Session<'_>, boundary: usize) -> Result<(), ReconcileError> {
    let _span = info_span!("boundary", boundary).entered();
    if boundary > 0 {
        lock_zone(s, boundary)?;
    }
    converge_boundary(s, boundary)?;

    let config = s.config;
    let mut handled: IndexSet<ProductKey> = IndexSet::new();
    let mut passes = 0u32;
    loop {
        let baseline = Snapshot::capture(s.plano, config.snapshot_key, &config.tolerances);
        let displaced: Vec<Displacement> = match &s.ctx.original {
            Some(original) => compare(original, &baseline, boundary, boundary + 1)
                .into_iter()
                .filter(|d| !handled.contains(&d.key))
                .collect(),
            None => Vec::new(),
        };
        s.ctx.baseline = Some(baseline);
        if displaced.is_empty() {
            break;
        }
        record_displacements(s, boundary, &displaced);
        if passes == config.max_rescue_passes {
            warn!(
                boundary,
                count = displaced.len(),
                "rescue passes exhausted, displaced products left in place"
            );
            break;
        }
        rescue_displaced(s, boundary, &displaced)?;
        converge_boundary(s, boundary)?;
        handled.extend(displaced.iter().map(|d| d.key));
        passes += 1;
    }

    s.ctx.metrics.boundaries_processed += 1;
    info!(
        boundary,
        displaced = handled.len(),
        passes,
        rounds = s.ctx.metrics.overlap_rounds,
        "boundary settled"
    );
    Ok(())
}
