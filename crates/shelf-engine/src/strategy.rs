//! Placement primitives shared by every phase.
//!
//! [`relocate_whole_item`] and [`split_facings`] move facings into a
//! segment's leftmost slot on the same shelf. Both distinguish recoverable
//! failures (the inner `Err(PlacementFailure)`, on which nothing has been
//! left changed) from fatal ones (the outer [`ReconcileError`]).

use std::error::Error;
use std::fmt;

use shelf_core::{FixtureId, ModelError, Planogram, PositionId};
use tracing::debug;

use crate::config::ToleranceConfig;
use crate::decision::{Decision, InflationPhase, RevertCause};
use crate::error::ReconcileError;
use crate::selection::SelectionReason;
use crate::session::Session;

/// Why a placement could not be made. Recoverable.
#[derive(Clone, Debug, PartialEq)]
pub enum PlacementFailure {
    /// No fixture in the destination segment sits at the item's height.
    NoTargetFixture {
        /// Destination segment index.
        segment: usize,
        /// Shelf height searched for.
        y: f64,
    },
    /// The destination segment does not exist.
    MissingSegment {
        /// Requested segment index.
        segment: usize,
    },
    /// After a split the kept part still reached past the boundary.
    SplitVerification {
        /// Right edge of the kept part after layout.
        right_edge: f64,
        /// Largest right edge that would have been accepted.
        limit: f64,
    },
    /// No candidate qualified.
    NoCandidate,
}

impl fmt::Display for PlacementFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTargetFixture { segment, y } => {
                write!(f, "no fixture in segment {segment} at y={y:.3}")
            }
            Self::MissingSegment { segment } => write!(f, "segment {segment} does not exist"),
            Self::SplitVerification { right_edge, limit } => write!(
                f,
                "kept facings end at {right_edge:.4}, past limit {limit:.4}"
            ),
            Self::NoCandidate => write!(f, "no candidate qualified"),
        }
    }
}

impl Error for PlacementFailure {}

/// Outcome of a placement: fatal error outside, recoverable failure inside.
pub type Placement<T> = Result<Result<T, PlacementFailure>, ReconcileError>;

/// Offset from the fixture's left edge at which a new leftmost item goes.
///
/// Empty fixture: the edge tolerance. Otherwise just left of the current
/// leftmost item, but never closer to the edge than the tolerance.
pub fn leftmost_available_offset(
    plano: &Planogram,
    fixture: FixtureId,
    tol: &ToleranceConfig,
) -> Result<f64, ModelError> {
    let fx = plano.fixture(fixture)?.x;
    let min_rel = plano
        .positions_on(fixture)?
        .map(|p| p.ui_x - fx)
        .reduce(f64::min);
    Ok(match min_rel {
        None => tol.leftmost_edge,
        Some(rel) => tol.leftmost_edge.max(rel - tol.leftmost_gap),
    })
}

/// Rank that sorts ahead of everything on `fixture`.
fn front_rank(plano: &Planogram, fixture: FixtureId) -> Result<f64, ModelError> {
    Ok(plano.min_rank(fixture)?.map_or(0.5, |r| r - 0.5))
}

/// Fixture at the position's height in `segment`, or why there is none.
fn target_for(
    plano: &Planogram,
    position: PositionId,
    segment: usize,
    tol: &ToleranceConfig,
) -> Result<Result<FixtureId, PlacementFailure>, ModelError> {
    if plano.segment(segment).is_none() {
        return Ok(Err(PlacementFailure::MissingSegment { segment }));
    }
    let y = plano.position(position)?.ui_y;
    Ok(plano
        .target_fixture(segment, y, tol.fixture_y_match)
        .ok_or(PlacementFailure::NoTargetFixture { segment, y }))
}

/// Move every facing of `position` to the leftmost slot of `segment`.
///
/// The item is recreated on the leftmost fixture at its height with a rank
/// ahead of everything there, and the original is removed. Returns the new
/// position. Records [`Decision::Relocated`].
pub fn relocate_whole_item(
    s: &mut Session<'_>,
    position: PositionId,
    segment: usize,
) -> Placement<PositionId> {
    let config = s.config;
    let tol = &config.tolerances;
    let target = match target_for(s.plano, position, segment, tol)? {
        Ok(f) => f,
        Err(failure) => return Ok(Err(failure)),
    };
    let offset = leftmost_available_offset(s.plano, target, tol)?;
    let rank = front_rank(s.plano, target)?;
    let upc = s.upc_of(position);

    let moved = s.plano.duplicate_position(position, target, offset, rank)?;
    s.plano.remove_position(position)?;
    s.settle()?;

    debug!(upc = %upc, segment, fixture = %target, offset, "relocated whole item");
    s.ctx.metrics.relocations += 1;
    s.ctx.log.record(Decision::Relocated {
        upc,
        from: position,
        to: moved,
        segment,
    });
    Ok(Ok(moved))
}

/// Keep `left` facings of `position` in place and move the rest to the
/// leftmost slot of `segment`.
///
/// After layout the kept part must end at or before
/// `boundary + split_verify`; otherwise the new position is removed, the
/// facing count restored, and [`PlacementFailure::SplitVerification`]
/// returned. Records [`Decision::Split`] or [`Decision::SplitReverted`].
pub fn split_facings(
    s: &mut Session<'_>,
    position: PositionId,
    segment: usize,
    left: u32,
    boundary: usize,
    at: f64,
) -> Placement<PositionId> {
    let config = s.config;
    let tol = &config.tolerances;
    let total = s.plano.position(position)?.facings.x;
    if left == 0 || left >= total {
        return Ok(Err(PlacementFailure::NoCandidate));
    }
    let target = match target_for(s.plano, position, segment, tol)? {
        Ok(f) => f,
        Err(failure) => return Ok(Err(failure)),
    };
    let offset = leftmost_available_offset(s.plano, target, tol)?;
    let rank = front_rank(s.plano, target)?;
    let limit = at + tol.split_verify;
    let upc = s.upc_of(position);
    let right = total - left;

    s.plano.set_facings(position, left)?;
    let moved = s.plano.duplicate_position(position, target, offset, rank)?;
    s.plano.set_facings(moved, right)?;
    s.settle()?;

    let right_edge = s.plano.position(position)?.right();
    if right_edge > limit {
        s.plano.remove_position(moved)?;
        s.plano.set_facings(position, total)?;
        s.settle()?;
        let failure = PlacementFailure::SplitVerification { right_edge, limit };
        debug!(upc = %upc, boundary, right_edge, limit, "split failed verification, reverted");
        s.ctx.metrics.splits_reverted += 1;
        s.ctx.log.record(Decision::SplitReverted {
            boundary,
            upc,
            failure: failure.clone(),
        });
        return Ok(Err(failure));
    }

    debug!(upc = %upc, boundary, left, right, "split facings");
    s.ctx.metrics.splits += 1;
    s.ctx.log.record(Decision::Split {
        boundary,
        upc,
        kept: position,
        moved,
        left_facings: left,
        right_facings: right,
    });
    Ok(Ok(moved))
}

// ── Inflation ──────────────────────────────────────────────────────

const FIT_SLACK: f64 = 1e-9;

/// Whether one more facing of `single_width` fits in the width left on
/// the position's own fixture at its shelf height.
pub(crate) fn fits_on_fixture(
    s: &Session<'_>,
    position: PositionId,
    single_width: f64,
) -> Result<bool, ReconcileError> {
    let p = s.plano.position(position)?;
    let room = s
        .plano
        .available_space(p.fixture, p.ui_y, s.config.tolerances.shelf_match)?;
    Ok(single_width <= room + FIT_SLACK)
}

/// Add one facing to `position` and recompute. Returns the previous count.
pub(crate) fn inflate(s: &mut Session<'_>, position: PositionId) -> Result<u32, ReconcileError> {
    let before = s.plano.position(position)?.facings.x;
    s.plano.set_facings(position, before + 1)?;
    s.settle()?;
    Ok(before)
}

/// Record a kept inflation.
pub(crate) fn commit_inflation(
    s: &mut Session<'_>,
    phase: InflationPhase,
    position: PositionId,
    reason: SelectionReason,
) -> Result<(), ReconcileError> {
    let facings = s.plano.position(position)?.facings.x;
    let upc = s.upc_of(position);
    debug!(upc = %upc, facings, ?phase, ?reason, "inflated");
    s.ctx.metrics.inflations_committed += 1;
    s.ctx.log.record(Decision::Inflated {
        phase,
        upc,
        position,
        facings,
        reason,
    });
    Ok(())
}

/// Restore `facings` on `position`, recompute, and record the revert.
pub(crate) fn revert_inflation(
    s: &mut Session<'_>,
    phase: InflationPhase,
    position: PositionId,
    facings: u32,
    cause: RevertCause,
) -> Result<(), ReconcileError> {
    s.plano.set_facings(position, facings)?;
    s.settle()?;
    let upc = s.upc_of(position);
    debug!(upc = %upc, facings, ?phase, ?cause, "inflation reverted");
    s.ctx.metrics.inflations_reverted += 1;
    s.ctx.log.record(Decision::InflationReverted {
        phase,
        upc,
        position,
        facings,
        cause,
    });
    Ok(())
}
