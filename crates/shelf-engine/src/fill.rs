//! Remaining-space fill in the last segment.

use shelf_core::{shelf_level, FixtureId, Position};
use tracing::{debug, info_span};

use crate::decision::{InflationPhase, RevertCause};
use crate::error::ReconcileError;
use crate::selection::{candidates, select_for_inflation};
use crate::session::Session;
use crate::strategy::{commit_inflation, inflate, revert_inflation};

/// How far any position on a same-height fixture of the last segment
/// reaches past its own fixture's right edge. Zero when nothing does.
fn worst_overflow(s: &Session<'_>, fixtures: &[FixtureId], y: f64) -> Result<f64, ReconcileError> {
    let within = s.config.tolerances.fixture_y_match;
    let mut worst = 0.0f64;
    for id in fixtures {
        let fixture = s.plano.fixture(*id)?;
        if (fixture.y - y).abs() >= within {
            continue;
        }
        let right = fixture.right();
        if let Some(max) = s.plano.positions_on(*id)?.map(Position::right).reduce(f64::max) {
            worst = worst.max(max - right);
        }
    }
    Ok(worst)
}

/// Fill leftover width on every fixture of the last segment.
///
/// Per fixture and shelf, the base donor policy runs against the fixture's
/// own width until the residual is under the fill threshold, nothing fits,
/// or the iteration cap is hit. An inflation that pushes any shelf at that
/// height past its fixture's right edge is reverted and ends that shelf.
pub fn fill_last_zone(s: &mut Session<'_>) -> Result<(), ReconcileError> {
    let Some(last) = s.last_segment() else {
        return Ok(());
    };
    let _span = info_span!("fill", segment = last).entered();
    let config = s.config;
    let tol = &config.tolerances;
    let fill = &config.fill;
    let fixtures = s.plano.fixtures_in_segment(last);

    for &fixture in &fixtures {
        let width = s.plano.fixture(fixture)?.width;
        let mut levels: Vec<i64> = s
            .plano
            .positions_on(fixture)?
            .map(|p| shelf_level(p.ui_y, tol.level_grouping))
            .collect();
        levels.sort_unstable_by(|a, b| b.cmp(a));
        levels.dedup();

        for level in levels {
            let y = level as f64 * tol.level_grouping;
            for _ in 0..fill.max_iterations {
                let shelf: Vec<&Position> = s
                    .plano
                    .positions_on(fixture)?
                    .filter(|p| (p.ui_y - y).abs() < tol.shelf_match)
                    .collect();
                if shelf.is_empty() {
                    break;
                }
                let used: f64 = shelf.iter().map(|p| p.width()).sum();
                let avail = width - used;
                if avail < fill.residual {
                    break;
                }
                let cands = candidates(s.plano, shelf)?;
                let Some(sel) = select_for_inflation(&cands, avail) else {
                    break;
                };

                let before_overflow = worst_overflow(s, &fixtures, y)?;
                let before = inflate(s, sel.position)?;
                let after_overflow = worst_overflow(s, &fixtures, y)?;
                if after_overflow > fill.overflow_tolerance && after_overflow > before_overflow {
                    revert_inflation(
                        s,
                        InflationPhase::Fill,
                        sel.position,
                        before,
                        RevertCause::FixtureOverflow,
                    )?;
                    break;
                }
                commit_inflation(s, InflationPhase::Fill, sel.position, sel.reason)?;
                s.ctx.metrics.fill_facings += 1;
            }
        }
    }
    debug!(facings = s.ctx.metrics.fill_facings, "fill complete");
    Ok(())
}
