//! Cross-zone facing inflation across the last two segments.
//!
//! Per shelf level, phase 1 greedily inflates the lowest-DOS item of the
//! earlier segment while the later segment still has room to absorb the
//! push, and phase 2 does the same inside the later segment. Items that
//! already hold enough stock (DOS at or above the cutoff) are left alone.

use shelf_core::{shelf_level, Planogram, Position, PositionId, Segment};
use tracing::{debug, info_span};

use crate::decision::InflationPhase;
use crate::error::ReconcileError;
use crate::overlap::{converge_boundary, resolve_crossing};
use crate::selection::{candidates, lowest_dos, SelectionReason};
use crate::session::Session;
use crate::strategy::{commit_inflation, fits_on_fixture, inflate};

/// Positions at shelf height `y` whose left edge lies in `seg`.
fn level_items<'p>(plano: &'p Planogram, seg: &Segment, y: f64, within: f64) -> Vec<&'p Position> {
    plano
        .positions()
        .filter(|p| (p.ui_y - y).abs() < within && seg.contains_x(p.ui_x))
        .collect()
}

/// Free width between the rightmost item at this level and the segment's
/// right edge.
fn free_width(items: &[&Position], seg: &Segment) -> f64 {
    let rightmost = items
        .iter()
        .map(|p| p.right())
        .reduce(f64::max)
        .unwrap_or(seg.left);
    seg.right() - rightmost
}

/// Positions at this level anchored on an earlier-segment fixture that now
/// reach past the segment's right edge.
fn overflowing(s: &Session<'_>, seg: &Segment, y: f64) -> Vec<PositionId> {
    let within = s.config.tolerances.level_match;
    s.plano
        .positions()
        .filter(|p| (p.ui_y - y).abs() < within && p.right() > seg.right())
        .filter(|p| {
            s.plano
                .fixture(p.fixture)
                .is_ok_and(|f| seg.contains_x(f.x))
        })
        .map(|p| p.id)
        .collect()
}

/// Inflate items in the last two segments, shelf level by shelf level.
///
/// Does nothing with fewer than two segments.
pub fn inflate_last_two_zones(s: &mut Session<'_>) -> Result<(), ReconcileError> {
    let n = s.plano.segment_count();
    if n < 2 {
        return Ok(());
    }
    let _span = info_span!("cross_zone").entered();
    let config = s.config;
    let tol = &config.tolerances;
    let inf = &config.inflation;
    let boundary = n - 2;
    let (Some(earlier), Some(later)) = (
        s.plano.segment(n - 2).cloned(),
        s.plano.segment(n - 1).cloned(),
    ) else {
        return Ok(());
    };

    let mut levels: Vec<i64> = s
        .plano
        .positions()
        .map(|p| shelf_level(p.ui_y, tol.level_grouping))
        .collect();
    levels.sort_unstable_by(|a, b| b.cmp(a));
    levels.dedup();

    for level in levels {
        let y = level as f64 * tol.level_grouping;
        let mut count = 0u32;

        // ── Phase 1: earlier segment ───────────────────────────────
        for _ in 0..inf.phase1_cap {
            if count >= inf.per_shelf_cap {
                break;
            }
            let items = level_items(s.plano, &earlier, y, tol.level_match);
            if items.is_empty() {
                break;
            }
            let later_items = level_items(s.plano, &later, y, tol.level_match);
            let avail = free_width(&later_items, &later);
            if avail < inf.min_gap {
                debug!(y, avail, "later zone full");
                break;
            }
            let cands = candidates(s.plano, items.iter().copied())?;
            let Some((pick, dos)) = lowest_dos(&cands) else {
                break;
            };
            let w = pick.single_width;
            if dos >= inf.dos_cutoff || w > avail - inf.width_margin || avail < inf.preflight {
                debug!(y, dos, avail, "phase 1 stopped");
                break;
            }
            let mid = earlier.midpoint();
            let right_half: f64 = items
                .iter()
                .filter(|p| p.ui_x >= mid)
                .map(|p| p.width())
                .sum();
            let has_right_half = items.iter().any(|p| p.ui_x >= mid);
            if has_right_half && w + inf.cascade_factor * right_half > avail - inf.cascade_margin {
                debug!(y, right_half, avail, "phase 1 cascade risk");
                break;
            }

            let target = pick.position;
            if !fits_on_fixture(s, target, w)? {
                debug!(y, "phase 1 donor fixture full");
                break;
            }
            inflate(s, target)?;
            commit_inflation(
                s,
                InflationPhase::CrossZoneEarlier,
                target,
                SelectionReason::LowestDos(dos),
            )?;
            count += 1;
            s.ctx.metrics.cross_zone_facings += 1;

            let over = overflowing(s, &earlier, y);
            for id in &over {
                if s.plano.contains_position(*id) {
                    resolve_crossing(s, *id, boundary, 0)?;
                }
            }
            if !over.is_empty() {
                converge_boundary(s, boundary)?;
            }
        }

        // ── Phase 2: later segment ─────────────────────────────────
        for _ in 0..inf.phase2_cap {
            if count >= inf.per_shelf_cap {
                break;
            }
            let items = level_items(s.plano, &later, y, tol.level_match);
            if items.is_empty() {
                break;
            }
            let avail = free_width(&items, &later);
            if avail < inf.min_gap {
                break;
            }
            let cands = candidates(s.plano, items.iter().copied())?;
            let Some((pick, dos)) = lowest_dos(&cands) else {
                break;
            };
            if dos >= inf.dos_cutoff || pick.single_width > avail - inf.width_margin {
                debug!(y, dos, avail, "phase 2 stopped");
                break;
            }
            let target = pick.position;
            if !fits_on_fixture(s, target, pick.single_width)? {
                debug!(y, "phase 2 donor fixture full");
                break;
            }
            inflate(s, target)?;
            commit_inflation(
                s,
                InflationPhase::CrossZoneLater,
                target,
                SelectionReason::LowestDos(dos),
            )?;
            count += 1;
            s.ctx.metrics.cross_zone_facings += 1;
        }

        if count > 0 {
            debug!(y, count, "cross-zone facings added");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcileConfig;
    use shelf_core::{CombineMode, FixtureId, RankLayout};

    fn two_zones() -> (Planogram, FixtureId, FixtureId) {
        zones_with_fixture_width(1.0)
    }

    /// Two 1m segments whose fixtures are `width` wide.
    fn zones_with_fixture_width(width: f64) -> (Planogram, FixtureId, FixtureId) {
        let mut p = Planogram::new();
        p.add_segment("S0", 0.0, 1.0).unwrap();
        p.add_segment("S1", 1.0, 1.0).unwrap();
        let f0 = p.add_fixture("F0", 0.0, 1.0, width).unwrap();
        let f1 = p.add_fixture("F1", 1.0, 1.0, width).unwrap();
        p.set_can_combine(f0, CombineMode::No).unwrap();
        (p, f0, f1)
    }

    #[test]
    fn low_dos_items_gain_facings_until_cutoff() {
        let (mut p, f0, f1) = two_zones();
        // movement 7 → DOS = facings.
        let a = p.add_product("A", 0.1, 7.0).unwrap();
        let b = p.add_product("B", 0.1, 7.0).unwrap();
        let pa = p.add_position(a, f0, 1, 0.1).unwrap();
        let pb = p.add_position(b, f1, 1, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        inflate_last_two_zones(&mut s).unwrap();
        // DOS 1, 2, 3 inflate; 4 >= 3.5 stops.
        assert_eq!(s.plano.position(pa).unwrap().facings.x, 4);
        assert_eq!(s.plano.position(pb).unwrap().facings.x, 4);
        assert_eq!(s.ctx.metrics.cross_zone_facings, 6);
    }

    #[test]
    fn full_later_zone_blocks_phase_one() {
        let (mut p, f0, f1) = two_zones();
        let a = p.add_product("A", 0.1, 7.0).unwrap();
        let big = p.add_product("B", 0.9, 0.0).unwrap();
        let pa = p.add_position(a, f0, 1, 0.1).unwrap();
        p.add_position(big, f1, 1, 0.9).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        inflate_last_two_zones(&mut s).unwrap();
        // 0.1m free in the later zone is under the 0.15m preflight.
        assert_eq!(s.plano.position(pa).unwrap().facings.x, 1);
        assert_eq!(s.ctx.metrics.cross_zone_facings, 0);
    }

    #[test]
    fn inflation_stops_at_donor_fixture_capacity() {
        let (mut p, f0, f1) = zones_with_fixture_width(0.3);
        let a = p.add_product("A", 0.1, 7.0).unwrap();
        let b = p.add_product("B", 0.1, 7.0).unwrap();
        let pa = p.add_position(a, f0, 1, 0.1).unwrap();
        let pb = p.add_position(b, f1, 2, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        inflate_last_two_zones(&mut s).unwrap();
        // Both segments keep 0.7m free, but each 0.3m fixture is full.
        assert_eq!(s.plano.position(pa).unwrap().facings.x, 3);
        assert_eq!(s.plano.position(pb).unwrap().facings.x, 3);
        assert_eq!(s.ctx.metrics.cross_zone_facings, 3);
        for f in [f0, f1] {
            let space = s.plano.available_space(f, 1.0, 0.01).unwrap();
            assert!(space >= -1e-9, "fixture {f} over capacity by {}", -space);
        }
    }

    #[test]
    fn single_segment_is_a_no_op() {
        let mut p = Planogram::new();
        p.add_segment("S0", 0.0, 1.0).unwrap();
        let mut host = RankLayout::new();
        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        inflate_last_two_zones(&mut s).unwrap();
        assert!(s.ctx.log.is_empty());
    }
}
