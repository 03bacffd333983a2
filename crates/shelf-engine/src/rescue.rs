//! Displacement rescue.
//!
//! After a boundary converges, products that ended up in a different
//! segment than they started in are handled one at a time. Before a
//! non-terminal zone the narrowest neighbour to the product's left gains a
//! facing; if that makes anything cross the boundary it is undone and the
//! product is moved back into its original segment. Before the last zone
//! the tiered donor choice (lowest DOS, second-lowest DOS, narrowest) with
//! the cascade test is used instead, falling back to relocation into the
//! last segment. A product with nothing to its left is left where it is.

use shelf_core::{crosses_boundary, shelf_level, Position, PositionId};
use tracing::{debug, warn};

use crate::decision::{Decision, InflationPhase, RescueMethod, RevertCause};
use crate::error::ReconcileError;
use crate::overlap::{crossings, resolve_crossing};
use crate::selection::{candidates, narrowest, select_tiered, SelectionReason};
use crate::session::Session;
use crate::snapshot::Displacement;
use crate::strategy::{
    commit_inflation, fits_on_fixture, inflate, relocate_whole_item, revert_inflation,
    PlacementFailure,
};

/// Current placement of a displaced product: one in its new segment if
/// there is one, otherwise any.
fn locate(s: &Session<'_>, d: &Displacement) -> Option<PositionId> {
    let tol = &s.config.tolerances;
    let matching: Vec<&Position> = s
        .plano
        .positions_of_product(d.key.product)
        .filter(|p| {
            d.key
                .level
                .is_none_or(|level| shelf_level(p.ui_y, tol.snapshot_grouping) == level)
        })
        .collect();
    matching
        .iter()
        .find(|p| {
            s.plano
                .segment_of_footprint(p.left(), p.right(), tol.membership_pct)
                == Some(d.to.segment)
        })
        .or_else(|| matching.first())
        .map(|p| p.id)
}

/// Positions on the same fixture and shelf, left of `x`, sorted by X.
fn left_neighbours(s: &Session<'_>, pos: &Position) -> Result<Vec<PositionId>, ReconcileError> {
    let tol = &s.config.tolerances;
    let mut out: Vec<&Position> = s
        .plano
        .positions_on(pos.fixture)?
        .filter(|p| (p.ui_y - pos.ui_y).abs() < tol.shelf_match && p.ui_x < pos.ui_x)
        .collect();
    out.sort_by(|a, b| a.ui_x.total_cmp(&b.ui_x));
    Ok(out.into_iter().map(|p| p.id).collect())
}

/// Move the product to `segment` and record the outcome as a rescue.
fn rescue_by_relocation(
    s: &mut Session<'_>,
    boundary: usize,
    position: PositionId,
    segment: usize,
    upc: String,
) -> Result<(), ReconcileError> {
    match relocate_whole_item(s, position, segment)? {
        Ok(moved) => {
            s.ctx.metrics.rescues_by_relocation += 1;
            s.ctx.log.record(Decision::Rescued {
                boundary,
                upc,
                method: RescueMethod::Relocation {
                    segment,
                    position: moved,
                },
            });
        }
        Err(failure) => abandon(s, boundary, upc, failure),
    }
    Ok(())
}

fn abandon(s: &mut Session<'_>, boundary: usize, upc: String, failure: PlacementFailure) {
    warn!(upc = %upc, boundary, %failure, "displaced product left in place");
    s.ctx.log.record(Decision::RescueAbandoned {
        boundary,
        upc,
        failure,
    });
}

fn record_inflation_rescue(
    s: &mut Session<'_>,
    boundary: usize,
    upc: String,
    donor: PositionId,
) {
    let donor_upc = s.upc_of(donor);
    s.ctx.metrics.rescues_by_inflation += 1;
    s.ctx.log.record(Decision::Rescued {
        boundary,
        upc,
        method: RescueMethod::Inflation { donor, donor_upc },
    });
}

/// Dispatch the displaced product if the inflation pushed it over the
/// boundary.
fn post_check(
    s: &mut Session<'_>,
    boundary: usize,
    at: f64,
    displaced: PositionId,
) -> Result<(), ReconcileError> {
    let tol = s.config.tolerances.boundary;
    let crossing = s
        .plano
        .position(displaced)
        .map(|p| crosses_boundary(p.left(), p.right(), at, tol))
        .unwrap_or(false);
    if crossing {
        resolve_crossing(s, displaced, boundary, 0)?;
    }
    Ok(())
}

/// Handle every displacement found at boundary `boundary`.
pub fn rescue_displaced(
    s: &mut Session<'_>,
    boundary: usize,
    displaced: &[Displacement],
) -> Result<(), ReconcileError> {
    let Some(at) = s.plano.boundary(boundary) else {
        return Ok(());
    };
    let config = s.config;
    let tol = &config.tolerances;
    let terminal = s.last_segment() == Some(boundary + 1);

    for d in displaced {
        let upc = s.upc(d.key.product);
        let Some(id) = locate(s, d) else {
            warn!(upc = %upc, boundary, "displaced product has no placement, skipped");
            continue;
        };
        let pos = s.plano.position(id)?.clone();
        let lefts = left_neighbours(s, &pos)?;

        if lefts.is_empty() {
            abandon(s, boundary, upc, PlacementFailure::NoCandidate);
            continue;
        }

        let left_positions: Vec<&Position> = lefts
            .iter()
            .map(|l| s.plano.position(*l))
            .collect::<Result<_, _>>()?;
        let cands = candidates(s.plano, left_positions)?;

        if !terminal {
            let Some(donor) = narrowest(&cands).cloned() else {
                continue;
            };
            if !fits_on_fixture(s, donor.position, donor.single_width)? {
                debug!(upc = %upc, donor = %donor.position, "narrowest neighbour does not fit, relocating");
                rescue_by_relocation(s, boundary, id, d.from.segment, upc)?;
                continue;
            }
            let before = inflate(s, donor.position)?;
            if !crossings(s.plano, at, tol).is_empty() {
                revert_inflation(
                    s,
                    InflationPhase::Rescue,
                    donor.position,
                    before,
                    RevertCause::BoundaryCrossed { boundary },
                )?;
                rescue_by_relocation(s, boundary, id, d.from.segment, upc)?;
                continue;
            }
            commit_inflation(
                s,
                InflationPhase::Rescue,
                donor.position,
                SelectionReason::SmallestWidth(donor.product_width),
            )?;
            record_inflation_rescue(s, boundary, upc, donor.position);
            post_check(s, boundary, at, id)?;
            continue;
        }

        let available = s.plano.available_space(pos.fixture, pos.ui_y, tol.shelf_match)?;
        let shelf_positions: Vec<&Position> = s
            .plano
            .positions_on(pos.fixture)?
            .filter(|p| (p.ui_y - pos.ui_y).abs() < tol.shelf_match)
            .collect();
        let shelf = candidates(s.plano, shelf_positions)?;
        match select_tiered(&cands, &shelf, available, at, tol.boundary) {
            Some(sel) => {
                inflate(s, sel.position)?;
                commit_inflation(s, InflationPhase::Rescue, sel.position, sel.reason)?;
                record_inflation_rescue(s, boundary, upc, sel.position);
                post_check(s, boundary, at, id)?;
            }
            None => {
                debug!(upc = %upc, "no donor passes the cascade test, relocating");
                rescue_by_relocation(s, boundary, id, boundary + 1, upc)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReconcileConfig, SnapshotKey};
    use crate::snapshot::{ProductKey, ZoneRecord};
    use shelf_core::{Planogram, ProductId, RankLayout};

    fn record(segment: usize) -> ZoneRecord {
        ZoneRecord {
            segment,
            shelf: 0,
            shelf_y: 1.0,
        }
    }

    fn displacement(product: ProductId, from: usize, to: usize) -> Displacement {
        Displacement {
            key: ProductKey {
                product,
                level: None,
            },
            from: record(from),
            to: record(to),
        }
    }

    #[test]
    fn standard_rescue_inflates_narrowest_left_neighbour() {
        let mut p = Planogram::new();
        for i in 0..3 {
            p.add_segment(format!("S{i}"), i as f64, 1.0).unwrap();
        }
        let f1 = p.add_fixture("F1", 1.0, 1.0, 1.0).unwrap();
        let wide = p.add_product("W", 0.2, 1.0).unwrap();
        let thin = p.add_product("T", 0.1, 1.0).unwrap();
        let moved = p.add_product("M", 0.1, 1.0).unwrap();
        p.add_position(wide, f1, 1, 0.2).unwrap();
        let pt = p.add_position(thin, f1, 1, 0.1).unwrap();
        p.add_position(moved, f1, 1, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        rescue_displaced(&mut s, 0, &[displacement(moved, 0, 1)]).unwrap();
        assert_eq!(s.plano.position(pt).unwrap().facings.x, 2);
        assert_eq!(s.ctx.metrics.rescues_by_inflation, 1);
        match &s.ctx.log.entries().last() {
            Some(Decision::Rescued {
                method: RescueMethod::Inflation { donor_upc, .. },
                ..
            }) => assert_eq!(donor_upc, "T"),
            other => panic!("expected inflation rescue, got {other:?}"),
        }
    }

    #[test]
    fn standard_rescue_reverts_when_boundary_is_crossed() {
        let mut p = Planogram::new();
        for i in 0..3 {
            p.add_segment(format!("S{i}"), i as f64, 1.0).unwrap();
        }
        // F0 runs on into segment 1, so T has room on its own fixture.
        let f0 = p.add_fixture("F0", 0.0, 1.0, 2.0).unwrap();
        let f1 = p.add_fixture("F1", 1.0, 1.0, 1.0).unwrap();
        let thin = p.add_product("T", 0.25, 1.0).unwrap();
        let moved = p.add_product("M", 0.1, 1.0).unwrap();
        let filler = p.add_product("F", 0.38, 1.0).unwrap();
        let pt = p.add_position(thin, f0, 2, 0.25).unwrap();
        p.add_position(moved, f0, 1, 0.1).unwrap();
        p.add_position(filler, f0, 1, 0.38).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();
        // T 0.0..0.5, M 0.5..0.6, F 0.6..0.98. One more T facing pushes F
        // to 0.85..1.23, across the boundary.

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        rescue_displaced(&mut s, 0, &[displacement(moved, 1, 0)]).unwrap();
        assert_eq!(s.plano.position(pt).unwrap().facings.x, 2);
        assert_eq!(s.ctx.metrics.inflations_reverted, 1);
        assert_eq!(s.ctx.metrics.rescues_by_relocation, 1);
        let placed: Vec<_> = s.plano.positions_of_product(moved).collect();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].fixture, f1);
        assert!(crossings(s.plano, 1.0, &cfg.tolerances).is_empty());
    }

    #[test]
    fn standard_rescue_never_overfills_the_donor_fixture() {
        let mut p = Planogram::new();
        for i in 0..3 {
            p.add_segment(format!("S{i}"), i as f64, 1.0).unwrap();
        }
        let f0 = p.add_fixture("F0", 0.0, 1.0, 1.0).unwrap();
        let f1 = p.add_fixture("F1", 1.0, 1.0, 0.3).unwrap();
        let donor = p.add_product("A", 0.1, 1.0).unwrap();
        let moved = p.add_product("M", 0.1, 1.0).unwrap();
        let pa = p.add_position(donor, f1, 2, 0.1).unwrap();
        p.add_position(moved, f1, 1, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        rescue_displaced(&mut s, 0, &[displacement(moved, 0, 1)]).unwrap();
        // A's third facing would not fit the 0.3m fixture.
        assert_eq!(s.plano.position(pa).unwrap().facings.x, 2);
        assert_eq!(s.ctx.metrics.rescues_by_inflation, 0);
        assert!(s.plano.available_space(f1, 1.0, 0.01).unwrap() >= -1e-9);
        let placed: Vec<_> = s.plano.positions_of_product(moved).collect();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].fixture, f0);
        assert!(matches!(
            s.ctx.log.entries().last(),
            Some(Decision::Rescued {
                method: RescueMethod::Relocation { segment: 0, .. },
                ..
            })
        ));
    }

    #[test]
    fn rescue_without_left_neighbours_leaves_product_in_place() {
        let mut p = Planogram::new();
        for i in 0..3 {
            p.add_segment(format!("S{i}"), i as f64, 1.0).unwrap();
        }
        p.add_fixture("F0", 0.0, 1.0, 1.0).unwrap();
        let f1 = p.add_fixture("F1", 1.0, 1.0, 1.0).unwrap();
        let moved = p.add_product("M", 0.1, 1.0).unwrap();
        let pm = p.add_position(moved, f1, 1, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        rescue_displaced(&mut s, 0, &[displacement(moved, 0, 1)]).unwrap();
        assert_eq!(s.plano.position(pm).unwrap().fixture, f1);
        assert_eq!(s.ctx.metrics.rescues_by_relocation, 0);
        match s.ctx.log.entries() {
            [Decision::RescueAbandoned {
                failure: PlacementFailure::NoCandidate,
                ..
            }] => {}
            other => panic!("expected one RescueAbandoned, got {other:?}"),
        }
    }

    #[test]
    fn terminal_rescue_uses_lowest_dos_donor() {
        let mut p = Planogram::new();
        p.add_segment("S0", 0.0, 1.0).unwrap();
        p.add_segment("S1", 1.0, 1.0).unwrap();
        let f0 = p.add_fixture("F0", 0.0, 1.0, 1.0).unwrap();
        let fast = p.add_product("A", 0.1, 10.0).unwrap();
        let slow = p.add_product("B", 0.1, 1.0).unwrap();
        let moved = p.add_product("M", 0.1, 1.0).unwrap();
        p.add_position(slow, f0, 1, 0.1).unwrap();
        let pa = p.add_position(fast, f0, 1, 0.1).unwrap();
        p.add_position(moved, f0, 1, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        rescue_displaced(&mut s, 0, &[displacement(moved, 1, 0)]).unwrap();
        assert_eq!(s.plano.position(pa).unwrap().facings.x, 2);
        assert!(s.ctx.log.iter().any(|d| matches!(
            d,
            Decision::Inflated {
                phase: InflationPhase::Rescue,
                reason: SelectionReason::LowestDos(_),
                ..
            }
        )));
    }

    #[test]
    fn terminal_rescue_without_room_relocates_into_last_zone() {
        let mut p = Planogram::new();
        p.add_segment("S0", 0.0, 1.0).unwrap();
        p.add_segment("S1", 1.0, 1.0).unwrap();
        let f0 = p.add_fixture("F0", 0.0, 1.0, 1.0).unwrap();
        let f1 = p.add_fixture("F1", 1.0, 1.0, 1.0).unwrap();
        let wide = p.add_product("W", 0.4, 1.0).unwrap();
        let moved = p.add_product("M", 0.55, 1.0).unwrap();
        p.add_position(wide, f0, 1, 0.4).unwrap();
        p.add_position(moved, f0, 1, 0.55).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig::default();
        let mut s = Session::new(&mut p, &mut host, &cfg);
        rescue_displaced(&mut s, 0, &[displacement(moved, 1, 0)]).unwrap();
        let placed: Vec<_> = s.plano.positions_of_product(moved).collect();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].fixture, f1);
        assert_eq!(s.ctx.metrics.rescues_by_relocation, 1);
    }

    #[test]
    fn product_without_placement_is_skipped() {
        let mut p = Planogram::new();
        p.add_segment("S0", 0.0, 1.0).unwrap();
        p.add_segment("S1", 1.0, 1.0).unwrap();
        let gone = p.add_product("G", 0.1, 1.0).unwrap();
        let mut host = RankLayout::new();
        let cfg = ReconcileConfig {
            snapshot_key: SnapshotKey::Product,
            ..Default::default()
        };
        let mut s = Session::new(&mut p, &mut host, &cfg);
        rescue_displaced(&mut s, 0, &[displacement(gone, 0, 1)]).unwrap();
        assert!(s.ctx.log.is_empty());
    }
}
