//! Split-item detection and reconciliation.
//!
//! A product whose placements fall (by the membership rule) in exactly two
//! adjacent segments is a split item. If either side holds a single facing
//! the split is treated as unintentional, a "fell-back" split, and is
//! reconciled under the document's split policy:
//!
//! - [`SplitPolicy::Allow`] keeps the split and inflates a neighbour on the
//!   side with fewer facings.
//! - [`SplitPolicy::Prevent`] deletes the stray side and adds its facings
//!   to the product's placement on the other side.

use indexmap::IndexMap;
use shelf_core::{Planogram, PositionId, ProductId};
use smallvec::SmallVec;
use tracing::{debug, info, info_span};

use crate::config::{SplitPolicy, ToleranceConfig};
use crate::decision::{Decision, InflationPhase, RevertCause, SplitItemAction};
use crate::error::ReconcileError;
use crate::overlap::{converge_boundary, crossing_counts};
use crate::selection::{candidates, select_for_inflation};
use crate::session::Session;
use crate::strategy::{commit_inflation, inflate, revert_inflation};

/// A product placed in two adjacent segments.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitItem {
    /// The product.
    pub product: ProductId,
    /// Left segment index.
    pub left_segment: usize,
    /// Right segment index (`left_segment + 1`).
    pub right_segment: usize,
    /// Placements in the left segment, in discovery order.
    pub left_positions: SmallVec<[PositionId; 2]>,
    /// Placements in the right segment, in discovery order.
    pub right_positions: SmallVec<[PositionId; 2]>,
    /// Total facings in the left segment.
    pub left_facings: u32,
    /// Total facings in the right segment.
    pub right_facings: u32,
}

impl SplitItem {
    /// Whether one side holds exactly one facing.
    pub fn is_fell_back(&self) -> bool {
        self.left_facings == 1 || self.right_facings == 1
    }
}

/// Find every product split across two adjacent segments.
///
/// Pure: the planogram is not modified, and two calls with no mutation in
/// between return identical results. Products in more than two segments
/// are logged and skipped.
pub fn detect_split_items(plano: &Planogram, tol: &ToleranceConfig) -> Vec<SplitItem> {
    let mut by_product: IndexMap<ProductId, IndexMap<usize, SmallVec<[PositionId; 2]>>> =
        IndexMap::new();
    for pos in plano.positions() {
        if let Some(seg) = plano.segment_of_footprint(pos.left(), pos.right(), tol.membership_pct) {
            by_product
                .entry(pos.product)
                .or_default()
                .entry(seg)
                .or_default()
                .push(pos.id);
        }
    }

    let facings = |ids: &[PositionId]| -> u32 {
        ids.iter()
            .filter_map(|id| plano.position(*id).ok())
            .map(|p| p.facings.x)
            .sum()
    };

    let mut out = Vec::new();
    for (product, mut segments) in by_product {
        match segments.len() {
            2 => {}
            n if n > 2 => {
                debug!(product = %product, segments = n, "product in more than two segments");
                continue;
            }
            _ => continue,
        }
        segments.sort_keys();
        let mut it = segments.into_iter();
        let (Some((a, left)), Some((b, right))) = (it.next(), it.next()) else {
            continue;
        };
        if b != a + 1 {
            continue;
        }
        out.push(SplitItem {
            product,
            left_segment: a,
            right_segment: b,
            left_facings: facings(&left),
            right_facings: facings(&right),
            left_positions: left,
            right_positions: right,
        });
    }
    out
}

fn record(s: &mut Session<'_>, item: &SplitItem, action: SplitItemAction) {
    let upc = s.upc(item.product);
    debug!(upc = %upc, action = ?action, "split item");
    s.ctx.log.record(Decision::SplitItem {
        product: item.product,
        upc,
        left_segment: item.left_segment,
        right_segment: item.right_segment,
        left_facings: item.left_facings,
        right_facings: item.right_facings,
        action,
    });
}

/// Tidy the gap side of a split by inflating a neighbour there.
fn allow(s: &mut Session<'_>, item: &SplitItem) -> Result<(), ReconcileError> {
    let config = s.config;
    let tol = &config.tolerances;
    // Ties go to the right side.
    let gap = if item.left_facings < item.right_facings {
        &item.left_positions
    } else {
        &item.right_positions
    };
    let Some(first) = gap.iter().find(|id| s.plano.contains_position(**id)) else {
        record(s, item, SplitItemAction::NoDonor);
        return Ok(());
    };
    let (fixture, y) = {
        let p = s.plano.position(*first)?;
        (p.fixture, p.ui_y)
    };

    let available = s.plano.available_space(fixture, y, tol.shelf_match)?;
    if available < config.inflation.min_gap {
        record(s, item, SplitItemAction::NoSpace { available });
        return Ok(());
    }
    let shelf: Vec<_> = s
        .plano
        .positions_on(fixture)?
        .filter(|p| (p.ui_y - y).abs() < tol.shelf_match && p.product != item.product)
        .collect();
    let cands = candidates(s.plano, shelf)?;
    let Some(sel) = select_for_inflation(&cands, available) else {
        record(s, item, SplitItemAction::NoDonor);
        return Ok(());
    };

    let counts_before = crossing_counts(s.plano, tol);
    let before = inflate(s, sel.position)?;
    let counts_after = crossing_counts(s.plano, tol);
    let worsened = counts_after
        .iter()
        .zip(&counts_before)
        .position(|(now, was)| now > was);
    if let Some(boundary) = worsened {
        revert_inflation(
            s,
            InflationPhase::SplitAllow,
            sel.position,
            before,
            RevertCause::BoundaryCrossed { boundary },
        )?;
        record(s, item, SplitItemAction::Reverted);
        return Ok(());
    }
    commit_inflation(s, InflationPhase::SplitAllow, sel.position, sel.reason)?;
    s.ctx.metrics.split_items_allowed += 1;
    record(
        s,
        item,
        SplitItemAction::DonorInflated {
            donor: sel.position,
            reason: sel.reason,
        },
    );
    Ok(())
}

/// Fold the single-facing side back into the other side.
fn prevent(s: &mut Session<'_>, item: &SplitItem) -> Result<(), ReconcileError> {
    let (stray, keep, receiving) = if item.left_facings == 1 {
        (&item.left_positions, &item.right_positions, item.right_segment)
    } else {
        (&item.right_positions, &item.left_positions, item.left_segment)
    };
    let Some(&into) = keep.iter().find(|id| s.plano.contains_position(**id)) else {
        record(s, item, SplitItemAction::NoReceiver);
        return Ok(());
    };

    let mut moved = 0u32;
    for id in stray {
        if s.plano.contains_position(*id) {
            moved += s.plano.remove_position(*id)?.facings.x;
        }
    }
    let current = s.plano.position(into)?.facings.x;
    s.plano.set_facings(into, current + moved)?;
    s.settle()?;

    if receiving > 0 {
        converge_boundary(s, receiving - 1)?;
    }
    if receiving + 1 < s.plano.segment_count() {
        converge_boundary(s, receiving)?;
    }
    s.ctx.metrics.split_items_prevented += 1;
    record(
        s,
        item,
        SplitItemAction::Merged {
            facings: moved,
            into,
        },
    );
    Ok(())
}

/// Detect fell-back splits and reconcile each under the run's split policy.
pub fn reconcile_split_items(s: &mut Session<'_>) -> Result<(), ReconcileError> {
    let _span = info_span!("split_items").entered();
    let config = s.config;
    let (policy, _) = s.ctx.split_policy(s.plano, config.split_policy);
    let items: Vec<SplitItem> = detect_split_items(s.plano, &config.tolerances)
        .into_iter()
        .filter(SplitItem::is_fell_back)
        .collect();

    for item in &items {
        match policy {
            SplitPolicy::Allow => allow(s, item)?,
            SplitPolicy::Prevent => prevent(s, item)?,
        }
    }
    info!(
        fell_back = items.len(),
        ?policy,
        allowed = s.ctx.metrics.split_items_allowed,
        prevented = s.ctx.metrics.split_items_prevented,
        "split items reconciled"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcileConfig;
    use shelf_core::{FixtureId, RankLayout};

    /// Segments 0..4 of one metre, one fixture each at y=1.0.
    fn bays(n: usize) -> (Planogram, Vec<FixtureId>) {
        let mut p = Planogram::new();
        let mut f = Vec::new();
        for i in 0..n {
            p.add_segment(format!("S{i}"), i as f64, 1.0).unwrap();
            let id = p.add_fixture(format!("F{i}"), i as f64, 1.0, 1.0).unwrap();
            p.set_can_combine(id, shelf_core::CombineMode::No).unwrap();
            f.push(id);
        }
        (p, f)
    }

    #[test]
    fn detects_only_adjacent_two_segment_products() {
        let (mut p, f) = bays(4);
        let split = p.add_product("S", 0.1, 1.0).unwrap();
        let far = p.add_product("F", 0.1, 1.0).unwrap();
        let wide = p.add_product("W", 0.1, 1.0).unwrap();
        p.add_position(split, f[0], 1, 0.1).unwrap();
        p.add_position(split, f[1], 4, 0.1).unwrap();
        p.add_position(far, f[0], 1, 0.1).unwrap();
        p.add_position(far, f[2], 1, 0.1).unwrap();
        for fx in &f[..3] {
            p.add_position(wide, *fx, 1, 0.1).unwrap();
        }
        RankLayout::new().layout_all(&mut p).unwrap();

        let items = detect_split_items(&p, &ToleranceConfig::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product, split);
        assert_eq!((items[0].left_facings, items[0].right_facings), (1, 4));
        assert!(items[0].is_fell_back());
        assert_eq!(items, detect_split_items(&p, &ToleranceConfig::default()));
    }

    #[test]
    fn prevent_merges_stray_facing() {
        let (mut p, f) = bays(5);
        let prod = p.add_product("P", 0.1, 1.0).unwrap();
        let stray = p.add_position(prod, f[3], 1, 0.1).unwrap();
        let main = p.add_position(prod, f[4], 4, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig {
            split_policy: Some(SplitPolicy::Prevent),
            ..Default::default()
        };
        let mut s = Session::new(&mut p, &mut host, &cfg);
        reconcile_split_items(&mut s).unwrap();
        assert!(!s.plano.contains_position(stray));
        assert_eq!(s.plano.position(main).unwrap().facings.x, 5);
        assert_eq!(s.plano.positions_of_product(prod).count(), 1);
        assert_eq!(s.ctx.metrics.split_items_prevented, 1);
    }

    #[test]
    fn allow_inflates_donor_on_gap_side() {
        let (mut p, f) = bays(5);
        let prod = p.add_product("P", 0.1, 1.0).unwrap();
        let donor = p.add_product("D", 0.1, 2.0).unwrap();
        let pd = p.add_position(donor, f[3], 1, 0.1).unwrap();
        let stray = p.add_position(prod, f[3], 1, 0.1).unwrap();
        let main = p.add_position(prod, f[4], 4, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig {
            split_policy: Some(SplitPolicy::Allow),
            ..Default::default()
        };
        let mut s = Session::new(&mut p, &mut host, &cfg);
        reconcile_split_items(&mut s).unwrap();
        assert_eq!(s.plano.position(pd).unwrap().facings.x, 2);
        assert_eq!(s.plano.position(stray).unwrap().facings.x, 1);
        assert_eq!(s.plano.position(main).unwrap().facings.x, 4);
        assert_eq!(s.ctx.metrics.split_items_allowed, 1);
    }

    #[test]
    fn allow_without_space_records_no_space() {
        let (mut p, f) = bays(2);
        let prod = p.add_product("P", 0.1, 1.0).unwrap();
        let filler = p.add_product("X", 0.88, 1.0).unwrap();
        p.add_position(filler, f[0], 1, 0.88).unwrap();
        p.add_position(prod, f[0], 1, 0.1).unwrap();
        p.add_position(prod, f[1], 3, 0.1).unwrap();
        let mut host = RankLayout::new();
        host.layout_all(&mut p).unwrap();

        let cfg = ReconcileConfig {
            split_policy: Some(SplitPolicy::Allow),
            ..Default::default()
        };
        let mut s = Session::new(&mut p, &mut host, &cfg);
        reconcile_split_items(&mut s).unwrap();
        assert!(matches!(
            s.ctx.log.entries().last(),
            Some(Decision::SplitItem {
                action: SplitItemAction::NoSpace { .. },
                ..
            })
        ));
    }
}
