//! Donor selection for facing inflation, and the cascade overflow test.
//!
//! The base policy ([`select_for_inflation`]) prefers the lowest finite
//! days-of-supply and falls back to the narrowest product; a selection is
//! only made if one more facing fits the available width. The tiered
//! variant ([`select_tiered`]) additionally rejects any donor whose extra
//! facing would push the shelf past a boundary.

use std::cmp::Ordering;

use shelf_core::{ModelError, Planogram, Position, PositionId};

/// One position considered for inflation.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// The position that would gain a facing.
    pub position: PositionId,
    /// Days of supply; `None` when not applicable.
    pub dos: Option<f64>,
    /// Width one more facing adds.
    pub single_width: f64,
    /// Nominal product width, used for the narrowest-product fallback.
    pub product_width: f64,
    /// Current side-by-side facings.
    pub facings: u32,
    /// Left edge of the current footprint.
    pub left: f64,
    /// Right edge of the current footprint.
    pub right: f64,
}

impl Candidate {
    /// Build a candidate from a placed position.
    pub fn from_position(plano: &Planogram, pos: &Position) -> Result<Self, ModelError> {
        let product = plano.product(pos.product)?;
        Ok(Self {
            position: pos.id,
            dos: pos.days_of_supply(product),
            single_width: pos.merch_width,
            product_width: product.width,
            facings: pos.facings.x,
            left: pos.left(),
            right: pos.right(),
        })
    }
}

/// Build candidates for `positions`, preserving order.
pub fn candidates<'a>(
    plano: &Planogram,
    positions: impl IntoIterator<Item = &'a Position>,
) -> Result<Vec<Candidate>, ModelError> {
    positions
        .into_iter()
        .map(|p| Candidate::from_position(plano, p))
        .collect()
}

/// Why a donor was chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionReason {
    /// Lowest finite days of supply (the value).
    LowestDos(f64),
    /// Second-lowest finite days of supply (the value).
    SecondLowestDos(f64),
    /// Narrowest product (its nominal width).
    SmallestWidth(f64),
}

/// A chosen donor.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    /// The position to inflate.
    pub position: PositionId,
    /// Why it was chosen.
    pub reason: SelectionReason,
    /// Width the extra facing adds.
    pub single_width: f64,
}

fn by_dos(cands: &[Candidate]) -> Vec<(&Candidate, f64)> {
    let mut out: Vec<(&Candidate, f64)> = cands
        .iter()
        .filter_map(|c| c.dos.map(|d| (c, d)))
        .collect();
    // Stable: ties keep discovery order.
    out.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    out
}

/// Candidate with the lowest finite days of supply, first on ties.
pub fn lowest_dos(cands: &[Candidate]) -> Option<(&Candidate, f64)> {
    by_dos(cands).first().copied()
}

/// Candidate with the narrowest product, first on ties.
pub fn narrowest(cands: &[Candidate]) -> Option<&Candidate> {
    cands.iter().min_by(|a, b| {
        a.product_width
            .partial_cmp(&b.product_width)
            .unwrap_or(Ordering::Equal)
    })
}

fn pick(c: &Candidate, reason: SelectionReason) -> Selection {
    Selection {
        position: c.position,
        reason,
        single_width: c.single_width,
    }
}

/// Choose a donor whose extra facing fits in `available`.
///
/// 1. If any candidate has a finite DOS, take the lowest; choose it if
///    one facing fits.
/// 2. Otherwise, or if it did not fit, take the narrowest product;
///    choose it if one facing fits.
/// 3. Else nothing. Callers must not mutate on `None`.
pub fn select_for_inflation(cands: &[Candidate], available: f64) -> Option<Selection> {
    if let Some((lowest, dos)) = by_dos(cands).first() {
        if lowest.single_width <= available {
            return Some(pick(lowest, SelectionReason::LowestDos(*dos)));
        }
    }
    let smallest = narrowest(cands)?;
    (smallest.single_width <= available)
        .then(|| pick(smallest, SelectionReason::SmallestWidth(smallest.product_width)))
}

/// Whether one more facing on `cand` would push the shelf's right end past
/// `boundary + tolerance`.
///
/// `shelf` holds every position on the same fixture and shelf, including
/// `cand`. If `cand` is left of the rightmost item, that item is pushed
/// right by one facing width; otherwise `cand` itself grows.
pub fn cascade_overflows(cand: &Candidate, shelf: &[Candidate], boundary: f64, tolerance: f64) -> bool {
    let Some(rightmost) = shelf.iter().max_by(|a, b| {
        a.left
            .partial_cmp(&b.left)
            .unwrap_or(Ordering::Equal)
    }) else {
        return false;
    };
    let projected = if cand.left < rightmost.left {
        rightmost.right + cand.single_width
    } else {
        cand.left + f64::from(cand.facings + 1) * cand.single_width
    };
    projected > boundary + tolerance
}

/// Tiered donor choice used where a boundary must be protected: lowest
/// DOS, second-lowest DOS, then narrowest product. Each tier must fit in
/// `available` and pass [`cascade_overflows`].
pub fn select_tiered(
    cands: &[Candidate],
    shelf: &[Candidate],
    available: f64,
    boundary: f64,
    tolerance: f64,
) -> Option<Selection> {
    let ok = |c: &Candidate| {
        c.single_width <= available && !cascade_overflows(c, shelf, boundary, tolerance)
    };
    let ranked = by_dos(cands);
    if let Some(&(c, dos)) = ranked.first() {
        if ok(c) {
            return Some(pick(c, SelectionReason::LowestDos(dos)));
        }
    }
    if let Some(&(c, dos)) = ranked.get(1) {
        if ok(c) {
            return Some(pick(c, SelectionReason::SecondLowestDos(dos)));
        }
    }
    let smallest = narrowest(cands)?;
    ok(smallest).then(|| pick(smallest, SelectionReason::SmallestWidth(smallest.product_width)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: u32, dos: Option<f64>, single: f64, product: f64) -> Candidate {
        Candidate {
            position: PositionId(id),
            dos,
            single_width: single,
            product_width: product,
            facings: 1,
            left: 0.0,
            right: single,
        }
    }

    #[test]
    fn lowest_dos_wins_when_it_fits() {
        let cands = vec![
            cand(0, Some(5.0), 0.05, 0.05),
            cand(1, Some(2.0), 0.08, 0.08),
            cand(2, None, 0.02, 0.02),
        ];
        let sel = select_for_inflation(&cands, 0.10).unwrap();
        assert_eq!(sel.position, PositionId(1));
        assert_eq!(sel.reason, SelectionReason::LowestDos(2.0));
    }

    #[test]
    fn falls_back_to_narrowest_when_lowest_dos_does_not_fit() {
        let cands = vec![cand(0, Some(1.0), 0.12, 0.12), cand(1, None, 0.04, 0.04)];
        let sel = select_for_inflation(&cands, 0.05).unwrap();
        assert_eq!(sel.position, PositionId(1));
        assert_eq!(sel.reason, SelectionReason::SmallestWidth(0.04));
    }

    #[test]
    fn residual_smaller_than_any_facing_selects_nothing() {
        let cands = vec![cand(0, Some(1.0), 0.06, 0.06), cand(1, None, 0.07, 0.07)];
        assert_eq!(select_for_inflation(&cands, 0.05), None);
        assert_eq!(select_for_inflation(&[], 1.0), None);
    }

    #[test]
    fn narrowest_tie_keeps_first() {
        let cands = vec![cand(4, None, 0.05, 0.05), cand(5, None, 0.05, 0.05)];
        assert_eq!(
            select_for_inflation(&cands, 0.1).unwrap().position,
            PositionId(4)
        );
    }

    #[test]
    fn lowest_dos_ignores_missing_values_and_keeps_first_tie() {
        let cands = vec![
            cand(0, None, 0.05, 0.05),
            cand(1, Some(2.0), 0.05, 0.05),
            cand(2, Some(2.0), 0.05, 0.05),
        ];
        let (c, dos) = lowest_dos(&cands).unwrap();
        assert_eq!(c.position, PositionId(1));
        assert_eq!(dos, 2.0);
        assert!(lowest_dos(&cands[..1]).is_none());
    }

    #[test]
    fn cascade_projects_rightmost_item_when_donor_is_left_of_it() {
        let mut donor = cand(0, Some(1.0), 0.10, 0.10);
        donor.left = 0.50;
        donor.right = 0.60;
        let mut last = cand(1, None, 0.10, 0.10);
        last.left = 0.85;
        last.right = 0.95;
        let shelf = vec![donor.clone(), last];
        // 0.95 + 0.10 = 1.05 > 1.005
        assert!(cascade_overflows(&donor, &shelf, 1.0, 0.005));
        assert!(!cascade_overflows(&donor, &shelf, 1.1, 0.005));
    }

    #[test]
    fn cascade_projects_donor_itself_when_rightmost() {
        let mut donor = cand(0, Some(1.0), 0.10, 0.10);
        donor.left = 0.70;
        donor.right = 0.90;
        donor.facings = 2;
        let shelf = vec![donor.clone()];
        // 0.70 + 3 * 0.10 = 1.00 <= 1.005
        assert!(!cascade_overflows(&donor, &shelf, 1.0, 0.005));
        donor.left = 0.72;
        let shelf = vec![donor.clone()];
        assert!(cascade_overflows(&donor, &shelf, 1.0, 0.005));
    }

    #[test]
    fn tiered_skips_cascading_lowest_dos() {
        let mut a = cand(0, Some(1.0), 0.10, 0.10);
        a.left = 0.80;
        a.right = 0.90;
        let mut b = cand(1, Some(2.0), 0.04, 0.04);
        b.left = 0.10;
        b.right = 0.14;
        let shelf = vec![b.clone(), a.clone()];
        // a is rightmost: 0.80 + 2 * 0.10 = 1.0 passes at boundary 1.0.
        let sel = select_tiered(&[a.clone(), b.clone()], &shelf, 0.2, 1.0, 0.005).unwrap();
        assert_eq!(sel.position, PositionId(0));
        // At boundary 0.95 a cascades; b pushes a: 0.90 + 0.04 = 0.94 passes.
        let sel = select_tiered(&[a, b], &shelf, 0.2, 0.95, 0.005).unwrap();
        assert_eq!(sel.position, PositionId(1));
        assert_eq!(sel.reason, SelectionReason::SecondLowestDos(2.0));
    }

    #[test]
    fn tiered_returns_none_when_everything_cascades() {
        let mut a = cand(0, Some(1.0), 0.10, 0.10);
        a.left = 0.85;
        a.right = 0.95;
        let shelf = vec![a.clone()];
        assert_eq!(select_tiered(&[a], &shelf, 0.5, 1.0, 0.005), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_candidate() -> impl Strategy<Value = Candidate> {
            (
                0u32..1000,
                proptest::option::of(0.1f64..20.0),
                0.01f64..0.3,
                0.01f64..0.3,
            )
                .prop_map(|(id, dos, single, product)| cand(id, dos, single, product))
        }

        proptest! {
            #[test]
            fn selection_always_fits(
                cands in proptest::collection::vec(arb_candidate(), 0..12),
                available in 0.0f64..0.4,
            ) {
                if let Some(sel) = select_for_inflation(&cands, available) {
                    prop_assert!(sel.single_width <= available);
                    prop_assert!(cands.iter().any(|c| c.position == sel.position));
                }
            }

            #[test]
            fn fitting_lowest_dos_is_always_chosen(
                cands in proptest::collection::vec(arb_candidate(), 1..12),
            ) {
                let sel = select_for_inflation(&cands, 1.0).unwrap();
                let min_dos = cands.iter().filter_map(|c| c.dos).fold(f64::INFINITY, f64::min);
                if min_dos.is_finite() {
                    prop_assert_eq!(sel.reason, SelectionReason::LowestDos(min_dos));
                }
            }
        }
    }
}
