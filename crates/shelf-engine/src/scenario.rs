//! Classifies a boundary-crossing position into a resolution scenario.

use shelf_core::Position;

use crate::config::ToleranceConfig;

/// How a crossing position should be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// Some whole facings fit left of the boundary: keep `left` there and
    /// move `right` into the next segment.
    SplitFacings {
        /// Facings that stay left of the boundary.
        left: u32,
        /// Facings moved into the next segment.
        right: u32,
    },
    /// At least the attachment percentage lies left of the boundary.
    FiftyPercentLeft,
    /// Less than the attachment percentage lies left of the boundary.
    MinorityLeft,
}

/// Result of [`classify`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    /// The scenario to dispatch on.
    pub scenario: Scenario,
    /// Share of the footprint left of the boundary, 0–100.
    pub percentage_left: f64,
    /// Whole facings that fit left of the boundary (multi-facing items only).
    pub facings_left: Option<u32>,
}

/// Share of `pos` lying left of `boundary`, as a percentage.
pub fn percentage_left(pos: &Position, boundary: f64) -> f64 {
    let width = pos.width();
    if width <= 0.0 {
        return 0.0;
    }
    (boundary - pos.left()).max(0.0) / width * 100.0
}

/// Whole facings of `pos` that fit before `boundary` minus the boundary
/// tolerance. Zero if the item starts past that point.
pub fn facings_fitting_left(pos: &Position, boundary: f64, tol: &ToleranceConfig) -> u32 {
    if pos.merch_width <= 0.0 {
        return 0;
    }
    let room = boundary - tol.boundary - pos.left();
    let fit = (room / pos.merch_width + tol.split_epsilon).floor();
    if fit <= 0.0 {
        0
    } else {
        fit.min(f64::from(u32::MAX)) as u32
    }
}

/// Classify a position crossing `boundary`.
///
/// Multi-facing items where at least one but not all facings fit on the
/// left classify as [`Scenario::SplitFacings`]. Everything else is
/// classified by the share of its width left of the boundary.
pub fn classify(pos: &Position, boundary: f64, tol: &ToleranceConfig) -> Classification {
    let pct = percentage_left(pos, boundary);
    let facings = pos.facings.x;
    let facings_left = (facings >= 2).then(|| facings_fitting_left(pos, boundary, tol));

    let scenario = match facings_left {
        Some(left) if left >= 1 && left < facings => Scenario::SplitFacings {
            left,
            right: facings - left,
        },
        _ if pct >= tol.attachment_pct => Scenario::FiftyPercentLeft,
        _ => Scenario::MinorityLeft,
    };
    Classification {
        scenario,
        percentage_left: pct,
        facings_left,
    }
}
