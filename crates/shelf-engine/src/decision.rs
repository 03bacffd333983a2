//! Structured record of every choice the engine makes during a run.
//!
//! Logging goes to `tracing`; the decision log is the machine-readable
//! counterpart that callers and tests inspect after the run.

use shelf_core::{PositionId, ProductId};

use crate::scenario::Scenario;
use crate::selection::SelectionReason;
use crate::strategy::PlacementFailure;

/// Which pass performed an inflation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InflationPhase {
    /// Displacement rescue at a boundary.
    Rescue,
    /// Cross-zone inflation, earlier of the last two segments.
    CrossZoneEarlier,
    /// Cross-zone inflation, last segment.
    CrossZoneLater,
    /// Remaining-space fill in the last segment.
    Fill,
    /// Donor inflation for an allowed split item.
    SplitAllow,
}

/// Why an inflation was undone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevertCause {
    /// Something crossed the given boundary afterwards.
    BoundaryCrossed {
        /// Boundary index.
        boundary: usize,
    },
    /// The shelf's right end passed the fixture edge.
    FixtureOverflow,
}

/// How a displaced product was dealt with.
#[derive(Clone, Debug, PartialEq)]
pub enum RescueMethod {
    /// A neighbour to its left gained a facing.
    Inflation {
        /// The inflated neighbour.
        donor: PositionId,
        /// The neighbour's UPC.
        donor_upc: String,
    },
    /// The product was moved to the leftmost slot of a segment.
    Relocation {
        /// Destination segment index.
        segment: usize,
        /// The new position.
        position: PositionId,
    },
}

/// Outcome for one fell-back split item.
#[derive(Clone, Debug, PartialEq)]
pub enum SplitItemAction {
    /// A donor on the gap side gained a facing.
    DonorInflated {
        /// The inflated donor.
        donor: PositionId,
        /// Why it was chosen.
        reason: SelectionReason,
    },
    /// The gap shelf had less free width than required.
    NoSpace {
        /// Free width found.
        available: f64,
    },
    /// No donor fit.
    NoDonor,
    /// The donor inflation made something cross a boundary and was undone.
    Reverted,
    /// Stray placements were removed and their facings folded into `into`.
    Merged {
        /// Facings moved.
        facings: u32,
        /// The receiving position.
        into: PositionId,
    },
    /// Nothing was left to receive the stray facings.
    NoReceiver,
}

/// One engine decision.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// A segment's fixtures were set to not combine.
    ZoneLocked {
        /// Segment index.
        segment: usize,
        /// Fixtures locked.
        fixtures: usize,
    },
    /// A crossing position was classified and handed to the dispatcher.
    OverlapDetected {
        /// Boundary index.
        boundary: usize,
        /// Detection round, from zero.
        round: u32,
        /// The crossing position.
        position: PositionId,
        /// Its UPC.
        upc: String,
        /// The classification.
        scenario: Scenario,
    },
    /// Facings were split across a boundary.
    Split {
        /// Boundary index.
        boundary: usize,
        /// The product's UPC.
        upc: String,
        /// The original, now holding the left facings.
        kept: PositionId,
        /// The new position in the next segment.
        moved: PositionId,
        /// Facings kept left.
        left_facings: u32,
        /// Facings moved right.
        right_facings: u32,
    },
    /// A split was attempted and undone.
    SplitReverted {
        /// Boundary index.
        boundary: usize,
        /// The product's UPC.
        upc: String,
        /// Why it failed.
        failure: PlacementFailure,
    },
    /// A whole item moved to the leftmost slot of a segment.
    Relocated {
        /// The product's UPC.
        upc: String,
        /// The removed position.
        from: PositionId,
        /// The new position.
        to: PositionId,
        /// Destination segment index.
        segment: usize,
    },
    /// A relocation could not be placed.
    RelocationFailed {
        /// The product's UPC.
        upc: String,
        /// The position that stayed put.
        position: PositionId,
        /// Why it failed.
        failure: PlacementFailure,
    },
    /// A position gained one facing and kept it.
    Inflated {
        /// Which pass.
        phase: InflationPhase,
        /// The product's UPC.
        upc: String,
        /// The inflated position.
        position: PositionId,
        /// Facings after inflation.
        facings: u32,
        /// Why it was chosen.
        reason: SelectionReason,
    },
    /// A position's extra facing was taken back.
    InflationReverted {
        /// Which pass.
        phase: InflationPhase,
        /// The product's UPC.
        upc: String,
        /// The position.
        position: PositionId,
        /// Facings restored.
        facings: u32,
        /// Why.
        cause: RevertCause,
    },
    /// A product ended up outside the segment it started in.
    Displaced {
        /// Boundary index being processed.
        boundary: usize,
        /// The product.
        product: ProductId,
        /// Its UPC.
        upc: String,
        /// Original segment.
        from_segment: usize,
        /// Current segment.
        to_segment: usize,
    },
    /// A displaced product was handled.
    Rescued {
        /// Boundary index.
        boundary: usize,
        /// The product's UPC.
        upc: String,
        /// How.
        method: RescueMethod,
    },
    /// A displaced product could not be handled.
    RescueAbandoned {
        /// Boundary index.
        boundary: usize,
        /// The product's UPC.
        upc: String,
        /// Why.
        failure: PlacementFailure,
    },
    /// A fell-back split item was processed.
    SplitItem {
        /// The product.
        product: ProductId,
        /// Its UPC.
        upc: String,
        /// Left segment index.
        left_segment: usize,
        /// Right segment index.
        right_segment: usize,
        /// Facings in the left segment at detection.
        left_facings: u32,
        /// Facings in the right segment at detection.
        right_facings: u32,
        /// What was done.
        action: SplitItemAction,
    },
}

/// Append-only list of [`Decision`]s in the order they were made.
#[derive(Clone, Debug, Default)]
pub struct DecisionLog {
    entries: Vec<Decision>,
}

impl DecisionLog {
    /// Append a decision.
    pub fn record(&mut self, decision: Decision) {
        self.entries.push(decision);
    }

    /// All decisions in order.
    pub fn entries(&self) -> &[Decision] {
        &self.entries
    }

    /// Iterate decisions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Decision> {
        self.entries.iter()
    }

    /// Number of recorded decisions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count decisions matching `pred`.
    pub fn count(&self, pred: impl Fn(&Decision) -> bool) -> usize {
        self.entries.iter().filter(|&d| pred(d)).count()
    }
}

impl<'a> IntoIterator for &'a DecisionLog {
    type Item = &'a Decision;
    type IntoIter = std::slice::Iter<'a, Decision>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_preserves_order_and_counts() {
        let mut log = DecisionLog::default();
        assert!(log.is_empty());
        log.record(Decision::ZoneLocked {
            segment: 0,
            fixtures: 3,
        });
        log.record(Decision::ZoneLocked {
            segment: 1,
            fixtures: 2,
        });
        log.record(Decision::Displaced {
            boundary: 0,
            product: ProductId(1),
            upc: "1".into(),
            from_segment: 1,
            to_segment: 0,
        });
        assert_eq!(log.len(), 3);
        assert_eq!(
            log.count(|d| matches!(d, Decision::ZoneLocked { .. })),
            2
        );
        assert!(matches!(
            log.entries()[1],
            Decision::ZoneLocked { segment: 1, .. }
        ));
        assert_eq!((&log).into_iter().count(), 3);
    }
}
