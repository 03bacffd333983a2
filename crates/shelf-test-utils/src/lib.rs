//! Test utilities and mock hosts for Shelf development.
//!
//! Provides a [`PlanogramBuilder`] for laying out test bays (one fixture
//! per segment per shelf row), layout host wrappers in [`hosts`], and
//! geometry assertions shared by the engine's integration tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod hosts;

use std::collections::BTreeMap;

use shelf_core::{
    crosses_boundary, CombineMode, FixtureId, Planogram, PositionId, ProductId, RankLayout,
};

pub use hosts::{CountingHost, FailingHost};

/// Builder for bays of equal-width segments.
///
/// Each call to [`shelf`](PlanogramBuilder::shelf) adds one fixture per
/// segment at the given height, spanning exactly that segment. Products
/// get sequential twelve-digit UPCs. [`build`](PlanogramBuilder::build)
/// lays everything out with [`RankLayout`] and clears the dirty set.
pub struct PlanogramBuilder {
    plano: Planogram,
    segment_width: f64,
    segments: usize,
    rows: Vec<Vec<FixtureId>>,
    next_upc: u64,
}

impl PlanogramBuilder {
    pub fn new(segments: usize, segment_width: f64) -> Self {
        let mut plano = Planogram::new();
        for i in 0..segments {
            plano
                .add_segment(format!("S{i}"), i as f64 * segment_width, segment_width)
                .expect("segment");
        }
        Self {
            plano,
            segment_width,
            segments,
            rows: Vec::new(),
            next_upc: 1,
        }
    }

    /// Add a shelf row at height `y`. Returns the row index.
    pub fn shelf(&mut self, y: f64) -> usize {
        self.shelf_of_width(y, self.segment_width)
    }

    /// Add a shelf row whose fixtures start at each segment's left edge
    /// and are `width` wide. Returns the row index.
    pub fn shelf_of_width(&mut self, y: f64, width: f64) -> usize {
        let row = self.rows.len();
        let fixtures = (0..self.segments)
            .map(|i| {
                self.plano
                    .add_fixture(format!("R{row}S{i}"), i as f64 * self.segment_width, y, width)
                    .expect("fixture")
            })
            .collect();
        self.rows.push(fixtures);
        row
    }

    /// The fixture of `row` in `segment`.
    pub fn fixture(&self, row: usize, segment: usize) -> FixtureId {
        self.rows[row][segment]
    }

    /// Register a product with the next sequential UPC.
    pub fn product(&mut self, width: f64, movement: f64) -> ProductId {
        let upc = format!("{:012}", self.next_upc);
        self.next_upc += 1;
        self.plano
            .add_product(upc, width, movement)
            .expect("product")
    }

    /// Place an existing product at the right end of a fixture.
    pub fn place_product(
        &mut self,
        row: usize,
        segment: usize,
        product: ProductId,
        facings: u32,
    ) -> PositionId {
        let width = self.plano.product(product).expect("product").width;
        let fixture = self.fixture(row, segment);
        self.plano
            .add_position(product, fixture, facings, width)
            .expect("position")
    }

    /// Create a product and place it in one step.
    pub fn place(
        &mut self,
        row: usize,
        segment: usize,
        width: f64,
        facings: u32,
        movement: f64,
    ) -> PositionId {
        let product = self.product(width, movement);
        self.place_product(row, segment, product, facings)
    }

    /// Set a manual placement offset.
    pub fn offset(&mut self, position: PositionId, offset: f64) -> &mut Self {
        self.plano.set_offset(position, offset).expect("offset");
        self
    }

    /// Set the combine flag of one fixture.
    pub fn combine(&mut self, row: usize, segment: usize, mode: CombineMode) -> &mut Self {
        let fixture = self.fixture(row, segment);
        self.plano.set_can_combine(fixture, mode).expect("combine");
        self
    }

    /// Set a document descriptor.
    pub fn descriptor(&mut self, index: u16, value: &str) -> &mut Self {
        self.plano.set_descriptor(index, value);
        self
    }

    /// Direct access for edits the builder has no shortcut for.
    pub fn plano_mut(&mut self) -> &mut Planogram {
        &mut self.plano
    }

    /// Lay out every fixture and return the planogram.
    pub fn build(mut self) -> Planogram {
        RankLayout::new()
            .layout_all(&mut self.plano)
            .expect("initial layout");
        self.plano
    }
}

// ── Assertions ─────────────────────────────────────────────────────

/// Every `(boundary, position)` pair where the position spans the
/// boundary by more than `tolerance`.
pub fn crossing_positions(plano: &Planogram, tolerance: f64) -> Vec<(usize, PositionId)> {
    let mut out = Vec::new();
    for b in 0..plano.segment_count().saturating_sub(1) {
        let Some(at) = plano.boundary(b) else {
            continue;
        };
        for p in plano.positions() {
            if crosses_boundary(p.left(), p.right(), at, tolerance) {
                out.push((b, p.id));
            }
        }
    }
    out
}

/// Panics with the offending footprints if anything spans a boundary.
pub fn assert_no_crossings(plano: &Planogram, tolerance: f64) {
    let crossing = crossing_positions(plano, tolerance);
    if crossing.is_empty() {
        return;
    }
    let detail: Vec<String> = crossing
        .iter()
        .map(|(b, id)| {
            let p = plano.position(*id).expect("position");
            format!("boundary {b}: {id} [{:.4}, {:.4}]", p.left(), p.right())
        })
        .collect();
    panic!("positions still crossing: {}", detail.join("; "));
}

/// Total `x` facings per UPC across the whole planogram.
pub fn facings_by_upc(plano: &Planogram) -> BTreeMap<String, u32> {
    let mut out = BTreeMap::new();
    for p in plano.positions() {
        let upc = plano.product(p.product).expect("product").upc.clone();
        *out.entry(upc).or_insert(0) += p.facings.x;
    }
    out
}

/// How far the rightmost position on `fixture` reaches past its right
/// edge. Zero or negative when everything fits.
pub fn fixture_overflow(plano: &Planogram, fixture: FixtureId) -> f64 {
    let right = plano.fixture(fixture).expect("fixture").right();
    plano
        .positions_on(fixture)
        .expect("fixture")
        .map(|p| p.right() - right)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Fixtures whose positions at their own height are wider in total than
/// the fixture, with the excess.
pub fn overfilled_fixtures(plano: &Planogram, slack: f64) -> Vec<(FixtureId, f64)> {
    plano
        .fixtures()
        .filter_map(|f| {
            let room = plano.available_space(f.id, f.y, 0.01).expect("fixture");
            (room < -slack).then_some((f.id, -room))
        })
        .collect()
}

/// Index of the segment containing a position's left edge.
pub fn segment_of(plano: &Planogram, position: PositionId) -> Option<usize> {
    let p = plano.position(position).ok()?;
    plano.segment_index_at(p.left())
}
