//! The planogram arena: entities by stable ID plus the indices the engine
//! queries on every pass.
//!
//! Segments are kept sorted by left edge. Fixtures, products and positions
//! live in insertion-ordered maps so that iteration ("discovery order") is
//! deterministic. The `fixture → positions` index is updated on every
//! structural mutation, and every mutation that can change derived geometry
//! marks the affected fixture dirty for the next
//! [`LayoutHost::recompute`](crate::LayoutHost::recompute).

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::error::ModelError;
use crate::geometry::overlap_percentage;
use crate::id::{FixtureId, PositionId, ProductId, SegmentId};
use crate::model::{CombineMode, Facings, Fixture, MerchDirection, Position, Product, Segment};

/// Document descriptor that carries the split-item policy (`yes` / `no`).
pub const SPLIT_POLICY_DESCRIPTOR: u16 = 13;

/// Segment-edge slack when checking new segments for overlap.
const SEGMENT_EPSILON: f64 = 1e-9;

fn check_length(what: &'static str, value: f64) -> Result<f64, ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ModelError::InvalidDimension { what, value })
    }
}

fn check_coordinate(what: &'static str, value: f64) -> Result<f64, ModelError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::InvalidDimension { what, value })
    }
}

/// Root aggregate owning every segment, fixture, product and position.
#[derive(Clone, Debug, Default)]
pub struct Planogram {
    segments: Vec<Segment>,
    fixtures: IndexMap<FixtureId, Fixture>,
    products: IndexMap<ProductId, Product>,
    positions: IndexMap<PositionId, Position>,
    fixture_positions: IndexMap<FixtureId, SmallVec<[PositionId; 8]>>,
    descriptors: IndexMap<u16, String>,
    dirty: IndexSet<FixtureId>,
    next_segment: u32,
    next_fixture: u32,
    next_product: u32,
    next_position: u32,
}

impl Planogram {
    /// Create an empty planogram.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ───────────────────────────────────────────────

    /// Add a segment covering `[left, left + width)`.
    ///
    /// Segments are kept ordered by left edge; a segment overlapping an
    /// existing one is rejected.
    pub fn add_segment(
        &mut self,
        name: impl Into<String>,
        left: f64,
        width: f64,
    ) -> Result<SegmentId, ModelError> {
        let left = check_coordinate("segment left", left)?;
        let width = check_length("segment width", width)?;
        let right = left + width;
        let overlaps = self
            .segments
            .iter()
            .any(|s| left < s.right() - SEGMENT_EPSILON && s.left < right - SEGMENT_EPSILON);
        if overlaps {
            return Err(ModelError::OverlappingSegment { left, right });
        }
        let id = SegmentId(self.next_segment);
        self.next_segment += 1;
        let at = self.segments.partition_point(|s| s.left < left);
        self.segments.insert(
            at,
            Segment {
                id,
                name: name.into(),
                left,
                width,
            },
        );
        Ok(id)
    }

    /// Add a left-to-right fixture with an unset combine flag.
    pub fn add_fixture(
        &mut self,
        name: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
    ) -> Result<FixtureId, ModelError> {
        let x = check_coordinate("fixture x", x)?;
        let y = check_coordinate("fixture y", y)?;
        let width = check_length("fixture width", width)?;
        let id = FixtureId(self.next_fixture);
        self.next_fixture += 1;
        self.fixtures.insert(
            id,
            Fixture {
                id,
                name: name.into(),
                x,
                y,
                width,
                depth: 0.0,
                can_combine: CombineMode::Unset,
                direction: MerchDirection::LeftToRight,
            },
        );
        self.fixture_positions.insert(id, SmallVec::new());
        Ok(id)
    }

    /// Add a product record. Description is empty, casepack is one.
    pub fn add_product(
        &mut self,
        upc: impl Into<String>,
        width: f64,
        movement: f64,
    ) -> Result<ProductId, ModelError> {
        let width = check_length("product width", width)?;
        let movement = check_coordinate("product movement", movement)?;
        let id = ProductId(self.next_product);
        self.next_product += 1;
        self.products.insert(
            id,
            Product {
                id,
                upc: upc.into(),
                description: String::new(),
                width,
                movement,
                casepack: 1,
                category: None,
            },
        );
        Ok(id)
    }

    /// Mutable access to a product's descriptive fields.
    ///
    /// Products carry no derived geometry, so edits never dirty a fixture.
    pub fn product_mut(&mut self, id: ProductId) -> Result<&mut Product, ModelError> {
        self.products
            .get_mut(&id)
            .ok_or(ModelError::UnknownProduct(id))
    }

    /// Place `facings` of `product` on `fixture`, after every existing
    /// position (rank one above the current maximum).
    ///
    /// The new position's X is provisional until the next recompute.
    pub fn add_position(
        &mut self,
        product: ProductId,
        fixture: FixtureId,
        facings: u32,
        merch_width: f64,
    ) -> Result<PositionId, ModelError> {
        if !self.products.contains_key(&product) {
            return Err(ModelError::UnknownProduct(product));
        }
        if facings == 0 {
            return Err(ModelError::InvalidFacings {
                position: None,
                requested: 0,
            });
        }
        let merch_width = check_length("merch width", merch_width)?;
        let rank = self.max_rank(fixture)?.map_or(1.0, |r| r + 1.0);
        let id = self.insert_position(product, fixture, Facings::wide(facings), merch_width)?;
        if let Some(pos) = self.positions.get_mut(&id) {
            pos.rank = rank;
        }
        Ok(id)
    }

    fn insert_position(
        &mut self,
        product: ProductId,
        fixture: FixtureId,
        facings: Facings,
        merch_width: f64,
    ) -> Result<PositionId, ModelError> {
        let (fx, fy) = {
            let f = self.fixture(fixture)?;
            (f.x, f.y)
        };
        let id = PositionId(self.next_position);
        self.next_position += 1;
        self.positions.insert(
            id,
            Position {
                id,
                product,
                fixture,
                facings,
                merch_width,
                rank: 1.0,
                offset: 0.0,
                ui_x: fx,
                ui_y: fy,
            },
        );
        self.fixture_positions
            .entry(fixture)
            .or_default()
            .push(id);
        self.dirty.insert(fixture);
        Ok(id)
    }

    // ── Descriptors ────────────────────────────────────────────────

    /// Read a numbered document descriptor.
    pub fn descriptor(&self, index: u16) -> Option<&str> {
        self.descriptors.get(&index).map(String::as_str)
    }

    /// Set a numbered document descriptor.
    pub fn set_descriptor(&mut self, index: u16, value: impl Into<String>) {
        self.descriptors.insert(index, value.into());
    }

    // ── Lookup ─────────────────────────────────────────────────────

    /// Segments in ascending X order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment by index (0 = leftmost).
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Boundary between segment `index` and `index + 1`: the right edge of
    /// segment `index`. `None` if either segment is missing.
    pub fn boundary(&self, index: usize) -> Option<f64> {
        if index + 1 < self.segments.len() {
            Some(self.segments[index].right())
        } else {
            None
        }
    }

    /// Fixture by ID.
    pub fn fixture(&self, id: FixtureId) -> Result<&Fixture, ModelError> {
        self.fixtures.get(&id).ok_or(ModelError::UnknownFixture(id))
    }

    /// All fixtures in insertion order.
    pub fn fixtures(&self) -> impl Iterator<Item = &Fixture> + '_ {
        self.fixtures.values()
    }

    /// Product by ID.
    pub fn product(&self, id: ProductId) -> Result<&Product, ModelError> {
        self.products.get(&id).ok_or(ModelError::UnknownProduct(id))
    }

    /// All products in insertion order.
    pub fn products(&self) -> impl Iterator<Item = &Product> + '_ {
        self.products.values()
    }

    /// Position by ID.
    pub fn position(&self, id: PositionId) -> Result<&Position, ModelError> {
        self.positions
            .get(&id)
            .ok_or(ModelError::UnknownPosition(id))
    }

    /// Whether a position with this ID is still placed.
    pub fn contains_position(&self, id: PositionId) -> bool {
        self.positions.contains_key(&id)
    }

    /// All positions in discovery (arena) order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> + '_ {
        self.positions.values()
    }

    /// Number of placed positions.
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Positions on `fixture`, in the order they were attached.
    pub fn positions_on(
        &self,
        fixture: FixtureId,
    ) -> Result<impl Iterator<Item = &Position> + '_, ModelError> {
        let ids = self
            .fixture_positions
            .get(&fixture)
            .ok_or(ModelError::UnknownFixture(fixture))?;
        Ok(ids.iter().filter_map(move |id| self.positions.get(id)))
    }

    /// Positions on `fixture` sorted by rank (ties broken by ID).
    pub fn positions_by_rank(&self, fixture: FixtureId) -> Result<Vec<&Position>, ModelError> {
        let mut out: Vec<&Position> = self.positions_on(fixture)?.collect();
        out.sort_by(|a, b| a.rank.total_cmp(&b.rank).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    /// Every placement of `product`, in discovery order.
    pub fn positions_of_product(&self, product: ProductId) -> impl Iterator<Item = &Position> + '_ {
        self.positions.values().filter(move |p| p.product == product)
    }

    fn max_rank(&self, fixture: FixtureId) -> Result<Option<f64>, ModelError> {
        Ok(self.positions_on(fixture)?.map(|p| p.rank).reduce(f64::max))
    }

    /// Lowest rank on `fixture`, or `None` when it holds no positions.
    pub fn min_rank(&self, fixture: FixtureId) -> Result<Option<f64>, ModelError> {
        Ok(self.positions_on(fixture)?.map(|p| p.rank).reduce(f64::min))
    }

    // ── Geometry queries ───────────────────────────────────────────

    /// Index of the segment whose `[left, right)` range contains `x`.
    pub fn segment_index_at(&self, x: f64) -> Option<usize> {
        self.segments.iter().position(|s| s.contains_x(x))
    }

    /// Index of the segment the fixture belongs to (by its left edge).
    pub fn fixture_segment(&self, fixture: FixtureId) -> Result<Option<usize>, ModelError> {
        Ok(self.segment_index_at(self.fixture(fixture)?.x))
    }

    /// Fixtures whose left edge lies in segment `index`, sorted by X then ID.
    pub fn fixtures_in_segment(&self, index: usize) -> Vec<FixtureId> {
        let Some(seg) = self.segments.get(index) else {
            return Vec::new();
        };
        let mut out: Vec<&Fixture> = self
            .fixtures
            .values()
            .filter(|f| seg.contains_x(f.x))
            .collect();
        out.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.id.cmp(&b.id)));
        out.into_iter().map(|f| f.id).collect()
    }

    /// Leftmost fixture in segment `index` whose Y is within `tolerance` of `y`.
    pub fn target_fixture(&self, index: usize, y: f64, tolerance: f64) -> Option<FixtureId> {
        self.fixtures_in_segment(index)
            .into_iter()
            .find(|id| {
                self.fixtures
                    .get(id)
                    .is_some_and(|f| (f.y - y).abs() < tolerance)
            })
    }

    /// `fixture.width - Σ footprint widths` over positions on `fixture`
    /// whose Y is within `tolerance` of `y`. Negative means overflow.
    pub fn available_space(
        &self,
        fixture: FixtureId,
        y: f64,
        tolerance: f64,
    ) -> Result<f64, ModelError> {
        let width = self.fixture(fixture)?.width;
        let used: f64 = self
            .positions_on(fixture)?
            .filter(|p| (p.ui_y - y).abs() < tolerance)
            .map(Position::width)
            .sum();
        Ok(width - used)
    }

    /// First segment holding at least `threshold` percent of `[left, right)`.
    pub fn segment_of_footprint(&self, left: f64, right: f64, threshold: f64) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| overlap_percentage(left, right, s.left, s.right()) >= threshold)
    }

    /// Segment a position belongs to under the membership rule, if any.
    pub fn segment_of_position(
        &self,
        id: PositionId,
        threshold: f64,
    ) -> Result<Option<usize>, ModelError> {
        let pos = self.position(id)?;
        Ok(self.segment_of_footprint(pos.left(), pos.right(), threshold))
    }

    // ── Mutation ───────────────────────────────────────────────────

    fn position_mut(&mut self, id: PositionId) -> Result<&mut Position, ModelError> {
        self.positions
            .get_mut(&id)
            .ok_or(ModelError::UnknownPosition(id))
    }

    /// Set the side-by-side facing count. Zero is rejected.
    pub fn set_facings(&mut self, id: PositionId, facings: u32) -> Result<(), ModelError> {
        if facings == 0 {
            return Err(ModelError::InvalidFacings {
                position: Some(id),
                requested: 0,
            });
        }
        let pos = self.position_mut(id)?;
        pos.facings.x = facings;
        let fixture = pos.fixture;
        self.dirty.insert(fixture);
        Ok(())
    }

    /// Create a copy of `source` on `fixture` with the same product, facings
    /// and single-facing width, at the given offset and rank.
    pub fn duplicate_position(
        &mut self,
        source: PositionId,
        fixture: FixtureId,
        offset: f64,
        rank: f64,
    ) -> Result<PositionId, ModelError> {
        let (product, facings, merch_width) = {
            let src = self.position(source)?;
            (src.product, src.facings, src.merch_width)
        };
        let id = self.insert_position(product, fixture, facings, merch_width)?;
        let pos = self.position_mut(id)?;
        pos.offset = offset;
        pos.rank = rank;
        Ok(id)
    }

    /// Remove a position from the planogram. Its ID is never reused.
    pub fn remove_position(&mut self, id: PositionId) -> Result<Position, ModelError> {
        let pos = self
            .positions
            .shift_remove(&id)
            .ok_or(ModelError::UnknownPosition(id))?;
        if let Some(ids) = self.fixture_positions.get_mut(&pos.fixture) {
            ids.retain(|p| *p != id);
        }
        self.dirty.insert(pos.fixture);
        Ok(pos)
    }

    /// Set a position's rank.
    pub fn set_rank(&mut self, id: PositionId, rank: f64) -> Result<(), ModelError> {
        let pos = self.position_mut(id)?;
        pos.rank = rank;
        let fixture = pos.fixture;
        self.dirty.insert(fixture);
        Ok(())
    }

    /// Set a position's manual placement offset.
    pub fn set_offset(&mut self, id: PositionId, offset: f64) -> Result<(), ModelError> {
        let offset = check_coordinate("position offset", offset)?;
        let pos = self.position_mut(id)?;
        pos.offset = offset;
        let fixture = pos.fixture;
        self.dirty.insert(fixture);
        Ok(())
    }

    /// Set a fixture's combine flag.
    pub fn set_can_combine(&mut self, id: FixtureId, mode: CombineMode) -> Result<(), ModelError> {
        let fixture = self
            .fixtures
            .get_mut(&id)
            .ok_or(ModelError::UnknownFixture(id))?;
        if fixture.can_combine != mode {
            fixture.can_combine = mode;
            self.dirty.insert(id);
        }
        Ok(())
    }

    /// Set a fixture's merchandising direction. Returns whether it changed.
    pub fn set_direction(
        &mut self,
        id: FixtureId,
        direction: MerchDirection,
    ) -> Result<bool, ModelError> {
        let fixture = self
            .fixtures
            .get_mut(&id)
            .ok_or(ModelError::UnknownFixture(id))?;
        if fixture.direction == direction {
            return Ok(false);
        }
        fixture.direction = direction;
        self.dirty.insert(id);
        Ok(true)
    }

    /// Write host-derived world coordinates. Does not dirty anything.
    pub fn set_layout(&mut self, id: PositionId, ui_x: f64, ui_y: f64) -> Result<(), ModelError> {
        let pos = self.position_mut(id)?;
        pos.ui_x = ui_x;
        pos.ui_y = ui_y;
        Ok(())
    }

    /// Mark a fixture dirty without changing it.
    pub fn touch(&mut self, id: FixtureId) -> Result<(), ModelError> {
        self.fixture(id)?;
        self.dirty.insert(id);
        Ok(())
    }

    /// Whether any fixture awaits recompute.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drain the dirty set, in the order fixtures were first touched.
    pub fn take_dirty(&mut self) -> Vec<FixtureId> {
        self.dirty.drain(..).collect()
    }
}
