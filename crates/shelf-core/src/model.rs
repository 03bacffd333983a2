//! Entity records stored in the planogram arena.
//!
//! Records are plain data. Relationships are expressed through IDs
//! ([`Position::fixture`], [`Position::product`]) rather than
//! back-pointers; segment membership of a fixture is derived from its X
//! coordinate by the [`Planogram`](crate::Planogram).

use crate::geometry::days_of_supply;
use crate::id::{FixtureId, PositionId, ProductId, SegmentId};

// ── Segment ────────────────────────────────────────────────────────

/// A contiguous horizontal slice `[left, left + width)` of the planogram.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Stable identifier.
    pub id: SegmentId,
    /// Display name. Consecutive segments with equal names look alike.
    pub name: String,
    /// Left edge, in metres.
    pub left: f64,
    /// Width, in metres.
    pub width: f64,
}

impl Segment {
    /// Right edge (exclusive). This is the boundary with the next segment.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Whether `x` falls inside `[left, right)`.
    pub fn contains_x(&self, x: f64) -> bool {
        x >= self.left && x < self.right()
    }

    /// Midpoint of the segment.
    pub fn midpoint(&self) -> f64 {
        self.left + self.width / 2.0
    }
}

// ── Fixture ────────────────────────────────────────────────────────

/// Tri-state flag controlling whether adjacent fixtures share one layout span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CombineMode {
    /// Never combine with neighbours. Used to lock settled zones.
    No,
    /// Combine with adjacent combinable fixtures on the same shelf.
    Yes,
    /// Not set on the document; hosts treat it as combinable.
    #[default]
    Unset,
}

impl CombineMode {
    /// Whether this fixture may join a combined span.
    pub fn allows(self) -> bool {
        !matches!(self, Self::No)
    }
}

/// Horizontal merchandising direction of a fixture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MerchDirection {
    /// Rank 1 at the left edge.
    #[default]
    LeftToRight,
    /// Rank 1 at the right edge (reverse-flow planograms).
    RightToLeft,
}

/// A horizontal merchandising surface with finite width.
#[derive(Clone, Debug, PartialEq)]
pub struct Fixture {
    /// Stable identifier.
    pub id: FixtureId,
    /// Display name.
    pub name: String,
    /// Left edge in world coordinates, in metres.
    pub x: f64,
    /// Shelf height, in metres.
    pub y: f64,
    /// Width capacity, in metres.
    pub width: f64,
    /// Depth, in metres. Carried for hosts; unused by the engine.
    pub depth: f64,
    /// Whether this fixture may be combined with its neighbours.
    pub can_combine: CombineMode,
    /// Merchandising direction.
    pub direction: MerchDirection,
}

impl Fixture {
    /// Right edge in world coordinates.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

// ── Product ────────────────────────────────────────────────────────

/// A catalogue item. Many positions may reference the same product.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    /// Stable identifier.
    pub id: ProductId,
    /// Universal product code; the product's identity in logs and reports.
    pub upc: String,
    /// Free-text description.
    pub description: String,
    /// Nominal product width, in metres.
    pub width: f64,
    /// Weekly unit movement. Zero or negative means "no data".
    pub movement: f64,
    /// Units per case.
    pub casepack: u32,
    /// Optional category tag.
    pub category: Option<String>,
}

impl Product {
    /// Last six characters of the UPC, as shown in operator logs.
    pub fn short_upc(&self) -> &str {
        let start = self
            .upc
            .char_indices()
            .rev()
            .nth(5)
            .map_or(0, |(i, _)| i);
        &self.upc[start..]
    }
}

// ── Position ───────────────────────────────────────────────────────

/// Facing counts along each axis. Every component is at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Facings {
    /// Side-by-side count. This is the count the engine adjusts.
    pub x: u32,
    /// Stacked count.
    pub y: u32,
    /// Front-to-back count.
    pub z: u32,
}

impl Facings {
    /// `x` facings wide, one high, one deep.
    pub fn wide(x: u32) -> Self {
        Self { x, y: 1, z: 1 }
    }

    /// Total units displayed.
    pub fn units(&self) -> u32 {
        self.x.saturating_mul(self.y).saturating_mul(self.z)
    }
}

/// One placement of a product on a fixture.
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    /// Stable identifier.
    pub id: PositionId,
    /// The product displayed.
    pub product: ProductId,
    /// The owning fixture.
    pub fixture: FixtureId,
    /// Facing counts.
    pub facings: Facings,
    /// Width of a single facing (`merchSize.x`), in metres.
    pub merch_width: f64,
    /// Left-to-right order on the fixture. Lower ranks sit further left.
    pub rank: f64,
    /// Manual placement offset from the fixture's left edge, in metres.
    pub offset: f64,
    /// World X of the left edge, derived by the layout host.
    pub ui_x: f64,
    /// World Y, derived by the layout host (the fixture's shelf height).
    pub ui_y: f64,
}

impl Position {
    /// Footprint width: `facings.x * merch_width`.
    pub fn width(&self) -> f64 {
        f64::from(self.facings.x) * self.merch_width
    }

    /// Left edge of the footprint.
    pub fn left(&self) -> f64 {
        self.ui_x
    }

    /// Right edge of the footprint.
    pub fn right(&self) -> f64 {
        self.ui_x + self.width()
    }

    /// Units held by this placement.
    pub fn capacity(&self) -> f64 {
        f64::from(self.facings.units())
    }

    /// Days of supply for this placement given the product's movement.
    pub fn days_of_supply(&self, product: &Product) -> Option<f64> {
        days_of_supply(self.capacity(), product.movement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(x: f64, facings: u32, merch_width: f64) -> Position {
        Position {
            id: PositionId(0),
            product: ProductId(0),
            fixture: FixtureId(0),
            facings: Facings::wide(facings),
            merch_width,
            rank: 1.0,
            offset: 0.0,
            ui_x: x,
            ui_y: 0.0,
        }
    }

    #[test]
    fn footprint_is_facings_times_single_width() {
        let pos = position(0.85, 3, 0.10);
        assert!((pos.width() - 0.30).abs() < 1e-12);
        assert!((pos.right() - 1.15).abs() < 1e-12);
    }

    #[test]
    fn dos_uses_all_facing_axes() {
        let mut pos = position(0.0, 2, 0.1);
        pos.facings.y = 3;
        let product = Product {
            id: ProductId(0),
            upc: "0001".into(),
            description: String::new(),
            width: 0.1,
            movement: 21.0,
            casepack: 6,
            category: None,
        };
        // capacity 6 units, 21 per week -> 2 days.
        assert_eq!(pos.days_of_supply(&product), Some(2.0));
    }

    #[test]
    fn short_upc_keeps_last_six() {
        let mut product = Product {
            id: ProductId(0),
            upc: "0123456789012".into(),
            description: String::new(),
            width: 0.1,
            movement: 0.0,
            casepack: 1,
            category: None,
        };
        assert_eq!(product.short_upc(), "789012");
        product.upc = "42".into();
        assert_eq!(product.short_upc(), "42");
    }

    #[test]
    fn unset_combine_mode_is_combinable() {
        assert!(CombineMode::Unset.allows());
        assert!(CombineMode::Yes.allows());
        assert!(!CombineMode::No.allows());
    }

    #[test]
    fn segment_containment_is_half_open() {
        let seg = Segment {
            id: SegmentId(0),
            name: "A".into(),
            left: 0.0,
            width: 1.0,
        };
        assert!(seg.contains_x(0.0));
        assert!(!seg.contains_x(1.0));
        assert_eq!(seg.midpoint(), 0.5);
    }
}
