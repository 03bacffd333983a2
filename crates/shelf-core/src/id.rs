//! Strongly-typed identifiers for planogram entities.
//!
//! IDs are allocated sequentially by the owning [`Planogram`](crate::Planogram)
//! and are never reused within one document, so a removed position's ID
//! stays dangling rather than aliasing a newer placement.

use std::fmt;

/// Identifies a segment ("zone") within a planogram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SegmentId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a fixture ("shelf") within a planogram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId(pub u32);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FixtureId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies one placement of a product on a fixture.
///
/// Positions are the only entities the engine creates and destroys.
/// A position created by duplicating another always receives a fresh ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionId(pub u32);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PositionId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a product record. Many positions may share one product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductId(pub u32);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProductId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
