//! Reference layout host: packs positions by rank along each shelf row.
//!
//! Fixtures that share a shelf height form a row. Within a row, adjacent
//! fixtures whose edges meet and whose combine flags both allow it form a
//! run that shares one packing cursor, so overflow from the left fixture
//! pushes positions on the right one. Each position is placed at
//! `max(cursor, fixture.x + offset)`. Right-to-left fixtures never join a
//! run and pack from their right edge.

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::error::HostError;
use crate::geometry::shelf_level;
use crate::id::{FixtureId, PositionId};
use crate::model::{Fixture, MerchDirection};
use crate::planogram::Planogram;
use crate::traits::LayoutHost;

/// Edge gap under which two fixtures in a row count as adjacent.
const ADJACENCY_TOLERANCE: f64 = 0.001;

/// Rank-order packing host.
#[derive(Clone, Debug)]
pub struct RankLayout {
    row_step: f64,
}

impl Default for RankLayout {
    fn default() -> Self {
        Self { row_step: 0.001 }
    }
}

impl RankLayout {
    /// Layout host grouping rows to the nearest millimetre.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different Y quantization step to decide which fixtures share
    /// a row.
    pub fn with_row_step(row_step: f64) -> Self {
        Self { row_step }
    }

    /// Lay out every fixture, regardless of the dirty set.
    pub fn layout_all(&mut self, plano: &mut Planogram) -> Result<(), HostError> {
        let all: Vec<FixtureId> = plano.fixtures().map(|f| f.id).collect();
        plano.take_dirty();
        self.recompute(plano, &all)
    }

    fn layout_row(&self, plano: &mut Planogram, row: &[FixtureId]) -> Result<(), HostError> {
        let mut fixtures: Vec<Fixture> = row
            .iter()
            .map(|id| plano.fixture(*id).cloned())
            .collect::<Result<_, _>>()
            .map_err(|_| HostError::LayoutFailed {
                reason: "row references a missing fixture".to_string(),
            })?;
        fixtures.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.id.cmp(&b.id)));

        let mut cursor = f64::NEG_INFINITY;
        let mut prev: Option<&Fixture> = None;
        for fixture in &fixtures {
            let joins = prev.is_some_and(|p| continues_run(p, fixture));
            if !joins {
                cursor = f64::NEG_INFINITY;
            }
            let placed = ranked(plano, fixture.id)?;
            match fixture.direction {
                MerchDirection::LeftToRight => {
                    for (id, offset, width) in placed {
                        let x = cursor.max(fixture.x + offset);
                        cursor = x + width;
                        write(plano, id, x, fixture.y)?;
                    }
                }
                MerchDirection::RightToLeft => {
                    let mut edge = fixture.right();
                    for (id, offset, width) in placed {
                        let x = edge.min(fixture.right() - offset) - width;
                        edge = x;
                        write(plano, id, x, fixture.y)?;
                    }
                }
            }
            prev = Some(fixture);
        }
        Ok(())
    }
}

fn continues_run(left: &Fixture, right: &Fixture) -> bool {
    left.direction == MerchDirection::LeftToRight
        && right.direction == MerchDirection::LeftToRight
        && left.can_combine.allows()
        && right.can_combine.allows()
        && (left.right() - right.x).abs() <= ADJACENCY_TOLERANCE
}

fn ranked(
    plano: &Planogram,
    fixture: FixtureId,
) -> Result<SmallVec<[(PositionId, f64, f64); 8]>, HostError> {
    let positions = plano
        .positions_by_rank(fixture)
        .map_err(|_| HostError::UnknownFixture(fixture))?;
    Ok(positions
        .into_iter()
        .map(|p| (p.id, p.offset, p.width()))
        .collect())
}

fn write(plano: &mut Planogram, id: PositionId, x: f64, y: f64) -> Result<(), HostError> {
    plano
        .set_layout(id, x, y)
        .map_err(|e| HostError::LayoutFailed {
            reason: e.to_string(),
        })
}

impl LayoutHost for RankLayout {
    fn recompute(&mut self, plano: &mut Planogram, dirty: &[FixtureId]) -> Result<(), HostError> {
        let mut levels = Vec::with_capacity(dirty.len());
        for id in dirty {
            let fixture = plano
                .fixture(*id)
                .map_err(|_| HostError::UnknownFixture(*id))?;
            let level = shelf_level(fixture.y, self.row_step);
            if !levels.contains(&level) {
                levels.push(level);
            }
        }
        if levels.is_empty() {
            return Ok(());
        }

        let mut rows: IndexMap<i64, Vec<FixtureId>> = IndexMap::new();
        for fixture in plano.fixtures() {
            let level = shelf_level(fixture.y, self.row_step);
            if levels.contains(&level) {
                rows.entry(level).or_default().push(fixture.id);
            }
        }
        trace!(rows = rows.len(), dirty = dirty.len(), "rank layout");
        for row in rows.values() {
            self.layout_row(plano, row)?;
        }
        Ok(())
    }
}
