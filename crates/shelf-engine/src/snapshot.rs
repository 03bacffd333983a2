//! Point-in-time records of which segment each product occupies.
//!
//! A [`Snapshot`] is captured before any boundary is processed
//! ("original") and again after each boundary converges ("baseline").
//! [`compare`] reports products whose segment changed. A [`ShelfRoster`]
//! remembers which products sat on each shelf of the last segment so the
//! run can audit them at the end.

use indexmap::{IndexMap, IndexSet};
use shelf_core::{shelf_level, Planogram, PositionId, ProductId};
use tracing::warn;

use crate::config::{SnapshotKey, ToleranceConfig};

/// Identity a snapshot entry is recorded under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProductKey {
    /// The product.
    pub product: ProductId,
    /// Quantized shelf level, when keyed per shelf.
    pub level: Option<i64>,
}

/// Where a product was found.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneRecord {
    /// Segment index under the membership rule.
    pub segment: usize,
    /// Shelf ordinal within the segment, top shelf first.
    pub shelf: usize,
    /// Shelf height, quantized.
    pub shelf_y: f64,
}

/// Product → segment assignment at one checkpoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    records: IndexMap<ProductKey, ZoneRecord>,
    straddling: IndexSet<ProductKey>,
}

impl Snapshot {
    /// Record every position that belongs to a segment.
    ///
    /// Scan order is segments left to right, shelves top to bottom, then X
    /// ascending; when a key occurs more than once the first occurrence is
    /// kept. Positions belonging to no segment are not recorded; their keys
    /// are remembered as straddling unless another placement was recorded.
    pub fn capture(plano: &Planogram, key: SnapshotKey, tol: &ToleranceConfig) -> Self {
        let step = tol.snapshot_grouping;
        let key_of = |product: ProductId, level: i64| ProductKey {
            product,
            level: match key {
                SnapshotKey::Product => None,
                SnapshotKey::ProductShelf => Some(level),
            },
        };
        let mut per_segment: Vec<Vec<(i64, f64, PositionId, ProductId)>> =
            vec![Vec::new(); plano.segment_count()];
        let mut straddling = IndexSet::new();
        for pos in plano.positions() {
            let level = shelf_level(pos.ui_y, step);
            match plano.segment_of_footprint(pos.left(), pos.right(), tol.membership_pct) {
                Some(seg) => per_segment[seg].push((level, pos.ui_x, pos.id, pos.product)),
                None => {
                    straddling.insert(key_of(pos.product, level));
                }
            }
        }

        let mut records = IndexMap::new();
        for (segment, mut items) in per_segment.into_iter().enumerate() {
            items.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));
            let mut shelf = 0;
            let mut current: Option<i64> = None;
            for (level, _, _, product) in items {
                if let Some(prev) = current {
                    if prev != level {
                        shelf += 1;
                    }
                }
                current = Some(level);
                records.entry(key_of(product, level)).or_insert(ZoneRecord {
                    segment,
                    shelf,
                    shelf_y: level as f64 * step,
                });
            }
        }
        straddling.retain(|k| !records.contains_key(k));
        Self {
            records,
            straddling,
        }
    }

    /// Look up one key.
    pub fn get(&self, key: &ProductKey) -> Option<&ZoneRecord> {
        self.records.get(key)
    }

    /// Segment of a product keyed without shelf level.
    pub fn segment_of(&self, product: ProductId) -> Option<usize> {
        self.records
            .get(&ProductKey {
                product,
                level: None,
            })
            .map(|r| r.segment)
    }

    /// Whether the key is placed only on positions that meet no segment's
    /// membership threshold.
    pub fn is_straddling(&self, key: &ProductKey) -> bool {
        self.straddling.contains(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Entries in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductKey, &ZoneRecord)> + '_ {
        self.records.iter()
    }
}

/// A product whose recorded segment changed between two snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct Displacement {
    /// The displaced key.
    pub key: ProductKey,
    /// Where it was.
    pub from: ZoneRecord,
    /// Where it is now.
    pub to: ZoneRecord,
}

/// Products originally in `zone_a` or `zone_b` whose segment differs in
/// `after`. Keys missing from `after` are logged and skipped; the log line
/// distinguishes a product straddling segments from one no longer placed.
pub fn compare(before: &Snapshot, after: &Snapshot, zone_a: usize, zone_b: usize) -> Vec<Displacement> {
    let mut out = Vec::new();
    for (key, from) in before.iter() {
        if from.segment != zone_a && from.segment != zone_b {
            continue;
        }
        let Some(to) = after.get(key) else {
            if after.is_straddling(key) {
                warn!(
                    product = %key.product,
                    segment = from.segment,
                    "product straddles segments with no majority, skipped"
                );
            } else {
                warn!(product = %key.product, segment = from.segment, "product no longer placed, skipped");
            }
            continue;
        };
        if to.segment != from.segment {
            out.push(Displacement {
                key: *key,
                from: *from,
                to: *to,
            });
        }
    }
    out
}

// ── Last-zone roster ───────────────────────────────────────────────

/// A product missing from the last-segment shelf it started on.
#[derive(Clone, Debug, PartialEq)]
pub struct MissingProduct {
    /// The product.
    pub product: ProductId,
    /// Its UPC.
    pub upc: String,
    /// The shelf height it was recorded on.
    pub shelf_y: f64,
}

/// Products anchored (by left edge) in one segment, grouped by shelf.
#[derive(Clone, Debug, PartialEq)]
pub struct ShelfRoster {
    segment: usize,
    step: f64,
    shelves: IndexMap<i64, Vec<ProductId>>,
}

impl ShelfRoster {
    fn collect(plano: &Planogram, segment: usize, step: f64) -> IndexMap<i64, Vec<ProductId>> {
        let mut shelves: IndexMap<i64, Vec<ProductId>> = IndexMap::new();
        let Some(seg) = plano.segment(segment) else {
            return shelves;
        };
        for pos in plano.positions().filter(|p| seg.contains_x(p.ui_x)) {
            shelves
                .entry(shelf_level(pos.ui_y, step))
                .or_default()
                .push(pos.product);
        }
        shelves.sort_by(|a, _, b, _| b.cmp(a));
        shelves
    }

    /// Record the products currently anchored in `segment`.
    pub fn capture(plano: &Planogram, segment: usize, tol: &ToleranceConfig) -> Self {
        let step = tol.snapshot_grouping;
        Self {
            segment,
            step,
            shelves: Self::collect(plano, segment, step),
        }
    }

    /// Segment the roster covers.
    pub fn segment(&self) -> usize {
        self.segment
    }

    /// Total recorded placements.
    pub fn len(&self) -> usize {
        self.shelves.values().map(Vec::len).sum()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recorded products no longer found on their shelf in the segment.
    pub fn missing(&self, plano: &Planogram) -> Vec<MissingProduct> {
        let current = Self::collect(plano, self.segment, self.step);
        let mut out = Vec::new();
        for (level, products) in &self.shelves {
            let now = current.get(level);
            for product in products {
                if now.is_some_and(|v| v.contains(product)) {
                    continue;
                }
                let upc = plano
                    .product(*product)
                    .map(|p| p.upc.clone())
                    .unwrap_or_default();
                out.push(MissingProduct {
                    product: *product,
                    upc,
                    shelf_y: *level as f64 * self.step,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plano() -> (Planogram, [PositionId; 4]) {
        let mut p = Planogram::new();
        p.add_segment("A", 0.0, 1.0).unwrap();
        p.add_segment("B", 1.0, 1.0).unwrap();
        let top = p.add_fixture("top", 0.0, 1.5, 2.0).unwrap();
        let low = p.add_fixture("low", 0.0, 0.5, 2.0).unwrap();
        let a = p.add_product("A", 0.1, 1.0).unwrap();
        let b = p.add_product("B", 0.1, 1.0).unwrap();
        let pa = p.add_position(a, top, 1, 0.1).unwrap();
        let pb = p.add_position(b, top, 1, 0.1).unwrap();
        let pa2 = p.add_position(a, low, 1, 0.1).unwrap();
        let pb2 = p.add_position(b, low, 1, 0.1).unwrap();
        p.set_layout(pa, 0.2, 1.5).unwrap();
        p.set_layout(pb, 1.2, 1.5).unwrap();
        p.set_layout(pa2, 1.4, 0.5).unwrap();
        p.set_layout(pb2, 0.1, 0.5).unwrap();
        (p, [pa, pb, pa2, pb2])
    }

    #[test]
    fn first_occurrence_in_scan_order_wins() {
        let (p, _) = plano();
        let snap = Snapshot::capture(&p, SnapshotKey::Product, &ToleranceConfig::default());
        // A: top shelf of segment 0 is scanned before segment 1.
        assert_eq!(snap.segment_of(ProductId(0)), Some(0));
        // B: low shelf of segment 0 is scanned before segment 1.
        assert_eq!(snap.segment_of(ProductId(1)), Some(0));
        let b = snap
            .get(&ProductKey {
                product: ProductId(1),
                level: None,
            })
            .unwrap();
        assert_eq!(b.shelf, 1);
        assert!((b.shelf_y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn per_shelf_keys_record_each_level() {
        let (p, _) = plano();
        let snap = Snapshot::capture(&p, SnapshotKey::ProductShelf, &ToleranceConfig::default());
        assert_eq!(snap.len(), 4);
        let a_low = snap
            .get(&ProductKey {
                product: ProductId(0),
                level: Some(500),
            })
            .unwrap();
        assert_eq!(a_low.segment, 1);
    }

    #[test]
    fn straddling_positions_are_not_recorded() {
        let (mut p, [pa, ..]) = plano();
        p.set_layout(pa, 0.95, 1.5).unwrap();
        p.set_facings(pa, 2).unwrap();
        // 0.95..1.15 is 25% / 75%: no segment.
        let snap = Snapshot::capture(&p, SnapshotKey::ProductShelf, &ToleranceConfig::default());
        let key = ProductKey {
            product: ProductId(0),
            level: Some(1500),
        };
        assert!(snap.get(&key).is_none());
        assert!(snap.is_straddling(&key));

        // Keyed per product, A's low-shelf placement is recorded instead.
        let by_product = Snapshot::capture(&p, SnapshotKey::Product, &ToleranceConfig::default());
        assert!(!by_product.is_straddling(&ProductKey {
            product: ProductId(0),
            level: None,
        }));
    }

    #[test]
    fn compare_reports_only_watched_zones() {
        let (mut p, [pa, ..]) = plano();
        let tol = ToleranceConfig::default();
        let before = Snapshot::capture(&p, SnapshotKey::Product, &tol);
        p.set_layout(pa, 1.6, 1.5).unwrap();
        let after = Snapshot::capture(&p, SnapshotKey::Product, &tol);

        // A's first occurrence is now the low shelf of segment 1.
        let moved = compare(&before, &after, 0, 1);
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].key.product, ProductId(0));
        assert_eq!(moved[0].from.segment, 0);
        assert_eq!(moved[0].to.segment, 1);

        assert!(compare(&before, &after, 2, 3).is_empty());
    }

    #[test]
    fn compare_skips_products_that_vanished() {
        let (mut p, [pa, _, pa2, _]) = plano();
        let tol = ToleranceConfig::default();
        let before = Snapshot::capture(&p, SnapshotKey::Product, &tol);
        p.remove_position(pa).unwrap();
        p.remove_position(pa2).unwrap();
        let after = Snapshot::capture(&p, SnapshotKey::Product, &tol);
        assert!(compare(&before, &after, 0, 1).is_empty());
        assert!(!after.is_straddling(&ProductKey {
            product: ProductId(0),
            level: None,
        }));
    }

    #[test]
    fn compare_skips_products_left_straddling() {
        let (mut p, [pa, _, pa2, _]) = plano();
        let tol = ToleranceConfig::default();
        let before = Snapshot::capture(&p, SnapshotKey::Product, &tol);
        p.remove_position(pa2).unwrap();
        p.set_layout(pa, 0.95, 1.5).unwrap();
        p.set_facings(pa, 2).unwrap();
        let after = Snapshot::capture(&p, SnapshotKey::Product, &tol);
        let key = ProductKey {
            product: ProductId(0),
            level: None,
        };
        assert!(after.get(&key).is_none());
        assert!(after.is_straddling(&key));
        assert!(compare(&before, &after, 0, 1).is_empty());
    }

    #[test]
    fn roster_reports_products_leaving_their_shelf() {
        let (mut p, [_, pb, pa2, _]) = plano();
        let tol = ToleranceConfig::default();
        let roster = ShelfRoster::capture(&p, 1, &tol);
        assert_eq!(roster.len(), 2);
        assert!(roster.missing(&p).is_empty());

        p.set_layout(pb, 0.6, 1.5).unwrap();
        let missing = roster.missing(&p);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].upc, "B");
        assert!((missing[0].shelf_y - 1.5).abs() < 1e-9);

        // Moving to a different shelf inside the segment also counts.
        p.set_layout(pa2, 1.4, 1.5).unwrap();
        assert_eq!(roster.missing(&p).len(), 2);
    }
}
