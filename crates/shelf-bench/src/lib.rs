//! Benchmark profiles and utilities for the Shelf reconciliation engine.
//!
//! Provides pre-built random bays for benchmarking:
//!
//! - [`reference_profile`]: 6 segments x 5 shelves, one straddler per boundary per shelf
//! - [`stress_profile`]: 24 segments x 8 shelves, same density
//! - [`random_candidates`]: donor candidates for the selection policies
//!
//! Every generator is deterministic in its seed (ChaCha8).

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use shelf_core::{Planogram, PositionId, RankLayout};
use shelf_engine::Candidate;

/// Shape of a generated bay.
#[derive(Clone, Debug)]
pub struct BayProfile {
    /// Number of segments.
    pub segments: usize,
    /// Width of every segment and fixture, in metres.
    pub segment_width: f64,
    /// Shelf rows; each has one fixture per segment.
    pub shelves: usize,
    /// Share of each fixture's width stocked before straddlers are added.
    pub fill: f64,
    /// Place one item across every boundary on every shelf.
    pub straddle: bool,
}

/// Generate a bay for `profile`, laid out with [`RankLayout`].
///
/// # Panics
///
/// Panics if the profile has a non-positive segment width.
pub fn random_bay(profile: &BayProfile, seed: u64) -> Planogram {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut plano = Planogram::new();
    let w = profile.segment_width;
    for i in 0..profile.segments {
        plano
            .add_segment(format!("S{i}"), i as f64 * w, w)
            .expect("segment");
    }

    let mut upc = 0u64;
    for row in 0..profile.shelves {
        let y = 0.3 + 0.4 * row as f64;
        for seg in 0..profile.segments {
            let fixture = plano
                .add_fixture(format!("R{row}S{seg}"), seg as f64 * w, y, w)
                .expect("fixture");
            let mut used = 0.0;
            loop {
                let width = rng.random_range(0.04..0.12);
                let facings = 1 + rng.random_range(0..3u32);
                if used + width * f64::from(facings) > profile.fill * w {
                    break;
                }
                // One product in ten has no movement data.
                let movement = if rng.random_range(0..10) == 0 {
                    0.0
                } else {
                    rng.random_range(0.5..12.0)
                };
                upc += 1;
                let product = plano
                    .add_product(format!("{upc:012}"), width, movement)
                    .expect("product");
                plano
                    .add_position(product, fixture, facings, width)
                    .expect("position");
                used += width * f64::from(facings);
            }

            if profile.straddle && seg + 1 < profile.segments {
                let width = rng.random_range(0.05..0.10);
                let facings = 1 + rng.random_range(0..3u32);
                upc += 1;
                let product = plano
                    .add_product(format!("{upc:012}"), width, rng.random_range(0.5..12.0))
                    .expect("product");
                let id = plano
                    .add_position(product, fixture, facings, width)
                    .expect("position");
                plano
                    .set_offset(id, w - rng.random_range(0.02..0.08))
                    .expect("offset");
            }
        }
    }

    RankLayout::new()
        .layout_all(&mut plano)
        .expect("initial layout");
    plano
}

/// Reference profile: 6 segments of 1.2m, 5 shelves, 60% stocked.
pub fn reference_profile(seed: u64) -> Planogram {
    random_bay(
        &BayProfile {
            segments: 6,
            segment_width: 1.2,
            shelves: 5,
            fill: 0.6,
            straddle: true,
        },
        seed,
    )
}

/// Stress profile: 24 segments of 1.2m, 8 shelves, 60% stocked.
pub fn stress_profile(seed: u64) -> Planogram {
    random_bay(
        &BayProfile {
            segments: 24,
            segment_width: 1.2,
            shelves: 8,
            fill: 0.6,
            straddle: true,
        },
        seed,
    )
}

/// `n` synthetic donor candidates packed left to right from x = 0.
pub fn random_candidates(n: usize, seed: u64) -> Vec<Candidate> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut left = 0.0;
    (0..n)
        .map(|i| {
            let single = rng.random_range(0.04..0.12);
            let facings = 1 + rng.random_range(0..4u32);
            let dos = (rng.random_range(0..5) != 0).then(|| rng.random_range(0.5..20.0));
            let c = Candidate {
                position: PositionId(i as u32),
                dos,
                single_width: single,
                product_width: single,
                facings,
                left,
                right: left + single * f64::from(facings),
            };
            left = c.right;
            c
        })
        .collect()
}
