//! The top-level orchestrator.
//!
//! [`Reconciler::run`] executes, in order: preparation, the original
//! snapshot, every boundary left to right, cross-zone inflation of the last
//! two segments, the last-zone audit, remaining-space fill, and split-item
//! reconciliation. A [`ReconcileError`] aborts the document; everything
//! else is recovered locally and recorded in the report's decision log.

use std::time::Instant;

use shelf_core::{
    CombineMode, FixtureId, LayoutHost, MerchDirection, Planogram, PositionId,
};
use tracing::{info, info_span, warn};

use crate::config::{ConfigError, PolicySource, ReconcileConfig, SplitPolicy};
use crate::cross_zone::inflate_last_two_zones;
use crate::decision::DecisionLog;
use crate::error::ReconcileError;
use crate::fill::fill_last_zone;
use crate::metrics::ReconcileMetrics;
use crate::overlap::{lock_zone, process_boundary};
use crate::session::Session;
use crate::snapshot::{MissingProduct, ShelfRoster, Snapshot};
use crate::split_items::reconcile_split_items;

/// Slack when comparing a position against its fixture's edges.
const EDGE_EPSILON: f64 = 1e-9;

/// A position sticking out of its fixture before reconciliation started.
#[derive(Clone, Debug, PartialEq)]
pub struct FixtureOverflow {
    /// The position.
    pub position: PositionId,
    /// Its UPC.
    pub upc: String,
    /// The fixture it sits on.
    pub fixture: FixtureId,
    /// Left edge of the footprint.
    pub left: f64,
    /// Right edge of the footprint.
    pub right: f64,
    /// Fixture's left edge.
    pub fixture_left: f64,
    /// Fixture's right edge.
    pub fixture_right: f64,
}

/// Everything a successful run produced.
#[derive(Clone, Debug)]
pub struct ReconcileReport {
    /// Counters and per-phase timings.
    pub metrics: ReconcileMetrics,
    /// Every decision, in order.
    pub decisions: DecisionLog,
    /// The split policy the run used.
    pub split_policy: SplitPolicy,
    /// Where that policy came from.
    pub policy_source: PolicySource,
    /// Positions found outside their fixture after preparation.
    pub initial_overflows: Vec<FixtureOverflow>,
    /// Last-segment products no longer on the shelf they started on.
    pub last_zone_missing: Vec<MissingProduct>,
}

/// Normalize fixtures and bring every position's geometry up to date.
///
/// With `normalize` set, every fixture is made left-to-right and
/// combinable. Returns positions that overflow their fixture afterwards;
/// these are reported, not corrected.
pub fn prepare(s: &mut Session<'_>) -> Result<Vec<FixtureOverflow>, ReconcileError> {
    let ids: Vec<FixtureId> = s.plano.fixtures().map(|f| f.id).collect();
    if s.config.normalize {
        let mut flipped = 0usize;
        for id in &ids {
            if s.plano.set_direction(*id, MerchDirection::LeftToRight)? {
                flipped += 1;
            }
        }
        if flipped > 0 {
            info!(fixtures = flipped, "merchandising direction normalized");
            s.settle()?;
        }
        for id in &ids {
            s.plano.set_can_combine(*id, CombineMode::Yes)?;
        }
    }
    for id in &ids {
        s.plano.touch(*id)?;
    }
    s.settle()?;

    let mut overflows = Vec::new();
    for pos in s.plano.positions() {
        let fixture = s.plano.fixture(pos.fixture)?;
        if pos.left() < fixture.x - EDGE_EPSILON || pos.right() > fixture.right() + EDGE_EPSILON {
            let upc = s.plano.product(pos.product)?.upc.clone();
            warn!(
                upc = %upc,
                fixture = %fixture.id,
                left = pos.left(),
                right = pos.right(),
                "position overflows its fixture"
            );
            overflows.push(FixtureOverflow {
                position: pos.id,
                upc,
                fixture: fixture.id,
                left: pos.left(),
                right: pos.right(),
                fixture_left: fixture.x,
                fixture_right: fixture.right(),
            });
        }
    }
    Ok(overflows)
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

fn timed<'a, T>(
    s: &mut Session<'a>,
    phase: &str,
    f: impl FnOnce(&mut Session<'a>) -> Result<T, ReconcileError>,
) -> Result<T, ReconcileError> {
    let start = Instant::now();
    let out = f(s)?;
    s.ctx.metrics.phase_us.push((phase.to_string(), elapsed_us(start)));
    Ok(out)
}

/// Runs the full reconciliation pipeline over one planogram.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Create a reconciler, rejecting an invalid configuration.
    pub fn new(config: ReconcileConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconcile `plano` in place, using `host` for every layout recompute.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::Convergence`] if a boundary cannot be cleared;
    /// [`ReconcileError::Host`] or [`ReconcileError::Model`] if the host or
    /// the arena fails. The planogram is left as it was at the failure.
    pub fn run(
        &self,
        plano: &mut Planogram,
        host: &mut dyn LayoutHost,
    ) -> Result<ReconcileReport, ReconcileError> {
        let start = Instant::now();
        let n = plano.segment_count();
        let _span = info_span!("reconcile", segments = n, positions = plano.position_count())
            .entered();
        let mut s = Session::new(plano, host, &self.config);
        let (split_policy, policy_source) = s.ctx.split_policy(s.plano, self.config.split_policy);

        if n == 0 {
            info!("no segments, nothing to reconcile");
            let ctx = s.into_context();
            return Ok(ReconcileReport {
                metrics: ctx.metrics,
                decisions: ctx.log,
                split_policy,
                policy_source,
                initial_overflows: Vec::new(),
                last_zone_missing: Vec::new(),
            });
        }

        let initial_overflows = timed(&mut s, "prepare", prepare)?;

        let config = &self.config;
        s.ctx.original = Some(Snapshot::capture(
            s.plano,
            config.snapshot_key,
            &config.tolerances,
        ));
        s.ctx.roster = Some(ShelfRoster::capture(s.plano, n - 1, &config.tolerances));

        timed(&mut s, "boundaries", |s| {
            lock_zone(s, 0)?;
            for i in 0..n - 1 {
                process_boundary(s, i)?;
            }
            Ok(())
        })?;

        timed(&mut s, "cross_zone", inflate_last_two_zones)?;

        let last_zone_missing = match &s.ctx.roster {
            Some(roster) => roster.missing(s.plano),
            None => Vec::new(),
        };
        for m in &last_zone_missing {
            warn!(upc = %m.upc, shelf_y = m.shelf_y, "product missing from its last-zone shelf");
        }

        timed(&mut s, "fill", fill_last_zone)?;
        timed(&mut s, "split_items", reconcile_split_items)?;

        let mut ctx = s.into_context();
        ctx.metrics.total_us = elapsed_us(start);
        info!(
            boundaries = ctx.metrics.boundaries_processed,
            relocations = ctx.metrics.relocations,
            splits = ctx.metrics.splits,
            inflations = ctx.metrics.inflations_committed,
            recomputes = ctx.metrics.recompute_calls,
            total_us = ctx.metrics.total_us,
            "reconciliation complete"
        );
        Ok(ReconcileReport {
            metrics: ctx.metrics,
            decisions: ctx.log,
            split_policy,
            policy_source,
            initial_overflows,
            last_zone_missing,
        })
    }
}
