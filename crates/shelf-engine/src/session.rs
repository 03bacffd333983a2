//! A planogram, its layout host, and the run context, borrowed together.
//!
//! Every phase takes a [`Session`]. Mutations go through
//! [`Session::plano`]; [`Session::settle`] hands the accumulated dirty set
//! to the host so that coordinates read afterwards are current.

use shelf_core::{LayoutHost, Planogram, PositionId, ProductId};

use crate::config::ReconcileConfig;
use crate::context::ReconcileContext;
use crate::error::ReconcileError;

/// Borrowed state for one reconciliation run.
pub struct Session<'a> {
    /// The document being reconciled.
    pub plano: &'a mut Planogram,
    host: &'a mut dyn LayoutHost,
    /// Thresholds for this run.
    pub config: &'a ReconcileConfig,
    /// Decisions, metrics, snapshots.
    pub ctx: ReconcileContext,
}

impl<'a> Session<'a> {
    /// Start a session with a fresh context.
    pub fn new(
        plano: &'a mut Planogram,
        host: &'a mut dyn LayoutHost,
        config: &'a ReconcileConfig,
    ) -> Self {
        Self {
            plano,
            host,
            config,
            ctx: ReconcileContext::new(),
        }
    }

    /// Recompute layout for every fixture touched since the last call.
    ///
    /// Does nothing (and does not call the host) when nothing is dirty.
    pub fn settle(&mut self) -> Result<(), ReconcileError> {
        if !self.plano.is_dirty() {
            return Ok(());
        }
        let dirty = self.plano.take_dirty();
        self.ctx.metrics.recompute_calls += 1;
        self.host.recompute(&mut *self.plano, &dirty)?;
        Ok(())
    }

    /// End the session, returning the accumulated context.
    pub fn into_context(self) -> ReconcileContext {
        self.ctx
    }

    /// Index of the last segment, if any.
    pub fn last_segment(&self) -> Option<usize> {
        self.plano.segment_count().checked_sub(1)
    }

    pub(crate) fn upc(&self, product: ProductId) -> String {
        self.plano
            .product(product)
            .map(|p| p.upc.clone())
            .unwrap_or_default()
    }

    pub(crate) fn upc_of(&self, position: PositionId) -> String {
        self.plano
            .position(position)
            .map(|p| self.upc(p.product))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("positions", &self.plano.position_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
