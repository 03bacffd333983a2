//! Run-scoped state threaded through every phase.

use shelf_core::{Planogram, SPLIT_POLICY_DESCRIPTOR};
use tracing::warn;

use crate::config::{PolicySource, SplitPolicy};
use crate::decision::DecisionLog;
use crate::metrics::ReconcileMetrics;
use crate::snapshot::{ShelfRoster, Snapshot};

/// State accumulated over one reconciliation run.
///
/// Created fresh per document; nothing in it outlives the run.
#[derive(Clone, Debug, Default)]
pub struct ReconcileContext {
    /// Decisions in the order they were made.
    pub log: DecisionLog,
    /// Counters and timings.
    pub metrics: ReconcileMetrics,
    /// Segment assignment before any boundary was processed.
    pub original: Option<Snapshot>,
    /// Segment assignment after the most recent boundary converged.
    pub baseline: Option<Snapshot>,
    /// Last-segment shelves as they were at the start.
    pub roster: Option<ShelfRoster>,
    policy: Option<(SplitPolicy, PolicySource)>,
}

impl ReconcileContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective split policy, resolved once and cached for the run.
    ///
    /// `forced` wins over the document descriptor.
    pub fn split_policy(
        &mut self,
        plano: &Planogram,
        forced: Option<SplitPolicy>,
    ) -> (SplitPolicy, PolicySource) {
        if let Some(cached) = &self.policy {
            return cached.clone();
        }
        let resolved = match forced {
            Some(policy) => (policy, PolicySource::Override),
            None => SplitPolicy::from_descriptor(plano.descriptor(SPLIT_POLICY_DESCRIPTOR)),
        };
        if let PolicySource::Unrecognized(raw) = &resolved.1 {
            warn!(
                descriptor = SPLIT_POLICY_DESCRIPTOR,
                value = %raw,
                "unrecognized split policy, preventing splits"
            );
        }
        self.policy = Some(resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_is_read_once() {
        let mut plano = Planogram::new();
        plano.set_descriptor(SPLIT_POLICY_DESCRIPTOR, "no");
        let mut ctx = ReconcileContext::new();
        assert_eq!(
            ctx.split_policy(&plano, None),
            (SplitPolicy::Prevent, PolicySource::Descriptor)
        );
        plano.set_descriptor(SPLIT_POLICY_DESCRIPTOR, "yes");
        assert_eq!(ctx.split_policy(&plano, None).0, SplitPolicy::Prevent);
    }

    #[test]
    fn forced_policy_ignores_descriptor() {
        let mut plano = Planogram::new();
        plano.set_descriptor(SPLIT_POLICY_DESCRIPTOR, "no");
        let mut ctx = ReconcileContext::new();
        assert_eq!(
            ctx.split_policy(&plano, Some(SplitPolicy::Allow)),
            (SplitPolicy::Allow, PolicySource::Override)
        );
    }

    #[test]
    fn garbage_descriptor_prevents() {
        let mut plano = Planogram::new();
        plano.set_descriptor(SPLIT_POLICY_DESCRIPTOR, "sometimes");
        let (policy, source) = ReconcileContext::new().split_policy(&plano, None);
        assert_eq!(policy, SplitPolicy::Prevent);
        assert!(matches!(source, PolicySource::Unrecognized(v) if v == "sometimes"));
    }
}
