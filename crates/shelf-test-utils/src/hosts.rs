//! Layout host wrappers for engine testing.
//!
//! - [`CountingHost`]: delegates to an inner host, recording every call.
//! - [`FailingHost`]: fails deterministically after N calls.

use shelf_core::{FixtureId, HostError, LayoutHost, Planogram, RankLayout};

/// Wraps a host and records the dirty set of every recompute.
///
/// Useful for asserting that the engine settles geometry when it should
/// and never calls the host with nothing to do.
pub struct CountingHost<H = RankLayout> {
    pub inner: H,
    pub calls: Vec<Vec<FixtureId>>,
}

impl<H: LayoutHost> CountingHost<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            calls: Vec::new(),
        }
    }

    /// How many times `recompute()` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    /// Whether any call arrived with an empty dirty set.
    pub fn saw_empty_call(&self) -> bool {
        self.calls.iter().any(Vec::is_empty)
    }
}

impl Default for CountingHost<RankLayout> {
    fn default() -> Self {
        Self::new(RankLayout::new())
    }
}

impl<H: LayoutHost> LayoutHost for CountingHost<H> {
    fn recompute(&mut self, plano: &mut Planogram, dirty: &[FixtureId]) -> Result<(), HostError> {
        self.calls.push(dirty.to_vec());
        self.inner.recompute(plano, dirty)
    }
}

/// Lays out like [`RankLayout`] for `succeed_count` calls, then fails.
pub struct FailingHost {
    pub succeed_count: usize,
    calls: usize,
    inner: RankLayout,
}

impl FailingHost {
    /// Create a host that succeeds `succeed_count` times then fails.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            calls: 0,
            inner: RankLayout::new(),
        }
    }

    /// How many times `recompute()` has been called.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl LayoutHost for FailingHost {
    fn recompute(&mut self, plano: &mut Planogram, dirty: &[FixtureId]) -> Result<(), HostError> {
        let n = self.calls;
        self.calls += 1;
        if n >= self.succeed_count {
            return Err(HostError::LayoutFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        self.inner.recompute(plano, dirty)
    }
}
