//! The contract between the engine and whatever owns layout.

use crate::error::HostError;
use crate::id::FixtureId;
use crate::planogram::Planogram;

/// Recomputes derived geometry (`ui_x`, `ui_y`) after structural edits.
///
/// The engine never trusts a position's world coordinates between a
/// mutation and a successful `recompute`. Hosts must write every position
/// they lay out through [`Planogram::set_layout`], and must at least lay
/// out the fixtures in `dirty`; laying out more (a whole shelf row, or
/// everything) is allowed.
pub trait LayoutHost {
    /// Bring derived geometry up to date.
    ///
    /// `dirty` lists fixtures touched since the previous call, in the
    /// order they were first touched. It may be empty.
    fn recompute(&mut self, plano: &mut Planogram, dirty: &[FixtureId]) -> Result<(), HostError>;
}

impl<H: LayoutHost + ?Sized> LayoutHost for &mut H {
    fn recompute(&mut self, plano: &mut Planogram, dirty: &[FixtureId]) -> Result<(), HostError> {
        (**self).recompute(plano, dirty)
    }
}

impl<H: LayoutHost + ?Sized> LayoutHost for Box<H> {
    fn recompute(&mut self, plano: &mut Planogram, dirty: &[FixtureId]) -> Result<(), HostError> {
        (**self).recompute(plano, dirty)
    }
}
