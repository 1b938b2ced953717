//! Height source consumed by the staking vault.
//!
//! The vault never advances time itself; the host owns the counter and
//! hands the vault a read-only view of it for the duration of a call.

/// Supplies the current height. Must be monotonically non-decreasing
/// across calls.
pub trait HeightSource {
    /// Returns the height the current operation executes at.
    fn current_height(&self) -> u64;
}

/// A height frozen at a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedHeight(pub u64);

impl HeightSource for FixedHeight {
    fn current_height(&self) -> u64 {
        self.0
    }
}
