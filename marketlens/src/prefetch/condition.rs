//! Network condition gate for speculative work.

use std::time::Duration;

/// Last observed network condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkCondition {
    /// No measurement yet
    #[default]
    Unknown,
    Measured(Duration),
    /// Probe failed or timed out
    Unreachable,
}

impl NetworkCondition {
    /// Whether speculative fetches may run. Unknown counts as healthy so the
    /// first predictions are not lost before a probe completes.
    pub fn allows_prefetch(&self, threshold: Duration) -> bool {
        match self {
            Self::Unknown => true,
            Self::Measured(latency) => *latency <= threshold,
            Self::Unreachable => false,
        }
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            Self::Measured(latency) => Some(*latency),
            _ => None,
        }
    }
}
