/// Outcome definitions for crawl and resource tasks
///
/// Every dequeued task ends in exactly one of these outcomes.
use std::fmt;

/// Represents how a page or resource task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOutcome {
    // ===== Success States =====
    /// Content was downloaded from the network
    Fetched,

    /// Local copy was fresh; no download happened
    Unchanged,

    // ===== Disposition States =====
    /// Retries were exhausted and the item was dropped by the skip disposition
    Skipped,

    /// The item failed and was recorded as such
    Failed,

    // ===== Special States =====
    /// The crawl stopped before the task finished
    Cancelled,
}

impl TaskOutcome {
    /// Returns true if the task produced usable content
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched | Self::Unchanged)
    }

    /// Returns true if the item counts as processed for resume purposes
    ///
    /// Failed items are left out so the next run tries them again.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Fetched | Self::Unchanged | Self::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
