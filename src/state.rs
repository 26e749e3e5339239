//! Subscription lifecycle state.

/// Lifecycle of a single subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Subscribed, but no demand has arrived yet.
    Idle,
    /// Demand has been granted and no terminal signal has been produced.
    Active,
    /// The source was exhausted and completion was signalled.
    Completed,
    /// The subscriber cancelled.
    Cancelled,
    /// The source, or the protocol, failed.
    Failed,
}

impl StreamState {
    /// Returns `true` for `Completed`, `Cancelled` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns `true` while elements may still be emitted.
    #[must_use]
    pub const fn is_live(self) -> bool { !self.is_terminal() }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}
