//! Shard lifecycle states
//!
//! A shard moves strictly forward: `Init -> Running -> Drained -> Terminated`.
//! There is no pause or resume; the only outside control is killing the
//! process, which skips the remaining states and any sink flush.

use std::fmt;

/// Represents where a shard is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardState {
    /// Constructed, nothing pulled yet
    Init,

    /// Polling batches and dispatching owned URLs to worker units
    Running,

    /// Provider exhausted and every worker unit has finished
    Drained,

    /// Sink closed; the shard does nothing further
    Terminated,
}

impl ShardState {
    /// Returns the only state reachable from this one
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Running),
            Self::Running => Some(Self::Drained),
            Self::Drained => Some(Self::Terminated),
            Self::Terminated => None,
        }
    }

    /// Returns true if moving to `to` is a legal transition
    pub fn can_transition_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Drained => "drained",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ShardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
