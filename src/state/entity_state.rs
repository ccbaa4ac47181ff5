/// Entity state definitions for tracking harvest progress
use std::fmt;

/// Represents the current state of an entity in a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    // ===== Active States =====
    /// Entity is waiting for its turn
    Pending,

    /// Entity is being planned, fetched and merged
    InFlight,

    // ===== Terminal States =====
    /// Every request resolved and failures stayed within tolerance
    Completed,

    /// Every request resolved but more requests failed than tolerated
    PartiallyFailed,

    /// Already checkpointed by an earlier run; never planned
    Skipped,

    /// The run was cancelled before the sweep finished; nothing was kept
    Cancelled,
}

impl EntityState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::InFlight)
    }

    /// Returns true if an entity in this state is recorded as done
    ///
    /// Only these states are written to the checkpoint store and acknowledged
    /// to the completion sink.
    pub fn is_checkpointed(&self) -> bool {
        matches!(self, Self::Completed | Self::PartiallyFailed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: EntityState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::Pending, Self::Skipped)
                | (Self::Pending, Self::Cancelled)
                | (Self::InFlight, Self::Completed)
                | (Self::InFlight, Self::PartiallyFailed)
                | (Self::InFlight, Self::Cancelled)
        )
    }

    /// Terminal state of a finished sweep with `failures` failed requests
    pub fn for_failures(failures: usize, tolerance: u32) -> Self {
        if failures <= tolerance as usize {
            Self::Completed
        } else {
            Self::PartiallyFailed
        }
    }

    /// Converts the entity state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
            Self::PartiallyFailed => "partially_failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses an entity state from a database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_flight" => Some(Self::InFlight),
            "completed" => Some(Self::Completed),
            "partially_failed" => Some(Self::PartiallyFailed),
            "skipped" => Some(Self::Skipped),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns all possible entity states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::InFlight,
            Self::Completed,
            Self::PartiallyFailed,
            Self::Skipped,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
