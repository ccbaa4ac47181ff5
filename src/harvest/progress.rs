//! Progress events emitted while a harvest runs

use crate::fetch::FetchOutcome;
use crate::request::{EntityId, RequestSpec};
use crate::state::EntityState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Something observable that happened during a run
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    /// The run accepted its entity list
    RunStarted { entities: usize },

    /// An entity moved to a new lifecycle state
    EntityTransition {
        entity: EntityId,
        from: EntityState,
        to: EntityState,
    },

    /// An entity's sweep was planned
    EntityPlanned { entity: EntityId, requests: usize },

    /// One request of a sweep resolved
    RequestResolved {
        request: RequestSpec,
        outcome: ResolvedAs,
    },

    /// An entity finished and its aggregate was written
    EntityFinished {
        entity: EntityId,
        state: EntityState,
        reviews: usize,
        failures: usize,
    },
}

/// Short form of a fetch outcome, without the page body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAs {
    Fetched,
    Cached,
    Empty,
    Blocked,
    Failed,
}

impl ResolvedAs {
    pub fn of(outcome: &FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Success {
                from_cache: true, ..
            } => Self::Cached,
            FetchOutcome::Success { .. } => Self::Fetched,
            FetchOutcome::SoftFailure(crate::fetch::SoftFailureKind::NoResults) => Self::Empty,
            FetchOutcome::SoftFailure(_) => Self::Blocked,
            FetchOutcome::HardFailure(_) => Self::Failed,
        }
    }
}

/// Receives progress events; implementations must tolerate concurrent calls
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: HarvestEvent);
}

/// Logs events through `tracing`
///
/// Entity-level events are logged individually; request-level events are
/// summarized every `interval` resolved requests.
#[derive(Debug)]
pub struct TracingReporter {
    interval: u64,
    resolved: AtomicU64,
}

impl TracingReporter {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            resolved: AtomicU64::new(0),
        }
    }

    /// Requests resolved so far
    pub fn resolved(&self) -> u64 {
        self.resolved.load(Ordering::Relaxed)
    }
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ProgressReporter for TracingReporter {
    fn report(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::RunStarted { entities } => {
                tracing::info!(entities, "Starting harvest");
            }
            HarvestEvent::EntityTransition { entity, from, to } => match to {
                EntityState::Skipped => {
                    tracing::info!(entity = %entity, "Already harvested, skipping");
                }
                EntityState::Cancelled => {
                    tracing::warn!(entity = %entity, %from, "Harvest cancelled, discarding partial aggregate");
                }
                _ => tracing::debug!(entity = %entity, %from, %to, "State transition"),
            },
            HarvestEvent::EntityPlanned { entity, requests } => {
                tracing::info!(entity = %entity, requests, "Harvesting");
            }
            HarvestEvent::RequestResolved { request, outcome } => {
                tracing::trace!(request = %request, ?outcome, "Request resolved");
                let resolved = self.resolved.fetch_add(1, Ordering::Relaxed) + 1;
                if resolved % self.interval == 0 {
                    tracing::info!(resolved, "Progress");
                }
            }
            HarvestEvent::EntityFinished {
                entity,
                state,
                reviews,
                failures,
            } => match state {
                EntityState::PartiallyFailed => {
                    tracing::warn!(entity = %entity, reviews, failures, "Harvested with failures");
                }
                _ => tracing::info!(entity = %entity, reviews, failures, "Harvested"),
            },
        }
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<HarvestEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HarvestEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: HarvestEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
