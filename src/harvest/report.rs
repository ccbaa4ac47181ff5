use crate::fetch::{FetchOutcome, FetchStats, SoftFailureKind};
use crate::state::EntityState;
use std::collections::BTreeMap;
use std::fmt;

/// Summary of one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub completed: u64,
    pub partially_failed: u64,
    pub skipped: u64,
    pub cancelled: u64,

    /// HTTP requests sent, retries included
    pub network_requests: u64,
    pub cache_hits: u64,

    /// Blocked pages by kind; empty listings are counted in `empty_results`
    pub soft_failures: BTreeMap<SoftFailureKind, u64>,
    pub empty_results: u64,
    pub hard_failures: u64,
}

impl HarvestReport {
    /// Counts an entity that reached `state`
    pub fn record_state(&mut self, state: EntityState) {
        match state {
            EntityState::Completed => self.completed += 1,
            EntityState::PartiallyFailed => self.partially_failed += 1,
            EntityState::Skipped => self.skipped += 1,
            EntityState::Cancelled => self.cancelled += 1,
            EntityState::Pending | EntityState::InFlight => {}
        }
    }

    pub fn record_outcome(&mut self, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Success { .. } => {}
            FetchOutcome::SoftFailure(SoftFailureKind::NoResults) => self.empty_results += 1,
            FetchOutcome::SoftFailure(kind) => {
                *self.soft_failures.entry(*kind).or_insert(0) += 1;
            }
            FetchOutcome::HardFailure(_) => self.hard_failures += 1,
        }
    }

    /// Records the fetch counter growth between two snapshots of one client
    pub fn record_fetch_stats(&mut self, before: FetchStats, after: FetchStats) {
        self.network_requests = after.network_requests.saturating_sub(before.network_requests);
        self.cache_hits = after.cache_hits.saturating_sub(before.cache_hits);
    }

    /// Adds the counts of `other` to this report
    pub fn merge(&mut self, other: &HarvestReport) {
        self.completed += other.completed;
        self.partially_failed += other.partially_failed;
        self.skipped += other.skipped;
        self.cancelled += other.cancelled;
        self.network_requests += other.network_requests;
        self.cache_hits += other.cache_hits;
        for (kind, count) in &other.soft_failures {
            *self.soft_failures.entry(*kind).or_insert(0) += count;
        }
        self.empty_results += other.empty_results;
        self.hard_failures += other.hard_failures;
    }

    pub fn entities(&self) -> u64 {
        self.completed + self.partially_failed + self.skipped + self.cancelled
    }

    pub fn soft_failure_count(&self, kind: SoftFailureKind) -> u64 {
        self.soft_failures.get(&kind).copied().unwrap_or(0)
    }

    /// Whether any entity was cancelled before its sweep finished
    pub fn was_interrupted(&self) -> bool {
        self.cancelled > 0
    }
}

impl fmt::Display for HarvestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Entities: {}", self.entities())?;
        writeln!(f, "  Completed: {}", self.completed)?;
        writeln!(f, "  Partially failed: {}", self.partially_failed)?;
        writeln!(f, "  Skipped: {}", self.skipped)?;
        writeln!(f, "  Cancelled: {}", self.cancelled)?;
        writeln!(f, "Requests:")?;
        writeln!(f, "  Network: {}", self.network_requests)?;
        writeln!(f, "  Cache hits: {}", self.cache_hits)?;
        writeln!(f, "  Empty listings: {}", self.empty_results)?;
        for (kind, count) in &self.soft_failures {
            writeln!(f, "  {}: {}", kind, count)?;
        }
        write!(f, "  Hard failures: {}", self.hard_failures)
    }
}
