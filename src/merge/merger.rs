use crate::extract::{AggregateHints, PageFragment, Review};
use crate::fetch::{FailureReason, FetchOutcome};
use crate::merge::aggregate::{Aggregate, RequestFailure, ReviewRecord};
use crate::request::{EntityId, RequestSpec};
use std::collections::{BTreeMap, BTreeSet};

/// A value together with the request it was taken from
#[derive(Debug, Clone)]
struct Sourced<T> {
    origin: RequestSpec,
    value: T,
}

impl<T> Sourced<T> {
    /// Keeps the value from the earliest request in plan order
    fn offer(slot: &mut Option<Sourced<T>>, origin: &RequestSpec, value: T) {
        match slot {
            Some(current) if current.origin <= *origin => {}
            _ => {
                *slot = Some(Sourced {
                    origin: origin.clone(),
                    value,
                })
            }
        }
    }
}

#[derive(Debug)]
struct ReviewEntry {
    /// Sighting whose fields are kept (the earliest origin in plan order)
    canonical: Sourced<Review>,
    found_under: BTreeSet<RequestSpec>,
}

/// Folds the fragments of one product's sweep into an [`Aggregate`]
///
/// Fragments may arrive in any order; the finalized aggregate does not depend
/// on it:
/// - name and overall rating come from the earliest request (plan order) that
///   reported one
/// - counters keep the maximum reported value
/// - a review is stored once per id, its provenance is the union of every
///   request it was seen under, and its fields come from the earliest sighting
/// - a request that succeeded is never listed as failed, whatever order its
///   outcomes were folded in
#[derive(Debug)]
pub struct AggregateMerger {
    entity: EntityId,
    name: Option<Sourced<String>>,
    overall_rating: Option<Sourced<f64>>,
    total_rating_count: Option<u64>,
    total_review_count: Option<u64>,
    reviews: BTreeMap<String, ReviewEntry>,
    failures: BTreeMap<RequestSpec, FailureReason>,
    succeeded: BTreeSet<RequestSpec>,
}

impl AggregateMerger {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            name: None,
            overall_rating: None,
            total_rating_count: None,
            total_review_count: None,
            reviews: BTreeMap::new(),
            failures: BTreeMap::new(),
            succeeded: BTreeSet::new(),
        }
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    /// Folds the fragment extracted from `origin`'s page
    pub fn merge(&mut self, origin: &RequestSpec, fragment: PageFragment) {
        if !self.accepts(origin) {
            return;
        }

        self.failures.remove(origin);
        self.succeeded.insert(origin.clone());

        self.merge_hints(origin, fragment.hints);

        for review in fragment.reviews {
            if review.id.is_empty() {
                continue;
            }

            match self.reviews.get_mut(&review.id) {
                Some(entry) => {
                    entry.found_under.insert(origin.clone());
                    if *origin < entry.canonical.origin {
                        entry.canonical = Sourced {
                            origin: origin.clone(),
                            value: review,
                        };
                    }
                }
                None => {
                    let mut found_under = BTreeSet::new();
                    found_under.insert(origin.clone());
                    self.reviews.insert(
                        review.id.clone(),
                        ReviewEntry {
                            canonical: Sourced {
                                origin: origin.clone(),
                                value: review,
                            },
                            found_under,
                        },
                    );
                }
            }
        }
    }

    /// Records that `origin` yielded no usable data
    ///
    /// Ignored when `origin` already produced a fragment.
    pub fn record_failure(&mut self, origin: &RequestSpec, reason: FailureReason) {
        if !self.accepts(origin) || self.succeeded.contains(origin) {
            return;
        }
        self.failures.insert(origin.clone(), reason);
    }

    /// Records a non-success outcome; `no_results` leaves no trace
    pub fn record_outcome(&mut self, origin: &RequestSpec, outcome: &FetchOutcome) {
        if let Some(reason) = outcome.failure_reason() {
            self.record_failure(origin, reason);
        }
    }

    /// Number of requests currently listed as failed
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    /// Produces the immutable aggregate
    pub fn finalize(self) -> Aggregate {
        Aggregate {
            entity_id: self.entity,
            name: self.name.map(|s| s.value),
            overall_rating: self.overall_rating.map(|s| s.value),
            total_rating_count: self.total_rating_count,
            total_review_count: self.total_review_count,
            reviews: self
                .reviews
                .into_values()
                .map(|entry| ReviewRecord {
                    review: entry.canonical.value,
                    found_under: entry.found_under,
                })
                .collect(),
            failures: self
                .failures
                .into_iter()
                .map(|(request, reason)| RequestFailure { request, reason })
                .collect(),
        }
    }

    fn accepts(&self, origin: &RequestSpec) -> bool {
        if origin.entity != self.entity {
            tracing::warn!(
                entity = %self.entity,
                request = %origin,
                "Ignoring request that belongs to another entity"
            );
            return false;
        }
        true
    }

    fn merge_hints(&mut self, origin: &RequestSpec, hints: AggregateHints) {
        if let Some(name) = hints.product_name.filter(|n| !n.is_empty()) {
            Sourced::offer(&mut self.name, origin, name);
        }

        if let Some(rating) = hints.overall_rating.filter(|r| *r > 0.0) {
            Sourced::offer(&mut self.overall_rating, origin, rating);
        }

        self.total_rating_count = max_of(self.total_rating_count, hints.total_rating_count);
        self.total_review_count = max_of(self.total_review_count, hints.total_review_count);
    }
}

fn max_of(current: Option<u64>, seen: Option<u64>) -> Option<u64> {
    match (current, seen) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
