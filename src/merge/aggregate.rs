use crate::extract::Review;
use crate::fetch::FailureReason;
use crate::request::{EntityId, RequestSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Finalized, deduplicated harvest result for one product
///
/// Reviews are ordered by id, provenance sets and failures by request, so two
/// aggregates built from the same sightings serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub entity_id: EntityId,
    pub name: Option<String>,
    pub overall_rating: Option<f64>,
    pub total_rating_count: Option<u64>,
    pub total_review_count: Option<u64>,
    pub reviews: Vec<ReviewRecord>,
    pub failures: Vec<RequestFailure>,
}

impl Aggregate {
    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn review(&self, id: &str) -> Option<&ReviewRecord> {
        self.reviews.iter().find(|r| r.review.id == id)
    }
}

/// A review together with every request it was seen under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(flatten)]
    pub review: Review,
    pub found_under: BTreeSet<RequestSpec>,
}

/// A request whose fetch yielded no usable data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFailure {
    pub request: RequestSpec,
    pub reason: FailureReason,
}
