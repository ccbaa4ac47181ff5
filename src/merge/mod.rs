//! Aggregate merging
//!
//! [`AggregateMerger`] folds the page fragments of one product's sweep into a
//! single deduplicated [`Aggregate`] with per-review provenance.

mod aggregate;
mod merger;

pub use aggregate::{Aggregate, RequestFailure, ReviewRecord};
pub use merger::AggregateMerger;
