//! Request space of a review sweep
//!
//! This module contains:
//! - The filter and sort enumerations of the review listing
//! - [`EntityId`] and [`RequestSpec`], the identity of one page request
//! - URL normalization and cache key derivation
//! - [`RequestPlanner`], which expands an entity into its full sweep

mod filters;
mod normalize;
mod planner;
mod spec;

pub use filters::{combination_count, FormatFilter, MediaFilter, SortOrder, StarFilter};
pub use normalize::{cache_key_for, normalize_url};
pub use planner::RequestPlanner;
pub use spec::{CacheKey, EntityId, RequestSpec};
