//! Page extraction
//!
//! Turns one fetched page body into a [`PageFragment`]: the reviews on the page
//! plus whatever product-level figures the page shows. Extraction is pure and
//! never fails; missing markup yields absent fields.

mod review_page;
pub mod text;

pub use review_page::ReviewPageExtractor;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Extracts a fragment from a page body
pub trait PageExtractor: Send + Sync {
    fn extract(&self, body: &str) -> PageFragment;
}

/// Everything one listing page contributes to its product's aggregate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFragment {
    /// Reviews in page order; every review has a non-empty id
    pub reviews: Vec<Review>,
    pub hints: AggregateHints,
}

/// Product-level figures shown on a listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateHints {
    pub product_name: Option<String>,
    pub overall_rating: Option<f64>,
    pub total_rating_count: Option<u64>,
    pub total_review_count: Option<u64>,
}

/// One customer review, identified by its listing element id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub rating: Option<f64>,
    pub title: Option<String>,
    pub href: Option<String>,
    pub country: Option<String>,
    pub date: Option<NaiveDate>,
    pub body: Option<String>,
    pub verified_purchase: bool,
    pub found_helpful: u64,
    pub username: Option<String>,
    pub username_url: Option<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}
