//! Sort and filter dimensions of the review listing
//!
//! Every enumeration exposes `ALL` in a fixed order; the planner relies on that
//! order to emit requests deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing sort order (`sortBy`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Recent,
    Helpful,
}

impl SortOrder {
    pub const ALL: [SortOrder; 2] = [Self::Recent, Self::Helpful];

    pub fn query_value(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Helpful => "helpful",
        }
    }
}

/// Star rating filter (`filterByStar`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarFilter {
    AllStars,
    FiveStar,
    FourStar,
    ThreeStar,
    TwoStar,
    OneStar,
    Positive,
    Critical,
}

impl StarFilter {
    pub const ALL: [StarFilter; 8] = [
        Self::AllStars,
        Self::FiveStar,
        Self::FourStar,
        Self::ThreeStar,
        Self::TwoStar,
        Self::OneStar,
        Self::Positive,
        Self::Critical,
    ];

    pub fn query_value(&self) -> &'static str {
        match self {
            Self::AllStars => "all_stars",
            Self::FiveStar => "five_star",
            Self::FourStar => "four_star",
            Self::ThreeStar => "three_star",
            Self::TwoStar => "two_star",
            Self::OneStar => "one_star",
            Self::Positive => "positive",
            Self::Critical => "critical",
        }
    }
}

/// Product format filter (`formatType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatFilter {
    AllFormats,
    CurrentFormat,
}

impl FormatFilter {
    pub const ALL: [FormatFilter; 2] = [Self::AllFormats, Self::CurrentFormat];

    pub fn query_value(&self) -> &'static str {
        match self {
            Self::AllFormats => "all_formats",
            Self::CurrentFormat => "current_format",
        }
    }
}

/// Review media filter (`mediaType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaFilter {
    AllContents,
    MediaReviewsOnly,
}

impl MediaFilter {
    pub const ALL: [MediaFilter; 2] = [Self::AllContents, Self::MediaReviewsOnly];

    pub fn query_value(&self) -> &'static str {
        match self {
            Self::AllContents => "all_contents",
            Self::MediaReviewsOnly => "media_reviews_only",
        }
    }
}

macro_rules! display_as_query_value {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.query_value())
                }
            }
        )*
    };
}

display_as_query_value!(SortOrder, StarFilter, FormatFilter, MediaFilter);

/// Number of filter/sort combinations swept for each page number
pub fn combination_count() -> usize {
    SortOrder::ALL.len() * StarFilter::ALL.len() * FormatFilter::ALL.len() * MediaFilter::ALL.len()
}
