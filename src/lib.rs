//! Review-Harvester: an exhaustive review sweeper
//!
//! This crate harvests every review for a catalog of products from a paginated,
//! filterable review listing. Each product is expanded into the full cross-product
//! of sort orders, star filters, format filters, media filters and page numbers;
//! pages are fetched under a global concurrency bound with retry and caching, and
//! the extracted reviews are folded into one deduplicated, provenance-tracked
//! aggregate per product. Progress is checkpointed so long runs can resume.

pub mod cache;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod harvest;
pub mod merge;
pub mod output;
pub mod request;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for run-level failures
///
/// Per-request failures are never represented here; they are values of
/// [`fetch::FetchOutcome`] and end up in an aggregate's failure list.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Page cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::EntityState,
        to: state::EntityState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Environment variable '{0}' referenced by credentials is not set")]
    MissingEnv(String),

    #[error("Invalid credential header: {0}")]
    InvalidHeader(String),
}

/// Errors raised while turning identifiers into requests
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid entity identifier: {0:?}")]
    InvalidEntity(String),

    #[error("Invalid request URL: {0}")]
    InvalidRequest(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for request operations
pub type RequestResult<T> = std::result::Result<T, RequestError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{FetchClient, FetchOutcome, HardFailureKind, SoftFailureKind};
pub use merge::{Aggregate, AggregateMerger};
pub use request::{EntityId, RequestPlanner, RequestSpec};
pub use state::EntityState;
