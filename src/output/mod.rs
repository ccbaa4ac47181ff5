//! Output module for harvest results and reports
//!
//! This module handles:
//! - Writing one JSON document per finalized aggregate
//! - Loading and printing harvest statistics from the database

pub mod stats;
mod writer;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};
pub use writer::AggregateWriter;

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize aggregate: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
