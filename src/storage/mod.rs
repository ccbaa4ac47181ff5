//! Storage module for persisting harvest progress
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Run bookkeeping
//! - Entity checkpoints, consulted before work starts and written after each sweep
//! - The product catalog used as identifier source and completion sink

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SharedStorage, SqliteStorage};
pub use traits::{
    CheckpointStore, CompletionSink, IdentifierSource, Storage, StorageError, StorageResult,
};

use crate::request::EntityId;
use crate::state::EntityState;
use chrono::Utc;
use std::path::Path;

/// Opens (creating if needed) the storage database
///
/// Failure here is fatal to a run; nothing has been harvested yet.
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Durable marker that an entity's sweep finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub entity_id: EntityId,
    pub status: EntityState,
    pub failure_count: u64,
    pub review_count: u64,
    pub completed_at: String,
    pub run_id: Option<i64>,
}

impl CheckpointRecord {
    /// Creates a checkpoint stamped with the current time
    pub fn new(
        entity_id: EntityId,
        status: EntityState,
        failure_count: u64,
        review_count: u64,
        run_id: Option<i64>,
    ) -> Self {
        Self {
            entity_id,
            status,
            failure_count,
            review_count,
            completed_at: Utc::now().to_rfc3339(),
            run_id,
        }
    }
}
