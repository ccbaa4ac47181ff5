//! Storage traits and error types
//!
//! [`Storage`] is the full database interface. The harvest engine only sees the
//! three narrow seams built on top of it: [`CheckpointStore`],
//! [`IdentifierSource`] and [`CompletionSink`].

use crate::request::EntityId;
use crate::state::EntityState;
use crate::storage::{CheckpointRecord, RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Checkpoint for {entity} has unknown status '{status}'")]
    CorruptCheckpoint { entity: String, status: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with the given status and a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Checkpoints =====

    /// Gets the checkpoint of an entity, if its sweep finished in an earlier run
    fn get_checkpoint(&self, entity: &EntityId) -> StorageResult<Option<CheckpointRecord>>;

    /// Inserts or replaces the checkpoint of an entity
    fn save_checkpoint(&mut self, checkpoint: &CheckpointRecord) -> StorageResult<()>;

    /// Removes every checkpoint, returning how many were removed
    fn clear_checkpoints(&mut self) -> StorageResult<u64>;

    // ===== Product Catalog =====

    /// Adds products to the catalog, ignoring ones already present
    ///
    /// # Returns
    ///
    /// The number of newly added products
    fn insert_products(&mut self, entities: &[EntityId]) -> StorageResult<u64>;

    /// Lists catalog identifiers in identifier order
    ///
    /// Rows whose identifier is not a valid [`EntityId`] are skipped.
    fn list_products(&self) -> StorageResult<Vec<EntityId>>;

    /// Records that an entity's reviews were harvested
    fn mark_harvested(&mut self, entity: &EntityId) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts checkpoints per status
    fn count_checkpoints_by_status(&self) -> StorageResult<HashMap<EntityState, u64>>;

    /// Counts catalog products
    fn count_products(&self) -> StorageResult<u64>;

    /// Counts catalog products with a harvest timestamp
    fn count_harvested_products(&self) -> StorageResult<u64>;

    /// Sums review counts across all checkpoints
    fn total_reviews(&self) -> StorageResult<u64>;
}

/// Durable record of which entities are done
pub trait CheckpointStore: Send + Sync {
    /// Whether the entity's sweep finished in an earlier run
    fn is_complete(&self, entity: &EntityId) -> StorageResult<bool>;

    /// Records a finished sweep
    fn mark_complete(&self, checkpoint: &CheckpointRecord) -> StorageResult<()>;
}

/// Read-once source of the identifiers to harvest
pub trait IdentifierSource {
    fn entity_ids(&self) -> StorageResult<Vec<EntityId>>;
}

/// Acknowledges entities whose sweep finished
pub trait CompletionSink: Send + Sync {
    fn acknowledge(&self, entity: &EntityId) -> StorageResult<()>;
}
