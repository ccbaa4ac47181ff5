//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait,
//! and [`SharedStorage`], the handle the harvest engine uses.

use crate::request::EntityId;
use crate::state::EntityState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    CheckpointStore, CompletionSink, IdentifierSource, Storage, StorageError, StorageResult,
};
use crate::storage::{CheckpointRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; missing parent directories are created
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt.query_row([], Self::row_to_run).optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Checkpoints =====

    fn get_checkpoint(&self, entity: &EntityId) -> StorageResult<Option<CheckpointRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT status, failure_count, review_count, completed_at, run_id
                 FROM checkpoints WHERE entity_id = ?1",
                params![entity.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, failure_count, review_count, completed_at, run_id)) = row else {
            return Ok(None);
        };

        let status =
            EntityState::from_db_string(&status).ok_or_else(|| StorageError::CorruptCheckpoint {
                entity: entity.to_string(),
                status: status.clone(),
            })?;

        Ok(Some(CheckpointRecord {
            entity_id: entity.clone(),
            status,
            failure_count: failure_count as u64,
            review_count: review_count as u64,
            completed_at,
            run_id,
        }))
    }

    fn save_checkpoint(&mut self, checkpoint: &CheckpointRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO checkpoints
             (entity_id, status, failure_count, review_count, completed_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                checkpoint.entity_id.as_str(),
                checkpoint.status.to_db_string(),
                checkpoint.failure_count as i64,
                checkpoint.review_count as i64,
                checkpoint.completed_at,
                checkpoint.run_id,
            ],
        )?;
        Ok(())
    }

    fn clear_checkpoints(&mut self) -> StorageResult<u64> {
        let removed = self.conn.execute("DELETE FROM checkpoints", [])?;
        Ok(removed as u64)
    }

    // ===== Product Catalog =====

    fn insert_products(&mut self, entities: &[EntityId]) -> StorageResult<u64> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut added = 0u64;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO products (entity_id, added_at) VALUES (?1, ?2)")?;
            for entity in entities {
                added += stmt.execute(params![entity.as_str(), now])? as u64;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    fn list_products(&self) -> StorageResult<Vec<EntityId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT entity_id FROM products ORDER BY entity_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entities = Vec::new();
        for row in rows {
            let raw = row?;
            match EntityId::new(&raw) {
                Ok(entity) => entities.push(entity),
                Err(e) => tracing::warn!(entity = %raw, error = %e, "Skipping invalid catalog entry"),
            }
        }

        Ok(entities)
    }

    fn mark_harvested(&mut self, entity: &EntityId) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO products (entity_id, added_at, reviews_harvested_at) VALUES (?1, ?2, ?2)
             ON CONFLICT(entity_id) DO UPDATE SET reviews_harvested_at = excluded.reviews_harvested_at",
            params![entity.as_str(), now],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_checkpoints_by_status(&self) -> StorageResult<HashMap<EntityState, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM checkpoints GROUP BY status")?;

        let mut summary = HashMap::new();
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        for row in rows {
            let (status, count) = row?;
            if let Some(state) = EntityState::from_db_string(&status) {
                summary.insert(state, count as u64);
            }
        }

        Ok(summary)
    }

    fn count_products(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_harvested_products(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE reviews_harvested_at IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn total_reviews(&self) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(review_count), 0) FROM checkpoints",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }
}

/// Thread-safe handle to a [`SqliteStorage`]
///
/// Implements the engine-facing seams; every call takes the lock for the
/// duration of one statement.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<Mutex<SqliteStorage>>,
}

impl SharedStorage {
    pub fn new(storage: SqliteStorage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(storage)),
        }
    }

    /// Locks the underlying storage
    pub fn lock(&self) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
        self.inner.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl CheckpointStore for SharedStorage {
    fn is_complete(&self, entity: &EntityId) -> StorageResult<bool> {
        Ok(self
            .lock()?
            .get_checkpoint(entity)?
            .map_or(false, |c| c.status.is_checkpointed()))
    }

    fn mark_complete(&self, checkpoint: &CheckpointRecord) -> StorageResult<()> {
        self.lock()?.save_checkpoint(checkpoint)
    }
}

impl IdentifierSource for SharedStorage {
    fn entity_ids(&self) -> StorageResult<Vec<EntityId>> {
        self.lock()?.list_products()
    }
}

impl CompletionSink for SharedStorage {
    fn acknowledge(&self, entity: &EntityId) -> StorageResult<()> {
        self.lock()?.mark_harvested(entity)
    }
}
