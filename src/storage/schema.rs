//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the Review-Harvester database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per entity whose sweep finished (completed or partially failed)
CREATE TABLE IF NOT EXISTS checkpoints (
    entity_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    failure_count INTEGER NOT NULL DEFAULT 0,
    review_count INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_checkpoints_status ON checkpoints(status);

-- Product catalog: identifier source and completion sink
CREATE TABLE IF NOT EXISTS products (
    entity_id TEXT PRIMARY KEY,
    added_at TEXT NOT NULL,
    reviews_harvested_at TEXT
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
