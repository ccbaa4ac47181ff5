//! Harvest orchestration
//!
//! This module runs sweeps end to end:
//! - Wiring the page cache, fetch client, storage and aggregate writer
//! - Skipping checkpointed entities and checkpointing finished ones
//! - Bounding fetch concurrency across the whole run
//! - Cooperative cancellation
//! - Progress events and the final run report

mod orchestrator;
pub mod progress;
mod report;

pub use orchestrator::HarvestOrchestrator;
pub use progress::{
    HarvestEvent, ProgressReporter, RecordingReporter, ResolvedAs, TracingReporter,
};
pub use report::HarvestReport;

use crate::cache::FsPageCache;
use crate::config::Config;
use crate::fetch::{Credentials, FetchClient};
use crate::output::AggregateWriter;
use crate::request::EntityId;
use crate::storage::{open_storage, IdentifierSource, RunStatus, SharedStorage, Storage};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs one harvest as configured
///
/// `entities` are added to the catalog and harvested; when `None`, the whole
/// catalog is harvested. `fresh` clears every checkpoint first. Failing to set
/// up the page cache, the database or the output directory is fatal before any
/// entity is processed.
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    entities: Option<Vec<EntityId>>,
    fresh: bool,
    cancel: CancellationToken,
) -> Result<HarvestReport, HarvestError> {
    let cache = FsPageCache::new(&config.output.cache_dir)?;
    let writer = AggregateWriter::new(&config.output.aggregate_dir)?;
    let credentials = Credentials::from_config(&config.credentials)?;
    let client = Arc::new(FetchClient::new(config, &credentials, Arc::new(cache))?);

    let mut storage = open_storage(Path::new(&config.output.database_path))?;

    if fresh {
        let cleared = storage.clear_checkpoints()?;
        tracing::info!(cleared, "Cleared checkpoints for a fresh harvest");
    }

    if let Some(ids) = &entities {
        let added = storage.insert_products(ids)?;
        tracing::debug!(added, "Added products to the catalog");
    }

    let run_id = storage.create_run(config_hash)?;
    let storage = SharedStorage::new(storage);

    let entities = match entities {
        Some(ids) => ids,
        None => storage.entity_ids()?,
    };

    tracing::info!(run_id, base_url = %client.base_url(), "Starting harvest run");

    let orchestrator = HarvestOrchestrator::new(
        &config.harvest,
        client,
        Arc::new(storage.clone()),
        Arc::new(storage.clone()),
        writer,
    )
    .with_cancellation(cancel)
    .with_run_id(run_id);

    let result = orchestrator.run(entities).await;

    let status = match &result {
        Ok(report) if report.was_interrupted() => RunStatus::Interrupted,
        Ok(_) => RunStatus::Completed,
        Err(_) => RunStatus::Failed,
    };
    storage.lock()?.finish_run(run_id, status)?;

    result
}
