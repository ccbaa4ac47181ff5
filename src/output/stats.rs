//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::state::EntityState;
use crate::storage::{RunRecord, Storage, StorageResult};
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Number of products in the catalog
    pub total_products: u64,

    /// Catalog products with a harvest timestamp
    pub harvested_products: u64,

    /// Count of checkpoints by entity state
    pub checkpoints_by_status: HashMap<EntityState, u64>,

    /// Reviews recorded across all checkpoints
    pub total_reviews: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

impl HarvestStatistics {
    pub fn checkpointed(&self) -> u64 {
        self.checkpoints_by_status.values().sum()
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<HarvestStatistics> {
    Ok(HarvestStatistics {
        total_products: storage.count_products()?,
        harvested_products: storage.count_harvested_products()?,
        checkpoints_by_status: storage.count_checkpoints_by_status()?,
        total_reviews: storage.total_reviews()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Products in catalog: {}", stats.total_products);
    println!("  Products harvested: {}", stats.harvested_products);
    println!("  Reviews collected: {}", stats.total_reviews);
    println!();

    println!("Checkpoints by Status:");
    let mut status_counts: Vec<_> = stats.checkpoints_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    let checkpointed = stats.checkpointed();
    for (state, count) in status_counts {
        let percentage = if checkpointed > 0 {
            (*count as f64 / checkpointed as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  ID: {}", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!("  Config hash: {}", run.config_hash);
        println!();
    }

    let completed = stats
        .checkpoints_by_status
        .get(&EntityState::Completed)
        .unwrap_or(&0);
    let completion_rate = if checkpointed > 0 {
        (*completed as f64 / checkpointed as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Completion Rate: {:.1}% ({} / {} entities fully harvested)",
        completion_rate, completed, checkpointed
    );
}
