//! Review-Harvester main entry point
//!
//! This is the command-line interface for the Review-Harvester sweeper.

use anyhow::Context;
use clap::Parser;
use review_harvester::config::{load_config_with_hash, Config};
use review_harvester::harvest::run_harvest;
use review_harvester::output::{load_statistics, print_statistics};
use review_harvester::request::{combination_count, EntityId, RequestPlanner};
use review_harvester::storage::{open_storage, Storage};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Review-Harvester: an exhaustive review sweeper
///
/// Review-Harvester sweeps every sort, star, format and media filter
/// combination of a product's review listing, merges what it finds into one
/// deduplicated document per product, and checkpoints finished products so
/// interrupted runs resume where they left off.
#[derive(Parser, Debug)]
#[command(name = "review-harvester")]
#[command(version)]
#[command(about = "An exhaustive review sweeper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Product identifiers to harvest (default: the whole catalog)
    #[arg(value_name = "ID")]
    ids: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Clear checkpoints and harvest every product again
    #[arg(long)]
    fresh: bool,

    /// Validate config and show the planned requests without fetching
    #[arg(long, conflicts_with_all = ["stats", "import"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "import"])]
    stats: bool,

    /// Add the identifiers listed in FILE (one per line) to the catalog and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "stats"])]
    import: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let ids = parse_ids(&cli.ids)?;

    if cli.dry_run {
        handle_dry_run(&config, &ids)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(path) = &cli.import {
        handle_import(&config, path)
    } else {
        handle_harvest(&config, &config_hash, ids, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_harvester=info,warn"),
            1 => EnvFilter::new("review_harvester=debug,info"),
            2 => EnvFilter::new("review_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn parse_ids(raw: &[String]) -> anyhow::Result<Vec<EntityId>> {
    raw.iter()
        .map(|id| EntityId::new(id).map_err(anyhow::Error::from))
        .collect()
}

/// Handles the --dry-run mode: validates config and shows the request plan
fn handle_dry_run(config: &Config, ids: &[EntityId]) -> anyhow::Result<()> {
    let planner = RequestPlanner::from_config(&config.harvest);

    println!("=== Review-Harvester Dry Run ===\n");

    println!("Harvest Configuration:");
    println!(
        "  Max concurrent fetches: {}",
        config.harvest.max_concurrent_fetches
    );
    println!(
        "  Request timeout: {}s",
        config.harvest.request_timeout_secs
    );
    println!(
        "  Retry attempts: {} (base delay {}ms)",
        config.harvest.retry_attempts, config.harvest.retry_base_delay_ms
    );
    println!("  Max pages: {}", config.harvest.max_pages);
    println!("  Failure tolerance: {}", config.harvest.failure_tolerance);

    println!("\nSite:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  User agent: {}", config.site.user_agent);
    println!(
        "  Credentials: {} cookies, {} headers",
        config.credentials.cookies.len(),
        config.credentials.headers.len()
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Page cache: {}", config.output.cache_dir);
    println!("  Aggregates: {}", config.output.aggregate_dir);

    let ids = if ids.is_empty() {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        storage.list_products()?
    } else {
        ids.to_vec()
    };

    println!(
        "\nRequests per product: {} ({} filter combinations x {} pages)",
        planner.requests_per_entity(),
        combination_count(),
        planner.max_pages()
    );
    for id in &ids {
        println!("  - {}: {} requests", id, planner.plan_entity(id).len());
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would plan {} requests for {} products",
        planner.requests_per_entity() * ids.len(),
        ids.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --import mode: adds identifiers to the catalog
fn handle_import(config: &Config, path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut ids = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let id = EntityId::new(line)
            .with_context(|| format!("{}:{}", path.display(), line_no + 1))?;
        ids.push(id);
    }

    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let added = storage.insert_products(&ids)?;

    println!(
        "✓ Imported {} identifiers ({} new, {} in catalog)",
        ids.len(),
        added,
        storage.count_products()?
    );

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: &Config,
    config_hash: &str,
    ids: Vec<EntityId>,
    fresh: bool,
) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring checkpoints)");
    } else {
        tracing::info!("Starting harvest (checkpointed products are skipped)");
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, letting in-flight requests finish");
            on_interrupt.cancel();
        }
    });

    let entities = if ids.is_empty() { None } else { Some(ids) };

    let report = run_harvest(config, config_hash, entities, fresh, cancel)
        .await
        .context("Harvest failed")?;

    if report.was_interrupted() {
        tracing::warn!("Harvest interrupted; rerun to resume");
    } else {
        tracing::info!("Harvest completed successfully");
    }
    println!("{}", report);

    Ok(())
}
