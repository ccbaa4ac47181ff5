//! Configuration module for Review-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use review_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Concurrent fetches: {}", config.harvest.max_concurrent_fetches);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CredentialsConfig, HarvestConfig, OutputConfig, SiteConfig, DEFAULT_BASE_URL,
    DEFAULT_USER_AGENT,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
