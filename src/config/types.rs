use serde::Deserialize;
use crate::fetch::Redacted;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Default review listing host
pub const DEFAULT_BASE_URL: &str = "https://www.amazon.com";

/// Default browser user agent sent with every listing request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1.1 Safari/605.1.15";

/// Main configuration structure for Review-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub output: OutputConfig,
}

/// Harvest engine behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarvestConfig {
    /// Size of the global admission gate shared by every entity in a run
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Timeout applied to each individual fetch (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Total attempts for a request that keeps failing transiently
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Linear backoff base: the wait after attempt `n` is `base * n` (milliseconds)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Pages requested for every filter/sort combination
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Number of failed requests an entity may accumulate and still count as completed
    #[serde(default)]
    pub failure_tolerance: u32,
}

impl HarvestConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_pages: default_max_pages(),
            failure_tolerance: 0,
        }
    }
}

fn default_max_concurrent_fetches() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_pages() -> u32 {
    10
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Scheme and host of the review listing, e.g. `https://www.amazon.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Session credentials attached to outbound requests
///
/// Values beginning with `$` name an environment variable that is resolved
/// when the fetch client is built.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("cookies", &Redacted(&self.cookies))
            .field("headers", &Redacted(&self.headers))
            .finish()
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding runs, checkpoints and the product catalog
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory of cached page bodies
    #[serde(rename = "cache-dir")]
    pub cache_dir: String,

    /// Directory receiving one JSON document per harvested product
    #[serde(rename = "aggregate-dir")]
    pub aggregate_dir: String,
}
