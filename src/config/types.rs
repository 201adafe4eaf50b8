use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for a ripplefront run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub kv: KvConfig,
    pub frontier: FrontierConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    /// Path to the newline-delimited seed URL list.
    #[serde(rename = "seed-file")]
    pub seed_file: PathBuf,
}

/// Connection settings for the networked KV store.
#[derive(Debug, Clone, Deserialize)]
pub struct KvConfig {
    /// Redis-compatible connection URL, e.g. `redis://127.0.0.1:6379`.
    pub url: String,
    /// Number of independent connections `RedisKv` opens against `url`,
    /// routed by `hash(domain) % shard_count` (spec §2: "pipelining,
    /// sharded routing by domain"), so a hot domain's pipeline can't
    /// head-of-line block another's on a single multiplexed connection.
    #[serde(default = "default_shard_count")]
    pub shard_count: u32,
}

fn default_shard_count() -> u32 {
    16
}

/// On-disk layout settings for the frontier.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontierConfig {
    /// Root directory under which `frontiers/` and `content/` live.
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

/// Politeness thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Floor on the delay between requests to the same domain, in seconds
    /// (spec §4.1: `MIN_CRAWL_DELAY`, default 70s).
    #[serde(rename = "min-crawl-delay-secs", default = "default_min_crawl_delay")]
    pub min_crawl_delay_secs: u64,
    /// Fixed capacity of the in-process robots parser LRU (spec §3, default
    /// 10 000).
    #[serde(rename = "robots-cache-capacity", default = "default_robots_cache_capacity")]
    pub robots_cache_capacity: usize,
    /// Robots cache TTL in hours (spec §4.1 step 3, default 24h).
    #[serde(rename = "robots-ttl-hours", default = "default_robots_ttl_hours")]
    pub robots_ttl_hours: i64,
    /// Optional path to a newline-delimited manual exclusion list (spec
    /// §4.1 `load_manual_exclusions`).
    #[serde(rename = "manual-exclusions-file")]
    pub manual_exclusions_file: Option<PathBuf>,
}

fn default_min_crawl_delay() -> u64 {
    70
}

fn default_robots_cache_capacity() -> usize {
    10_000
}

fn default_robots_ttl_hours() -> i64 {
    24
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            min_crawl_delay_secs: default_min_crawl_delay(),
            robots_cache_capacity: default_robots_cache_capacity(),
            robots_ttl_hours: default_robots_ttl_hours(),
            manual_exclusions_file: None,
        }
    }
}

/// Orchestrator sizing and stop conditions.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Number of concurrent fetcher tasks (spec §4.5, default 500).
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: u32,
    /// Stop the crawl after this many successful fetches, if set.
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u64>,
    /// Stop the crawl after this many seconds, if set.
    #[serde(rename = "max-duration-secs")]
    pub max_duration_secs: Option<u64>,
    /// How long a worker sleeps after `get_next_url` returns `None` (spec
    /// §4.5, default 10s).
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Interval between maintenance/gauge-emission ticks (spec §4.5,
    /// default 60s).
    #[serde(rename = "maintenance-interval-secs", default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,
}

fn default_max_workers() -> u32 {
    500
}

fn default_poll_interval() -> u64 {
    10
}

fn default_maintenance_interval() -> u64 {
    60
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_pages: None,
            max_duration_secs: None,
            poll_interval_secs: default_poll_interval(),
            maintenance_interval_secs: default_maintenance_interval(),
        }
    }
}

/// User agent identification, used both for robots.txt matching and the
/// outgoing `User-Agent` header.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
    #[serde(rename = "contact-url")]
    pub contact_url: String,
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full `User-Agent` header value: `Name/Version (+URL; email)`.
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
