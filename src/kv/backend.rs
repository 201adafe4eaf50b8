use super::KvError;
use async_trait::async_trait;

/// The raw contents of a `domain:<d>` hash (spec §6 schema table).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainRecord {
    pub frontier_offset: u64,
    pub frontier_size: u64,
    pub file_path: Option<String>,
    pub is_seeded: bool,
    pub is_excluded: bool,
    pub next_fetch_time: Option<i64>,
    pub robots_txt: Option<String>,
    pub robots_expires: Option<i64>,
}

/// Fields recorded for a single fetch outcome (spec §6 `visited:<16-hex>`).
#[derive(Debug, Clone)]
pub struct VisitedFields {
    pub url: String,
    pub url_sha256: String,
    pub domain: String,
    pub status_code: Option<u16>,
    pub fetched_at: i64,
    pub content_path: Option<String>,
    pub content_type: Option<String>,
    pub content_hash: Option<String>,
    pub redirected_to_url: Option<String>,
    pub error: Option<String>,
}

/// A claimed ready-domain popped off `domains:queue`, with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyDomain {
    pub domain: String,
    pub next_fetch_time: f64,
}

/// Abstraction over the networked KV store described in spec §6: hashes for
/// per-domain state, a sorted set for ready-domain scheduling, a bloom
/// filter for probabilistic URL dedup, and a sorted set of visited records.
///
/// All mutation here is a single atomic server-side command or a single
/// pipelined round-trip — no read-modify-write sequence is ever performed
/// against shared state client-side (spec §5). This trait is the seam the
/// teacher's `storage::Storage` trait occupies for SQLite: one interface,
/// swappable backends, easy to fake in tests.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Reads `schema_version`, if it has been set.
    async fn schema_version(&self) -> Result<Option<u32>, KvError>;

    /// Sets `schema_version` (idempotent; run once at startup).
    async fn set_schema_version(&self, version: u32) -> Result<(), KvError>;

    /// Reads the full `domain:<d>` hash.
    async fn get_domain(&self, domain: &str) -> Result<DomainRecord, KvError>;

    /// Admits a batch of already-filtered, already-deduped URLs belonging to
    /// one domain in a single pipelined round-trip (spec §4.3 step 5):
    /// `BF.ADD` each URL, `HINCRBY frontier_size` by `bytes_written`,
    /// `HSETNX is_seeded 0`, `SADD domains:index`, and `ZADD LT domains:queue
    /// now`. `file_path` is set via `HSETNX` so the first writer wins.
    async fn admit_domain_batch(
        &self,
        domain: &str,
        file_path: &str,
        urls: &[String],
        bytes_written: u64,
        now: f64,
    ) -> Result<(), KvError>;

    /// Pops the domain with the lowest `next_fetch_time` score, if any
    /// (`ZPOPMIN domains:queue`).
    async fn pop_ready_domain(&self) -> Result<Option<ReadyDomain>, KvError>;

    /// Re-inserts a domain into `domains:queue` at exactly `score`, used
    /// when a popped domain turns out not to be ready yet, or when the
    /// migrator/maintenance tools need to set a score unconditionally.
    async fn reinsert_domain(&self, domain: &str, score: f64) -> Result<(), KvError>;

    /// Persists a new frontier offset for `domain` (`HSET frontier_offset`).
    async fn set_frontier_offset(&self, domain: &str, offset: u64) -> Result<(), KvError>;

    /// Atomically resets both `frontier_offset` and `frontier_size`, used by
    /// the frontier normalizer after it rewrites a domain's file wholesale.
    async fn reset_frontier(&self, domain: &str, offset: u64, size: u64) -> Result<(), KvError>;

    /// Records a fetch attempt and reschedules the domain unconditionally
    /// to `next_fetch_time` (spec §4.4 step 7 — "Unconditional here").
    async fn record_fetch_and_reschedule(
        &self,
        domain: &str,
        next_fetch_time: f64,
    ) -> Result<(), KvError>;

    /// Removes a domain from `domains:queue` without touching its hash
    /// (used by the empty-domain pruner).
    async fn remove_from_queue(&self, domain: &str) -> Result<(), KvError>;

    /// Lists every domain ever admitted (`SMEMBERS domains:index`), used by
    /// maintenance tools that must walk all known domains.
    async fn all_domains(&self) -> Result<Vec<String>, KvError>;

    /// Persists a (possibly truncated) robots.txt body and its expiry.
    async fn set_domain_robots(
        &self,
        domain: &str,
        body: &str,
        expires: i64,
    ) -> Result<(), KvError>;

    /// Marks a set of domains as manually excluded (`load_manual_exclusions`,
    /// spec §4.1), in one batch.
    async fn set_domains_excluded(&self, domains: &[String]) -> Result<(), KvError>;

    /// `BF.EXISTS seen:bloom <url>` for every URL in one pipelined call.
    async fn bloom_check_batch(&self, urls: &[String]) -> Result<Vec<bool>, KvError>;

    /// Records a fetch outcome (`HSET visited:<id> ...` + `ZADD
    /// visited:by_time`), in one pipelined round-trip.
    async fn record_visited(&self, visited_id: &str, fields: VisitedFields) -> Result<(), KvError>;

    /// Number of members currently in `domains:queue` (for gauges).
    async fn queue_len(&self) -> Result<u64, KvError>;
}
