use super::file_store::FrontierFileStore;
use super::types::{DomainEntry, FrontierError, UrlRecord};
use crate::kv::KvBackend;
use crate::politeness::PolitenessEnforcer;
use crate::url::{extract_registered_domain, is_likely_non_text, normalize_url, MAX_URL_LENGTH};
use crate::PageOutcome;
use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

/// Number of buckets in the sharded per-domain mutex map (spec §5: "a
/// sharded mutex map... bucketed by domain hash into a small fixed number of
/// buckets"). 256 keeps collision probability low at the thousands-of-
/// concurrent-fetchers scale this crate targets without allocating one
/// mutex per domain.
const DOMAIN_LOCK_SHARDS: usize = 256;

/// A small bound on how many lines `get_next_url` will skip within a single
/// domain (malformed lines, robots-blocked lines) before giving the domain
/// back to the queue, so one bad domain can't starve the others.
const MAX_SKIP_ITERATIONS: u32 = 50;

/// A URL handed to exactly one caller by [`FrontierManager::get_next_url`].
/// `id` has no backing row in this schema; it is kept at a fixed `-1`
/// purely to preserve the literal four-tuple shape the source API returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedUrl {
    pub url: String,
    pub domain: String,
    pub depth: u32,
    pub id: i64,
}

/// Adds discovered URLs (deduped, normalized, policy-filtered) and serves
/// the next claimable URL, maintaining the ready-domain priority queue.
///
/// Grounded in the teacher's `crawler::scheduler::Scheduler`
/// (claim/dispatch shape) generalized from an in-process `BinaryHeap` to a
/// KV-store-backed sorted set so the queue is shared across thousands of
/// tasks instead of owned by one.
pub struct FrontierManager {
    kv: Arc<dyn KvBackend>,
    files: FrontierFileStore,
    politeness: Arc<PolitenessEnforcer>,
    domain_locks: Vec<AsyncMutex<()>>,
}

impl FrontierManager {
    pub fn new(
        kv: Arc<dyn KvBackend>,
        files: FrontierFileStore,
        politeness: Arc<PolitenessEnforcer>,
    ) -> Self {
        let domain_locks = (0..DOMAIN_LOCK_SHARDS).map(|_| AsyncMutex::new(())).collect();
        Self {
            kv,
            files,
            politeness,
            domain_locks,
        }
    }

    fn shard_for(&self, domain: &str) -> &AsyncMutex<()> {
        let mut hasher = DefaultHasher::new();
        domain.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.domain_locks.len();
        &self.domain_locks[index]
    }

    /// Reads a domain's current KV state as a [`DomainEntry`].
    pub async fn describe_domain(&self, domain: &str) -> Result<DomainEntry, FrontierError> {
        let record = self.kv.get_domain(domain).await?;
        Ok(DomainEntry {
            domain: domain.to_string(),
            file_path: record
                .file_path
                .unwrap_or_else(|| FrontierFileStore::relative_path(domain)),
            frontier_offset: record.frontier_offset,
            frontier_size: record.frontier_size,
            is_seeded: record.is_seeded,
            is_excluded: record.is_excluded,
            next_fetch_time: record.next_fetch_time,
        })
    }

    /// Adds a batch of raw, freshly-discovered URLs at `depth`. Returns the
    /// number of URL lines actually written to disk (spec §4.3).
    pub async fn add_urls_batch(&self, urls: &[String], depth: u32) -> Result<usize, FrontierError> {
        let now = Utc::now().timestamp() as f64;

        // Step 1: pre-filter (length cap, non-text extensions) + in-batch dedup.
        let mut seen_in_batch = HashSet::new();
        let mut normalized = Vec::new();
        for raw in urls {
            if raw.len() > MAX_URL_LENGTH {
                continue;
            }
            let url = match normalize_url(raw) {
                Ok(u) => u,
                Err(_) => continue,
            };
            if is_likely_non_text(&url) {
                continue;
            }
            let as_string = url.to_string();
            if seen_in_batch.insert(as_string) {
                normalized.push(url);
            }
        }
        if normalized.is_empty() {
            return Ok(0);
        }

        // Step 2: bloom pre-check.
        let url_strings: Vec<String> = normalized.iter().map(|u| u.to_string()).collect();
        let present = self.kv.bloom_check_batch(&url_strings).await?;
        let survivors: Vec<_> = normalized
            .into_iter()
            .zip(present)
            .filter_map(|(url, present)| if present { None } else { Some(url) })
            .collect();
        if survivors.is_empty() {
            return Ok(0);
        }

        // Steps 3+4: politeness filter, grouped by registered domain.
        let mut groups: HashMap<String, Vec<UrlRecord>> = HashMap::new();
        for url in survivors {
            let domain = match extract_registered_domain(&url) {
                Some(d) => d,
                None => continue,
            };
            if !self.politeness.is_url_allowed(&url, &domain).await {
                continue;
            }
            groups
                .entry(domain)
                .or_default()
                .push(UrlRecord::new(url.to_string(), depth));
        }

        // Step 5: one pipelined write per domain group.
        let mut total_written = 0usize;
        for (domain, records) in groups {
            let bytes_written = self.files.append_batch(&domain, &records).await?;
            if bytes_written == 0 {
                continue;
            }
            let file_path = FrontierFileStore::relative_path(&domain);
            let url_list: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
            self.kv
                .admit_domain_batch(&domain, &file_path, &url_list, bytes_written, now)
                .await?;
            total_written += records.len();
        }

        Ok(total_written)
    }

    /// Serves the next claimable URL, or `None` if nothing is fetchable
    /// right now (spec §4.4).
    pub async fn get_next_url(&self, now: f64) -> Result<Option<ClaimedUrl>, FrontierError> {
        let ready = match self.kv.pop_ready_domain().await? {
            Some(r) => r,
            None => return Ok(None),
        };

        if ready.next_fetch_time > now {
            self.kv
                .reinsert_domain(&ready.domain, ready.next_fetch_time)
                .await?;
            return Ok(None);
        }

        let domain = ready.domain;
        let _guard = self.shard_for(&domain).lock().await;

        let entry = self.kv.get_domain(&domain).await?;
        if entry.frontier_offset >= entry.frontier_size {
            debug!(domain, outcome = ?PageOutcome::Exhausted, "domain exhausted, not reinserted");
            return Ok(None);
        }

        let mut offset = entry.frontier_offset;
        let size = entry.frontier_size;

        for _ in 0..MAX_SKIP_ITERATIONS {
            if offset >= size {
                return Ok(None);
            }

            let (record, new_offset) = match self.files.read_line_at(&domain, offset).await {
                Ok(pair) => pair,
                Err(FrontierError::FileMissing(_)) => {
                    warn!(domain, "frontier file missing, treating as exhausted");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            self.kv.set_frontier_offset(&domain, new_offset).await?;
            offset = new_offset;

            let record = match record {
                Some(r) => r,
                None => continue, // malformed line; already advanced past it
            };

            let url = match normalize_url(&record.url) {
                Ok(u) => u,
                Err(_) => continue,
            };
            if is_likely_non_text(&url) {
                debug!(domain, url = %url, outcome = ?PageOutcome::NonTextSkipped, "skipping likely non-text URL");
                continue;
            }
            if !self.politeness.is_url_allowed(&url, &domain).await {
                debug!(domain, url = %url, outcome = ?PageOutcome::RobotsDenied, "skipping disallowed URL");
                continue;
            }

            self.politeness.record_domain_fetch_attempt(&domain).await?;
            return Ok(Some(ClaimedUrl {
                url: url.to_string(),
                domain,
                depth: record.depth,
                id: -1,
            }));
        }

        debug!(domain, "skip-iteration cap reached, yielding domain");
        self.kv.reinsert_domain(&domain, now).await?;
        Ok(None)
    }
}
