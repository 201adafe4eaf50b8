use super::{DomainRecord, KvBackend, KvError, ReadyDomain, VisitedFields};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// An in-memory [`KvBackend`] used by unit and integration tests so the
/// frontier/politeness layers can be exercised without a live Redis — the
/// same role the teacher's `Storage` trait gives a test-only in-memory
/// implementation alongside `SqliteStorage`.
///
/// Not a serious implementation of `ZADD LT`/`ZPOPMIN` semantics for
/// production use (no persistence, `Mutex<_>`-serialized, O(n log n)
/// min-score scans) — it exists purely to pin the `KvBackend` contract.
#[derive(Default)]
pub struct FakeKv {
    inner: Mutex<FakeKvInner>,
}

#[derive(Default)]
struct FakeKvInner {
    schema_version: Option<u32>,
    domains: BTreeMap<String, DomainRecord>,
    queue: BTreeMap<String, f64>,
    bloom: HashSet<String>,
    visited: Vec<(String, VisitedFields)>,
    domain_index: HashSet<String>,
}

impl FakeKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: current `(domain, score)` pairs in the ready-domain
    /// index, sorted by score then domain (mirrors `ZPOPMIN`'s tie-break).
    pub fn queue_snapshot(&self) -> Vec<(String, f64)> {
        let inner = self.inner.lock().unwrap();
        let mut items: Vec<_> = inner.queue.iter().map(|(k, v)| (k.clone(), *v)).collect();
        items.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then_with(|| a.0.cmp(&b.0)));
        items
    }

    pub fn visited_count(&self) -> usize {
        self.inner.lock().unwrap().visited.len()
    }
}

#[async_trait]
impl KvBackend for FakeKv {
    async fn schema_version(&self) -> Result<Option<u32>, KvError> {
        Ok(self.inner.lock().unwrap().schema_version)
    }

    async fn set_schema_version(&self, version: u32) -> Result<(), KvError> {
        self.inner.lock().unwrap().schema_version = Some(version);
        Ok(())
    }

    async fn get_domain(&self, domain: &str) -> Result<DomainRecord, KvError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .domains
            .get(domain)
            .cloned()
            .unwrap_or_default())
    }

    async fn admit_domain_batch(
        &self,
        domain: &str,
        file_path: &str,
        urls: &[String],
        bytes_written: u64,
        now: f64,
    ) -> Result<(), KvError> {
        let mut inner = self.inner.lock().unwrap();

        for url in urls {
            inner.bloom.insert(url.clone());
        }

        inner.domain_index.insert(domain.to_string());

        let record = inner.domains.entry(domain.to_string()).or_default();
        if record.file_path.is_none() {
            record.file_path = Some(file_path.to_string());
        }
        record.frontier_size += bytes_written;
        // HSETNX semantics: only set if absent. We model `is_seeded` as
        // already initialized (false) the first time a domain appears.
        let _ = record.is_seeded;

        // ZADD LT: add if absent; lower if greater; leave if lower-or-equal.
        let score = inner.queue.entry(domain.to_string()).or_insert(now);
        if now < *score {
            *score = now;
        }

        Ok(())
    }

    async fn pop_ready_domain(&self) -> Result<Option<ReadyDomain>, KvError> {
        let mut inner = self.inner.lock().unwrap();
        let best = inner
            .queue
            .iter()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap().then_with(|| a.0.cmp(b.0)))
            .map(|(k, v)| (k.clone(), *v));

        match best {
            Some((domain, score)) => {
                inner.queue.remove(&domain);
                Ok(Some(ReadyDomain {
                    domain,
                    next_fetch_time: score,
                }))
            }
            None => Ok(None),
        }
    }

    async fn reinsert_domain(&self, domain: &str, score: f64) -> Result<(), KvError> {
        self.inner
            .lock()
            .unwrap()
            .queue
            .insert(domain.to_string(), score);
        Ok(())
    }

    async fn set_frontier_offset(&self, domain: &str, offset: u64) -> Result<(), KvError> {
        self.inner
            .lock()
            .unwrap()
            .domains
            .entry(domain.to_string())
            .or_default()
            .frontier_offset = offset;
        Ok(())
    }

    async fn reset_frontier(&self, domain: &str, offset: u64, size: u64) -> Result<(), KvError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.domains.entry(domain.to_string()).or_default();
        entry.frontier_offset = offset;
        entry.frontier_size = size;
        Ok(())
    }

    async fn record_fetch_and_reschedule(
        &self,
        domain: &str,
        next_fetch_time: f64,
    ) -> Result<(), KvError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .domains
            .entry(domain.to_string())
            .or_default()
            .next_fetch_time = Some(next_fetch_time as i64);
        inner.queue.insert(domain.to_string(), next_fetch_time);
        Ok(())
    }

    async fn remove_from_queue(&self, domain: &str) -> Result<(), KvError> {
        self.inner.lock().unwrap().queue.remove(domain);
        Ok(())
    }

    async fn all_domains(&self) -> Result<Vec<String>, KvError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .domain_index
            .iter()
            .cloned()
            .collect())
    }

    async fn set_domain_robots(
        &self,
        domain: &str,
        body: &str,
        expires: i64,
    ) -> Result<(), KvError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.domains.entry(domain.to_string()).or_default();
        record.robots_txt = Some(body.to_string());
        record.robots_expires = Some(expires);
        Ok(())
    }

    async fn set_domains_excluded(&self, domains: &[String]) -> Result<(), KvError> {
        let mut inner = self.inner.lock().unwrap();
        for domain in domains {
            inner.domains.entry(domain.clone()).or_default().is_excluded = true;
        }
        Ok(())
    }

    async fn bloom_check_batch(&self, urls: &[String]) -> Result<Vec<bool>, KvError> {
        let inner = self.inner.lock().unwrap();
        Ok(urls.iter().map(|u| inner.bloom.contains(u)).collect())
    }

    async fn record_visited(&self, visited_id: &str, fields: VisitedFields) -> Result<(), KvError> {
        self.inner
            .lock()
            .unwrap()
            .visited
            .push((visited_id.to_string(), fields));
        Ok(())
    }

    async fn queue_len(&self) -> Result<u64, KvError> {
        Ok(self.inner.lock().unwrap().queue.len() as u64)
    }
}
