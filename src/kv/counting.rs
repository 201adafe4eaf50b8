use super::{DomainRecord, KvBackend, KvError, ReadyDomain, VisitedFields};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Wraps any [`KvBackend`] and counts every call made through it, so
/// `maintenance_loop` can report a total-KV-ops gauge without each caller
/// having to remember to increment anything itself.
pub struct CountingKv {
    inner: Arc<dyn KvBackend>,
    ops: Arc<AtomicU64>,
}

impl CountingKv {
    pub fn new(inner: Arc<dyn KvBackend>) -> (Self, Arc<AtomicU64>) {
        let ops = Arc::new(AtomicU64::new(0));
        (
            Self {
                inner,
                ops: ops.clone(),
            },
            ops,
        )
    }

    fn tick(&self) {
        self.ops.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl KvBackend for CountingKv {
    async fn schema_version(&self) -> Result<Option<u32>, KvError> {
        self.tick();
        self.inner.schema_version().await
    }

    async fn set_schema_version(&self, version: u32) -> Result<(), KvError> {
        self.tick();
        self.inner.set_schema_version(version).await
    }

    async fn get_domain(&self, domain: &str) -> Result<DomainRecord, KvError> {
        self.tick();
        self.inner.get_domain(domain).await
    }

    async fn admit_domain_batch(
        &self,
        domain: &str,
        file_path: &str,
        urls: &[String],
        bytes_written: u64,
        now: f64,
    ) -> Result<(), KvError> {
        self.tick();
        self.inner
            .admit_domain_batch(domain, file_path, urls, bytes_written, now)
            .await
    }

    async fn pop_ready_domain(&self) -> Result<Option<ReadyDomain>, KvError> {
        self.tick();
        self.inner.pop_ready_domain().await
    }

    async fn reinsert_domain(&self, domain: &str, score: f64) -> Result<(), KvError> {
        self.tick();
        self.inner.reinsert_domain(domain, score).await
    }

    async fn set_frontier_offset(&self, domain: &str, offset: u64) -> Result<(), KvError> {
        self.tick();
        self.inner.set_frontier_offset(domain, offset).await
    }

    async fn reset_frontier(&self, domain: &str, offset: u64, size: u64) -> Result<(), KvError> {
        self.tick();
        self.inner.reset_frontier(domain, offset, size).await
    }

    async fn record_fetch_and_reschedule(
        &self,
        domain: &str,
        next_fetch_time: f64,
    ) -> Result<(), KvError> {
        self.tick();
        self.inner
            .record_fetch_and_reschedule(domain, next_fetch_time)
            .await
    }

    async fn remove_from_queue(&self, domain: &str) -> Result<(), KvError> {
        self.tick();
        self.inner.remove_from_queue(domain).await
    }

    async fn all_domains(&self) -> Result<Vec<String>, KvError> {
        self.tick();
        self.inner.all_domains().await
    }

    async fn set_domain_robots(&self, domain: &str, body: &str, expires: i64) -> Result<(), KvError> {
        self.tick();
        self.inner.set_domain_robots(domain, body, expires).await
    }

    async fn set_domains_excluded(&self, domains: &[String]) -> Result<(), KvError> {
        self.tick();
        self.inner.set_domains_excluded(domains).await
    }

    async fn bloom_check_batch(&self, urls: &[String]) -> Result<Vec<bool>, KvError> {
        self.tick();
        self.inner.bloom_check_batch(urls).await
    }

    async fn record_visited(&self, visited_id: &str, fields: VisitedFields) -> Result<(), KvError> {
        self.tick();
        self.inner.record_visited(visited_id, fields).await
    }

    async fn queue_len(&self) -> Result<u64, KvError> {
        self.tick();
        self.inner.queue_len().await
    }
}
