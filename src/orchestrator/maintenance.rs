use super::{CrawlContext, CrawlStopConditions};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

/// Periodic background task: every `maintenance_interval_secs`, emits gauges
/// for pages-per-second, ready-domain count, total frontier size across all
/// domains, total KV operations, and total pages fetched so far (spec §4.5
/// — "emit gauges for frontier size, ready-domain count..."). This crate has
/// no process-metrics or connection-pool-introspection dependency, so gauges
/// that would require one (CPU, RSS, IO, network, pool sizes) are left to
/// whatever supervises the process; this loop reports only what the KV
/// store and the shared counters can answer directly.
pub async fn maintenance_loop(
    ctx: Arc<CrawlContext>,
    stop: Arc<CrawlStopConditions>,
    mut shutdown: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs(ctx.config.orchestrator.maintenance_interval_secs);
    let mut last_tick = Instant::now();
    let mut last_pages = stop.pages_fetched.load(Ordering::Relaxed);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }

        if *shutdown.borrow() {
            break;
        }

        let now_pages = stop.pages_fetched.load(Ordering::Relaxed);
        let elapsed = last_tick.elapsed().as_secs_f64();
        let pages_per_sec = if elapsed > 0.0 {
            (now_pages.saturating_sub(last_pages)) as f64 / elapsed
        } else {
            0.0
        };

        match ctx.kv.queue_len().await {
            Ok(ready_domains) => {
                let frontier_size = total_frontier_size(&ctx).await;
                let kv_ops = ctx.kv_op_count.load(Ordering::Relaxed);
                info!(
                    pages_per_sec = format!("{pages_per_sec:.2}"),
                    total_pages = now_pages,
                    ready_domains,
                    frontier_size,
                    kv_ops,
                    "maintenance tick"
                );
            }
            Err(e) => {
                warn!(error = %e, "maintenance tick could not read queue length");
            }
        }

        last_tick = Instant::now();
        last_pages = now_pages;
    }
}

/// Sums `frontier_size` across every admitted domain. O(domains), run only
/// once per maintenance tick, so it's acceptable against the same store a
/// `prune_empty_domains` sweep already walks in full.
async fn total_frontier_size(ctx: &CrawlContext) -> u64 {
    let domains = match ctx.kv.all_domains().await {
        Ok(domains) => domains,
        Err(e) => {
            warn!(error = %e, "maintenance tick could not list domains for frontier_size gauge");
            return 0;
        }
    };

    let mut total = 0u64;
    for domain in domains {
        match ctx.kv.get_domain(&domain).await {
            Ok(record) => total += record.frontier_size,
            Err(e) => warn!(domain, error = %e, "maintenance tick could not read a domain's frontier_size"),
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ContentWriter, FetchOutcome, Fetcher, HtmlParser, ParsedPage};
    use crate::config::*;
    use crate::frontier::{FrontierFileStore, FrontierManager};
    use crate::kv::{FakeKv, KvBackend};
    use crate::politeness::{PolitenessEnforcer, PolitenessSettings};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tempfile::tempdir;

    struct NullFetcher;

    #[async_trait]
    impl Fetcher for NullFetcher {
        async fn fetch(&self, _url: &str, _is_robots_txt: bool) -> FetchOutcome {
            FetchOutcome {
                initial_url: String::new(),
                final_url: String::new(),
                status_code: None,
                content_type: None,
                text_content: None,
                is_redirect: false,
                error_message: Some("unused".to_string()),
            }
        }
    }

    struct NullParser;

    impl HtmlParser for NullParser {
        fn parse(&self, _html: &str, _base_url: &url::Url) -> ParsedPage {
            ParsedPage::default()
        }
    }

    struct NullWriter;

    #[async_trait]
    impl ContentWriter for NullWriter {
        async fn save(&self, _url_sha256: &str, _text: &str) -> Result<Option<PathBuf>, std::io::Error> {
            Ok(None)
        }
    }

    fn test_config(data_dir: PathBuf) -> Config {
        Config {
            kv: KvConfig {
                url: "redis://127.0.0.1:6379".to_string(),
                shard_count: 1,
            },
            frontier: FrontierConfig { data_dir },
            politeness: PolitenessConfig::default(),
            orchestrator: OrchestratorConfig {
                maintenance_interval_secs: 1,
                ..OrchestratorConfig::default()
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestBot".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "http://example.com".to_string(),
                contact_email: "test@example.com".to_string(),
            },
            seed_file: PathBuf::from("seeds.txt"),
        }
    }

    #[tokio::test]
    async fn shuts_down_promptly_when_the_flag_is_already_set() {
        let dir = tempdir().unwrap();
        let kv: Arc<dyn KvBackend> = Arc::new(FakeKv::new());
        let files = FrontierFileStore::new(dir.path());
        let politeness = Arc::new(PolitenessEnforcer::new(
            kv.clone(),
            reqwest::Client::new(),
            PolitenessSettings {
                min_crawl_delay: Duration::from_secs(0),
                robots_cache_capacity: 100,
                robots_ttl: Duration::from_secs(3600),
                user_agent: "TestBot".to_string(),
            },
        ));
        let frontier = FrontierManager::new(kv.clone(), files, politeness);

        let ctx = Arc::new(CrawlContext {
            kv: kv.clone(),
            frontier,
            fetcher: Arc::new(NullFetcher),
            parser: Arc::new(NullParser),
            content_writer: Arc::new(NullWriter),
            config: test_config(dir.path().to_path_buf()),
            kv_op_count: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        });

        let (stop, mut rx) = CrawlStopConditions::new(None, None);
        let stop = Arc::new(stop);
        stop.shutdown.send(true).unwrap();
        rx.changed().await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            maintenance_loop(ctx, stop, rx),
        )
        .await;
        assert!(result.is_ok(), "maintenance_loop did not exit promptly after shutdown");
    }
}
