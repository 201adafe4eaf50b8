use super::{CrawlContext, CrawlStopConditions};
use crate::collaborators::sha256_hex;
use crate::kv::schema::visited_id_from_sha256_hex;
use crate::kv::VisitedFields;
use crate::{CrawlError, PageOutcome};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// One fetcher task's outer loop: claim → fetch → parse → enqueue →
/// record, guarded by a shutdown flag, forgiving of every error except
/// cancellation (spec §4.5/§7 — "a single bad domain must never kill a
/// worker").
pub async fn worker_loop(
    ctx: Arc<CrawlContext>,
    stop: Arc<CrawlStopConditions>,
    mut shutdown: watch::Receiver<bool>,
    worker_id: u32,
) {
    let poll_interval = Duration::from_secs(ctx.config.orchestrator.poll_interval_secs);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match run_iteration(&ctx).await {
            Ok(true) => stop.record_page_fetched(),
            Ok(false) => {
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
            Err(CrawlError::Cancelled) => break,
            Err(e) => {
                error!(worker_id, error = %e, "worker iteration failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }

    debug!(worker_id, "worker exiting");
}

/// Runs a single claim-fetch-parse-record cycle. Returns `Ok(true)` if a URL
/// was dispatched (whether or not the fetch itself succeeded), `Ok(false)`
/// if nothing was claimable right now.
async fn run_iteration(ctx: &CrawlContext) -> Result<bool, CrawlError> {
    let now = Utc::now().timestamp() as f64;
    let claimed = match ctx.frontier.get_next_url(now).await? {
        Some(c) => c,
        None => return Ok(false),
    };

    let outcome = ctx.fetcher.fetch(&claimed.url, false).await;
    let url_sha256 = sha256_hex(&claimed.url);
    let visited_id = visited_id_from_sha256_hex(&url_sha256);
    let fetched_at = Utc::now().timestamp();
    let redirected_to_url = if outcome.is_redirect {
        Some(outcome.final_url.clone())
    } else {
        None
    };

    if let Some(error) = outcome.error_message {
        warn!(url = %claimed.url, error, outcome = ?PageOutcome::NetworkError, "fetch failed");
        ctx.kv
            .record_visited(
                &visited_id,
                VisitedFields {
                    url: claimed.url,
                    url_sha256,
                    domain: claimed.domain,
                    status_code: outcome.status_code,
                    fetched_at,
                    content_path: None,
                    content_type: outcome.content_type,
                    content_hash: None,
                    redirected_to_url,
                    error: Some(error),
                },
            )
            .await?;
        return Ok(true);
    }

    let mut content_path = None;
    let mut content_hash = None;
    let mut links_added = 0usize;

    if let Some(text) = &outcome.text_content {
        if let Ok(base_url) = url::Url::parse(&outcome.final_url) {
            let parsed = ctx.parser.parse(text, &base_url);

            if let Some(page_text) = &parsed.text_content {
                content_hash = Some(sha256_hex(page_text));
                match ctx.content_writer.save(&url_sha256, page_text).await {
                    Ok(path) => content_path = path.map(|p| p.display().to_string()),
                    Err(e) => warn!(url = %claimed.url, error = %e, "failed to save content"),
                }
            }

            if !parsed.extracted_links.is_empty() {
                links_added = ctx
                    .frontier
                    .add_urls_batch(&parsed.extracted_links, claimed.depth + 1)
                    .await?;
            }
        } else {
            warn!(final_url = %outcome.final_url, "fetched page has an unparseable final URL");
        }
    }

    let page_outcome = match outcome.status_code {
        Some(status) if status >= 400 => PageOutcome::HttpError(status),
        _ if content_path.is_none() && content_hash.is_none() => PageOutcome::NonTextSkipped,
        _ => PageOutcome::Fetched,
    };

    debug!(
        url = %claimed.url,
        status = ?outcome.status_code,
        links_added,
        outcome = ?page_outcome,
        "fetch recorded"
    );

    ctx.kv
        .record_visited(
            &visited_id,
            VisitedFields {
                url: claimed.url,
                url_sha256,
                domain: claimed.domain,
                status_code: outcome.status_code,
                fetched_at,
                content_path,
                content_type: outcome.content_type,
                content_hash,
                redirected_to_url,
                error: None,
            },
        )
        .await?;

    Ok(true)
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

    struct StubFetcher {
        outcome: FetchOutcome,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, _url: &str, _is_robots_txt: bool) -> FetchOutcome {
            self.outcome.clone()
        }
    }

    struct StubParser;

    impl HtmlParser for StubParser {
        fn parse(&self, _html: &str, _base_url: &url::Url) -> ParsedPage {
            ParsedPage {
                text_content: Some("hello world".to_string()),
                extracted_links: vec!["https://example.com/next".to_string()],
            }
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
            orchestrator: OrchestratorConfig::default(),
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
    async fn a_successful_fetch_parses_and_enqueues_links() {
        let dir = tempdir().unwrap();
        let kv: Arc<dyn KvBackend> = Arc::new(FakeKv::new());
        kv.set_domain_robots("example.com", "", i64::MAX / 2)
            .await
            .unwrap();
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
        frontier
            .add_urls_batch(&["http://example.com/a".to_string()], 0)
            .await
            .unwrap();

        let ctx = CrawlContext {
            kv: kv.clone(),
            frontier,
            fetcher: Arc::new(StubFetcher {
                outcome: FetchOutcome {
                    initial_url: "http://example.com/a".to_string(),
                    final_url: "http://example.com/a".to_string(),
                    status_code: Some(200),
                    content_type: Some("text/html".to_string()),
                    text_content: Some("<html></html>".to_string()),
                    is_redirect: false,
                    error_message: None,
                },
            }),
            parser: Arc::new(StubParser),
            content_writer: Arc::new(NullWriter),
            config: test_config(dir.path().to_path_buf()),
            kv_op_count: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        };

        let dispatched = run_iteration(&ctx).await.unwrap();
        assert!(dispatched);
        assert_eq!(kv.queue_len().await.unwrap(), 1); // example.com re-queued with the new link
    }

    #[tokio::test]
    async fn no_claimable_url_yields_false_without_error() {
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

        let ctx = CrawlContext {
            kv: kv.clone(),
            frontier,
            fetcher: Arc::new(StubFetcher {
                outcome: FetchOutcome {
                    initial_url: String::new(),
                    final_url: String::new(),
                    status_code: None,
                    content_type: None,
                    text_content: None,
                    is_redirect: false,
                    error_message: None,
                },
            }),
            parser: Arc::new(StubParser),
            content_writer: Arc::new(NullWriter),
            config: test_config(dir.path().to_path_buf()),
            kv_op_count: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        };

        assert!(!run_iteration(&ctx).await.unwrap());
    }
}
