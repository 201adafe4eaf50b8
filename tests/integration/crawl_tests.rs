//! End-to-end scenario tests for the frontier/politeness/claiming core.
//!
//! These drive `FrontierManager` directly against an in-memory `FakeKv` and
//! a real on-disk frontier file store under a temp directory, the same
//! "fake backend, real file I/O" split the unit tests use, scaled up to the
//! literal scenarios described for the crawl core.

use chrono::Utc;
use ripplefront::frontier::FrontierFileStore;
use ripplefront::frontier::FrontierManager;
use ripplefront::kv::{FakeKv, KvBackend};
use ripplefront::politeness::{PolitenessEnforcer, PolitenessSettings};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Builds a `FrontierManager` over a fresh `FakeKv` and temp-dir file store,
/// with every domain's robots cache pre-seeded to an empty, far-future-
/// expiring body so these tests never reach the network.
async fn test_manager(
    domains: &[&str],
    min_crawl_delay: Duration,
) -> (FrontierManager, TempDir, Arc<dyn KvBackend>) {
    let dir = tempfile::tempdir().unwrap();
    let kv: Arc<dyn KvBackend> = Arc::new(FakeKv::new());
    for domain in domains {
        kv.set_domain_robots(domain, "", i64::MAX / 2).await.unwrap();
    }
    let files = FrontierFileStore::new(dir.path());
    let politeness = Arc::new(PolitenessEnforcer::new(
        kv.clone(),
        reqwest::Client::new(),
        PolitenessSettings {
            min_crawl_delay,
            robots_cache_capacity: 1_000,
            robots_ttl: Duration::from_secs(3600),
            user_agent: "TestBot".to_string(),
        },
    ));
    let manager = FrontierManager::new(kv.clone(), files, politeness);
    (manager, dir, kv)
}

#[tokio::test]
async fn single_domain_ordering() {
    let (mgr, _dir, _kv) = test_manager(&["example.com"], Duration::from_secs(70)).await;

    mgr.add_urls_batch(
        &[
            "http://example.com/a".to_string(),
            "http://example.com/b".to_string(),
            "http://example.com/c".to_string(),
        ],
        0,
    )
    .await
    .unwrap();

    let now = Utc::now().timestamp() as f64;
    let first = mgr.get_next_url(now).await.unwrap().unwrap();
    assert_eq!(first.url, "http://example.com/a");

    // Immediately retrying must not yield "b" yet; MIN_CRAWL_DELAY hasn't
    // elapsed since the first dispatch.
    assert!(mgr.get_next_url(now).await.unwrap().is_none());

    let second = mgr.get_next_url(now + 70.0).await.unwrap().unwrap();
    assert_eq!(second.url, "http://example.com/b");

    let third = mgr.get_next_url(now + 140.0).await.unwrap().unwrap();
    assert_eq!(third.url, "http://example.com/c");
}

#[tokio::test]
async fn bare_domain_normalization() {
    let (mgr, _dir, _kv) = test_manager(&["gpumagick.com"], Duration::from_secs(0)).await;

    mgr.add_urls_batch(&["gpumagick.com".to_string()], 0)
        .await
        .unwrap();

    let now = Utc::now().timestamp() as f64;
    let claimed = mgr.get_next_url(now).await.unwrap().unwrap();
    assert!(claimed.url.starts_with("http://") || claimed.url.starts_with("https://"));
    assert_eq!(claimed.url, "http://gpumagick.com/");
}

#[tokio::test]
async fn robots_disallow_skips_the_blocked_line() {
    let (mgr, _dir, kv) = test_manager(&[], Duration::from_secs(0)).await;
    kv.set_domain_robots("x.com", "User-agent: *\nDisallow: /private", i64::MAX / 2)
        .await
        .unwrap();

    mgr.add_urls_batch(
        &[
            "http://x.com/public".to_string(),
            "http://x.com/private".to_string(),
        ],
        0,
    )
    .await
    .unwrap();

    let now = Utc::now().timestamp() as f64;
    let first = mgr.get_next_url(now).await.unwrap().unwrap();
    assert_eq!(first.url, "http://x.com/public");

    // /private is the only remaining line; it's skipped internally and its
    // offset advanced, so the domain is exhausted rather than ever serving it.
    let second = mgr.get_next_url(now + 1.0).await.unwrap();
    assert!(second.is_none());
}

#[tokio::test]
async fn concurrent_claim_exclusivity() {
    const DOMAINS: usize = 100;
    const URLS_PER_DOMAIN: usize = 10;
    const CONSUMERS: usize = 50;

    let domain_names: Vec<String> = (0..DOMAINS).map(|i| format!("d{i}.example")).collect();
    let domain_refs: Vec<&str> = domain_names.iter().map(String::as_str).collect();
    let (mgr, _dir, _kv) = test_manager(&domain_refs, Duration::from_secs(0)).await;

    let mut all_seed_urls = Vec::with_capacity(DOMAINS * URLS_PER_DOMAIN);
    for domain in &domain_names {
        let urls: Vec<String> = (0..URLS_PER_DOMAIN)
            .map(|i| format!("http://{domain}/page{i}"))
            .collect();
        mgr.add_urls_batch(&urls, 0).await.unwrap();
        all_seed_urls.extend(urls);
    }

    let mgr = Arc::new(mgr);
    let claimed = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let mut handles = Vec::with_capacity(CONSUMERS);

    for _ in 0..CONSUMERS {
        let mgr = mgr.clone();
        let claimed = claimed.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let now = Utc::now().timestamp() as f64 + 10_000.0;
                match mgr.get_next_url(now).await.unwrap() {
                    Some(url) => claimed.lock().await.push(url.url),
                    None => break,
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let mut claimed = Arc::try_unwrap(claimed).unwrap().into_inner();
    claimed.sort();
    let mut expected = all_seed_urls;
    expected.sort();

    assert_eq!(claimed.len(), DOMAINS * URLS_PER_DOMAIN);
    assert_eq!(claimed, expected);
}

#[tokio::test]
async fn unready_domain_no_op() {
    let (mgr, _dir, _kv) = test_manager(&["slow.example"], Duration::from_secs(60)).await;

    mgr.add_urls_batch(&["http://slow.example/a".to_string()], 0)
        .await
        .unwrap();

    let now = Utc::now().timestamp() as f64;
    mgr.get_next_url(now).await.unwrap().unwrap();

    // The domain was rescheduled 60s out by the dispatch above. Further
    // polling before that deadline must yield None every time.
    assert!(mgr.get_next_url(now + 1.0).await.unwrap().is_none());
    assert!(mgr.get_next_url(now + 59.0).await.unwrap().is_none());
}

#[tokio::test]
async fn crash_recovery_resumes_from_persisted_offset() {
    let dir = tempfile::tempdir().unwrap();
    let kv: Arc<dyn KvBackend> = Arc::new(FakeKv::new());
    kv.set_domain_robots("big.example", "", i64::MAX / 2)
        .await
        .unwrap();

    let urls: Vec<String> = (0..1000)
        .map(|i| format!("http://big.example/page{i}"))
        .collect();

    {
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
        let mgr = FrontierManager::new(kv.clone(), files, politeness);
        mgr.add_urls_batch(&urls, 0).await.unwrap();

        for i in 0..500 {
            let now = Utc::now().timestamp() as f64 + i as f64;
            let claimed = mgr.get_next_url(now).await.unwrap().unwrap();
            assert_eq!(claimed.url, format!("http://big.example/page{i}"));
        }
        // mgr (and its in-process state) is dropped here, simulating a
        // crash; only `kv` and the on-disk frontier file survive.
    }

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
    let resumed = FrontierManager::new(kv.clone(), files, politeness);

    // Re-seeding on "restart" must not re-admit any already-seen URL.
    let readmitted = resumed.add_urls_batch(&urls, 0).await.unwrap();
    assert_eq!(readmitted, 0);

    let now = Utc::now().timestamp() as f64 + 10_000.0;
    let next = resumed.get_next_url(now).await.unwrap().unwrap();
    assert_eq!(next.url, "http://big.example/page500");
}
