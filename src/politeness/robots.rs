use super::PolitenessSettings;
use crate::kv::{schema::truncate_body, KvBackend};
use chrono::Utc;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use texting_robots::Robot;
use thiserror::Error;
use tracing::{debug, warn};

/// Short TTL applied when robots.txt could not be fetched at all, so a
/// transiently-down host is retried soon rather than allow-all'd for a full
/// day.
const FAILURE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum RobotsFetchError {
    #[error("KV store error: {0}")]
    Kv(#[from] crate::kv::KvError),
}

struct CachedRobot {
    robot: Arc<Robot>,
    expires_at: i64,
}

/// A bounded, strictly-LRU in-process cache of parsed robots.txt parsers,
/// backed by the KV store as the cross-process source of truth. Mirrors the
/// teacher's `robots::cache::CachedRobots`, generalized from a single-domain
/// field into a real LRU and from a no-op `crawl_delay` into
/// `texting_robots`'s native support for it.
pub struct RobotsCache {
    entries: Mutex<LruCache<String, CachedRobot>>,
}

impl RobotsCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn get(
        &self,
        domain: &str,
        http: &reqwest::Client,
        kv: &Arc<dyn KvBackend>,
        settings: &PolitenessSettings,
    ) -> Result<Arc<Robot>, RobotsFetchError> {
        let now = Utc::now().timestamp();

        if let Some(robot) = self.fresh_in_process(domain, now) {
            return Ok(robot);
        }

        if let Some(robot) = self.try_kv_cached(domain, kv, now, settings).await? {
            self.insert(domain, robot.clone(), now + settings.robots_ttl.as_secs() as i64);
            return Ok(robot);
        }

        let (body, expires_at) = fetch_and_persist(domain, http, kv, settings, now).await?;
        let robot = Arc::new(
            Robot::new(&settings.user_agent, body.as_bytes())
                .unwrap_or_else(|_| allow_all_robot(&settings.user_agent)),
        );
        self.insert(domain, robot.clone(), expires_at);
        Ok(robot)
    }

    fn fresh_in_process(&self, domain: &str, now: i64) -> Option<Arc<Robot>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(domain) {
            Some(cached) if cached.expires_at > now => Some(cached.robot.clone()),
            _ => None,
        }
    }

    async fn try_kv_cached(
        &self,
        domain: &str,
        kv: &Arc<dyn KvBackend>,
        now: i64,
        settings: &PolitenessSettings,
    ) -> Result<Option<Arc<Robot>>, RobotsFetchError> {
        let record = kv.get_domain(domain).await?;
        match (record.robots_txt, record.robots_expires) {
            (Some(body), Some(expires)) if expires > now => {
                let robot = Robot::new(&settings.user_agent, body.as_bytes())
                    .unwrap_or_else(|_| allow_all_robot(&settings.user_agent));
                Ok(Some(Arc::new(robot)))
            }
            _ => Ok(None),
        }
    }

    fn insert(&self, domain: &str, robot: Arc<Robot>, expires_at: i64) {
        self.entries
            .lock()
            .unwrap()
            .put(domain.to_string(), CachedRobot { robot, expires_at });
    }
}

async fn fetch_and_persist(
    domain: &str,
    http: &reqwest::Client,
    kv: &Arc<dyn KvBackend>,
    settings: &PolitenessSettings,
    now: i64,
) -> Result<(String, i64), RobotsFetchError> {
    let body = match fetch_body(domain, http).await {
        Some(body) => body,
        None => {
            warn!(domain, "robots.txt unreachable over http and https");
            let expires = now + FAILURE_TTL.as_secs() as i64;
            kv.set_domain_robots(domain, "", expires).await?;
            return Ok((String::new(), expires));
        }
    };

    let truncated = truncate_body(&body);
    let expires = now + settings.robots_ttl.as_secs() as i64;
    kv.set_domain_robots(domain, &truncated, expires).await?;
    Ok((truncated, expires))
}

/// Fetches `http://<domain>/robots.txt`, falling back to https on any
/// non-2xx response or network error, trying both schemes before giving up.
/// A 4xx on a scheme is remembered as an explicit allow-all (empty body) but
/// does not short-circuit the loop, since https might still serve a real
/// robots.txt the http host didn't. Returns `None` only if neither scheme
/// produced a 2xx or a 4xx.
async fn fetch_body(domain: &str, http: &reqwest::Client) -> Option<String> {
    let mut allow_all_fallback = None;

    for scheme in ["http", "https"] {
        let url = format!("{scheme}://{domain}/robots.txt");
        let response = http
            .get(&url)
            .timeout(Duration::from_secs(15))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                debug!(domain, scheme, "fetched robots.txt");
                return Some(resp.text().await.unwrap_or_default());
            }
            Ok(resp) if resp.status().is_client_error() => {
                debug!(domain, scheme, status = %resp.status(), "robots.txt 4xx, treating as allow-all unless the other scheme succeeds");
                allow_all_fallback = Some(String::new());
                continue;
            }
            Ok(_) | Err(_) => continue,
        }
    }

    allow_all_fallback
}

fn allow_all_robot(user_agent: &str) -> Robot {
    Robot::new(user_agent, b"").expect("empty robots.txt always parses")
}

pub trait RobotCrawlDelay {
    fn crawl_delay(&self) -> Option<Duration>;
}

impl RobotCrawlDelay for Robot {
    fn crawl_delay(&self) -> Option<Duration> {
        self.delay.map(|secs| Duration::from_secs(secs as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_robot_permits_everything() {
        let robot = allow_all_robot("TestBot");
        assert!(robot.allowed("http://example.com/anything"));
    }

    #[test]
    fn crawl_delay_reads_through_to_the_parsed_field() {
        let robot = Robot::new("TestBot", b"User-agent: *\nCrawl-delay: 5\n").unwrap();
        assert_eq!(robot.crawl_delay(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn crawl_delay_is_none_when_not_declared() {
        let robot = Robot::new("TestBot", b"User-agent: *\nDisallow: /admin\n").unwrap();
        assert_eq!(robot.crawl_delay(), None);
    }
}
