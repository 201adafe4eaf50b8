use crate::kv::schema::truncate_body;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

/// Outcome of one fetch attempt, returned even on failure (spec §6: the HTTP
/// fetcher "returns even on failure" rather than propagating an error up
/// through the frontier, since a fetch failure is recorded as a visited
/// record, not a crate-level error).
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub initial_url: String,
    pub final_url: String,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub text_content: Option<String>,
    pub is_redirect: bool,
    pub error_message: Option<String>,
}

impl FetchOutcome {
    fn error(initial_url: &str, message: impl Into<String>) -> Self {
        Self {
            initial_url: initial_url.to_string(),
            final_url: initial_url.to_string(),
            status_code: Some(0),
            content_type: None,
            text_content: None,
            is_redirect: false,
            error_message: Some(message.into()),
        }
    }
}

/// Turns a claimed URL into fetched bytes. A thin collaborator: the
/// frontier and politeness layers don't care how the bytes were obtained,
/// only that a [`FetchOutcome`] comes back for every claim.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, is_robots_txt: bool) -> FetchOutcome;
}

/// Default [`Fetcher`], adapted from the teacher's `crawler::fetcher`:
/// same `reqwest` client shape (custom UA, gzip/brotli, bounded timeouts),
/// simplified to the spec's at-most-once contract — no retry loop, since
/// fetch failures here are recorded and never retried by the core.
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn build(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(10))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, _is_robots_txt: bool) -> FetchOutcome {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return FetchOutcome::error(url, e.to_string()),
        };

        let final_url = response.url().to_string();
        let is_redirect = final_url != url;
        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let text_content = match response.text().await {
            Ok(body) => Some(truncate_body(&body)),
            Err(e) => {
                return FetchOutcome {
                    initial_url: url.to_string(),
                    final_url,
                    status_code: Some(status_code),
                    content_type,
                    text_content: None,
                    is_redirect,
                    error_message: Some(e.to_string()),
                }
            }
        };

        FetchOutcome {
            initial_url: url.to_string(),
            final_url,
            status_code: Some(status_code),
            content_type,
            text_content,
            is_redirect,
            error_message: None,
        }
    }
}
