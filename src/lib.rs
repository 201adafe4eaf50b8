//! Ripplefront: the frontier, politeness, and claiming core of a polite,
//! high-throughput web crawler.
//!
//! This crate owns the concurrent data plane shared by thousands of fetcher
//! tasks: a per-domain append-only frontier of discovered URLs, a networked
//! KV store that tracks ready-domain scheduling and probabilistic dedup, and
//! a politeness layer that caches robots.txt and enforces crawl delays. The
//! HTTP fetcher and HTML parser are thin collaborators (see [`collaborators`])
//! whose job is to turn a claimed URL into fetched bytes and extracted links;
//! everything about *which* URL gets claimed *when* lives here.

pub mod collaborators;
pub mod config;
pub mod frontier;
pub mod kv;
pub mod orchestrator;
pub mod politeness;
pub mod tools;
pub mod url;

use thiserror::Error;

/// A derived, non-persisted view over a fetch's outcome, used only for
/// structured logging and metrics labels at the orchestrator layer (mirrors
/// the teacher's `state::PageState` enum). Shared between [`frontier`]
/// (which sees robots denials and non-text skips during claiming) and
/// [`orchestrator`] (which sees the rest during fetch/parse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Fetched,
    HttpError(u16),
    NetworkError,
    RobotsDenied,
    NonTextSkipped,
    Exhausted,
}

/// Top-level error type for ripplefront operations.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("KV store error: {0}")]
    Kv(#[from] kv::KvError),

    #[error("frontier error: {0}")]
    Frontier(#[from] frontier::FrontierError),

    #[error("politeness error: {0}")]
    Politeness(#[from] politeness::PolitenessError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown requested")]
    Cancelled,
}

/// URL-specific errors, mirroring the normalization pipeline's failure modes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("failed to parse URL: {0}")]
    Parse(String),

    #[error("unsupported URL scheme: {0}")]
    InvalidScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for ripplefront operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

pub use config::Config;
pub use frontier::{DomainEntry, UrlRecord};
pub use url::{extract_registered_domain, is_likely_non_text, normalize_url};
