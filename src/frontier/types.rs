use thiserror::Error;

/// One URL discovered at a given crawl depth, as stored in a domain's
/// frontier file: `url|depth\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub url: String,
    pub depth: u32,
}

impl UrlRecord {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }

    /// Serializes as the on-disk line format, including the trailing `\n`.
    pub fn to_line(&self) -> String {
        format!("{}|{}\n", self.url, self.depth)
    }

    /// Parses a single line (without its trailing `\n`). Returns `None` on
    /// malformed input rather than erroring — callers skip and advance past
    /// a bad line instead of treating the whole frontier file as corrupt.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (url, depth) = line.rsplit_once('|')?;
        if url.is_empty() {
            return None;
        }
        let depth: u32 = depth.trim_end().parse().ok()?;
        Some(Self {
            url: url.to_string(),
            depth,
        })
    }
}

/// A registered-domain's frontier entry, as cached in process from the KV
/// store's `domain:<d>` hash. Mirrors [`crate::kv::DomainRecord`] but adds
/// the domain name itself, since callers usually need both together.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEntry {
    pub domain: String,
    pub file_path: String,
    pub frontier_offset: u64,
    pub frontier_size: u64,
    pub is_seeded: bool,
    pub is_excluded: bool,
    pub next_fetch_time: Option<i64>,
}

impl DomainEntry {
    pub fn is_exhausted(&self) -> bool {
        self.frontier_offset >= self.frontier_size
    }
}

/// Errors surfaced by the frontier file store and manager.
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("KV store error: {0}")]
    Kv(#[from] crate::kv::KvError),

    #[error("frontier file I/O error for domain {domain}: {source}")]
    Io {
        domain: String,
        #[source]
        source: std::io::Error,
    },

    #[error("frontier file for domain {0} is missing")]
    FileMissing(String),

    #[error("politeness error: {0}")]
    Politeness(#[from] crate::politeness::PolitenessError),
}
