//! Thin, swappable collaborators named by the core's external interfaces:
//! the HTTP fetcher, HTML parser, and content writer. The frontier and
//! politeness layers depend only on these traits, never on `reqwest` or
//! `scraper` directly.

mod fetcher;
mod parser;
mod storage;

pub use fetcher::{FetchOutcome, Fetcher, ReqwestFetcher};
pub use parser::{HtmlParser, ParsedPage, ScraperHtmlParser};
pub use storage::{sha256_hex, ContentWriter, FsContentWriter};
