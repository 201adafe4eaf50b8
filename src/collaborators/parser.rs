use scraper::{Html, Selector};
use url::Url;

/// Extracted content from a fetched page: text for storage, links for
/// frontier re-admission. Both fields are derived views, never persisted
/// directly — the frontier records only the links it chose to admit.
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub text_content: Option<String>,
    pub extracted_links: Vec<String>,
}

/// Turns raw HTML into text and links. A thin collaborator: HTML parsing is
/// specified as happening off the fetcher event loop (spec §5), but this
/// crate's default implementation runs it inline for simplicity — a
/// deployment that needs the out-of-process split swaps in a different
/// [`HtmlParser`] that shells out to a parser worker.
pub trait HtmlParser: Send + Sync {
    fn parse(&self, html: &str, base_url: &Url) -> ParsedPage;
}

/// Default [`HtmlParser`], adapted from the teacher's `crawler::parser`:
/// same link-extraction rules (`<a href>` + `<link rel="canonical">`,
/// javascript:/mailto:/tel:/data: and fragment-only hrefs excluded,
/// non-http(s) schemes dropped after resolution), generalized to also
/// return extracted body text instead of only a title.
pub struct ScraperHtmlParser;

impl ScraperHtmlParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScraperHtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlParser for ScraperHtmlParser {
    fn parse(&self, html: &str, base_url: &Url) -> ParsedPage {
        let document = Html::parse_document(html);
        ParsedPage {
            text_content: extract_text(&document),
            extracted_links: extract_links(&document, base_url),
        }
    }
}

fn extract_text(document: &Html) -> Option<String> {
    let body_selector = Selector::parse("body").ok()?;
    let text: String = document
        .select(&body_selector)
        .flat_map(|el| el.text())
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

/// Resolves an href to an absolute, defragmented URL, or `None` if it
/// should be excluded (special schemes, fragment-only, non-http(s) after
/// resolution).
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute.to_string())
}
