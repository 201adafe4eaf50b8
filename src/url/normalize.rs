use crate::UrlError;
use ::url::Url;

/// URLs longer than this are dropped during the frontier pre-filter (spec
/// §4.3 step 1); kept here so both the frontier manager and tests share one
/// constant.
pub const MAX_URL_LENGTH: usize = 2_000;

/// File extensions that are "likely non-text" and should never be queued.
/// Matched case-insensitively against the final path segment.
const NON_TEXT_EXTENSIONS: &[&str] = &[
    // media
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico", "tiff", "avif", "mp3", "mp4", "wav",
    "avi", "mov", "mkv", "flac", "ogg", "webm", "m4a", "m4v",
    // archives / binaries
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "exe", "dmg", "msi", "deb", "rpm", "iso",
    // documents that are not HTML text
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "woff", "woff2", "ttf", "eot", "otf",
    "css", "js", "json", "xml", "rss",
];

/// Normalizes a URL per the frontier's storage invariant.
///
/// Steps:
/// 1. If `url_str` has no recognizable scheme, promote it to `http://`.
/// 2. Parse; reject anything that isn't `http`/`https`.
/// 3. Lowercase scheme and host (the `url` crate does this during parsing).
/// 4. Strip the default port for the scheme (also handled by `url`'s
///    serializer, verified below by test).
/// 5. Remove the fragment.
///
/// Path dot-segment collapsing is handled by the `url` crate itself during
/// parsing, since `http`/`https` are "special" schemes under the WHATWG URL
/// Standard.
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let candidate = promote_bare_host(url_str);

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(url)
}

/// If `url_str` has no `scheme://` prefix, treat it as a bare host and
/// promote it to `http://host/` (spec §3, "bare host promotion").
fn promote_bare_host(url_str: &str) -> String {
    let trimmed = url_str.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Returns true if `url`'s final path segment has an extension that marks
/// it as "likely non-text" (binary, media, or archive content).
pub fn is_likely_non_text(url: &Url) -> bool {
    let path = url.path();
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => NON_TEXT_EXTENSIONS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(ext)),
        None => false,
    }
}
