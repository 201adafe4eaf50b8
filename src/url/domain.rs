use ::url::Url;

/// Extracts the registered (public-suffix-aware) domain from a URL.
///
/// Unlike the teacher's bare `host_str().to_lowercase()`, this resolves
/// multi-label public suffixes (`co.uk`, `github.io`, ...) via the
/// `psl` compiled public suffix list so that `blog.example.co.uk` and
/// `shop.example.co.uk` are correctly grouped under `example.co.uk` rather
/// than being treated as unrelated five-label hosts.
///
/// Returns `None` if the URL has no host or the host has no registrable
/// domain (bare IP addresses, single-label hosts with no known suffix).
pub fn extract_registered_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let lower = host.to_lowercase();

    match psl::domain(lower.as_bytes()) {
        Some(domain) => Some(String::from_utf8_lossy(domain.as_bytes()).into_owned()),
        // Hosts the public suffix list doesn't recognize (bare IPs, single
        // label hosts used in tests, internal names) are treated as their
        // own registered domain rather than dropped.
        None => Some(lower),
    }
}
