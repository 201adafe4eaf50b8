//! URL normalization, registered-domain extraction, and content-type
//! filtering.
//!
//! This module is the teacher's `url` module generalized: normalization now
//! follows the spec's exact rules (scheme lowercasing, default-port
//! stripping, fragment removal, dot-segment collapsing, bare-host
//! promotion) instead of the teacher's opinionated https-only/www-stripping
//! policy, and domain extraction is public-suffix aware rather than a bare
//! `host_str().to_lowercase()`.

mod domain;
mod matcher;
mod normalize;

pub use domain::extract_registered_domain;
pub use matcher::matches_wildcard;
pub use normalize::{is_likely_non_text, normalize_url, MAX_URL_LENGTH};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_then_extract_domain_round_trips() {
        let url = normalize_url("HTTP://Example.COM:80/a/../b/").unwrap();
        let domain = extract_registered_domain(&url).unwrap();
        assert_eq!(domain, "example.com");
    }
}
