/// Checks if a domain matches a manual-exclusion pattern.
///
/// Supports two shapes:
/// 1. Exact match: `"example.com"` matches only `"example.com"`.
/// 2. Wildcard match: `"*.example.com"` matches `"example.com"` itself, any
///    single subdomain, and any nested subdomain.
///
/// Manual exclusions (spec §4.1) are loaded as one domain-or-pattern per
/// line; a literal domain is simply a pattern with no `*.` prefix, so a
/// single matcher covers both shapes.
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}
