use crate::url::matches_wildcard;
use std::sync::RwLock;

/// In-process manual-exclusion patterns: bare domains or `*.suffix`
/// wildcards, checked with [`matches_wildcard`] on every `is_url_allowed`
/// call so the hot path never round-trips to the KV store.
pub struct ExclusionList {
    patterns: RwLock<Vec<String>>,
}

impl ExclusionList {
    pub fn new() -> Self {
        Self {
            patterns: RwLock::new(Vec::new()),
        }
    }

    /// Parses a newline-delimited exclusion file: blank lines and lines
    /// starting with `#` are ignored, everything else is lowercased and
    /// trimmed.
    pub fn parse(contents: &str) -> Vec<String> {
        contents
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.to_lowercase())
            .collect()
    }

    pub fn replace(&self, patterns: Vec<String>) {
        *self.patterns.write().unwrap() = patterns;
    }

    pub fn len(&self) -> usize {
        self.patterns.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn matches(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.patterns
            .read()
            .unwrap()
            .iter()
            .any(|pattern| matches_wildcard(pattern, &domain))
    }
}

impl Default for ExclusionList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let parsed = ExclusionList::parse("example.com\n\n# comment\nOTHER.com\n");
        assert_eq!(parsed, vec!["example.com".to_string(), "other.com".to_string()]);
    }

    #[test]
    fn matches_a_literal_domain() {
        let list = ExclusionList::new();
        list.replace(vec!["blocked.example".to_string()]);
        assert!(list.matches("blocked.example"));
        assert!(!list.matches("other.example"));
    }

    #[test]
    fn matches_a_wildcard_pattern() {
        let list = ExclusionList::new();
        list.replace(vec!["*.blocked.example".to_string()]);
        assert!(list.matches("sub.blocked.example"));
        assert!(!list.matches("blocked.example"));
    }

    #[test]
    fn empty_list_matches_nothing() {
        let list = ExclusionList::new();
        assert!(list.is_empty());
        assert!(!list.matches("example.com"));
    }
}
