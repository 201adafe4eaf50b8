//! KV store key/field naming — the crate's external compatibility surface
//! (spec §6). Keep this module as the single source of truth for key shapes
//! so the backend implementations and the maintenance tools never drift.

/// Current schema version. Bump when a key or field shape changes.
pub const SCHEMA_VERSION: u32 = 1;

pub const KEY_SCHEMA_VERSION: &str = "schema_version";
pub const KEY_DOMAINS_QUEUE: &str = "domains:queue";
pub const KEY_DOMAINS_INDEX: &str = "domains:index";
pub const KEY_SEEN_BLOOM: &str = "seen:bloom";
pub const KEY_VISITED_BY_TIME: &str = "visited:by_time";

pub fn domain_key(domain: &str) -> String {
    format!("domain:{domain}")
}

pub fn visited_key(visited_id: &str) -> String {
    format!("visited:{visited_id}")
}

// Hash fields on `domain:<d>`.
pub const FIELD_FRONTIER_OFFSET: &str = "frontier_offset";
pub const FIELD_FRONTIER_SIZE: &str = "frontier_size";
pub const FIELD_FILE_PATH: &str = "file_path";
pub const FIELD_IS_SEEDED: &str = "is_seeded";
pub const FIELD_IS_EXCLUDED: &str = "is_excluded";
pub const FIELD_NEXT_FETCH_TIME: &str = "next_fetch_time";
pub const FIELD_ROBOTS_TXT: &str = "robots_txt";
pub const FIELD_ROBOTS_EXPIRES: &str = "robots_expires";

// Hash fields on `visited:<16-hex>`.
pub const FIELD_URL: &str = "url";
pub const FIELD_URL_SHA256: &str = "url_sha256";
pub const FIELD_DOMAIN: &str = "domain";
pub const FIELD_STATUS_CODE: &str = "status_code";
pub const FIELD_FETCHED_AT: &str = "fetched_at";
pub const FIELD_CONTENT_PATH: &str = "content_path";
pub const FIELD_CONTENT_TYPE: &str = "content_type";
pub const FIELD_CONTENT_HASH: &str = "content_hash";
pub const FIELD_REDIRECTED_TO_URL: &str = "redirected_to_url";
pub const FIELD_ERROR: &str = "error";

/// Robots.txt bodies (and fetched page bodies) are capped at 100 KiB before
/// being persisted (spec §5 "Resource caps").
pub const MAX_CACHED_BODY_BYTES: usize = 100 * 1024;

/// Truncates a body to the shared cap, on a UTF-8 char boundary.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_CACHED_BODY_BYTES {
        return body.to_string();
    }
    let mut end = MAX_CACHED_BODY_BYTES;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

/// Builds the 16-hex-prefix visited key from a URL's SHA-256 hex digest.
pub fn visited_id_from_sha256_hex(sha256_hex: &str) -> String {
    sha256_hex.chars().take(16).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_at_char_boundary() {
        let body = "a".repeat(MAX_CACHED_BODY_BYTES + 10);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.len(), MAX_CACHED_BODY_BYTES);
    }

    #[test]
    fn leaves_short_body_untouched() {
        assert_eq!(truncate_body("hello"), "hello");
    }

    #[test]
    fn visited_id_is_16_chars() {
        let hex = "a".repeat(64);
        assert_eq!(visited_id_from_sha256_hex(&hex).len(), 16);
    }
}
