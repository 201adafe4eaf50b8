//! Maintenance tools acknowledged as collaborators rather than part of the
//! steady-state claim path (spec §6): an empty-domain pruner, a frontier
//! normalizer, a robots-cache truncator, and a ready-domain-index migrator.
//! Each is a plain async function over [`KvBackend`] and [`FrontierFileStore`]
//! so `main.rs` can wire them up as CLI subcommands, mirroring the teacher's
//! `output::stats`/`cli` split between library logic and command plumbing.

use crate::frontier::{FrontierError, FrontierFileStore, UrlRecord};
use crate::kv::schema::truncate_body;
use crate::kv::{KvBackend, KvError};
use crate::url::normalize_url;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Kv(#[from] KvError),

    #[error(transparent)]
    Frontier(#[from] FrontierError),
}

/// Removes every domain whose frontier is fully drained (`offset == size`)
/// from `domains:queue`, so the ready-domain index doesn't accumulate dead
/// weight for domains that will never produce another URL on their own
/// (spec §6: "`ZREM` domains whose file has 0 unread bytes").
pub async fn prune_empty_domains(kv: &dyn KvBackend) -> Result<usize, ToolError> {
    let mut pruned = 0usize;
    for domain in kv.all_domains().await? {
        let record = kv.get_domain(&domain).await?;
        if record.frontier_offset >= record.frontier_size {
            kv.remove_from_queue(&domain).await?;
            pruned += 1;
        }
    }
    info!(pruned, "pruned empty domains from the ready-domain index");
    Ok(pruned)
}

/// Rewrites a domain's frontier file with every URL re-normalized, dropping
/// lines that no longer parse, and resets `frontier_offset`/`frontier_size`
/// to match the rewritten file (spec §6: "rewrites legacy un-normalized
/// frontier lines and resets `frontier_offset=0`, `frontier_size=new-file-size`").
///
/// Intended as a one-off, offline operation against a quiesced domain — it
/// does not take the frontier manager's per-domain lock, so it must not run
/// concurrently with live traffic for the same domain.
pub async fn normalize_frontier_file(
    kv: &dyn KvBackend,
    files: &FrontierFileStore,
    domain: &str,
) -> Result<u64, ToolError> {
    let size = files.size(domain).await?;
    let mut offset = 0u64;
    let mut normalized = Vec::new();
    let mut dropped = 0usize;

    while offset < size {
        let (record, new_offset) = files.read_line_at(domain, offset).await?;
        if new_offset == offset {
            break;
        }
        offset = new_offset;
        let Some(record) = record else {
            dropped += 1;
            continue;
        };
        match normalize_url(&record.url) {
            Ok(normalized_url) => normalized.push(UrlRecord::new(normalized_url.to_string(), record.depth)),
            Err(e) => {
                warn!(domain, url = record.url, error = %e, "dropping frontier line that no longer normalizes");
                dropped += 1;
            }
        }
    }

    let new_size = files.rewrite(domain, &normalized).await?;
    kv.reset_frontier(domain, 0, new_size).await?;
    info!(domain, kept = normalized.len(), dropped, new_size, "normalized frontier file");
    Ok(new_size)
}

/// Caps every domain's persisted `robots_txt` body at the shared size limit,
/// for domains admitted by an older build that didn't yet enforce it.
pub async fn truncate_robots_cache(kv: &dyn KvBackend) -> Result<usize, ToolError> {
    let mut truncated = 0usize;
    for domain in kv.all_domains().await? {
        let record = kv.get_domain(&domain).await?;
        if let Some(body) = record.robots_txt {
            let capped = truncate_body(&body);
            if capped.len() != body.len() {
                let expires = record.robots_expires.unwrap_or(0);
                kv.set_domain_robots(&domain, &capped, expires).await?;
                truncated += 1;
            }
        }
    }
    info!(truncated, "truncated oversized robots.txt bodies");
    Ok(truncated)
}

/// One-shot migration for deployments that ran a prior schema where
/// `domains:queue` was a list instead of a sorted set: re-inserts every
/// listed domain with `score = now`, a no-op against a store already on the
/// sorted-set schema since [`KvBackend`] only ever exposes sorted-set
/// operations for it. Kept as an explicit, named step so upgrades have a
/// single documented command rather than relying on implicit behavior.
pub async fn migrate_queue_from_list(
    kv: &dyn KvBackend,
    legacy_domains: &[String],
    now: f64,
) -> Result<usize, ToolError> {
    for domain in legacy_domains {
        kv.reinsert_domain(domain, now).await?;
    }
    info!(count = legacy_domains.len(), "migrated legacy domain list into the sorted-set queue");
    Ok(legacy_domains.len())
}

/// Convenience wrapper bundling the scan-and-truncate tools behind `Arc`,
/// for callers (the CLI) that already hold a shared backend handle.
pub async fn run_robots_truncation(kv: Arc<dyn KvBackend>) -> Result<usize, ToolError> {
    truncate_robots_cache(kv.as_ref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::FakeKv;
    use tempfile::tempdir;

    #[tokio::test]
    async fn prunes_only_fully_drained_domains() {
        let kv = FakeKv::new();
        kv.admit_domain_batch("a.com", "frontiers/00/a.com.frontier", &["http://a.com/1".to_string()], 20, 0.0)
            .await
            .unwrap();
        kv.admit_domain_batch("b.com", "frontiers/00/b.com.frontier", &["http://b.com/1".to_string()], 20, 0.0)
            .await
            .unwrap();
        kv.set_frontier_offset("a.com", 20).await.unwrap();

        let pruned = prune_empty_domains(&kv).await.unwrap();
        assert_eq!(pruned, 1);
    }

    #[tokio::test]
    async fn normalizer_rewrites_and_resets_offsets() {
        let dir = tempdir().unwrap();
        let files = FrontierFileStore::new(dir.path());
        let kv = FakeKv::new();

        files
            .append_batch(
                "Example.com",
                &[UrlRecord::new("HTTP://Example.com:80/a".to_string(), 0)],
            )
            .await
            .unwrap();

        let new_size = normalize_frontier_file(&kv, &files, "Example.com").await.unwrap();
        assert!(new_size > 0);

        let (record, _) = files.read_line_at("Example.com", 0).await.unwrap();
        assert_eq!(record.unwrap().url, "http://example.com/a");

        let domain_record = kv.get_domain("Example.com").await.unwrap();
        assert_eq!(domain_record.frontier_offset, 0);
        assert_eq!(domain_record.frontier_size, new_size);
    }

    #[tokio::test]
    async fn truncates_oversized_robots_bodies() {
        let kv = FakeKv::new();
        kv.admit_domain_batch("big.com", "frontiers/00/big.com.frontier", &["http://big.com/1".to_string()], 20, 0.0)
            .await
            .unwrap();
        let oversized = "x".repeat(200_000);
        kv.set_domain_robots("big.com", &oversized, 9999).await.unwrap();

        let truncated = truncate_robots_cache(&kv).await.unwrap();
        assert_eq!(truncated, 1);

        let record = kv.get_domain("big.com").await.unwrap();
        assert!(record.robots_txt.unwrap().len() <= crate::kv::schema::MAX_CACHED_BODY_BYTES);
    }

    #[tokio::test]
    async fn migrates_a_legacy_domain_list() {
        let kv = FakeKv::new();
        let migrated = migrate_queue_from_list(&kv, &["legacy.com".to_string()], 123.0)
            .await
            .unwrap();
        assert_eq!(migrated, 1);
        assert_eq!(kv.queue_len().await.unwrap(), 1);
    }
}
