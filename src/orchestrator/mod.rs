//! Spawns fetcher tasks and drives each through claim → fetch → parse →
//! enqueue → record, watching for shutdown and the configured stop
//! conditions.

mod maintenance;
mod worker;

use crate::collaborators::{ContentWriter, Fetcher, HtmlParser};
use crate::config::Config;
use crate::frontier::FrontierManager;
use crate::kv::KvBackend;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub use crate::PageOutcome;
pub use maintenance::maintenance_loop;
pub use worker::worker_loop;

/// The bundle of collaborators and shared state every fetcher task needs.
/// Replaces the source's process-wide singletons (spec §9 design notes)
/// with one explicit struct, threaded by `Arc` into each task.
pub struct CrawlContext {
    pub kv: Arc<dyn KvBackend>,
    pub frontier: FrontierManager,
    pub fetcher: Arc<dyn Fetcher>,
    pub parser: Arc<dyn HtmlParser>,
    pub content_writer: Arc<dyn ContentWriter>,
    pub config: Config,
    /// Total KV backend calls made so far, for `maintenance_loop`'s gauge.
    /// `main.rs` wires this to the same counter a [`crate::kv::CountingKv`]
    /// wrapping `kv` increments; a plain zero-reporting counter here is fine
    /// for contexts (tests) that construct `kv` directly instead.
    pub kv_op_count: Arc<AtomicU64>,
}

/// Tracks global stop-condition state shared across every task: a shutdown
/// flag flipped once any stop condition fires, a running page counter, and
/// the crawl's start time for the `max_duration` check.
pub struct CrawlStopConditions {
    pub shutdown: watch::Sender<bool>,
    pub pages_fetched: AtomicU64,
    pub started_at: Instant,
    pub max_pages: Option<u64>,
    pub max_duration: Option<std::time::Duration>,
}

impl CrawlStopConditions {
    pub fn new(max_pages: Option<u64>, max_duration_secs: Option<u64>) -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let conditions = Self {
            shutdown: tx,
            pages_fetched: AtomicU64::new(0),
            started_at: Instant::now(),
            max_pages,
            max_duration: max_duration_secs.map(std::time::Duration::from_secs),
        };
        (conditions, rx)
    }

    /// Called after every successful dispatch; flips the shutdown flag if a
    /// stop condition now holds.
    pub fn record_page_fetched(&self) {
        let count = self
            .pages_fetched
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        if let Some(max) = self.max_pages {
            if count >= max {
                info!(count, max, "max_pages reached, signaling shutdown");
                let _ = self.shutdown.send(true);
            }
        }
        if let Some(max_duration) = self.max_duration {
            if self.started_at.elapsed() >= max_duration {
                info!("max_duration reached, signaling shutdown");
                let _ = self.shutdown.send(true);
            }
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.subscribe().borrow()
    }
}

/// Launches `config.orchestrator.max_workers` fetcher tasks plus a periodic
/// maintenance task, and waits for all of them to exit (after shutdown is
/// signaled).
pub struct Orchestrator {
    context: Arc<CrawlContext>,
    stop: Arc<CrawlStopConditions>,
}

impl Orchestrator {
    pub fn new(context: CrawlContext) -> Self {
        let max_pages = context.config.orchestrator.max_pages;
        let max_duration_secs = context.config.orchestrator.max_duration_secs;
        let (stop, _rx) = CrawlStopConditions::new(max_pages, max_duration_secs);
        Self {
            context: Arc::new(context),
            stop: Arc::new(stop),
        }
    }

    /// Flips the shared shutdown flag; every worker exits at its next
    /// iteration boundary.
    pub fn request_shutdown(&self) {
        let _ = self.stop.shutdown.send(true);
    }

    pub async fn run(&self) {
        let worker_count = self.context.config.orchestrator.max_workers;
        info!(worker_count, "spawning fetcher tasks");

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count as usize + 1);

        for worker_id in 0..worker_count {
            let ctx = self.context.clone();
            let stop = self.stop.clone();
            let shutdown_rx = stop.shutdown.subscribe();
            handles.push(tokio::spawn(async move {
                worker_loop(ctx, stop, shutdown_rx, worker_id).await;
            }));
        }

        let maintenance_ctx = self.context.clone();
        let maintenance_stop = self.stop.clone();
        let maintenance_shutdown = self.stop.shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            maintenance_loop(maintenance_ctx, maintenance_stop, maintenance_shutdown).await;
        }));

        for handle in handles {
            let _ = handle.await;
        }
    }
}
