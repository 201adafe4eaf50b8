//! Ripplefront main entry point: loads config, wires up the collaborators,
//! and either runs the crawl or dispatches to one of the maintenance
//! subcommands.

use clap::{Parser, Subcommand};
use ripplefront::collaborators::{FsContentWriter, ReqwestFetcher, ScraperHtmlParser};
use ripplefront::config::{load_config_with_hash, Config};
use ripplefront::frontier::{FrontierFileStore, FrontierManager};
use ripplefront::kv::{KvBackend, RedisKv};
use ripplefront::orchestrator::{CrawlContext, Orchestrator};
use ripplefront::politeness::{PolitenessEnforcer, PolitenessSettings};
use ripplefront::tools;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ripplefront")]
#[command(version = "1.0.0")]
#[command(about = "Frontier, politeness, and claiming core of a polite web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Resume an interrupted crawl (default behavior; the core always
    /// resumes from the persisted frontier offset)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl: wipe the on-disk frontier/content directories.
    /// Does not touch the KV store, which must be flushed separately.
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove fully-drained domains from the ready-domain index.
    PruneEmptyDomains,
    /// Rewrite a domain's frontier file with normalized URLs.
    NormalizeFrontier {
        /// Registered domain to normalize.
        domain: String,
    },
    /// Cap any oversized persisted robots.txt bodies.
    TruncateRobotsCache,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("loading configuration from {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!(config_hash, "configuration loaded");

    let kv: Arc<dyn KvBackend> =
        Arc::new(RedisKv::connect(&config.kv.url, config.kv.shard_count).await?);

    match cli.command {
        Some(Command::PruneEmptyDomains) => {
            let pruned = tools::prune_empty_domains(kv.as_ref()).await?;
            println!("pruned {pruned} empty domains");
        }
        Some(Command::NormalizeFrontier { domain }) => {
            let files = FrontierFileStore::new(&config.frontier.data_dir);
            let new_size = tools::normalize_frontier_file(kv.as_ref(), &files, &domain).await?;
            println!("normalized {domain}: new frontier size {new_size} bytes");
        }
        Some(Command::TruncateRobotsCache) => {
            let truncated = tools::truncate_robots_cache(kv.as_ref()).await?;
            println!("truncated {truncated} oversized robots.txt bodies");
        }
        None => {
            if cli.fresh {
                reset_on_disk_state(&config).await?;
            }
            run_crawl(config, kv).await?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripplefront=info,warn"),
            1 => EnvFilter::new("ripplefront=debug,info"),
            2 => EnvFilter::new("ripplefront=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// `--fresh` only clears the on-disk frontier/content directories; the KV
/// store (ready-domain index, bloom filter, visited records) is shared
/// infrastructure the CLI doesn't own and must be flushed out-of-band.
async fn reset_on_disk_state(config: &Config) -> std::io::Result<()> {
    tracing::warn!("--fresh: removing on-disk frontier and content directories");
    let frontiers_dir = config.frontier.data_dir.join("frontiers");
    let content_dir = config.frontier.data_dir.join("content");
    for dir in [frontiers_dir, content_dir] {
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
    }
    Ok(())
}

async fn run_crawl(
    config: Config,
    kv: Arc<dyn KvBackend>,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_agent = config.user_agent.header_value();

    let (counting_kv, kv_op_count) = ripplefront::kv::CountingKv::new(kv);
    let kv: Arc<dyn KvBackend> = Arc::new(counting_kv);

    kv.set_schema_version(ripplefront::kv::schema::SCHEMA_VERSION)
        .await?;

    let politeness = Arc::new(PolitenessEnforcer::new(
        kv.clone(),
        reqwest::Client::new(),
        PolitenessSettings {
            min_crawl_delay: Duration::from_secs(config.politeness.min_crawl_delay_secs),
            robots_cache_capacity: config.politeness.robots_cache_capacity,
            robots_ttl: Duration::from_secs(
                (config.politeness.robots_ttl_hours.max(0) as u64) * 3600,
            ),
            user_agent: user_agent.clone(),
        },
    ));
    politeness
        .initialize(config.politeness.manual_exclusions_file.as_deref())
        .await?;

    let files = FrontierFileStore::new(&config.frontier.data_dir);
    let frontier = FrontierManager::new(kv.clone(), files, politeness.clone());

    load_seeds(&frontier, &config.seed_file).await?;

    let fetcher = Arc::new(ReqwestFetcher::build(&user_agent)?);
    let parser = Arc::new(ScraperHtmlParser::new());
    let content_writer = Arc::new(FsContentWriter::new(&config.frontier.data_dir));

    let context = CrawlContext {
        kv,
        frontier,
        fetcher,
        parser,
        content_writer,
        config,
        kv_op_count,
    };

    let orchestrator = Orchestrator::new(context);
    tracing::info!("crawl starting");
    orchestrator.run().await;
    tracing::info!("crawl stopped");

    Ok(())
}

/// Reads the newline-delimited seed file and admits every line as a
/// depth-0 URL. Already-admitted seeds are rejected again by the bloom
/// filter, so running this on every restart is safe (spec §8: "idempotent
/// seeding").
async fn load_seeds(
    frontier: &FrontierManager,
    seed_file: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = tokio::fs::read_to_string(seed_file).await?;
    let seeds: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    tracing::info!(count = seeds.len(), "loading seed URLs");
    let admitted = frontier.add_urls_batch(&seeds, 0).await?;
    tracing::info!(admitted, "seed URLs admitted");
    Ok(())
}
