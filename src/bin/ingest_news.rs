use anyhow::{bail, Result};
use clap::Parser;
use serde_json::to_string_pretty;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use contentdeck::config::{self, Secrets};
use contentdeck::db;
use contentdeck::ingest::run_ingest_pipeline;
use contentdeck::search::SearchChain;
use contentdeck::seed::normalize_topics;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Search news for the given topics once and store new articles"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Topics to ingest.
    #[arg(required = true)]
    topics: Vec<String>,

    /// Override `discover.max_articles_per_topic`.
    #[arg(long)]
    limit: Option<usize>,

    /// Write into a throwaway in-memory database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;
    let secrets = Secrets::from_env();

    let search = SearchChain::from_keys(
        &cfg.providers,
        secrets.perplexity_api_key.clone(),
        secrets.tavily_api_key.clone(),
    )?;
    if search.is_empty() {
        bail!("set PERPLEXITY_API_KEY or TAVILY_API_KEY");
    }
    let topics = normalize_topics(&args.topics)?;

    let pool = if args.dry_run {
        db::memory_pool().await?
    } else {
        let pool = db::init_pool(&cfg.database_url()).await?;
        db::run_migrations(&pool).await?;
        pool
    };

    let batch_id = Uuid::new_v4().to_string();
    let limit = args.limit.unwrap_or(cfg.discover.max_articles_per_topic);
    info!(%batch_id, ?search, dry_run = args.dry_run, "ingesting");
    let report = run_ingest_pipeline(&pool, &search, &topics, &batch_id, limit).await?;
    println!("{}", to_string_pretty(&report)?);
    Ok(())
}
