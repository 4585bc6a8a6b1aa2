//! `refresh-volume-cache` — offline companion job (spec.md §6), three
//! modes: `all` (every symbol in the current snapshot), `stale` (only
//! symbols past `--max-age-hours`), `test` (a small dry-run sample).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use discovery_engine::cache_refresh_job::CacheRefreshJob;
use discovery_engine::config::Config;
use discovery_engine::market_data::PolygonMarketDataClient;
use discovery_engine::volume_store::VolumeAverageStore;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    All,
    Stale,
    Test,
}

#[derive(Parser, Debug)]
#[command(name = "refresh-volume-cache", about = "Refresh the 20-day average volume cache")]
struct Args {
    #[arg(long, value_enum, default_value = "all")]
    mode: Mode,

    #[arg(long, env = "DISCOVERY_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    #[arg(long, default_value_t = 500)]
    rate_limit_delay_ms: u64,

    #[arg(long, default_value_t = 24)]
    max_age_hours: i64,

    /// Sample size for `--mode test`.
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = Config::load(args.config.as_deref()).map_err(|e| anyhow::anyhow!(e))?;

    let market_data = Arc::new(PolygonMarketDataClient::new(cfg.market_data_api_key.clone()));
    let volume_store = VolumeAverageStore::connect(&cfg.database_url)
        .await
        .context("connecting to volume average store")?;
    volume_store.migrate().await.context("running volume_averages migration")?;

    let job = CacheRefreshJob::new(market_data, volume_store);
    let delay = Duration::from_millis(args.rate_limit_delay_ms);

    let report = match args.mode {
        Mode::All => job.refresh_all(args.batch_size, delay).await?,
        Mode::Stale => job.refresh_stale(args.max_age_hours, args.batch_size, delay).await?,
        Mode::Test => job.refresh_sample(args.limit, args.batch_size, delay).await?,
    };

    log::info!(
        "refresh complete: attempted={} upserted={} skipped_insufficient_history={}",
        report.attempted,
        report.upserted,
        report.skipped_insufficient_history
    );
    Ok(())
}
