//! `discover` — runs one discovery pass and publishes the result.
//! Exit code 0 on success (including a successful empty result), 1 on
//! lock contention or any unrecoverable startup failure (spec.md §6).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use discovery_engine::adaptive_params::{AdaptiveParameters, DefaultAdaptiveParameters, LearningServiceClient};
use discovery_engine::config::Config;
use discovery_engine::feature_cache::FeatureCache;
use discovery_engine::job_lock::JobLock;
use discovery_engine::market_data::{PolygonMarketDataClient, StreamQuoteListener};
use discovery_engine::metrics_boot;
use discovery_engine::orchestrator::DiscoveryOrchestrator;
use discovery_engine::redis_pool::RedisPool;
use discovery_engine::result_publisher::ResultPublisher;
use discovery_engine::volume_store::VolumeAverageStore;

#[derive(Parser, Debug)]
#[command(name = "discover", about = "Run one staged discovery pass")]
struct Args {
    /// Optional JSON document overlaying weights/presets/thresholds.
    #[arg(long, env = "DISCOVERY_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Strategy key, overriding config/env.
    #[arg(long)]
    strategy: Option<String>,

    /// Prometheus exporter bind address, e.g. 0.0.0.0:9898.
    #[arg(long, default_value = "127.0.0.1:9898")]
    metrics_addr: std::net::SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = Config::load(args.config.as_deref()).map_err(|e| anyhow::anyhow!(e))?;
    if let Some(strategy) = args.strategy {
        cfg.strategy = strategy;
    }

    metrics_boot::install(args.metrics_addr);

    // Purely ambient: discovery runs work from REST/batch features alone
    // if this is disabled or the connection drops.
    if std::env::var("DISCOVERY_ENABLE_STREAM").is_ok() {
        StreamQuoteListener::new(&cfg.market_data_api_key).spawn(FeatureCache::global());
    }

    let market_data = Arc::new(PolygonMarketDataClient::new(cfg.market_data_api_key.clone()));
    let volume_store = VolumeAverageStore::connect(&cfg.database_url)
        .await
        .context("connecting to volume average store")?;
    volume_store.migrate().await.context("running volume_averages migration")?;

    let redis = RedisPool::new(&cfg.redis_url).await.context("connecting to redis")?;
    let job_lock = JobLock::new(redis.clone());
    let publisher = ResultPublisher::new(redis, cfg.ttls.result_secs as usize);

    let adaptive: Arc<dyn AdaptiveParameters> = match &cfg.learning_service_url {
        Some(url) => Arc::new(LearningServiceClient::new(url.clone(), cfg.learning_timeout)),
        None => Arc::new(DefaultAdaptiveParameters::default()),
    };

    let orchestrator = Arc::new(DiscoveryOrchestrator::new(
        market_data,
        volume_store,
        job_lock,
        publisher,
        adaptive,
        cfg,
    ));

    let result = orchestrator.run().await;

    // spec.md §6: exit 0 on success (including a well-formed empty
    // result), exit 1 when the lock was held or the run never reached
    // the sorting stage at all — any `stats.reason` at this boundary.
    if let Some(reason) = &result.stats.reason {
        log::error!("discovery run produced no candidates: {reason}");
        std::process::exit(1);
    }

    log::info!(
        "discovery run complete: {} candidates, strategy={}",
        result.candidates.len(),
        result.strategy
    );
    Ok(())
}
