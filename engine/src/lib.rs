//! Staged US-equities discovery engine. See `SPEC_FULL.md` and
//! `DESIGN.md` at the workspace root for the full module ledger.

pub mod adaptive_params;
pub mod cache_refresh_job;
pub mod config;
pub mod error;
pub mod feature_cache;
pub mod filters;
pub mod freshness_gate;
pub mod job_lock;
pub mod market_data;
pub mod metrics_boot;
pub mod momentum;
pub mod orchestrator;
pub mod pattern_matcher;
pub mod redis_pool;
pub mod result_publisher;
pub mod scorer;
pub mod session;
pub mod stage_tracer;
pub mod types;
pub mod volume_store;
