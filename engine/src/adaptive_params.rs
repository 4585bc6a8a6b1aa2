//! Pluggable weight/threshold source (spec.md §4.10): an external
//! learning service may override scoring weights and the regime
//! acceptance threshold per run. Bounded by a flat per-call timeout —
//! the teacher's codebase has no circuit-breaker crate to draw on, and
//! spec.md only asks for a hard upper bound per call, so a plain
//! `tokio::time::timeout` is the faithful rendition, not a stateful
//! breaker object.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ScoringWeights;

#[derive(Debug, Clone, Copy)]
pub struct AdaptiveDecision {
    pub weights: ScoringWeights,
    pub regime_threshold: f64,
    pub confidence: f64,
}

#[async_trait]
pub trait AdaptiveParameters: Send + Sync {
    async fn resolve(&self, strategy: &str, base: &ScoringWeights) -> Option<AdaptiveDecision>;
}

/// Always returns the base weights with a neutral threshold. Used when no
/// learning service is configured, and as the fallback every other
/// implementation degrades to on failure or low confidence.
pub struct DefaultAdaptiveParameters {
    pub regime_threshold: f64,
}

impl Default for DefaultAdaptiveParameters {
    fn default() -> Self {
        Self {
            regime_threshold: 0.0,
        }
    }
}

#[async_trait]
impl AdaptiveParameters for DefaultAdaptiveParameters {
    async fn resolve(&self, _strategy: &str, base: &ScoringWeights) -> Option<AdaptiveDecision> {
        Some(AdaptiveDecision {
            weights: *base,
            regime_threshold: self.regime_threshold,
            confidence: 1.0,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LearningResponse {
    weights: Option<ScoringWeights>,
    regime_threshold: Option<f64>,
    confidence: f64,
}

/// HTTP-backed implementation. Responses below
/// [`crate::config::Config::learning_min_confidence`] are discarded by
/// the caller, not here — this client only enforces the timeout.
pub struct LearningServiceClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl LearningServiceClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl AdaptiveParameters for LearningServiceClient {
    async fn resolve(&self, strategy: &str, base: &ScoringWeights) -> Option<AdaptiveDecision> {
        let url = format!("{}/parameters/{strategy}", self.base_url);
        let call = self.client.get(&url).send();

        let resp = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(r)) if r.status().is_success() => r,
            Ok(Ok(r)) => {
                log::warn!("learning service non-success status: {}", r.status());
                return None;
            }
            Ok(Err(e)) => {
                log::warn!("learning service request failed: {e}");
                return None;
            }
            Err(_) => {
                metrics::increment_counter!("adaptive_params_timeout_total");
                log::warn!("learning service call for {strategy} exceeded its timeout");
                return None;
            }
        };

        let parsed: LearningResponse = match resp.json().await {
            Ok(p) => p,
            Err(e) => {
                log::warn!("learning service malformed payload: {e}");
                return None;
            }
        };

        Some(AdaptiveDecision {
            weights: parsed.weights.unwrap_or(*base),
            regime_threshold: parsed.regime_threshold.unwrap_or(0.0),
            confidence: parsed.confidence,
        })
    }
}
