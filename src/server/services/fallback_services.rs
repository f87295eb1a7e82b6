use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::RoutingConfig,
    models::{ChannelMapping, FailureKind, ProviderKind, ProviderPriority, StreamResult},
    server::services::provider_services::ProviderRegistry,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackOptions {
    pub preferred: Option<ProviderKind>,
    pub exclude: Vec<ProviderKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAttempt {
    pub provider: ProviderKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    pub result: StreamResult,
    // set only when something succeeded
    pub source: Option<ProviderKind>,
    pub provider_id: Option<String>,
    pub attempted: Vec<ProviderAttempt>,
    pub candidates: Vec<ProviderKind>,
}

impl FallbackOutcome {
    /// nothing was even tried, either everything got excluded or no adapter exists
    pub fn had_no_candidates(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// walks a channel's providers one after another until one of them plays
///
/// attempts are never concurrent, upstreams ban bursts
pub struct FallbackOrchestrator {
    registry: Arc<ProviderRegistry>,
    priority: ProviderPriority,
    delay: Duration,
}

impl FallbackOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, config: &RoutingConfig) -> Self {
        Self {
            registry,
            priority: config.priority.clone(),
            delay: config.fallback_delay,
        }
    }

    /// preferred first (if the channel has it and it isn't excluded), then priority order
    pub fn candidate_order(
        &self,
        mapping: &ChannelMapping,
        options: &FallbackOptions,
    ) -> Vec<ProviderKind> {
        let mut order = Vec::new();

        if let Some(preferred) = options.preferred.filter(|p| mapping.supports(*p)) {
            order.push(preferred);
        }

        for kind in self.priority.sort(mapping.providers.keys().copied()) {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }

        order.retain(|kind| !options.exclude.contains(kind));
        order
    }

    async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }

        let max_jitter = (self.delay.as_millis() / 2) as u64;
        let jitter = rand::rng().random_range(0..=max_jitter);
        tokio::time::sleep(self.delay + Duration::from_millis(jitter)).await;
    }

    pub async fn get_stream_with_fallback(
        &self,
        mapping: &ChannelMapping,
        options: &FallbackOptions,
    ) -> FallbackOutcome {
        let candidates: Vec<ProviderKind> = self
            .candidate_order(mapping, options)
            .into_iter()
            .filter(|kind| {
                let registered = self.registry.get(*kind).is_some();
                if !registered {
                    warn!("no adapter registered for {}, skipping", kind);
                }
                registered
            })
            .collect();

        let mut attempted = Vec::with_capacity(candidates.len());

        for (i, kind) in candidates.iter().copied().enumerate() {
            let (Some(adapter), Some(local_id)) = (self.registry.get(kind), mapping.local_id(kind))
            else {
                continue;
            };

            if i > 0 {
                self.pause().await;
            }

            info!(
                "channel {}: trying {} ({})",
                mapping.channel_id, kind, local_id
            );
            let result = adapter.resolve(local_id).await;

            let outcome = if result.success {
                "success"
            } else if result.is_offline() {
                "offline"
            } else {
                "failed"
            };
            metrics::counter!(
                "relay_provider_attempts_total",
                "provider" => kind.as_str(),
                "outcome" => outcome
            )
            .increment(1);

            attempted.push(ProviderAttempt {
                provider: kind,
                success: result.success,
                error: result.error.clone(),
                is_live: result.is_live,
            });

            if result.success {
                info!("channel {} resolved through {}", mapping.channel_id, kind);
                return FallbackOutcome {
                    result,
                    source: Some(kind),
                    provider_id: Some(local_id.to_string()),
                    attempted,
                    candidates,
                };
            }

            // offline here says nothing about the next provider, keep going
            warn!(
                "channel {}: {} failed: {}",
                mapping.channel_id,
                kind,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }

        let error = if candidates.is_empty() {
            format!("no provider available for channel {}", mapping.channel_id)
        } else {
            format!(
                "all providers failed for channel {} ({} tried)",
                mapping.channel_id,
                attempted.len()
            )
        };

        let kind = if candidates.is_empty() {
            FailureKind::NotFound
        } else {
            FailureKind::UpstreamUnavailable
        };

        FallbackOutcome {
            result: StreamResult::failed(kind, error),
            source: None,
            provider_id: None,
            attempted,
            candidates,
        }
    }
}
