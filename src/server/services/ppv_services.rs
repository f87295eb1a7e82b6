// pay per view events, the embed uri looks like "nfl/2026-01-17/buf-den"
use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    config::ProviderSettings,
    models::{FailureKind, ProviderKind, StreamResult},
    server::{
        error::Error,
        services::provider_services::{EmbedPipeline, ProviderServiceTrait},
        utils::{http_utils::playback_headers, pattern_extractor::PatternExtractor},
    },
};

pub struct PpvService {
    pipeline: EmbedPipeline,
    domains: Vec<String>,
}

impl PpvService {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            pipeline: EmbedPipeline::new(settings.timeout, PatternExtractor::with_vendor("ppv")),
            domains: settings.ppv_domains.clone(),
        }
    }

    /// strips anything that would let the uri escape /embed/
    pub fn embed_path(uri: &str) -> Option<String> {
        let cleaned = uri.trim().trim_matches('/');
        if cleaned.is_empty() || cleaned.split('/').any(|part| part == ".." || part.is_empty()) {
            return None;
        }

        let encoded: Vec<String> = cleaned
            .split('/')
            .map(|part| urlencoding::encode(part).into_owned())
            .collect();
        Some(format!("/embed/{}", encoded.join("/")))
    }
}

#[async_trait]
impl ProviderServiceTrait for PpvService {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ppv
    }

    async fn resolve(&self, local_id: &str) -> StreamResult {
        let Some(path) = Self::embed_path(local_id) else {
            return StreamResult::failed(
                FailureKind::NotFound,
                format!("invalid ppv uri '{}'", local_id),
            );
        };

        info!("resolving ppv {}", path);

        match self.pipeline.resolve_mirrors(&self.domains, &path).await {
            Ok((resolved, domain)) => StreamResult::found(
                resolved.stream_url,
                resolved.rule_name,
                playback_headers(&resolved.page_url),
                Some(domain),
            ),
            Err((Error::OfflineEvent(msg), domain)) => StreamResult::offline(msg, domain),
            Err((e, _)) => {
                error!("ppv {} failed on every mirror: {}", local_id, e);
                StreamResult::from(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_path_rejects_traversal() {
        assert_eq!(
            PpvService::embed_path("/nfl/2026-01-17/buf-den/").as_deref(),
            Some("/embed/nfl/2026-01-17/buf-den")
        );
        assert_eq!(PpvService::embed_path("nfl/../admin"), None);
        assert_eq!(PpvService::embed_path("  "), None);
    }
}
