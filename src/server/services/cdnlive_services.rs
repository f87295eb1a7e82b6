use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    config::ProviderSettings,
    models::{ProviderKind, StreamResult},
    server::{
        error::Error,
        services::provider_services::{EmbedPipeline, ProviderServiceTrait},
        utils::{http_utils::playback_headers, pattern_extractor::PatternExtractor},
    },
};

/// cdnlive serves both scheduled events (by id) and 24/7 channels (by name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdnliveTarget {
    Event(String),
    Channel(String),
}

impl CdnliveTarget {
    pub fn embed_path(&self) -> String {
        match self {
            CdnliveTarget::Event(id) => format!("/embed/event/{}", urlencoding::encode(id.trim())),
            CdnliveTarget::Channel(name) => format!(
                "/embed/channel/{}",
                urlencoding::encode(&name.trim().to_ascii_lowercase())
            ),
        }
    }
}

pub struct CdnliveService {
    pipeline: EmbedPipeline,
    domains: Vec<String>,
}

impl CdnliveService {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            pipeline: EmbedPipeline::new(settings.timeout, PatternExtractor::with_vendor("cdnlive")),
            domains: settings.cdnlive_domains.clone(),
        }
    }

    pub async fn resolve_target(&self, target: &CdnliveTarget) -> StreamResult {
        info!("resolving cdnlive {:?}", target);

        match self
            .pipeline
            .resolve_mirrors(&self.domains, &target.embed_path())
            .await
        {
            Ok((resolved, domain)) => StreamResult::found(
                resolved.stream_url,
                resolved.rule_name,
                playback_headers(&resolved.page_url),
                Some(domain),
            ),
            Err((Error::OfflineEvent(msg), domain)) => StreamResult::offline(msg, domain),
            Err((e, _)) => {
                error!("cdnlive {:?} failed on every mirror: {}", target, e);
                StreamResult::from(e)
            }
        }
    }
}

#[async_trait]
impl ProviderServiceTrait for CdnliveService {
    fn kind(&self) -> ProviderKind {
        ProviderKind::EventBased
    }

    async fn resolve(&self, local_id: &str) -> StreamResult {
        self.resolve_target(&CdnliveTarget::Channel(local_id.to_string()))
            .await
    }
}
