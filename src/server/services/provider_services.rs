// shared plumbing for every upstream: the adapter trait, the capability table and the embed
// page pipeline (fetch -> offline check -> rules -> one iframe hop)
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    models::{ProviderKind, StreamResult},
    server::{
        error::{AppResult, Error},
        utils::{
            http_utils::{DESKTOP_USER_AGENT, browser_headers},
            pattern_extractor::{PatternExtractor, detect_offline, find_iframes},
        },
    },
};

pub type DynProviderService = Arc<dyn ProviderServiceTrait + Send + Sync>;

/// one iframe hop, never more. misbehaving pages love iframing themselves
pub const MAX_IFRAME_DEPTH: usize = 1;

#[automock]
#[async_trait]
pub trait ProviderServiceTrait {
    fn kind(&self) -> ProviderKind;

    /// never errors, every failure comes back as a StreamResult with success = false
    async fn resolve(&self, local_id: &str) -> StreamResult;
}

/// ProviderKind -> adapter, built once at startup
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderKind, DynProviderService>,
}

impl ProviderRegistry {
    /// later adapters for the same kind replace earlier ones
    pub fn from_adapters(adapters: Vec<DynProviderService>) -> Self {
        Self {
            adapters: adapters.into_iter().map(|a| (a.kind(), a)).collect(),
        }
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&DynProviderService> {
        self.adapters.get(&kind)
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<ProviderKind> = self.adapters.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

/// where a manifest was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEmbed {
    pub stream_url: String,
    pub rule_name: String,
    // page the url was on, after any iframe hop. playback headers come from this
    pub page_url: String,
}

pub struct EmbedPipeline {
    http: reqwest::Client,
    extractor: PatternExtractor,
}

impl EmbedPipeline {
    pub fn new(timeout: Duration, extractor: PatternExtractor) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(DESKTOP_USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { http, extractor }
    }

    /// servers that don't like our referer answer 200 with nothing in it, so an empty body is a
    /// failure too
    pub async fn fetch_page(&self, url: &str, referer: &str) -> AppResult<String> {
        debug!("fetching embed page {} (referer {})", url, referer);

        let response = self
            .http
            .get(url)
            .headers(browser_headers(referer))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "embed page {} returned {}",
                url, status
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(Error::UpstreamUnavailable(format!(
                "embed page {} came back empty, referer was probably rejected",
                url
            )));
        }

        Ok(body)
    }

    /// fetch, check for offline markers, run the rules and follow a single iframe if nothing
    /// matched. depth is bounded by MAX_IFRAME_DEPTH
    pub async fn resolve_page(&self, embed_url: &str, referer: &str) -> AppResult<ResolvedEmbed> {
        let mut page_url = embed_url.to_string();
        let mut referer = referer.to_string();
        let mut depth = 0;

        loop {
            let html = self.fetch_page(&page_url, &referer).await?;

            if let Some(marker) = detect_offline(&html) {
                info!("{} is offline ({})", page_url, marker);
                return Err(Error::OfflineEvent(format!("stream is offline ({})", marker)));
            }

            let attempts = match self.extractor.extract(&html) {
                Ok(found) => {
                    info!("found stream on {} with rule {}", page_url, found.rule_name);
                    return Ok(ResolvedEmbed {
                        stream_url: found.url,
                        rule_name: found.rule_name,
                        page_url,
                    });
                }
                Err(attempts) => attempts,
            };

            let iframes = find_iframes(&html);
            if depth >= MAX_IFRAME_DEPTH || iframes.len() != 1 {
                return Err(Error::ExtractionFailed(format!(
                    "no stream found on {} after {} rules ({} iframes, depth {})",
                    page_url,
                    attempts.len(),
                    iframes.len(),
                    depth
                )));
            }

            let next = Url::parse(&page_url)
                .and_then(|base| base.join(&iframes[0]))
                .map_err(|e| {
                    Error::ExtractionFailed(format!("bad iframe src {}: {}", iframes[0], e))
                })?;

            debug!("following iframe {} from {}", next, page_url);
            referer = page_url;
            page_url = next.to_string();
            depth += 1;
        }
    }

    /// tries each mirror in order and stops at the first answer that isn't a plain failure.
    /// offline is a property of the event so it stops the rotation as well
    pub async fn resolve_mirrors(
        &self,
        domains: &[String],
        path: &str,
    ) -> Result<(ResolvedEmbed, String), (Error, Option<String>)> {
        let mut last_error = Error::UpstreamUnavailable("no mirror domains configured".to_string());

        for domain in domains {
            let embed_url = format!("{}{}", domain, path);
            let referer = format!("{}/", domain);

            match self.resolve_page(&embed_url, &referer).await {
                Ok(resolved) => return Ok((resolved, domain.clone())),
                Err(Error::OfflineEvent(msg)) => {
                    return Err((Error::OfflineEvent(msg), Some(domain.clone())));
                }
                Err(e) => {
                    warn!("mirror {} failed: {}", domain, e);
                    last_error = e;
                }
            }
        }

        Err((last_error, None))
    }
}
