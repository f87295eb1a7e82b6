use async_trait::async_trait;
use tracing::debug;

use crate::{
    config::ProviderSettings,
    models::{FailureKind, PlaybackHeaders, ProviderKind, StreamResult},
    server::services::provider_services::ProviderServiceTrait,
};

/// the numbered catalogue is played through our own player route, so there's nothing to scrape
/// here, just a range check
pub struct NumericTvService {
    route: String,
    min: u32,
    max: u32,
}

impl NumericTvService {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            route: settings.numeric_tv_route.clone(),
            min: settings.numeric_min,
            max: settings.numeric_max,
        }
    }
}

#[async_trait]
impl ProviderServiceTrait for NumericTvService {
    fn kind(&self) -> ProviderKind {
        ProviderKind::NumericTv
    }

    async fn resolve(&self, local_id: &str) -> StreamResult {
        let trimmed = local_id.trim();
        let number = trimmed
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| trimmed.parse::<u32>().ok())
            .flatten();

        match number {
            Some(n) if (self.min..=self.max).contains(&n) => {
                debug!("numeric channel {} -> {}{}", n, self.route, n);
                StreamResult::found(
                    format!("{}{}", self.route, n),
                    "numeric-route",
                    PlaybackHeaders::new(),
                    None,
                )
            }
            _ => StreamResult::failed(
                FailureKind::NotFound,
                format!(
                    "numeric channel '{}' is outside {}-{}",
                    local_id, self.min, self.max
                ),
            ),
        }
    }
}
