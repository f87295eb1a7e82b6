use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::{
    config::RoutingConfig,
    models::{
        CHANNEL_TABLE, ChannelEntry, ChannelInfo, ChannelMapping, MappingOrigin, ProviderKind,
        ProviderPriority,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderChoice {
    pub provider: ProviderKind,
    pub priority: usize,
}

/// channel id -> providers that can play it
///
/// the table and the priority order are read only after startup
pub struct ChannelRouter {
    table: HashMap<String, ChannelEntry>,
    config: RoutingConfig,
}

impl ChannelRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self::with_table(config, CHANNEL_TABLE)
    }

    pub fn with_table(config: RoutingConfig, entries: &[ChannelEntry]) -> Self {
        let table = entries
            .iter()
            .filter(|e| !e.providers.is_empty())
            .map(|e| (e.id.to_ascii_lowercase(), *e))
            .collect();

        Self { table, config }
    }

    pub fn priority(&self) -> &ProviderPriority {
        &self.config.priority
    }

    fn normalize(id: &str) -> String {
        id.trim().to_ascii_lowercase()
    }

    // plain digits only, "+5" or "5.0" aren't channel numbers
    fn numeric_id(&self, id: &str) -> Option<u32> {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        id.parse::<u32>()
            .ok()
            .filter(|n| (self.config.numeric_min..=self.config.numeric_max).contains(n))
    }

    /// table first, then a synthesized numeric mapping for ids in range
    pub fn find_channel_by_id(&self, id: &str) -> Option<ChannelMapping> {
        let key = Self::normalize(id);

        if let Some(entry) = self.table.get(&key) {
            return Some(entry.to_mapping());
        }

        let number = self.numeric_id(&key)?;
        debug!("channel {} synthesized as numeric {}", id, number);

        let mut providers = BTreeMap::new();
        providers.insert(ProviderKind::NumericTv, number.to_string());

        Some(ChannelMapping {
            channel_id: key,
            providers,
            info: ChannelInfo {
                name: format!("Channel {}", number),
                category: "tv".to_string(),
            },
            origin: MappingOrigin::NumericId,
        })
    }

    pub fn optimal_for(&self, mapping: &ChannelMapping) -> Option<ProviderChoice> {
        self.providers_for(mapping)
            .first()
            .map(|provider| ProviderChoice {
                provider: *provider,
                priority: self.config.priority.rank(*provider),
            })
    }

    pub fn providers_for(&self, mapping: &ChannelMapping) -> Vec<ProviderKind> {
        self.config.priority.sort(mapping.providers.keys().copied())
    }

    pub fn get_optimal_provider(&self, id: &str) -> Option<ProviderChoice> {
        self.find_channel_by_id(id)
            .and_then(|mapping| self.optimal_for(&mapping))
    }

    pub fn get_channel_providers(&self, id: &str) -> Vec<ProviderKind> {
        self.find_channel_by_id(id)
            .map(|mapping| self.providers_for(&mapping))
            .unwrap_or_default()
    }
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}
