use std::collections::BTreeMap;

use serde::Serialize;

use super::ProviderKind;
use super::ProviderKind::{EventBased, NumericTv, Ppv};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub name: String,
    pub category: String,
}

/// where a mapping came from, surfaced as routing.reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingOrigin {
    StaticTable,
    NumericId,
}

impl MappingOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingOrigin::StaticTable => "static-table",
            MappingOrigin::NumericId => "numeric-id",
        }
    }
}

/// which providers can serve a channel and what each of them calls it
///
/// built fresh for every request and never modified after, a mapping without providers is never
/// handed out (that's a not found)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    pub channel_id: String,
    pub providers: BTreeMap<ProviderKind, String>,
    pub info: ChannelInfo,
    pub origin: MappingOrigin,
}

impl ChannelMapping {
    pub fn local_id(&self, kind: ProviderKind) -> Option<&str> {
        self.providers.get(&kind).map(|s| s.as_str())
    }

    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }
}

/// one row of the static channel table
#[derive(Debug, Clone, Copy)]
pub struct ChannelEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub providers: &'static [(ProviderKind, &'static str)],
}

impl ChannelEntry {
    pub fn to_mapping(&self) -> ChannelMapping {
        ChannelMapping {
            channel_id: self.id.to_string(),
            providers: self
                .providers
                .iter()
                .map(|(kind, local)| (*kind, local.to_string()))
                .collect(),
            info: ChannelInfo {
                name: self.name.to_string(),
                category: self.category.to_string(),
            },
            origin: MappingOrigin::StaticTable,
        }
    }
}

/// channels we know by name, anything numeric and in range that isn't in here still routes
/// through the numeric provider
pub static CHANNEL_TABLE: &[ChannelEntry] = &[
    ChannelEntry {
        id: "espn",
        name: "ESPN",
        category: "sports",
        providers: &[(EventBased, "espn"), (NumericTv, "44")],
    },
    ChannelEntry {
        id: "espn2",
        name: "ESPN 2",
        category: "sports",
        providers: &[(EventBased, "espn-2"), (NumericTv, "45")],
    },
    ChannelEntry {
        id: "sky-sports-main-event",
        name: "Sky Sports Main Event",
        category: "sports",
        providers: &[(EventBased, "sky-sports-main-event"), (NumericTv, "38")],
    },
    ChannelEntry {
        id: "sky-sports-premier-league",
        name: "Sky Sports Premier League",
        category: "sports",
        providers: &[(EventBased, "sky-sports-premier-league"), (NumericTv, "130")],
    },
    ChannelEntry {
        id: "tnt-sports-1",
        name: "TNT Sports 1",
        category: "sports",
        providers: &[(EventBased, "tnt-sports-1"), (NumericTv, "31")],
    },
    ChannelEntry {
        id: "nfl-network",
        name: "NFL Network",
        category: "sports",
        providers: &[(EventBased, "nfl-network"), (NumericTv, "405")],
    },
    ChannelEntry {
        id: "nba-tv",
        name: "NBA TV",
        category: "sports",
        providers: &[(EventBased, "nba-tv"), (NumericTv, "404")],
    },
    ChannelEntry {
        id: "dazn-1",
        name: "DAZN 1",
        category: "sports",
        providers: &[(EventBased, "dazn-1")],
    },
    ChannelEntry {
        id: "cnn",
        name: "CNN",
        category: "news",
        providers: &[(NumericTv, "345"), (EventBased, "cnn")],
    },
    ChannelEntry {
        id: "ufc-fight-night",
        name: "UFC Fight Night",
        category: "combat",
        providers: &[(Ppv, "ufc/fight-night"), (EventBased, "ufc")],
    },
    ChannelEntry {
        id: "wwe-ppv",
        name: "WWE Premium Live Event",
        category: "combat",
        providers: &[(Ppv, "wwe/premium-live-event")],
    },
    // explicit numeric rows override the synthesized mapping
    ChannelEntry {
        id: "7",
        name: "ABC",
        category: "entertainment",
        providers: &[(NumericTv, "7"), (EventBased, "abc")],
    },
    ChannelEntry {
        id: "1001",
        name: "Event Channel 1",
        category: "events",
        providers: &[(EventBased, "event-channel-1")],
    },
];
