use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// every upstream we know how to resolve
///
/// new upstreams get a variant here and a slot in DEFAULT_PRIORITY, nothing should ever match on
/// provider names as strings outside of FromStr
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    NumericTv,
    EventBased,
    Ppv,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::NumericTv,
        ProviderKind::EventBased,
        ProviderKind::Ppv,
    ];

    /// event pages give us a real manifest so they go first, the numeric route is the catch all
    pub const DEFAULT_PRIORITY: [ProviderKind; 3] = [
        ProviderKind::EventBased,
        ProviderKind::Ppv,
        ProviderKind::NumericTv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::NumericTv => "numeric-tv",
            ProviderKind::EventBased => "event-based",
            ProviderKind::Ppv => "ppv",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // the old frontend still sends the upstream names so those are accepted as well
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric-tv" | "numeric" | "tv" => Ok(ProviderKind::NumericTv),
            "event-based" | "event" | "cdnlive" => Ok(ProviderKind::EventBased),
            "ppv" => Ok(ProviderKind::Ppv),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// total order over every ProviderKind, lower rank wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPriority {
    order: Vec<ProviderKind>,
}

impl ProviderPriority {
    /// duplicates are dropped and anything missing is appended in the default order so the
    /// result always ranks every provider
    pub fn new(configured: Vec<ProviderKind>) -> Self {
        let mut order: Vec<ProviderKind> = Vec::with_capacity(ProviderKind::ALL.len());

        for kind in configured
            .into_iter()
            .chain(ProviderKind::DEFAULT_PRIORITY)
        {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }

        Self { order }
    }

    /// 1 based so it reads naturally in responses
    pub fn rank(&self, kind: ProviderKind) -> usize {
        self.order
            .iter()
            .position(|k| *k == kind)
            .map(|i| i + 1)
            .unwrap_or(usize::MAX)
    }

    pub fn order(&self) -> &[ProviderKind] {
        &self.order
    }

    /// keeps only the given providers, in priority order
    pub fn sort<I>(&self, kinds: I) -> Vec<ProviderKind>
    where
        I: IntoIterator<Item = ProviderKind>,
    {
        let available: Vec<ProviderKind> = kinds.into_iter().collect();
        self.order
            .iter()
            .copied()
            .filter(|k| available.contains(k))
            .collect()
    }
}

impl Default for ProviderPriority {
    fn default() -> Self {
        Self::new(ProviderKind::DEFAULT_PRIORITY.to_vec())
    }
}
