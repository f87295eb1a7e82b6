use std::collections::BTreeMap;

use serde::Serialize;

/// headers the player (or the proxy on its behalf) has to send to the manifest host
pub type PlaybackHeaders = BTreeMap<String, String>;

/// why a resolution didn't produce a stream, kept off the wire and only used to pick a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    UpstreamUnavailable,
    OfflineEvent,
    ExtractionFailed,
}

/// outcome of one provider resolution
///
/// only built through the constructors below and never touched after, a successful result
/// always carries a stream url
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<PlaybackHeaders>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    // mirror domain that answered, only for providers that rotate them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip)]
    pub failure: Option<FailureKind>,
}

impl StreamResult {
    pub fn found(
        stream_url: impl Into<String>,
        method: impl Into<String>,
        headers: PlaybackHeaders,
        domain: Option<String>,
    ) -> Self {
        Self {
            success: true,
            stream_url: Some(stream_url.into()),
            method: Some(method.into()),
            headers: Some(headers),
            is_live: Some(true),
            error: None,
            domain,
            failure: None,
        }
    }

    pub fn offline(error: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            success: false,
            stream_url: None,
            method: None,
            headers: None,
            is_live: Some(false),
            error: Some(error.into()),
            domain,
            failure: Some(FailureKind::OfflineEvent),
        }
    }

    pub fn failed(kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            stream_url: None,
            method: None,
            headers: None,
            is_live: None,
            error: Some(error.into()),
            domain: None,
            failure: Some(kind),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.failure == Some(FailureKind::OfflineEvent)
    }
}
