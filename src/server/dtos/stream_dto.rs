use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::PlaybackHeaders;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CdnliveStreamQuery {
    #[validate(length(min = 1, max = 64))]
    pub event_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub channel: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnliveStreamResponse {
    pub success: bool,
    pub stream_url: String,
    pub method: String,
    pub domain: Option<String>,
    pub is_live: bool,
    pub headers: PlaybackHeaders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnliveStreamFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PpvStreamQuery {
    #[validate(length(min = 1, max = 256))]
    pub uri: String,
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PpvStreamInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub uri: String,
    pub domain: Option<String>,
    pub is_live: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PpvStreamResponse {
    pub success: bool,
    pub stream_url: String,
    pub method: String,
    pub stream_info: PpvStreamInfo,
    pub playback_headers: PlaybackHeaders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PpvStreamFailure {
    pub success: bool,
    pub error: String,
    pub uri_name: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamProxyQuery {
    pub url: Option<String>,
    pub source: Option<String>,
    pub referer: Option<String>,
    pub origin: Option<String>,
}
