use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    models::{ChannelInfo, PlaybackHeaders, ProviderKind},
    server::{
        error::{AppResult, Error},
        services::fallback_services::{FallbackOptions, ProviderAttempt},
    },
};

/// GET /route-channel, excludeProviders is a comma separated list here
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RouteChannelQuery {
    #[validate(length(min = 1, max = 128))]
    pub channel_id: String,
    pub preferred_provider: Option<String>,
    pub exclude_providers: Option<String>,
}

/// POST /route-channel, same fields as the query but excludeProviders is a proper array
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RouteChannelBody {
    #[validate(length(min = 1, max = 128))]
    pub channel_id: String,
    pub preferred_provider: Option<String>,
    #[serde(default)]
    pub exclude_providers: Vec<String>,
}

/// what both request shapes boil down to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChannelRequest {
    pub channel_id: String,
    pub options: FallbackOptions,
}

fn parse_provider(raw: &str) -> AppResult<ProviderKind> {
    raw.parse::<ProviderKind>().map_err(Error::BadRequest)
}

fn parse_options<'a, I>(preferred: Option<&str>, exclude: I) -> AppResult<FallbackOptions>
where
    I: IntoIterator<Item = &'a str>,
{
    let preferred = preferred
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(parse_provider)
        .transpose()?;

    let exclude = exclude
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(parse_provider)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(FallbackOptions { preferred, exclude })
}

impl TryFrom<RouteChannelQuery> for RouteChannelRequest {
    type Error = Error;

    fn try_from(query: RouteChannelQuery) -> AppResult<Self> {
        let exclude = query.exclude_providers.as_deref().unwrap_or("");
        Ok(Self {
            options: parse_options(query.preferred_provider.as_deref(), exclude.split(','))?,
            channel_id: query.channel_id,
        })
    }
}

impl TryFrom<RouteChannelBody> for RouteChannelRequest {
    type Error = Error;

    fn try_from(body: RouteChannelBody) -> AppResult<Self> {
        Ok(Self {
            options: parse_options(
                body.preferred_provider.as_deref(),
                body.exclude_providers.iter().map(String::as_str),
            )?,
            channel_id: body.channel_id,
        })
    }
}

/// how the request got routed, only lives for the one response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub optimal_provider: Option<ProviderKind>,
    pub used_provider: ProviderKind,
    pub priority: usize,
    pub fallback_available: bool,
    pub available_providers: Vec<ProviderKind>,
    pub attempted_providers: Vec<ProviderAttempt>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub headers: PlaybackHeaders,
    pub is_live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteChannelResponse {
    pub success: bool,
    pub channel_id: String,
    pub provider: ProviderKind,
    pub provider_id: String,
    pub stream_url: String,
    pub channel_info: ChannelInfo,
    pub routing: RoutingDecision,
    pub stream_info: StreamInfo,
}

/// every provider failed, the attempts tell the client whether anything was actually tried
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteChannelFailure {
    pub success: bool,
    pub error: String,
    pub channel_id: String,
    pub attempted_providers: Vec<ProviderAttempt>,
}
