use axum::{
    Extension, Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{info, warn};

use crate::{
    models::{FailureKind, MappingOrigin},
    server::{
        dtos::route_dto::{
            RouteChannelBody, RouteChannelFailure, RouteChannelQuery, RouteChannelRequest,
            RouteChannelResponse, RoutingDecision, StreamInfo,
        },
        error::{AppResult, Error},
        extractors::{ValidatedJson, ValidatedQuery},
        services::{
            RelayServices, channel_router_services::ProviderChoice,
            fallback_services::FallbackOutcome,
        },
    },
};

pub struct RouteController;

impl RouteController {
    pub fn app() -> Router {
        // the POST is only there because some clients can't be bothered building query strings
        Router::new().route(
            "/route-channel",
            get(Self::route_channel_get).post(Self::route_channel_post),
        )
    }

    async fn route_channel_get(
        Extension(services): Extension<RelayServices>,
        ValidatedQuery(query): ValidatedQuery<RouteChannelQuery>,
    ) -> AppResult<Response> {
        Self::route_channel(&services, RouteChannelRequest::try_from(query)?).await
    }

    async fn route_channel_post(
        Extension(services): Extension<RelayServices>,
        ValidatedJson(body): ValidatedJson<RouteChannelBody>,
    ) -> AppResult<Response> {
        Self::route_channel(&services, RouteChannelRequest::try_from(body)?).await
    }

    fn reason(
        origin: MappingOrigin,
        optimal: Option<ProviderChoice>,
        outcome: &FallbackOutcome,
        request: &RouteChannelRequest,
    ) -> String {
        let used = outcome.source;
        if used.is_some() && used != optimal.map(|c| c.provider) {
            if used == request.options.preferred {
                return "preferred-provider".to_string();
            }
            return "fallback".to_string();
        }
        origin.as_str().to_string()
    }

    async fn route_channel(
        services: &RelayServices,
        request: RouteChannelRequest,
    ) -> AppResult<Response> {
        info!(
            "routing channel {} (preferred {:?}, excluded {:?})",
            request.channel_id, request.options.preferred, request.options.exclude
        );

        let mapping = services
            .router
            .find_channel_by_id(&request.channel_id)
            .ok_or_else(|| Error::NotFound(format!("channel {} not found", request.channel_id)))?;

        let optimal = services.router.optimal_for(&mapping);
        let available = services.router.providers_for(&mapping);

        let outcome = services
            .fallback
            .get_stream_with_fallback(&mapping, &request.options)
            .await;

        let (Some(used), Some(provider_id), Some(stream_url)) = (
            outcome.source,
            outcome.provider_id.clone(),
            outcome.result.stream_url.clone(),
        ) else {
            let error = outcome
                .result
                .error
                .clone()
                .unwrap_or_else(|| "no provider could resolve the channel".to_string());

            if outcome.had_no_candidates() || outcome.result.failure == Some(FailureKind::NotFound)
            {
                return Err(Error::NotFound(error));
            }

            warn!("channel {}: {}", mapping.channel_id, error);
            let failure = RouteChannelFailure {
                success: false,
                error,
                channel_id: mapping.channel_id.clone(),
                attempted_providers: outcome.attempted,
            };
            return Ok((StatusCode::BAD_GATEWAY, Json(failure)).into_response());
        };

        let routing = RoutingDecision {
            optimal_provider: optimal.map(|c| c.provider),
            used_provider: used,
            priority: services.router.priority().rank(used),
            fallback_available: available.len() > 1,
            reason: Self::reason(mapping.origin, optimal, &outcome, &request),
            available_providers: available,
            attempted_providers: outcome.attempted.clone(),
        };

        let response = RouteChannelResponse {
            success: true,
            channel_id: mapping.channel_id.clone(),
            provider: used,
            provider_id,
            stream_url,
            channel_info: mapping.info.clone(),
            routing,
            stream_info: StreamInfo {
                headers: outcome.result.headers.clone().unwrap_or_default(),
                is_live: outcome.result.is_live.unwrap_or(true),
                method: outcome.result.method.clone(),
            },
        };

        Ok(Json(response).into_response())
    }
}
