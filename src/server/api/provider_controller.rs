// direct access to the scraping providers, skips channel routing entirely
use axum::{
    Extension, Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::info;

use crate::server::{
    dtos::stream_dto::{
        CdnliveStreamFailure, CdnliveStreamQuery, CdnliveStreamResponse, PpvStreamFailure,
        PpvStreamInfo, PpvStreamQuery, PpvStreamResponse,
    },
    error::{AppResult, Error},
    extractors::ValidatedQuery,
    services::{
        RelayServices, cdnlive_services::CdnliveTarget, provider_services::ProviderServiceTrait,
    },
};

pub struct ProviderController;

impl ProviderController {
    pub fn app() -> Router {
        Router::new()
            .route("/cdnlive-stream", get(Self::cdnlive_stream))
            .route("/ppv-stream", get(Self::ppv_stream))
    }

    async fn cdnlive_stream(
        Extension(services): Extension<RelayServices>,
        ValidatedQuery(query): ValidatedQuery<CdnliveStreamQuery>,
    ) -> AppResult<Response> {
        // event id wins if both are sent
        let target = match (query.event_id, query.channel) {
            (Some(event_id), _) => CdnliveTarget::Event(event_id),
            (None, Some(channel)) => CdnliveTarget::Channel(channel),
            (None, None) => {
                return Err(Error::BadRequest(
                    "either eventId or channel is required".to_string(),
                ));
            }
        };

        let result = services.cdnlive.resolve_target(&target).await;

        let (true, Some(stream_url)) = (result.success, result.stream_url) else {
            info!("cdnlive {:?} not resolved: {:?}", target, result.error);
            let failure = CdnliveStreamFailure {
                success: false,
                error: result
                    .error
                    .unwrap_or_else(|| "stream not found".to_string()),
                is_live: result.is_live,
            };
            return Ok((StatusCode::NOT_FOUND, Json(failure)).into_response());
        };

        Ok(Json(CdnliveStreamResponse {
            success: true,
            stream_url,
            method: result.method.unwrap_or_default(),
            domain: result.domain,
            is_live: result.is_live.unwrap_or(true),
            headers: result.headers.unwrap_or_default(),
        })
        .into_response())
    }

    async fn ppv_stream(
        Extension(services): Extension<RelayServices>,
        ValidatedQuery(query): ValidatedQuery<PpvStreamQuery>,
    ) -> AppResult<Response> {
        let result = services.ppv.resolve(&query.uri).await;

        let (true, Some(stream_url)) = (result.success, result.stream_url) else {
            info!("ppv {} not resolved: {:?}", query.uri, result.error);
            let failure = PpvStreamFailure {
                success: false,
                error: result
                    .error
                    .unwrap_or_else(|| "stream not found".to_string()),
                uri_name: query.uri,
            };
            return Ok((StatusCode::NOT_FOUND, Json(failure)).into_response());
        };

        Ok(Json(PpvStreamResponse {
            success: true,
            stream_url,
            method: result.method.unwrap_or_default(),
            stream_info: PpvStreamInfo {
                id: query.id,
                name: query.name,
                uri: query.uri,
                domain: result.domain,
                is_live: result.is_live.unwrap_or(true),
            },
            playback_headers: result.headers.unwrap_or_default(),
        })
        .into_response())
    }
}
