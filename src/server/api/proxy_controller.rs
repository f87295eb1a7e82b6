// the playback half: players hit this for the manifest and then for every uri we rewrote into it
use axum::{
    Extension, Router,
    body::Body,
    extract::Query,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::io::Write;

use flate2::{Compression, write::GzEncoder};
use tracing::{debug, error};

use crate::server::{
    dtos::stream_dto::StreamProxyQuery,
    error::{AppResult, Error},
    services::{
        RelayServices,
        stream_proxy_services::{ProxiedContent, ProxyRequest},
    },
    utils::playlist_rewriter::{PROXY_ENDPOINT, PlaylistRewriteContext},
};

/// Supported compression encodings
#[derive(Debug, Clone, Copy, PartialEq)]
enum ContentEncoding {
    Zstd,
    Gzip,
    None,
}

impl ContentEncoding {
    /// determine the best encoding based on Accept-Encoding header
    /// apple HLS player sends "gzip, deflate" or "identity" and that has to be respected
    fn from_accept_encoding(accept_encoding: Option<&str>) -> Self {
        match accept_encoding {
            Some(v) => {
                // don't compress if client explicitly requests identity-only
                if v == "identity" || v.starts_with("identity,") {
                    return Self::None;
                }
                // Prefer zstd if supported (better compression), fallback to gzip
                if v.contains("zstd") {
                    Self::Zstd
                } else if v.contains("gzip") {
                    Self::Gzip
                } else {
                    Self::None
                }
            }
            None => Self::None,
        }
    }

    fn as_header_value(&self) -> Option<&'static str> {
        match self {
            Self::Zstd => Some("zstd"),
            Self::Gzip => Some("gzip"),
            Self::None => None,
        }
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        match self {
            Self::Zstd => zstd::encode_all(data, 3),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()
            }
            Self::None => Ok(data.to_vec()),
        }
    }
}

pub struct ProxyController;

impl ProxyController {
    pub fn app() -> Router {
        Router::new().route(
            PROXY_ENDPOINT,
            get(Self::proxy_get).options(Self::proxy_options),
        )
    }

    /// video elements fetch us cross origin from wherever the app lives, so every response is
    /// wide open
    fn apply_cors(headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Range, Content-Type, Accept, Origin"),
        );
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("Content-Length, Content-Range, Content-Type"),
        );
    }

    /// build m3u8 response with proper headers and optional compression
    fn build_m3u8_response(processed_body: &str, headers: &HeaderMap) -> AppResult<Response> {
        // determine client's preferred encoding (apple hls likes gzip, not zstd)
        let encoding = ContentEncoding::from_accept_encoding(
            headers
                .get(header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        );

        let mut response_headers = HeaderMap::new();
        response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/vnd.apple.mpegurl"),
        );
        response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let response_body: Vec<u8> = if encoding != ContentEncoding::None {
            let compressed_body = encoding.compress(processed_body.as_bytes()).map_err(|e| {
                error!("Failed to compress response with {:?}: {}", encoding, e);
                Error::InternalServerErrorWithContext("Failed to compress response".to_string())
            })?;
            debug!(
                "Compressed M3U8 with {:?} from {} to {} bytes",
                encoding,
                processed_body.len(),
                compressed_body.len()
            );
            if let Some(enc_header) = encoding.as_header_value() {
                response_headers.insert(
                    header::CONTENT_ENCODING,
                    HeaderValue::from_static(enc_header),
                );
            }
            compressed_body
        } else {
            processed_body.as_bytes().to_vec()
        };

        response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(response_body.len()));

        Ok((StatusCode::OK, response_headers, response_body).into_response())
    }

    /// STREAM_BINARY, the body goes out as it comes in. if the player hangs up the stream is
    /// dropped and the upstream connection with it
    fn build_binary_response(upstream: reqwest::Response) -> Response {
        let status = upstream.status();

        // upstream headers worth keeping on a segment
        let mut response_headers = HeaderMap::new();
        for name in [
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::CONTENT_ENCODING,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CACHE_CONTROL,
        ] {
            if let Some(value) = upstream.headers().get(&name) {
                response_headers.insert(name, value.clone());
            }
        }
        if !response_headers.contains_key(header::CONTENT_TYPE) {
            response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp2t"));
        }

        let body = Body::from_stream(upstream.bytes_stream());
        (status, response_headers, body).into_response()
    }

    async fn proxy(
        services: &RelayServices,
        params: StreamProxyQuery,
        headers: &HeaderMap,
    ) -> AppResult<Response> {
        let target_url = params
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::BadRequest("missing url parameter".to_string()))?;

        let source = params.source.unwrap_or_default();
        let referer = params.referer.unwrap_or_default();
        debug!("Proxying (source={}): {}", source, target_url);

        let request = ProxyRequest {
            url: target_url,
            source: source.clone(),
            referer: Some(referer.clone()),
            origin: params.origin,
            range: headers
                .get(header::RANGE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string()),
        };

        match services.proxy.proxy(&request).await? {
            ProxiedContent::Playlist { body, final_url } => {
                let context = PlaylistRewriteContext::new(final_url, &source, &referer);
                let processed = context.rewrite(&body);
                debug!(
                    "Processed M3U8 from {}, {} -> {} bytes",
                    context.base_url,
                    body.len(),
                    processed.len()
                );
                Self::build_m3u8_response(&processed, headers)
            }
            ProxiedContent::Binary(upstream) => Ok(Self::build_binary_response(upstream)),
        }
    }

    async fn proxy_get(
        Extension(services): Extension<RelayServices>,
        Query(params): Query<StreamProxyQuery>,
        headers: HeaderMap,
    ) -> Response {
        let mut response = match Self::proxy(&services, params, &headers).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        };

        Self::apply_cors(response.headers_mut());
        response
    }

    async fn proxy_options() -> Response {
        let mut response = StatusCode::NO_CONTENT.into_response();
        Self::apply_cors(response.headers_mut());
        response
    }
}
