// upstream side of /stream-proxy: fetch with the caller's referer, follow one redirect ourselves
// and decide whether the body is a playlist we need to rewrite or a segment we just pass along
use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::{debug, error, warn};
use url::Url;

use crate::server::{
    error::{AppResult, Error},
    utils::http_utils::{DESKTOP_USER_AGENT, origin_of},
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct ProxyRequest {
    pub url: String,
    pub source: String,
    pub referer: Option<String>,
    pub origin: Option<String>,
    pub range: Option<String>,
}

impl ProxyRequest {
    fn upstream_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        // we decompress playlists ourselves, segments get passed through with their encoding
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip, zstd"));

        let referer = self.referer.as_deref().filter(|r| !r.is_empty());
        if let Some(value) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
            headers.insert(header::REFERER, value);
        }

        let origin = self
            .origin
            .clone()
            .filter(|o| !o.is_empty())
            .or_else(|| referer.and_then(origin_of));
        if let Some(value) = origin.and_then(|o| HeaderValue::from_str(&o).ok()) {
            headers.insert(header::ORIGIN, value);
        }

        if let Some(value) = self
            .range
            .as_deref()
            .and_then(|r| HeaderValue::from_str(r).ok())
        {
            headers.insert(header::RANGE, value);
        }

        headers
    }
}

pub enum ProxiedContent {
    /// decoded playlist text plus the url it was actually served from
    Playlist { body: String, final_url: Url },
    /// untouched upstream response, the body is streamed to the client
    Binary(reqwest::Response),
}

pub struct StreamProxyService {
    http: reqwest::Client,
}

impl StreamProxyService {
    pub fn new(timeout: Duration) -> Self {
        // redirects are handled by hand so the referer survives the hop
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build proxy client, retrying without timeouts: {}", e);
                // still no automatic redirects, the hop has to carry the referer
                reqwest::Client::builder()
                    .redirect(reqwest::redirect::Policy::none())
                    .build()
                    .unwrap_or_default()
            });

        Self { http }
    }

    pub fn parse_target(raw: &str) -> AppResult<Url> {
        let url = Url::parse(raw.trim())
            .map_err(|e| Error::BadRequest(format!("invalid url: {}", e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(Error::BadRequest("Invalid URL format".to_string())),
        }
    }

    /// FETCH, and if upstream answers with a redirect, FETCH once more at the new location with
    /// the same headers. a second redirect is an upstream error
    pub async fn fetch(
        &self,
        request: &ProxyRequest,
        target: &Url,
    ) -> AppResult<(reqwest::Response, Url)> {
        let mut url = target.clone();
        let headers = request.upstream_headers();

        for hop in 0..2 {
            debug!("proxy fetch (hop {}): {}", hop, url);
            let response = self
                .http
                .get(url.clone())
                .headers(headers.clone())
                .send()
                .await?;

            let status = response.status();
            if !status.is_redirection() {
                return Ok((response, url));
            }

            if hop == 1 {
                warn!("{} redirected twice, giving up", request.url);
                return Err(Error::ProxyUpstreamError {
                    status: status.as_u16(),
                });
            }

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(Error::ProxyUpstreamError {
                    status: status.as_u16(),
                })?;

            url = url.join(location).map_err(|e| {
                error!("bad redirect location {}: {}", location, e);
                Error::ProxyUpstreamError {
                    status: status.as_u16(),
                }
            })?;
            debug!("following redirect to {}", url);
        }

        Err(Error::InternalServerError)
    }

    /// playlist if the content type hints at hls or text, or either the url the player asked for
    /// or the one we ended up at looks like one. signed redirects often drop the extension
    pub fn is_playlist(content_type: &str, requested: &Url, final_url: &Url) -> bool {
        let content_type = content_type.to_ascii_lowercase();
        let looks_like_playlist = |url: &Url| {
            let path = url.path().to_ascii_lowercase();
            path.ends_with(".m3u8") || path.ends_with(".txt")
        };

        content_type.contains("mpegurl")
            || content_type.contains("text")
            || looks_like_playlist(requested)
            || looks_like_playlist(final_url)
    }

    fn decode_body(bytes: &[u8], content_encoding: Option<&str>) -> AppResult<Vec<u8>> {
        match content_encoding {
            Some("zstd") => {
                debug!("Decompressing zstd-encoded response");
                zstd::decode_all(bytes).map_err(|e| {
                    error!("Failed to decompress zstd: {}", e);
                    Error::InternalServerErrorWithContext(
                        "Failed to decompress response".to_string(),
                    )
                })
            }
            Some("gzip") => {
                debug!("Decompressing gzip-encoded response");
                let mut decoder = GzDecoder::new(bytes);
                let mut decomp: Vec<u8> = Vec::new();
                decoder.read_to_end(&mut decomp).map_err(|e| {
                    error!("Failed to decompress gzip response: {}", e);
                    Error::InternalServerErrorWithContext(
                        "Failed to decompress response".to_string(),
                    )
                })?;
                Ok(decomp)
            }
            _ => Ok(bytes.to_vec()),
        }
    }

    /// FETCH -> CLASSIFY, playlists come back decoded and ready for the rewriter
    pub async fn proxy(&self, request: &ProxyRequest) -> AppResult<ProxiedContent> {
        let requested = Self::parse_target(&request.url)?;
        let (response, final_url) = self.fetch(request, &requested).await?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "Response from target not successful: {} ({})",
                status, final_url
            );
            return Err(Error::ProxyUpstreamError {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !Self::is_playlist(&content_type, &requested, &final_url) {
            metrics::counter!("relay_proxy_requests_total", "kind" => "segment").increment(1);
            return Ok(ProxiedContent::Binary(response));
        }

        metrics::counter!("relay_proxy_requests_total", "kind" => "playlist").increment(1);

        let content_encoding = response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase());

        let bytes = response.bytes().await?;
        let decoded = Self::decode_body(&bytes, content_encoding.as_deref())?;

        let body = String::from_utf8(decoded).map_err(|e| {
            error!("Failed to parse m3u8 as UTF-8: {}", e);
            Error::InternalServerErrorWithContext("Invalid m3u8 encoding".to_string())
        })?;

        Ok(ProxiedContent::Playlist { body, final_url })
    }
}
