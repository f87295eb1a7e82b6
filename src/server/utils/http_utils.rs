use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

use crate::models::PlaybackHeaders;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// scheme://host[:port] of a url, no trailing slash
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

/// what a browser would send when loading an embed page from `referer`
pub fn browser_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("iframe"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("cross-site"));

    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(header::REFERER, value);
    }
    if let Some(origin) = origin_of(referer).and_then(|o| HeaderValue::from_str(&o).ok()) {
        headers.insert(header::ORIGIN, origin);
    }

    headers
}

/// headers the manifest host expects, taken from the page the url was found on
pub fn playback_headers(page_url: &str) -> PlaybackHeaders {
    let mut headers = PlaybackHeaders::new();
    if let Some(origin) = origin_of(page_url) {
        headers.insert("Referer".to_string(), format!("{}/", origin));
        headers.insert("Origin".to_string(), origin);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_headers_use_page_origin() {
        let headers = playback_headers("https://player.test:8443/embed/abc?x=1");
        assert_eq!(headers["Origin"], "https://player.test:8443");
        assert_eq!(headers["Referer"], "https://player.test:8443/");
    }
}
