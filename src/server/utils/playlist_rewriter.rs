use tracing::error;
use url::Url;

/// path every rewritten uri points back at
pub const PROXY_ENDPOINT: &str = "/stream-proxy";

/// tags that carry a quoted URI="..." attribute the player will fetch
const URI_TAGS: &[&str] = &[
    "#EXT-X-MEDIA:",
    "#EXT-X-I-FRAME-STREAM-INF:",
    "#EXT-X-KEY:",
    "#EXT-X-SESSION-KEY:",
    "#EXT-X-MAP:",
];

/// everything the line rewriter needs to know about the playlist it's working on, derived once
/// per fetch
#[derive(Debug, Clone)]
pub struct PlaylistRewriteContext {
    pub base_url: Url,
    pub base_path: String,
    pub source: String,
    pub referer: String,
}

impl PlaylistRewriteContext {
    /// base_url should be the url the playlist was actually served from (after redirects)
    pub fn new(base_url: Url, source: &str, referer: &str) -> Self {
        let path = base_url.path();
        let dir = &path[..path.rfind('/').map(|i| i + 1).unwrap_or(0)];
        let dir = if dir.is_empty() { "/" } else { dir };

        let base_path = format!("{}{}", base_url.origin().ascii_serialization(), dir);

        Self {
            base_url,
            base_path,
            source: source.to_string(),
            referer: referer.to_string(),
        }
    }

    fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }

    /// absolute urls pass through, `/x` hangs off the origin and anything else hangs off the
    /// playlist's directory
    pub fn resolve(&self, uri: &str) -> Option<String> {
        let uri = uri.trim();

        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Some(uri.to_string());
        }
        if uri.starts_with("//") {
            return Some(format!("{}:{}", self.base_url.scheme(), uri));
        }
        if uri.starts_with('/') {
            return Some(format!("{}{}", self.origin(), uri));
        }

        match Url::parse(&self.base_path).and_then(|base| base.join(uri)) {
            Ok(resolved) => Some(resolved.to_string()),
            Err(e) => {
                error!("Failed to resolve: {} - {}", uri, e);
                None
            }
        }
    }

    pub fn wrap(&self, absolute: &str) -> String {
        format!(
            "{}?url={}&source={}&referer={}",
            PROXY_ENDPOINT,
            urlencoding::encode(absolute),
            urlencoding::encode(&self.source),
            urlencoding::encode(&self.referer)
        )
    }

    // key servers sometimes use their own schemes (skd:// for fairplay, data: for inline keys),
    // those never go through us
    fn is_foreign_scheme(uri: &str) -> bool {
        match Url::parse(uri) {
            Ok(parsed) => !matches!(parsed.scheme(), "http" | "https"),
            Err(_) => false,
        }
    }

    fn rewrite_uri(&self, uri: &str) -> Option<String> {
        if Self::is_foreign_scheme(uri) {
            return None;
        }
        self.resolve(uri).map(|abs| self.wrap(&abs))
    }

    fn rewrite_tag(&self, line: &str) -> String {
        let Some(start) = line.find("URI=\"").map(|i| i + 5) else {
            return line.to_string();
        };
        let Some(len) = line[start..].find('"') else {
            return line.to_string();
        };
        let end = start + len;

        match self.rewrite_uri(&line[start..end]) {
            Some(wrapped) => format!("{}{}{}", &line[..start], wrapped, &line[end..]),
            None => line.to_string(),
        }
    }

    fn rewrite_line(&self, line: &str) -> String {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return line.to_string();
        }

        if trimmed.starts_with('#') {
            if URI_TAGS.iter().any(|tag| trimmed.starts_with(tag)) {
                return self.rewrite_tag(line);
            }
            return line.to_string();
        }

        self.rewrite_uri(trimmed)
            .unwrap_or_else(|| line.to_string())
    }

    /// rewrites every uri in the playlist to go back through the proxy, comment lines that
    /// don't carry uris come out byte for byte
    pub fn rewrite(&self, playlist: &str) -> String {
        let mut out = String::with_capacity(playlist.len());

        // each line keeps its own terminator, crlf playlists stay crlf
        for chunk in playlist.split_inclusive('\n') {
            let body = chunk.strip_suffix('\n').unwrap_or(chunk);
            let body = body.strip_suffix('\r').unwrap_or(body);

            out.push_str(&self.rewrite_line(body));
            out.push_str(&chunk[body.len()..]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(base: &str) -> PlaylistRewriteContext {
        PlaylistRewriteContext::new(Url::parse(base).unwrap(), "ppv", "https://embed.test/x")
    }

    #[test]
    fn base_path_keeps_port_and_drops_query() {
        let c = ctx("http://cdn.test:8080/live/a/index.m3u8?token=1");
        assert_eq!(c.base_path, "http://cdn.test:8080/live/a/");
    }

    #[test]
    fn protocol_relative_takes_playlist_scheme() {
        let c = ctx("https://cdn.test/live/index.m3u8");
        assert_eq!(
            c.resolve("//edge.test/seg.ts").as_deref(),
            Some("https://edge.test/seg.ts")
        );
    }

    #[test]
    fn fairplay_keys_are_left_alone() {
        let c = ctx("https://cdn.test/live/index.m3u8");
        let line = r#"#EXT-X-KEY:METHOD=SAMPLE-AES,URI="skd://key-id",KEYFORMAT="com.apple.streamingkeydelivery""#;
        assert_eq!(c.rewrite(line), line);
    }
}
