// embed pages hide the manifest in a dozen different ways, each rule below knows one of them.
// rules only look at the html, fetching and recursion live in the provider pipeline
use base64::{Engine as _, engine::general_purpose::STANDARD};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// image and static asset endings that show up in decoy urls
const DENIED_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico"];

/// path pieces some providers use for fake manifests that are really thumbnails
const DECOY_FRAGMENTS: &[&str] = &["/images/", "/img/", "/thumbs/", "/thumbnails/", "/favicon", "/poster"];

/// lowercase markers that mean the event is not live, checked before any extraction
const OFFLINE_MARKERS: &[&str] = &[
    "stream offline",
    "stream is offline",
    "currently offline",
    "event has ended",
    "stream has ended",
    "not currently live",
    "event has not started",
];

static OFFLINE_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)["']?is_?live["']?\s*:\s*false"#).expect("valid regex"));

static FILE_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"file\s*:\s*["']([^"']*\.m3u8[^"']*)["']"#).expect("valid regex")
});

static LOADER_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"loadSource\(\s*["']([^"']+)["']\s*\)"#).expect("valid regex")
});

static ATOB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"atob\(\s*["']([A-Za-z0-9+/=_-]{8,})["']\s*\)"#).expect("valid regex")
});

static QUOTED_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["'](https?:(?:\\/|/)(?:\\/|/)[^"'\s<>]*\.m3u8[^"'\s<>]*)["']"#)
        .expect("valid regex")
});

static BARE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^"'\s<>]+"#).expect("valid regex"));

static SOURCE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("source[src]").expect("valid selector"));

static IFRAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("iframe[src]").expect("valid selector"));

/// must be an absolute http(s) url, must mention .m3u8 and must not look like an image or a
/// known decoy path. the asset checks only look at the path, hosts are free to be named anything
pub fn is_valid_stream_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();

    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return false;
    }
    if !lower.contains(".m3u8") {
        return false;
    }

    let Ok(parsed) = Url::parse(&lower) else {
        return false;
    };
    let path = parsed.path();

    if DENIED_EXTENSIONS.iter().any(|ext| path.contains(ext)) {
        return false;
    }

    !DECOY_FRAGMENTS.iter().any(|frag| path.contains(frag))
}

/// true when the page says the event isn't live
pub fn detect_offline(html: &str) -> Option<&'static str> {
    let lower = html.to_ascii_lowercase();

    if let Some(marker) = OFFLINE_MARKERS.iter().copied().find(|m| lower.contains(m)) {
        return Some(marker);
    }

    OFFLINE_JSON_RE.is_match(html).then_some("isLive: false")
}

/// every iframe src on the page, in document order
pub fn find_iframes(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&IFRAME_SELECTOR)
        .filter_map(|el| el.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|src| !src.is_empty())
        .collect()
}

// javascript strings love escaping slashes
fn unescape_js(raw: &str) -> String {
    raw.replace("\\/", "/").replace("\\u0026", "&").trim().to_string()
}

fn captures(re: &Regex, html: &str) -> Vec<String> {
    re.captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| unescape_js(m.as_str()))
        .collect()
}

/// one way of pulling a manifest url out of a page
///
/// rules must be pure, they get the raw html and return candidate urls in page order. the
/// extractor validates the candidates, so a rule can be loose
pub trait ExtractionRule: Send + Sync {
    fn name(&self) -> &str;

    fn candidates(&self, html: &str) -> Vec<String>;
}

/// `file: "https://.../index.m3u8"` in a player config object
pub struct PlayerConfigFileRule;

impl ExtractionRule for PlayerConfigFileRule {
    fn name(&self) -> &str {
        "player-config-file"
    }

    fn candidates(&self, html: &str) -> Vec<String> {
        captures(&FILE_FIELD_RE, html)
    }
}

/// `hls.loadSource("...")`
pub struct LoaderCallRule;

impl ExtractionRule for LoaderCallRule {
    fn name(&self) -> &str {
        "loader-call"
    }

    fn candidates(&self, html: &str) -> Vec<String> {
        captures(&LOADER_CALL_RE, html)
    }
}

/// `<source src="...m3u8">`, parsed properly so entities like &amp; are decoded
pub struct SourceTagRule;

impl ExtractionRule for SourceTagRule {
    fn name(&self) -> &str {
        "source-tag"
    }

    fn candidates(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&SOURCE_SELECTOR)
            .filter_map(|el| el.value().attr("src"))
            .map(|src| src.trim().to_string())
            .collect()
    }
}

/// `atob("aHR0cHM6Ly9...")`, decoded and searched for a manifest
pub struct Base64DecodeRule;

impl Base64DecodeRule {
    fn decode(payload: &str) -> Option<String> {
        // some pages use the url safe alphabet and drop the padding
        let mut normalized = payload.replace('-', "+").replace('_', "/");
        while normalized.len() % 4 != 0 {
            normalized.push('=');
        }

        let bytes = STANDARD.decode(normalized.as_bytes()).ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl ExtractionRule for Base64DecodeRule {
    fn name(&self) -> &str {
        "base64-decode"
    }

    fn candidates(&self, html: &str) -> Vec<String> {
        ATOB_RE
            .captures_iter(html)
            .filter_map(|c| c.get(1))
            .filter_map(|m| Self::decode(m.as_str()))
            .filter(|decoded| decoded.contains(".m3u8"))
            .flat_map(|decoded| {
                let trimmed = decoded.trim().to_string();
                if trimmed.starts_with("http") && !trimmed.contains(char::is_whitespace) {
                    vec![trimmed]
                } else {
                    // payload was a whole config blob, take any url inside it
                    BARE_URL_RE
                        .find_iter(&decoded)
                        .map(|m| unescape_js(m.as_str()))
                        .collect()
                }
            })
            .collect()
    }
}

/// last resort, any quoted absolute url containing .m3u8
pub struct QuotedAbsoluteUrlRule;

impl ExtractionRule for QuotedAbsoluteUrlRule {
    fn name(&self) -> &str {
        "quoted-absolute-url"
    }

    fn candidates(&self, html: &str) -> Vec<String> {
        captures(&QUOTED_URL_RE, html)
    }
}

/// provider specific players hang the url off a prefixed field, like `cdnlivePlayer.source:` or
/// `window.PPV_SOURCE =`
pub struct VendorSourceRule {
    name: String,
    pattern: Regex,
}

impl VendorSourceRule {
    pub fn new(prefix: &str) -> Self {
        let pattern = Regex::new(&format!(
            r#"(?i){}[\w.]*source\s*[:=]\s*["']([^"']+)["']"#,
            regex::escape(prefix)
        ))
        .expect("escaped prefix is a valid regex");

        Self {
            name: format!("vendor-source:{}", prefix.to_ascii_lowercase()),
            pattern,
        }
    }
}

impl ExtractionRule for VendorSourceRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidates(&self, html: &str) -> Vec<String> {
        captures(&self.pattern, html)
    }
}

/// what one rule produced, matched_url is only set when a candidate passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionAttempt {
    pub rule_name: String,
    pub matched_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub url: String,
    pub rule_name: String,
    pub attempts: Vec<ExtractionAttempt>,
}

/// ordered rule list, first valid candidate wins
pub struct PatternExtractor {
    rules: Vec<Box<dyn ExtractionRule>>,
}

impl PatternExtractor {
    pub fn new(rules: Vec<Box<dyn ExtractionRule>>) -> Self {
        Self { rules }
    }

    /// the generic rules in their fixed order, more specific shapes first
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(PlayerConfigFileRule),
            Box::new(LoaderCallRule),
            Box::new(SourceTagRule),
            Box::new(Base64DecodeRule),
            Box::new(QuotedAbsoluteUrlRule),
        ])
    }

    /// standard rules plus the provider's own field as the last one
    pub fn with_vendor(prefix: &str) -> Self {
        let mut extractor = Self::standard();
        extractor.rules.push(Box::new(VendorSourceRule::new(prefix)));
        extractor
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// runs the rules in order and stops at the first candidate that validates, the returned
    /// attempts cover every rule that ran
    pub fn extract(&self, html: &str) -> Result<Extraction, Vec<ExtractionAttempt>> {
        let mut attempts = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let matched = rule
                .candidates(html)
                .into_iter()
                .find(|candidate| is_valid_stream_url(candidate));

            debug!("rule {} -> {:?}", rule.name(), matched);

            attempts.push(ExtractionAttempt {
                rule_name: rule.name().to_string(),
                matched_url: matched.clone(),
            });

            if let Some(url) = matched {
                metrics::counter!("relay_extraction_rule_hits_total", "rule" => rule.name().to_string())
                    .increment(1);
                return Ok(Extraction {
                    url,
                    rule_name: rule.name().to_string(),
                    attempts,
                });
            }
        }

        Err(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_rule_accepts_unpadded_url_safe_payloads() {
        // "https://cdn.test/a.m3u8?t=1" without padding
        let html = r#"<script>var s = atob("aHR0cHM6Ly9jZG4udGVzdC9hLm0zdTg_dD0x");</script>"#;
        assert_eq!(
            Base64DecodeRule.candidates(html),
            vec!["https://cdn.test/a.m3u8?t=1".to_string()]
        );
    }

    #[test]
    fn json_offline_marker() {
        assert_eq!(detect_offline(r#"{"isLive": false}"#), Some("isLive: false"));
        assert_eq!(detect_offline(r#"{"is_live":true}"#), None);
    }
}
