mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderMap, StatusCode, header},
    routing::get,
};
use relay::{
    config::ProviderSettings,
    models::{FailureKind, ProviderKind},
    server::{
        error::Error,
        services::{
            cdnlive_services::{CdnliveService, CdnliveTarget},
            numeric_tv_services::NumericTvService,
            ppv_services::PpvService,
            provider_services::{EmbedPipeline, ProviderServiceTrait},
        },
        utils::pattern_extractor::PatternExtractor,
    },
};

use common::{html, spawn};

const MANIFEST: &str = "https://cdn.test/live/index.m3u8?token=abc";

fn pipeline() -> EmbedPipeline {
    EmbedPipeline::new(Duration::from_secs(5), PatternExtractor::standard())
}

fn player_page() -> String {
    html(&format!(
        r#"<script>hls.loadSource("{}");</script>"#,
        MANIFEST
    ))
}

fn settings(cdnlive: Vec<String>, ppv: Vec<String>) -> ProviderSettings {
    ProviderSettings {
        cdnlive_domains: cdnlive,
        ppv_domains: ppv,
        timeout: Duration::from_secs(5),
        ..ProviderSettings::default()
    }
}

#[tokio::test]
async fn test_manifest_found_on_first_page() {
    let page = player_page();
    let base = spawn(Router::new().route("/embed/a", get(move || async move { page }))).await;

    let (resolved, domain) = pipeline()
        .resolve_mirrors(&[base.clone()], "/embed/a")
        .await
        .unwrap();

    assert_eq!(resolved.stream_url, MANIFEST);
    assert_eq!(resolved.rule_name, "loader-call");
    assert_eq!(resolved.page_url, format!("{}/embed/a", base));
    assert_eq!(domain, base);
}

#[tokio::test]
async fn test_mirror_referer_is_the_mirror_root() {
    let base = spawn(Router::new().route(
        "/embed/a",
        get(|headers: HeaderMap| async move {
            let referer = headers
                .get(header::REFERER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            html(&format!(r#"<script>file: "https://cdn.test/r.m3u8?ref={}"</script>"#, referer))
        }),
    ))
    .await;

    let (resolved, _) = pipeline()
        .resolve_mirrors(&[base.clone()], "/embed/a")
        .await
        .unwrap();

    assert_eq!(
        resolved.stream_url,
        format!("https://cdn.test/r.m3u8?ref={}/", base)
    );
}

#[tokio::test]
async fn test_single_iframe_is_followed_with_parent_as_referer() {
    let base = spawn(
        Router::new()
            .route(
                "/embed/outer",
                get(|| async { html(r#"<iframe src="/player/inner?id=1"></iframe>"#) }),
            )
            .route(
                "/player/inner",
                get(|headers: HeaderMap| async move {
                    let referer = headers
                        .get(header::REFERER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("");
                    if referer.ends_with("/embed/outer") {
                        player_page()
                    } else {
                        html("wrong referer")
                    }
                }),
            ),
    )
    .await;

    let resolved = pipeline()
        .resolve_page(&format!("{}/embed/outer", base), &format!("{}/", base))
        .await
        .unwrap();

    assert_eq!(resolved.stream_url, MANIFEST);
    assert_eq!(resolved.page_url, format!("{}/player/inner?id=1", base));
}

#[tokio::test]
async fn test_iframe_chain_stops_after_one_hop() {
    let hits = Arc::new(AtomicUsize::new(0));
    let third = hits.clone();

    let base = spawn(
        Router::new()
            .route("/one", get(|| async { html(r#"<iframe src="/two"></iframe>"#) }))
            .route("/two", get(|| async { html(r#"<iframe src="/three"></iframe>"#) }))
            .route(
                "/three",
                get(move || {
                    third.fetch_add(1, Ordering::SeqCst);
                    async { player_page() }
                }),
            ),
    )
    .await;

    let err = pipeline()
        .resolve_page(&format!("{}/one", base), &format!("{}/", base))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ExtractionFailed(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_multiple_iframes_are_not_guessed() {
    let base = spawn(Router::new().route(
        "/embed/a",
        get(|| async { html(r#"<iframe src="/ad"></iframe><iframe src="/player"></iframe>"#) }),
    ))
    .await;

    let err = pipeline()
        .resolve_page(&format!("{}/embed/a", base), &format!("{}/", base))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ExtractionFailed(_)));
}

#[tokio::test]
async fn test_offline_stops_mirror_rotation() {
    let second_hits = Arc::new(AtomicUsize::new(0));
    let counter = second_hits.clone();

    let offline = spawn(Router::new().route(
        "/embed/event/9",
        get(|| async { html("<h1>This event has ended</h1>") }),
    ))
    .await;
    let healthy = spawn(Router::new().route(
        "/embed/event/9",
        get(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { player_page() }
        }),
    ))
    .await;

    let (err, domain) = pipeline()
        .resolve_mirrors(&[offline.clone(), healthy], "/embed/event/9")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::OfflineEvent(_)));
    assert_eq!(domain, Some(offline));
    assert_eq!(second_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_mirror_moves_to_the_next() {
    let broken = spawn(Router::new().route(
        "/embed/a",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
    ))
    .await;
    let empty = spawn(Router::new().route("/embed/a", get(|| async { "   " }))).await;
    let page = player_page();
    let healthy = spawn(Router::new().route("/embed/a", get(move || async move { page }))).await;

    let (resolved, domain) = pipeline()
        .resolve_mirrors(&[broken, empty, healthy.clone()], "/embed/a")
        .await
        .unwrap();

    assert_eq!(resolved.stream_url, MANIFEST);
    assert_eq!(domain, healthy);
}

#[tokio::test]
async fn test_empty_body_is_upstream_unavailable() {
    let empty = spawn(Router::new().route("/embed/a", get(|| async { "" }))).await;

    let (err, domain) = pipeline()
        .resolve_mirrors(&[empty], "/embed/a")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UpstreamUnavailable(_)));
    assert_eq!(domain, None);
}

#[tokio::test]
async fn test_cdnlive_resolves_channels_and_events() {
    let base = spawn(
        Router::new()
            .route(
                "/embed/channel/espn",
                get(|| async {
                    html(r#"<script>cdnlivePlayer.source = ' https://cdn.test/espn/index.m3u8';</script>"#)
                }),
            )
            .route(
                "/embed/event/42",
                get(|| async { html(r#"<script>var cfg = {"isLive": false};</script>"#) }),
            ),
    )
    .await;

    let service = CdnliveService::new(&settings(vec![base.clone()], vec![]));
    assert_eq!(service.kind(), ProviderKind::EventBased);

    let result = service.resolve("ESPN").await;
    assert!(result.success);
    assert_eq!(result.stream_url.as_deref(), Some("https://cdn.test/espn/index.m3u8"));
    assert_eq!(result.method.as_deref(), Some("vendor-source:cdnlive"));
    assert_eq!(result.domain.as_deref(), Some(base.as_str()));

    let headers = result.headers.unwrap();
    assert_eq!(headers["Referer"], format!("{}/", base));
    assert_eq!(headers["Origin"], base);

    let offline = service
        .resolve_target(&CdnliveTarget::Event("42".to_string()))
        .await;
    assert!(!offline.success);
    assert_eq!(offline.is_live, Some(false));
    assert!(offline.is_offline());
}

#[tokio::test]
async fn test_ppv_failure_is_a_result_not_an_error() {
    let base = spawn(Router::new().route(
        "/embed/nfl/buf-den",
        get(|| async { html("<p>loading...</p>") }),
    ))
    .await;

    let service = PpvService::new(&settings(vec![], vec![base]));

    let result = service.resolve("nfl/buf-den").await;
    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::ExtractionFailed));
    assert!(result.error.is_some());

    let invalid = service.resolve("../etc").await;
    assert_eq!(invalid.failure, Some(FailureKind::NotFound));
}

#[tokio::test]
async fn test_numeric_tv_range_check() {
    let service = NumericTvService::new(&ProviderSettings::default());

    let result = service.resolve("51").await;
    assert!(result.success);
    assert_eq!(result.stream_url.as_deref(), Some("/tv/?channel=51"));
    assert_eq!(result.method.as_deref(), Some("numeric-route"));

    for id in ["0", "851", "abc", "-1", ""] {
        let result = service.resolve(id).await;
        assert!(!result.success, "{} should fail", id);
        assert_eq!(result.failure, Some(FailureKind::NotFound));
    }
}

#[tokio::test]
async fn test_slow_mirror_times_out_into_a_failed_result() {
    let slow = spawn(Router::new().route(
        "/embed/nfl/buf-den",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            player_page()
        }),
    ))
    .await;
    let fast = spawn(Router::new().route(
        "/embed/nfl/buf-den",
        get(|| async { player_page() }),
    ))
    .await;

    let short = |ppv: Vec<String>| ProviderSettings {
        timeout: Duration::from_millis(300),
        ..settings(vec![], ppv)
    };

    let started = std::time::Instant::now();
    let result = PpvService::new(&short(vec![slow.clone()]))
        .resolve("nfl/buf-den")
        .await;
    assert!(!result.success);
    assert_eq!(result.failure, Some(FailureKind::UpstreamUnavailable));
    assert!(result.error.unwrap().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(2));

    // a timeout is just a failed mirror, the next one still gets its turn
    let result = PpvService::new(&short(vec![slow, fast.clone()]))
        .resolve("nfl/buf-den")
        .await;
    assert!(result.success);
    assert_eq!(result.domain.as_deref(), Some(fast.as_str()));
}
