use std::collections::HashMap;

use relay::server::utils::playlist_rewriter::PlaylistRewriteContext;
use url::Url;

const REFERER: &str = "https://embed.example/watch/abc";

fn context(base: &str) -> PlaylistRewriteContext {
    PlaylistRewriteContext::new(Url::parse(base).unwrap(), "ppv", REFERER)
}

// pulls the query of a /stream-proxy?... line back apart
fn proxy_params(line: &str) -> HashMap<String, String> {
    assert!(line.starts_with("/stream-proxy?"), "not wrapped: {}", line);
    Url::parse(&format!("http://relay.local{}", line))
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

fn uri_attribute(line: &str) -> &str {
    let start = line.find("URI=\"").unwrap() + 5;
    let len = line[start..].find('"').unwrap();
    &line[start..start + len]
}

#[test]
fn test_segment_relative_to_playlist_directory() {
    let ctx = context("https://cdn.example/path/master.m3u8?x=1");

    let expected = format!(
        "/stream-proxy?url={}&source={}&referer={}",
        urlencoding::encode("https://cdn.example/path/segment_0.ts"),
        urlencoding::encode("ppv"),
        urlencoding::encode(REFERER)
    );

    assert_eq!(ctx.rewrite("segment_0.ts"), expected);
}

#[test]
fn test_round_trip_resolves_every_uri() {
    let ctx = context("https://cdn.example/live/stream/index.m3u8?token=abc");
    let playlist = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\",NAME=\"English\",URI=\"audio/en.m3u8\"\n\
        #EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720\n\
        720p/index.m3u8\n\
        #EXTINF:6.0,\n\
        https://edge.example/abs/seg1.ts\n\
        #EXTINF:6.0,\n\
        /root/seg2.ts\n";

    let output = ctx.rewrite(playlist);
    let input_lines: Vec<&str> = playlist.lines().collect();
    let output_lines: Vec<&str> = output.lines().collect();
    assert_eq!(input_lines.len(), output_lines.len());

    let expected_media = "https://cdn.example/live/stream/audio/en.m3u8";
    let media = proxy_params(uri_attribute(output_lines[2]));
    assert_eq!(media["url"], expected_media);
    assert_eq!(media["source"], "ppv");
    assert_eq!(media["referer"], REFERER);
    assert!(output_lines[2].starts_with("#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aud\""));

    assert_eq!(
        proxy_params(output_lines[4])["url"],
        "https://cdn.example/live/stream/720p/index.m3u8"
    );
    assert_eq!(
        proxy_params(output_lines[6])["url"],
        "https://edge.example/abs/seg1.ts"
    );
    assert_eq!(
        proxy_params(output_lines[8])["url"],
        "https://cdn.example/root/seg2.ts"
    );

    // tags without uris come out untouched
    for i in [0, 1, 3, 5, 7] {
        assert_eq!(input_lines[i], output_lines[i]);
    }
    assert!(output.ends_with('\n'));
}

#[test]
fn test_same_input_gives_identical_output() {
    let ctx = context("http://cdn.example:8080/a/b/list.m3u8");
    let playlist = "#EXTM3U\n#EXTINF:4,\nchunk-1.ts?sig=x y\n#EXT-X-ENDLIST";

    let first = ctx.rewrite(playlist);
    let second = ctx.rewrite(playlist);

    assert_eq!(first, second);
    assert!(!first.ends_with('\n'));
}

#[test]
fn test_port_is_kept_when_resolving() {
    let ctx = context("http://cdn.example:8080/a/b/list.m3u8");

    assert_eq!(
        ctx.resolve("../c/seg.ts").as_deref(),
        Some("http://cdn.example:8080/a/c/seg.ts")
    );
    assert_eq!(
        ctx.resolve("/top.ts").as_deref(),
        Some("http://cdn.example:8080/top.ts")
    );
}

#[test]
fn test_key_and_map_uris_are_proxied() {
    let ctx = context("https://cdn.example/path/media.m3u8");
    let playlist = "#EXT-X-KEY:METHOD=AES-128,URI=\"keys/k1.key\",IV=0x1\n#EXT-X-MAP:URI=\"init.mp4\"";

    let output = ctx.rewrite(playlist);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(
        proxy_params(uri_attribute(lines[0]))["url"],
        "https://cdn.example/path/keys/k1.key"
    );
    assert!(lines[0].ends_with("\",IV=0x1"));
    assert_eq!(
        proxy_params(uri_attribute(lines[1]))["url"],
        "https://cdn.example/path/init.mp4"
    );
}

#[test]
fn test_plain_comments_are_never_rewritten() {
    let ctx = context("https://cdn.example/path/media.m3u8");
    let playlist = "#EXTM3U\r\n\r\n## some comment with URI=\"nope.ts\"\r\n";

    let output = ctx.rewrite(playlist);

    assert_eq!(output, playlist);
}

#[test]
fn test_crlf_line_endings_survive_rewriting() {
    let ctx = context("https://cdn.example/path/media.m3u8");
    let playlist = "#EXTM3U\r\n#EXTINF:6.0,\r\nseg.ts\r\n#EXT-X-ENDLIST\r\n";

    let output = ctx.rewrite(playlist);
    let lines: Vec<&str> = output.split("\r\n").collect();

    assert!(output.starts_with("#EXTM3U\r\n#EXTINF:6.0,\r\n/stream-proxy?"));
    assert!(output.ends_with("\r\n#EXT-X-ENDLIST\r\n"));
    assert_eq!(
        proxy_params(lines[2])["url"],
        "https://cdn.example/path/seg.ts"
    );
}

#[test]
fn test_iframe_stream_uris_are_proxied() {
    let ctx = context("https://cdn.example/live/master.m3u8");
    let playlist = "#EXTM3U\n#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=86000,URI=\"iframes/low.m3u8\"\n";

    let output = ctx.rewrite(playlist);
    let lines: Vec<&str> = output.lines().collect();

    assert!(lines[1].starts_with("#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=86000,URI=\"/stream-proxy?"));
    assert!(lines[1].ends_with('"'));
    assert_eq!(
        proxy_params(uri_attribute(lines[1]))["url"],
        "https://cdn.example/live/iframes/low.m3u8"
    );
}
