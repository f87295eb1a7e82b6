pub mod http_utils;
pub mod pattern_extractor;
pub mod playlist_rewriter;
