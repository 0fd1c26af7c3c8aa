//! Head-fragment extraction.
//!
//! Plain substring search between the first `<head>` and the first
//! `</head>`; the markup is not parsed.

/// Minimal document the bundler transforms to produce per-route head tags.
pub const SKELETON_HTML: &str = "<html><head></head><body></body></html>";

const HEAD_OPEN: &str = "<head>";
const HEAD_CLOSE: &str = "</head>";

/// Return the inner contents of the `<head>` element in `html`.
///
/// Yields an empty string when either marker is missing or the closing
/// marker comes before the opening one.
pub fn extract_head_fragment(html: &str) -> &str {
    let (Some(open), Some(close)) = (html.find(HEAD_OPEN), html.find(HEAD_CLOSE)) else {
        return "";
    };
    let start = open + HEAD_OPEN.len();
    if start > close {
        return "";
    }
    &html[start..close]
}
