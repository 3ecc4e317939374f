//! Failure taxonomy and small pure helpers for the publish pipeline.

use embercast_core::PlatformResponse;
use url::Url;

use crate::content::models::ContentItem;
use embercast_core::RenderedPost;

/// What kind of failure a publish attempt hit. Decides the retry policy:
/// transient retries through queue backoff, permanent reverts the content to
/// review, configuration surfaces to operators and does neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
    Configuration,
}

/// Classify a platform response. `None` means success.
///
/// Transport failures (no status) and rate limits / 5xx are transient;
/// 401/403 mean an invalid or revoked credential, an operator problem; any
/// other 4xx is a content problem the platform will keep rejecting —
/// duplicate-content rejections included.
pub fn classify_response(resp: &PlatformResponse) -> Option<FailureKind> {
    if resp.success {
        return None;
    }
    Some(match resp.status {
        None => FailureKind::Transient,
        Some(429) | Some(408) => FailureKind::Transient,
        Some(401) | Some(403) => FailureKind::Configuration,
        Some(s) if s >= 500 => FailureKind::Transient,
        Some(_) => FailureKind::Permanent,
    })
}

/// Pull the platform post reference out of a stored post URL, for attempts
/// recorded before the direct field existed. LinkedIn feed URLs carry the
/// URN as a path segment: `https://www.linkedin.com/feed/update/<urn>/`.
pub fn parse_post_ref(post_url: &str) -> Option<String> {
    let url = Url::parse(post_url).ok()?;
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .find(|s| s.starts_with("urn:"))
        .map(|s| s.to_string())
}

/// Render a content item for platform submission.
pub fn render_post(item: &ContentItem) -> RenderedPost {
    let text = if item.title.is_empty() {
        item.body.clone()
    } else {
        format!("{}\n\n{}", item.title, item.body)
    };
    RenderedPost { text }
}
