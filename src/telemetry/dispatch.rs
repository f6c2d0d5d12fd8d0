//! Span helpers for worker sessions and the posts they process.

use crate::model::post::PostId;
use tracing::Span;
use uuid::Uuid;

/// Span covering one worker connection from accept to termination.
pub fn start_session_span(session_id: &Uuid) -> Span {
    tracing::info_span!("worker.session", "session.id" = %session_id)
}

/// Span for one claimed post. `post.verdict` is filled in by [`record_verdict`].
pub fn start_post_span(post_id: &PostId, photos: usize) -> Span {
    tracing::info_span!(
        "post.dispatch",
        "post.id" = %post_id,
        "post.photos" = photos,
        "post.verdict" = tracing::field::Empty,
    )
}

pub fn record_verdict(span: &Span, verdict: bool) {
    span.record("post.verdict", verdict);
}
