// src/handlers/comments.rs

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{Stream, StreamExt};
use validator::Validate;

use crate::{
    comments::section::CommentSection,
    error::AppError,
    models::{
        comment::{ContentKey, ContentType, CreateCommentRequest},
        profile::Viewer,
    },
};

/// Comment section for a piece of content, laid out as render rows.
/// Anonymous viewers get the same rows with reply/delete turned off.
pub async fn list_comments(
    State(section): State<CommentSection>,
    Extension(viewer): Extension<Viewer>,
    Path((content_type, content_id)): Path<(ContentType, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let key = ContentKey::new(content_type, content_id);
    let view = section.load(&key, viewer).await?;
    Ok(Json(view))
}

/// Same section as a nested reply tree.
pub async fn comment_tree(
    State(section): State<CommentSection>,
    Path((content_type, content_id)): Path<(ContentType, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let key = ContentKey::new(content_type, content_id);
    let tree = section.tree(&key).await?;
    Ok(Json(tree))
}

/// Create a root comment or a reply.
pub async fn create_comment(
    State(section): State<CommentSection>,
    Extension(viewer): Extension<Viewer>,
    Path((content_type, content_id)): Path<(ContentType, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let key = ContentKey::new(content_type, content_id);
    let comment = section
        .create(viewer, key, &payload.content, payload.parent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Delete a comment.
/// Requires: Login + Author.
pub async fn delete_comment(
    State(section): State<CommentSection>,
    Extension(viewer): Extension<Viewer>,
    Path((content_type, content_id, comment_id)): Path<(ContentType, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let key = ContentKey::new(content_type, content_id);
    section.delete(viewer, &key, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Server-sent events: one `invalidated` event each time the section's
/// comment list changes. Clients refetch on every event.
pub async fn comment_events(
    State(section): State<CommentSection>,
    Path((content_type, content_id)): Path<(ContentType, i64)>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let key = ContentKey::new(content_type, content_id);
    tracing::debug!(key = %key, "Comment event subscriber connected");

    let stream = section
        .subscribe(key)
        .into_stream()
        .filter_map(|key| async move {
            Event::default()
                .event("invalidated")
                .json_data(key)
                .ok()
                .map(Ok)
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
