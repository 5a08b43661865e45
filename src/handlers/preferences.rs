// src/handlers/preferences.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    comments::section::CommentSection,
    error::AppError,
    models::profile::{CommentPreferences, UpdatePreferencesRequest, Viewer},
};

/// Get a profile's comment preferences.
pub async fn get_preferences(
    State(section): State<CommentSection>,
    Path(profile_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let preferences = section.preferences(profile_id).await?;
    Ok(Json(preferences))
}

/// Update comment preferences.
/// Requires: Login + owner of the profile.
pub async fn update_preferences(
    State(section): State<CommentSection>,
    Extension(viewer): Extension<Viewer>,
    Path(profile_id): Path<i64>,
    Json(payload): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let preferences = CommentPreferences {
        disable_comments: payload.disable_comments,
    };
    let updated = section
        .update_preferences(viewer, profile_id, preferences)
        .await?;
    Ok(Json(updated))
}
