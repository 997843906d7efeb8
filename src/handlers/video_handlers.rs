//! HTTP handlers for video records.

use crate::{
    auth,
    errors::{AppError, ErrorCategory},
    models::video::{CreateVideoReq, Video},
    services::video_store::VideoStoreError,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

/// Parse a `{videoID}` path segment.
pub fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::new(ErrorCategory::InvalidIdentifier, "Invalid ID"))
}

fn store_error(err: VideoStoreError) -> AppError {
    match err {
        VideoStoreError::NotFound(_) => AppError::not_found("Couldn't find video"),
        other => AppError::categorized(ErrorCategory::PersistenceFailure, other),
    }
}

/// `POST /api/videos` — create an empty record owned by the caller.
pub async fn create_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateVideoReq>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = auth::authenticate(&headers, &state.jwt_secret)?;
    if req.title.trim().is_empty() {
        return Err(AppError::invalid_request("title must not be empty"));
    }

    let video = Video::new(user_id, req.title, req.description);
    state.videos.create(&video).await.map_err(store_error)?;

    tracing::info!(video_id = %video.id, user_id = %user_id, "video created");
    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos` — the caller's videos, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Video>>, AppError> {
    let user_id = auth::authenticate(&headers, &state.jwt_secret)?;
    let videos = state
        .videos
        .list_for_user(user_id)
        .await
        .map_err(store_error)?;
    Ok(Json(videos))
}

/// `GET /api/videos/{videoID}`
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = auth::authenticate(&headers, &state.jwt_secret)?;

    let video = state.videos.get(video_id).await.map_err(store_error)?;
    if !video.is_owned_by(user_id) {
        return Err(AppError::unauthorized("You don't own this video"));
    }
    Ok(Json(video))
}
