//! Multipart upload endpoints.
//!
//! Form fields are streamed straight into the services; nothing is buffered
//! in memory beyond a chunk.

use crate::{
    auth,
    errors::AppError,
    handlers::video_handlers::parse_video_id,
    models::video::Video,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::HeaderMap,
};
use futures::TryStreamExt;
use std::io;
use tokio_util::io::StreamReader;
use tracing::info;

const VIDEO_FIELD: &str = "video";
const THUMBNAIL_FIELD: &str = "thumbnail";

/// `POST /api/video_upload/{videoID}` — run the ingestion pipeline.
pub async fn upload_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = auth::authenticate(&headers, &state.jwt_secret)?;

    info!("uploading video {} by user {}", video_id, user_id);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid_request(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let body = StreamReader::new(Box::pin(field.map_err(io::Error::other)));

        let video = state
            .ingestor
            .ingest(
                user_id,
                video_id,
                body,
                &content_type,
                state.limits.max_video_bytes,
            )
            .await?;
        return Ok(Json(video));
    }

    Err(AppError::invalid_request("missing `video` form field"))
}

/// `POST /api/thumbnail_upload/{videoID}` — save a thumbnail image.
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let video_id = parse_video_id(&video_id)?;
    let user_id = auth::authenticate(&headers, &state.jwt_secret)?;

    info!("uploading thumbnail for video {} by user {}", video_id, user_id);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid_request(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let body = StreamReader::new(Box::pin(field.map_err(io::Error::other)));

        let video = state
            .thumbnails
            .upload(
                user_id,
                video_id,
                body,
                &content_type,
                state.limits.max_thumbnail_bytes,
            )
            .await?;
        return Ok(Json(video));
    }

    Err(AppError::invalid_request("missing `thumbnail` form field"))
}
