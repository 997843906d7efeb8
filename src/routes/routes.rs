//! Defines routes for the video API.
//!
//! ## Structure
//! - **Health**
//!   - `GET  /healthz`, `GET /readyz`
//!
//! - **Video records**
//!   - `POST /api/videos` — create a record
//!   - `GET  /api/videos` — list the caller's records
//!   - `GET  /api/videos/{videoID}` — fetch one record
//!
//! - **Uploads** (request body limit disabled; services enforce their own)
//!   - `POST /api/video_upload/{videoID}` — ingest a video
//!   - `POST /api/thumbnail_upload/{videoID}` — save a thumbnail
//!
//! - **Stored files**
//!   - `GET  /assets/{file}` — thumbnails
//!   - `GET  /objects/{bucket}/{*key}` — filesystem-store objects

use crate::{
    handlers::{
        asset_handlers::{get_asset, get_object},
        health_handlers::{healthz, readyz},
        upload_handlers::{upload_thumbnail, upload_video},
        video_handlers::{create_video, get_video, list_videos},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router for the whole API.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/videos", post(create_video).get(list_videos))
        .route("/api/videos/{video_id}", get(get_video))
        .route(
            "/api/video_upload/{video_id}",
            post(upload_video).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/api/thumbnail_upload/{video_id}",
            post(upload_thumbnail).layer(DefaultBodyLimit::disable()),
        )
        .route("/assets/{file}", get(get_asset))
        .route("/objects/{bucket}/{*key}", get(get_object))
}
