//! Streaming reads of stored files: thumbnails and filesystem-store objects.

use crate::{
    errors::{AppError, ErrorCategory},
    services::object_store::StoreError,
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use std::{io::ErrorKind, path::Path as FsPath};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// `GET /assets/{file}` — a saved thumbnail.
pub async fn get_asset(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    if file_name.is_empty()
        || file_name.starts_with('.')
        || file_name.contains(['/', '\\'])
    {
        return Err(AppError::not_found("asset not found"));
    }

    let path = state.thumbnails.assets_root().join(&file_name);
    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(AppError::not_found("asset not found"));
        }
        Err(err) => return Err(AppError::categorized(ErrorCategory::IoFault, err)),
    };
    let len = file
        .metadata()
        .await
        .map_err(|e| AppError::categorized(ErrorCategory::IoFault, e))?
        .len();

    Ok(stream_file(file, len, content_type_for(&file_name)))
}

/// `GET /objects/{bucket}/{*key}` — an object from the filesystem store.
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let store = state
        .objects
        .as_ref()
        .ok_or_else(|| AppError::not_found("object not found"))?;

    match store.open_object(&bucket, &key).await {
        Ok(Some((file, len))) => Ok(stream_file(file, len, content_type_for(&key))),
        Ok(None) => Err(AppError::not_found("object not found")),
        // invalid names cannot exist in the store
        Err(StoreError::Rejected(_)) => {
            Err(AppError::not_found("object not found"))
        }
        Err(err) => Err(AppError::categorized(ErrorCategory::StoreUnavailable, err)),
    }
}

fn stream_file(file: File, len: u64, content_type: &'static str) -> Response {
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    set_file_headers(response.headers_mut(), len, content_type);
    response
}

fn set_file_headers(headers: &mut HeaderMap, len: u64, content_type: &'static str) {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
}

fn content_type_for(name: &str) -> &'static str {
    match FsPath::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("png") => "image/png",
        Some("jpeg") | Some("jpg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
