use crate::services::{
    ingest::Ingestor, object_store::FsObjectStore, thumbnail::ThumbnailService,
    video_store::VideoStore,
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// Upload size ceilings, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_video_bytes: u64,
    pub max_thumbnail_bytes: u64,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// SQLite pool, used directly by the readiness probe.
    pub db: Arc<SqlitePool>,
    pub videos: Arc<dyn VideoStore>,
    pub ingestor: Ingestor,
    pub thumbnails: ThumbnailService,
    /// Set when objects live on local disk and this process serves them.
    pub objects: Option<FsObjectStore>,
    pub jwt_secret: Arc<str>,
    pub limits: UploadLimits,
    pub staging_dir: PathBuf,
}
