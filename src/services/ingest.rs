//! Video ingestion pipeline.
//!
//! Turns an uploaded byte stream into a faststart MP4 in object storage and
//! links it from the owning video record:
//!
//! 1. load the record and check ownership
//! 2. gate on the declared content type
//! 3. stage the body to a bounded scratch file
//! 4. probe the staged file and bucket it by aspect ratio
//! 5. remux for faststart, then drop the staged original
//! 6. derive a key and stream the optimized file to the store
//! 7. set `video_url` and persist the record
//!
//! Local files are held by [`ScratchFile`] guards and disappear on every exit
//! path. The record is only touched after the store confirms the write.
//!
//! Two concurrent ingestions for the same record are not coordinated; the
//! last `video_url` written wins.

use crate::{
    errors::{AppError, ErrorCategory},
    models::video::Video,
    services::{
        aspect::AspectBucket,
        keys::StorageKey,
        media::{MediaError, Optimizer, Prober},
        object_store::{ObjectStore, StoreError, Uploader},
        staging::{ScratchFile, Staged, parse_media_type, stage_bounded},
        video_store::{VideoStore, VideoStoreError},
    },
};
use chrono::Utc;
use std::{io, io::SeekFrom, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncSeekExt},
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// The only media type accepted for video uploads.
pub const ACCEPTED_VIDEO_TYPE: &str = "video/mp4";

const STAGING_PREFIX: &str = "tubely-upload-";
const STAGING_SUFFIX: &str = ".mp4";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("video `{0}` not found")]
    VideoNotFound(Uuid),
    #[error("you don't own this video")]
    Unauthorized,
    #[error("media type `{0}` is not supported")]
    UnsupportedMediaType(String),
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },
    #[error("local I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("loading video record failed: {0}")]
    Lookup(#[source] VideoStoreError),
    /// The object exists in storage but the record does not point at it.
    #[error("stored object `{key}` but failed to update the video record: {source}")]
    Persistence {
        key: String,
        #[source]
        source: VideoStoreError,
    },
}

impl IngestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestError::VideoNotFound(_) => ErrorCategory::NotFound,
            IngestError::Unauthorized => ErrorCategory::Unauthorized,
            IngestError::UnsupportedMediaType(_) => ErrorCategory::UnsupportedMediaType,
            IngestError::PayloadTooLarge { .. } => ErrorCategory::PayloadTooLarge,
            IngestError::Io(_) => ErrorCategory::IoFault,
            IngestError::Media(MediaError::ProbeFailed(_)) => ErrorCategory::ProbeFailed,
            IngestError::Media(MediaError::MalformedMetadata(_)) => {
                ErrorCategory::MalformedMetadata
            }
            IngestError::Media(MediaError::OptimizationFailed(_)) => {
                ErrorCategory::OptimizationFailed
            }
            IngestError::Store(StoreError::Unavailable(_)) => ErrorCategory::StoreUnavailable,
            IngestError::Store(StoreError::Rejected(_)) => ErrorCategory::StoreRejected,
            IngestError::Lookup(_) | IngestError::Persistence { .. } => {
                ErrorCategory::PersistenceFailure
            }
        }
    }

    pub(crate) fn from_lookup(err: VideoStoreError) -> Self {
        match err {
            VideoStoreError::NotFound(id) => IngestError::VideoNotFound(id),
            other => IngestError::Lookup(other),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::categorized(err.category(), err)
    }
}

/// Where processed videos go and where staging happens.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Object store bucket receiving processed videos.
    pub bucket: String,
    /// Public base URL of the object store; URLs are `{endpoint}/{bucket}/{key}`.
    pub store_endpoint: String,
    /// Directory for scratch files.
    pub staging_dir: PathBuf,
}

impl IngestConfig {
    pub fn public_url(&self, key: &StorageKey) -> String {
        format!(
            "{}/{}/{}",
            self.store_endpoint.trim_end_matches('/'),
            self.bucket,
            key
        )
    }
}

#[derive(Clone)]
pub struct Ingestor {
    config: Arc<IngestConfig>,
    videos: Arc<dyn VideoStore>,
    prober: Arc<dyn Prober>,
    optimizer: Arc<dyn Optimizer>,
    uploader: Uploader,
}

impl Ingestor {
    pub fn new(
        config: IngestConfig,
        videos: Arc<dyn VideoStore>,
        prober: Arc<dyn Prober>,
        optimizer: Arc<dyn Optimizer>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let uploader = Uploader::new(store, config.bucket.clone());
        Self {
            config: Arc::new(config),
            videos,
            prober,
            optimizer,
            uploader,
        }
    }

    /// Run the full pipeline for one upload and return the updated record.
    #[instrument(skip(self, body), fields(owner_id = %owner_id, video_id = %video_id))]
    pub async fn ingest<R>(
        &self,
        owner_id: Uuid,
        video_id: Uuid,
        body: R,
        declared_content_type: &str,
        size_limit: u64,
    ) -> Result<Video, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut video = self
            .videos
            .get(video_id)
            .await
            .map_err(IngestError::from_lookup)?;
        if !video.is_owned_by(owner_id) {
            return Err(IngestError::Unauthorized);
        }

        if parse_media_type(declared_content_type).as_deref() != Some(ACCEPTED_VIDEO_TYPE) {
            return Err(IngestError::UnsupportedMediaType(
                declared_content_type.to_string(),
            ));
        }

        let (mut staged, mut file) =
            ScratchFile::create_in(&self.config.staging_dir, STAGING_PREFIX, STAGING_SUFFIX)?;
        let staged_bytes = match stage_bounded(body, &mut file, size_limit).await? {
            Staged::Complete(written) => written,
            Staged::TooLarge => return Err(IngestError::PayloadTooLarge { limit: size_limit }),
        };
        file.seek(SeekFrom::Start(0)).await?;
        drop(file);
        debug!(
            "staged {} bytes at {}",
            staged_bytes,
            staged.path().display()
        );

        let geometry = self.prober.probe(staged.path()).await?;
        let bucket = AspectBucket::classify(&geometry.display_aspect_ratio);
        debug!(
            width = geometry.width,
            height = geometry.height,
            ratio = %geometry.display_aspect_ratio,
            bucket = %bucket,
            "classified upload"
        );

        let mut optimized = ScratchFile::adopt(self.optimizer.optimize(staged.path()).await?);
        if let Err(err) = staged.remove().await {
            warn!("could not remove staged upload early: {}", err);
        }

        let key = StorageKey::generate(bucket);
        let reader = File::open(optimized.path()).await?;
        self.uploader
            .upload(key.as_str(), declared_content_type, reader)
            .await?;

        video.video_url = Some(self.config.public_url(&key));
        video.updated_at = Utc::now();
        if let Err(source) = self.videos.update(&video).await {
            error!(
                bucket = %self.uploader.bucket(),
                key = %key,
                "object stored but video record update failed; needs reconciliation: {}",
                source
            );
            return Err(IngestError::Persistence {
                key: key.to_string(),
                source,
            });
        }

        if let Err(err) = optimized.remove().await {
            warn!("could not remove optimized upload: {}", err);
        }

        info!(key = %key, size_bytes = staged_bytes, "video ingested");
        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_joins_endpoint_bucket_and_key() {
        let config = IngestConfig {
            bucket: "tubely-videos".into(),
            store_endpoint: "https://cdn.example.com/".into(),
            staging_dir: std::env::temp_dir(),
        };
        let key = StorageKey::generate(AspectBucket::Landscape);
        let url = config.public_url(&key);
        assert_eq!(
            url,
            format!("https://cdn.example.com/tubely-videos/{}", key)
        );
    }

    #[test]
    fn store_failures_keep_their_category() {
        assert_eq!(
            IngestError::from(StoreError::Unavailable("timeout".into())).category(),
            ErrorCategory::StoreUnavailable
        );
        assert_eq!(
            IngestError::from(StoreError::Rejected("403".into())).category(),
            ErrorCategory::StoreRejected
        );
    }

    #[test]
    fn missing_record_is_not_found_not_persistence() {
        let id = Uuid::new_v4();
        let err = IngestError::from_lookup(VideoStoreError::NotFound(id));
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn media_errors_map_one_to_one() {
        assert_eq!(
            IngestError::from(MediaError::ProbeFailed("x".into())).category(),
            ErrorCategory::ProbeFailed
        );
        assert_eq!(
            IngestError::from(MediaError::MalformedMetadata("x".into())).category(),
            ErrorCategory::MalformedMetadata
        );
        assert_eq!(
            IngestError::from(MediaError::OptimizationFailed("x".into())).category(),
            ErrorCategory::OptimizationFailed
        );
    }
}
