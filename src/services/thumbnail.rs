//! Thumbnail upload: a bounded save to the local assets directory.

use crate::{
    models::video::Video,
    services::{
        ingest::IngestError,
        staging::{ScratchFile, Staged, parse_media_type, stage_bounded},
        video_store::VideoStore,
    },
};
use chrono::Utc;
use std::{path::PathBuf, sync::Arc};
use tokio::{fs, io::AsyncRead};
use tracing::info;
use uuid::Uuid;

pub const ACCEPTED_IMAGE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Clone)]
pub struct ThumbnailService {
    videos: Arc<dyn VideoStore>,
    /// Directory thumbnails are written to and served from.
    assets_root: PathBuf,
    /// Base URL the `/assets` route is reachable under.
    public_base_url: String,
}

impl ThumbnailService {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        assets_root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            videos,
            assets_root: assets_root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn assets_root(&self) -> &PathBuf {
        &self.assets_root
    }

    /// Save a thumbnail as `{video_id}.{subtype}` and link it from the record.
    pub async fn upload<R>(
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

        let media_type = parse_media_type(declared_content_type)
            .filter(|media_type| ACCEPTED_IMAGE_TYPES.contains(&media_type.as_str()))
            .ok_or_else(|| IngestError::UnsupportedMediaType(declared_content_type.to_string()))?;
        let extension = media_type
            .split_once('/')
            .map(|(_, subtype)| subtype.to_string())
            .unwrap_or_default();

        fs::create_dir_all(&self.assets_root).await?;
        let (staged, mut file) = ScratchFile::create_in(&self.assets_root, ".thumbnail-", ".part")?;
        match stage_bounded(body, &mut file, size_limit).await? {
            Staged::Complete(_) => {}
            Staged::TooLarge => return Err(IngestError::PayloadTooLarge { limit: size_limit }),
        }
        file.sync_all().await?;
        drop(file);

        let file_name = format!("{}.{}", video_id, extension);
        staged.persist(&self.assets_root.join(&file_name)).await?;

        video.thumbnail_url = Some(format!(
            "{}/assets/{}",
            self.public_base_url.trim_end_matches('/'),
            file_name
        ));
        video.updated_at = Utc::now();
        self.videos
            .update(&video)
            .await
            .map_err(|source| IngestError::Persistence {
                key: file_name.clone(),
                source,
            })?;

        info!(video_id = %video_id, file = %file_name, "thumbnail saved");
        Ok(video)
    }
}
