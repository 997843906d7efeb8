//! Represents a video record — the metadata row an upload is attached to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A video owned by a single user.
///
/// The record is created empty; the ingestion pipeline fills in `video_url`
/// once the processed file is in object storage, and the thumbnail upload
/// fills in `thumbnail_url`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Video {
    /// Unique identifier for this video.
    pub id: Uuid,

    /// When this record was created.
    pub created_at: DateTime<Utc>,

    /// When this record was last modified.
    pub updated_at: DateTime<Utc>,

    pub title: String,

    pub description: String,

    /// Public URL of the thumbnail image, once uploaded.
    pub thumbnail_url: Option<String>,

    /// Public URL of the processed video, once ingested.
    pub video_url: Option<String>,

    /// ID of the user that owns this video.
    pub user_id: Uuid,
}

impl Video {
    /// Build a fresh record with no media attached.
    pub fn new(user_id: Uuid, title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: title.into(),
            description: description.into(),
            thumbnail_url: None,
            video_url: None,
            user_id,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Request body for `POST /api/videos`.
#[derive(Debug, Deserialize)]
pub struct CreateVideoReq {
    pub title: String,
    #[serde(default)]
    pub description: String,
}
