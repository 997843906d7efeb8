//! Video record persistence backed by SQLite.
//!
//! The ingestion pipeline only needs `get` and `update`; the HTTP layer also
//! creates and lists records.

use crate::models::video::Video;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum VideoStoreError {
    #[error("video `{0}` not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type VideoStoreResult<T> = Result<T, VideoStoreError>;

/// Persistence collaborator for video records.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create(&self, video: &Video) -> VideoStoreResult<()>;

    /// Fetch a record by id; `NotFound` when it does not exist.
    async fn get(&self, id: Uuid) -> VideoStoreResult<Video>;

    /// Overwrite every mutable column of an existing record.
    async fn update(&self, video: &Video) -> VideoStoreResult<()>;

    /// All records owned by `user_id`, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> VideoStoreResult<Vec<Video>>;
}

#[derive(Clone)]
pub struct SqliteVideoStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteVideoStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VideoStore for SqliteVideoStore {
    async fn create(&self, video: &Video) -> VideoStoreResult<()> {
        sqlx::query(
            "INSERT INTO videos (id, created_at, updated_at, title, description,
                                 thumbnail_url, video_url, user_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(video.id)
        .bind(video.created_at)
        .bind(video.updated_at)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.user_id)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> VideoStoreResult<Video> {
        sqlx::query_as::<_, Video>(
            "SELECT id, created_at, updated_at, title, description,
                    thumbnail_url, video_url, user_id
             FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => VideoStoreError::NotFound(id),
            other => VideoStoreError::Sqlx(other),
        })
    }

    async fn update(&self, video: &Video) -> VideoStoreResult<()> {
        let result = sqlx::query(
            "UPDATE videos
             SET updated_at = ?, title = ?, description = ?,
                 thumbnail_url = ?, video_url = ?
             WHERE id = ?",
        )
        .bind(video.updated_at)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.id)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(VideoStoreError::NotFound(video.id));
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> VideoStoreResult<Vec<Video>> {
        let rows = sqlx::query_as::<_, Video>(
            "SELECT id, created_at, updated_at, title, description,
                    thumbnail_url, video_url, user_id
             FROM videos WHERE user_id = ?
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }
}

/// Apply the embedded schema, one statement at a time.
pub async fn run_migrations(db: &SqlitePool) -> anyhow::Result<()> {
    let statements = MIGRATION_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}
