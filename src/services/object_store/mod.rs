//! Durable object storage for processed videos.
//!
//! [`ObjectStore`] is the put-object collaborator; [`Uploader`] binds it to
//! the configured bucket and is what the ingestion pipeline talks to.

pub mod fs;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use std::{sync::Arc, time::Instant};
use thiserror::Error;
use tokio::fs::File;
use tracing::info;

pub use fs::FsObjectStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or failed mid-write.
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    /// The store refused the object.
    #[error("object store rejected the write: {0}")]
    Rejected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A confirmed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream `body` to `bucket/key`. Returns only once the write is durable.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: File,
        content_length: u64,
    ) -> StoreResult<StoredObject>;
}

/// Pushes processed files into one bucket of an [`ObjectStore`].
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Stream an open file to `key`. The file is read from its current position.
    pub async fn upload(
        &self,
        key: &str,
        content_type: &str,
        file: File,
    ) -> StoreResult<StoredObject> {
        let content_length = file
            .metadata()
            .await
            .map_err(|e| StoreError::Unavailable(format!("could not stat upload body: {}", e)))?
            .len();

        let started = Instant::now();
        let stored = self
            .store
            .put_object(&self.bucket, key, content_type, file, content_length)
            .await?;

        info!(
            bucket = %self.bucket,
            key = %stored.key,
            size_bytes = stored.size_bytes,
            duration_ms = started.elapsed().as_millis() as u64,
            "object stored"
        );
        Ok(stored)
    }
}
