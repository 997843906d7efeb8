//! Shared fixtures: deterministic media tools, a recording object store and
//! an in-memory database.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use sqlx::sqlite::SqlitePoolOptions;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tempfile::TempDir;
use tokio::{fs::File, io::AsyncReadExt};
use tubely::{
    auth,
    models::video::Video,
    services::{
        ingest::{IngestConfig, Ingestor},
        media::{MediaError, Optimizer, Prober, StreamGeometry, faststart::processed_path},
        object_store::{ObjectStore, StoreError, StoreResult, StoredObject},
        thumbnail::ThumbnailService,
        video_store::{
            SqliteVideoStore, VideoStore, VideoStoreError, VideoStoreResult, run_migrations,
        },
    },
    state::{AppState, UploadLimits},
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-secret";
pub const BUCKET: &str = "tubely-test";
pub const STORE_ENDPOINT: &str = "http://store.test";

/// Prober that reports a fixed ratio, or fails like a nonzero exit.
pub struct FixedProber {
    ratio: Option<String>,
    pub calls: AtomicUsize,
}

impl FixedProber {
    pub fn ratio(ratio: &str) -> Self {
        Self {
            ratio: Some(ratio.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            ratio: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Prober for FixedProber {
    async fn probe(&self, path: &Path) -> Result<StreamGeometry, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "probed file must exist");
        match &self.ratio {
            Some(ratio) => Ok(StreamGeometry {
                width: 1920,
                height: 1080,
                display_aspect_ratio: ratio.clone(),
            }),
            None => Err(MediaError::ProbeFailed("ffprobe exited with status 1".into())),
        }
    }
}

/// Optimizer that copies the input to the derived output path.
#[derive(Default)]
pub struct CopyOptimizer {
    pub fail: bool,
    pub outputs: Mutex<Vec<PathBuf>>,
}

impl CopyOptimizer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Optimizer for CopyOptimizer {
    async fn optimize(&self, path: &Path) -> Result<PathBuf, MediaError> {
        if self.fail {
            return Err(MediaError::OptimizationFailed("ffmpeg exited with status 1".into()));
        }
        let output = processed_path(path);
        tokio::fs::copy(path, &output)
            .await
            .map_err(|e| MediaError::OptimizationFailed(e.to_string()))?;
        self.outputs.lock().unwrap().push(output.clone());
        Ok(output)
    }
}

#[derive(Debug, Clone)]
pub struct PutCall {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Object store that records every put, optionally failing them.
#[derive(Default)]
pub struct RecordingStore {
    pub fail_with: Option<fn() -> StoreError>,
    pub puts: Mutex<Vec<PutCall>>,
}

impl RecordingStore {
    pub fn unavailable() -> Self {
        Self {
            fail_with: Some(|| StoreError::Unavailable("connection reset".into())),
            ..Self::default()
        }
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        mut body: File,
        _content_length: u64,
    ) -> StoreResult<StoredObject> {
        if let Some(fail) = self.fail_with {
            return Err(fail());
        }
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let size_bytes = bytes.len() as u64;
        self.puts.lock().unwrap().push(PutCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            body: bytes,
        });
        Ok(StoredObject {
            key: key.to_string(),
            size_bytes,
            etag: None,
        })
    }
}

/// Video store whose updates always fail; reads go to the inner store.
pub struct FailingUpdates(pub Arc<dyn VideoStore>);

#[async_trait]
impl VideoStore for FailingUpdates {
    async fn create(&self, video: &Video) -> VideoStoreResult<()> {
        self.0.create(video).await
    }

    async fn get(&self, id: Uuid) -> VideoStoreResult<Video> {
        self.0.get(id).await
    }

    async fn update(&self, _video: &Video) -> VideoStoreResult<()> {
        Err(VideoStoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn list_for_user(&self, user_id: Uuid) -> VideoStoreResult<Vec<Video>> {
        self.0.list_for_user(user_id).await
    }
}

pub async fn memory_pool() -> sqlx::SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");
    run_migrations(&pool).await.expect("migrate");
    pool
}

/// Everything a pipeline test needs, with handles on the doubles.
pub struct Harness {
    pub pool: Arc<sqlx::SqlitePool>,
    pub videos: Arc<dyn VideoStore>,
    pub prober: Arc<FixedProber>,
    pub optimizer: Arc<CopyOptimizer>,
    pub store: Arc<RecordingStore>,
    pub ingestor: Ingestor,
    pub staging: TempDir,
    pub assets: TempDir,
}

impl Harness {
    pub async fn new(prober: FixedProber, optimizer: CopyOptimizer, store: RecordingStore) -> Self {
        let pool = Arc::new(memory_pool().await);
        let videos: Arc<dyn VideoStore> = Arc::new(SqliteVideoStore::new(pool.clone()));
        Self::with_videos(pool, videos, prober, optimizer, store)
    }

    pub fn with_videos(
        pool: Arc<sqlx::SqlitePool>,
        videos: Arc<dyn VideoStore>,
        prober: FixedProber,
        optimizer: CopyOptimizer,
        store: RecordingStore,
    ) -> Self {
        let staging = TempDir::new().expect("staging dir");
        let assets = TempDir::new().expect("assets dir");
        let prober = Arc::new(prober);
        let optimizer = Arc::new(optimizer);
        let store = Arc::new(store);

        let ingestor = Ingestor::new(
            IngestConfig {
                bucket: BUCKET.to_string(),
                store_endpoint: STORE_ENDPOINT.to_string(),
                staging_dir: staging.path().to_path_buf(),
            },
            videos.clone(),
            prober.clone(),
            optimizer.clone(),
            store.clone(),
        );

        Self {
            pool,
            videos,
            prober,
            optimizer,
            store,
            ingestor,
            staging,
            assets,
        }
    }

    pub async fn create_video(&self, owner: Uuid) -> Video {
        let video = Video::new(owner, "test video", "");
        self.videos.create(&video).await.expect("create video");
        video
    }

    /// Files left in the staging directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.staging.path())
            .expect("read staging dir")
            .map(|entry| entry.expect("dir entry").path())
            .collect()
    }

    pub fn state(&self, limits: UploadLimits) -> AppState {
        AppState {
            db: self.pool.clone(),
            videos: self.videos.clone(),
            ingestor: self.ingestor.clone(),
            thumbnails: ThumbnailService::new(
                self.videos.clone(),
                self.assets.path().to_path_buf(),
                "http://localhost:8091",
            ),
            objects: None,
            jwt_secret: Arc::from(JWT_SECRET),
            limits,
            staging_dir: self.staging.path().to_path_buf(),
        }
    }

    pub fn server(&self) -> TestServer {
        let limits = UploadLimits {
            max_video_bytes: 1 << 20,
            max_thumbnail_bytes: 1 << 16,
        };
        TestServer::new(tubely::app(self.state(limits))).expect("test server")
    }
}

pub fn token_for(user: Uuid) -> String {
    auth::issue_token(user, JWT_SECRET, Duration::from_secs(3600)).expect("issue token")
}

/// A few bytes standing in for an MP4 file; the doubles never decode it.
pub fn fake_mp4(len: usize) -> Vec<u8> {
    let mut bytes = b"\x00\x00\x00\x18ftypmp42".to_vec();
    bytes.resize(len.max(bytes.len()), 0xAB);
    bytes
}
