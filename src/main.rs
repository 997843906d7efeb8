use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tubely::{
    config::{AppConfig, StoreBackend},
    services::{
        ingest::{IngestConfig, Ingestor},
        media::{FfmpegOptimizer, FfprobeProber},
        object_store::{FsObjectStore, ObjectStore},
        thumbnail::ThumbnailService,
        video_store::{self, SqliteVideoStore, VideoStore},
    },
    state::{AppState, UploadLimits},
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tubely=info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        addr = %cfg.addr(),
        store = ?cfg.store,
        bucket = %cfg.bucket,
        staging_dir = %cfg.staging_dir.display(),
        "Starting tubely"
    );

    // --- Ensure local directories exist ---
    for dir in [&cfg.assets_root, &cfg.staging_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            tracing::info!("Created directory {}", dir.display());
        }
    }

    // --- Initialize SQLite connection ---
    let connect_options = SqliteConnectOptions::from_str(&cfg.database_url)
        .with_context(|| format!("parsing database url `{}`", cfg.database_url))?
        .create_if_missing(true);
    if let Some(parent) = connect_options.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?,
    );

    // --- Handle migration mode ---
    if migrate {
        video_store::run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Initialize services ---
    let videos: Arc<dyn VideoStore> = Arc::new(SqliteVideoStore::new(db.clone()));

    let fs_store = match cfg.store {
        StoreBackend::Fs => Some(FsObjectStore::new(cfg.store_root.clone())),
        StoreBackend::S3 => None,
    };
    let object_store: Arc<dyn ObjectStore> = match &fs_store {
        Some(store) => Arc::new(store.clone()),
        None => s3_store(&cfg).await?,
    };

    let ingestor = Ingestor::new(
        IngestConfig {
            bucket: cfg.bucket.clone(),
            store_endpoint: cfg.store_endpoint.clone(),
            staging_dir: cfg.staging_dir.clone(),
        },
        videos.clone(),
        Arc::new(FfprobeProber::new(cfg.ffprobe.clone())),
        Arc::new(FfmpegOptimizer::new(cfg.ffmpeg.clone())),
        object_store,
    );
    let thumbnails = ThumbnailService::new(
        videos.clone(),
        cfg.assets_root.clone(),
        cfg.public_base_url.clone(),
    );

    let state = AppState {
        db,
        videos,
        ingestor,
        thumbnails,
        objects: fs_store,
        jwt_secret: Arc::from(cfg.jwt_secret.as_str()),
        limits: UploadLimits {
            max_video_bytes: cfg.max_video_bytes,
            max_thumbnail_bytes: cfg.max_thumbnail_bytes,
        },
        staging_dir: cfg.staging_dir.clone(),
    };

    // --- Build router ---
    let app = tubely::app(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "s3")]
async fn s3_store(cfg: &AppConfig) -> Result<Arc<dyn ObjectStore>> {
    use tubely::services::object_store::S3ObjectStore;

    Ok(Arc::new(
        S3ObjectStore::new(cfg.s3_region.clone(), cfg.s3_endpoint_url.clone()).await,
    ))
}

#[cfg(not(feature = "s3"))]
async fn s3_store(_cfg: &AppConfig) -> Result<Arc<dyn ObjectStore>> {
    anyhow::bail!("the `s3` store backend requires building with `--features s3`")
}
