use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr};

const DEFAULT_PORT: u16 = 8091;
const DEFAULT_MAX_VIDEO_BYTES: u64 = 1 << 30;
const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 10 << 20;

/// Which object store processed videos are written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Local directory, served back by this process under `/objects`.
    Fs,
    S3,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "fs" | "local" => Ok(StoreBackend::Fs),
            "s3" => Ok(StoreBackend::S3),
            other => bail!("unknown store backend `{}` (expected `fs` or `s3`)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub public_base_url: String,
    pub assets_root: PathBuf,
    pub staging_dir: PathBuf,
    pub max_video_bytes: u64,
    pub max_thumbnail_bytes: u64,
    pub store: StoreBackend,
    pub store_root: PathBuf,
    pub store_endpoint: String,
    pub bucket: String,
    pub s3_region: String,
    pub s3_endpoint_url: Option<String>,
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Tubely video ingestion service")]
pub struct Args {
    /// Host to bind to (overrides TUBELY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TUBELY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides TUBELY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// HMAC secret for access tokens (overrides TUBELY_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Base URL this server is reachable under (overrides TUBELY_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Directory thumbnails are saved to (overrides TUBELY_ASSETS_ROOT)
    #[arg(long)]
    pub assets_root: Option<PathBuf>,

    /// Directory for in-flight upload files (overrides TUBELY_STAGING_DIR)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Largest accepted video upload in bytes (overrides TUBELY_MAX_VIDEO_BYTES)
    #[arg(long)]
    pub max_video_bytes: Option<u64>,

    /// Largest accepted thumbnail in bytes (overrides TUBELY_MAX_THUMBNAIL_BYTES)
    #[arg(long)]
    pub max_thumbnail_bytes: Option<u64>,

    /// Object store backend, `fs` or `s3` (overrides TUBELY_STORE)
    #[arg(long)]
    pub store: Option<String>,

    /// Root directory of the `fs` object store (overrides TUBELY_STORE_ROOT)
    #[arg(long)]
    pub store_root: Option<PathBuf>,

    /// Public endpoint objects are addressed under (overrides TUBELY_STORE_ENDPOINT)
    #[arg(long)]
    pub store_endpoint: Option<String>,

    /// Bucket processed videos are written to (overrides TUBELY_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS region for the `s3` backend (overrides TUBELY_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom S3 endpoint, e.g. MinIO (overrides TUBELY_S3_ENDPOINT_URL)
    #[arg(long)]
    pub s3_endpoint_url: Option<String>,

    /// ffprobe binary (overrides TUBELY_FFPROBE)
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,

    /// ffmpeg binary (overrides TUBELY_FFMPEG)
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over `lookup`-provided environment over defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parsed = |name: &str| -> Result<Option<u64>> {
            lookup(name)
                .map(|value| {
                    value
                        .parse::<u64>()
                        .with_context(|| format!("parsing {} value `{}`", name, value))
                })
                .transpose()
        };

        let env_port = lookup("TUBELY_PORT")
            .map(|value| {
                value
                    .parse::<u16>()
                    .with_context(|| format!("parsing TUBELY_PORT value `{}`", value))
            })
            .transpose()?;
        let port = args.port.or(env_port).unwrap_or(DEFAULT_PORT);

        let jwt_secret = args
            .jwt_secret
            .or_else(|| lookup("TUBELY_JWT_SECRET"))
            .filter(|secret| !secret.is_empty())
            .context("TUBELY_JWT_SECRET must be set")?;

        let public_base_url = args
            .public_base_url
            .or_else(|| lookup("TUBELY_PUBLIC_BASE_URL"))
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let store = match args.store.or_else(|| lookup("TUBELY_STORE")) {
            Some(value) => value.parse()?,
            None => StoreBackend::Fs,
        };

        let s3_region = args
            .s3_region
            .or_else(|| lookup("TUBELY_S3_REGION"))
            .unwrap_or_else(|| "us-east-1".into());
        let s3_endpoint_url = args
            .s3_endpoint_url
            .or_else(|| lookup("TUBELY_S3_ENDPOINT_URL"));

        // Default to wherever the chosen backend actually serves objects.
        let store_endpoint = args
            .store_endpoint
            .or_else(|| lookup("TUBELY_STORE_ENDPOINT"))
            .unwrap_or_else(|| match store {
                StoreBackend::Fs => {
                    format!("{}/objects", public_base_url.trim_end_matches('/'))
                }
                StoreBackend::S3 => match &s3_endpoint_url {
                    Some(url) => url.trim_end_matches('/').to_string(),
                    None => format!("https://s3.{}.amazonaws.com", s3_region),
                },
            });

        Ok(Self {
            host: args
                .host
                .or_else(|| lookup("TUBELY_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database_url: args
                .database_url
                .or_else(|| lookup("TUBELY_DATABASE_URL"))
                .unwrap_or_else(|| "sqlite://./data/tubely.db".into()),
            jwt_secret,
            public_base_url,
            assets_root: args
                .assets_root
                .or_else(|| lookup("TUBELY_ASSETS_ROOT").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("./assets")),
            staging_dir: args
                .staging_dir
                .or_else(|| lookup("TUBELY_STAGING_DIR").map(PathBuf::from))
                .unwrap_or_else(env::temp_dir),
            max_video_bytes: match args.max_video_bytes {
                Some(value) => value,
                None => parsed("TUBELY_MAX_VIDEO_BYTES")?.unwrap_or(DEFAULT_MAX_VIDEO_BYTES),
            },
            max_thumbnail_bytes: match args.max_thumbnail_bytes {
                Some(value) => value,
                None => {
                    parsed("TUBELY_MAX_THUMBNAIL_BYTES")?.unwrap_or(DEFAULT_MAX_THUMBNAIL_BYTES)
                }
            },
            store,
            store_root: args
                .store_root
                .or_else(|| lookup("TUBELY_STORE_ROOT").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("./data/objects")),
            store_endpoint,
            bucket: args
                .bucket
                .or_else(|| lookup("TUBELY_BUCKET"))
                .unwrap_or_else(|| "tubely-videos".into()),
            s3_region,
            s3_endpoint_url,
            ffprobe: args
                .ffprobe
                .or_else(|| lookup("TUBELY_FFPROBE").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("ffprobe")),
            ffmpeg: args
                .ffmpeg
                .or_else(|| lookup("TUBELY_FFMPEG").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
