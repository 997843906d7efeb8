//! External media tooling: stream inspection and faststart remuxing.
//!
//! Both tools run as subprocesses against a local path. They sit behind the
//! [`Prober`] and [`Optimizer`] traits so the pipeline can run against
//! deterministic doubles.

pub mod faststart;
pub mod probe;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use faststart::FfmpegOptimizer;
pub use probe::FfprobeProber;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("probe failed: {0}")]
    ProbeFailed(String),
    #[error("malformed media metadata: {0}")]
    MalformedMetadata(String),
    #[error("optimization failed: {0}")]
    OptimizationFailed(String),
}

/// Geometry of the first stream in a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamGeometry {
    pub width: u32,
    pub height: u32,
    /// Declared display aspect ratio, e.g. `16:9`. Empty when not reported.
    pub display_aspect_ratio: String,
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<StreamGeometry, MediaError>;
}

#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Rewrite `path` for progressive playback, returning the new file's path.
    ///
    /// The input is left untouched; the caller owns both files afterwards.
    async fn optimize(&self, path: &Path) -> Result<PathBuf, MediaError>;
}
