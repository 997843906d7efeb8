use super::{MediaError, Optimizer};
use async_trait::async_trait;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use tokio::{fs, process::Command};
use tracing::{debug, info};

/// Infix marking the remuxed copy of a file.
pub const PROCESSED_INFIX: &str = "processing";

/// Moves the moov atom to the front with `ffmpeg -c copy -movflags faststart`.
#[derive(Debug, Clone)]
pub struct FfmpegOptimizer {
    binary: PathBuf,
}

impl FfmpegOptimizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegOptimizer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Path of the optimized copy: same directory and stem, `.processing` infix,
/// same extension.
///
/// `/tmp/tubely-upload-x.mp4` becomes `/tmp/tubely-upload-x.processing.mp4`.
pub fn processed_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(OsString::from).unwrap_or_default();
    let mut name = stem;
    name.push(".");
    name.push(PROCESSED_INFIX);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

#[async_trait]
impl Optimizer for FfmpegOptimizer {
    async fn optimize(&self, path: &Path) -> Result<PathBuf, MediaError> {
        let output_path = processed_path(path);

        info!(
            "Running faststart optimization: {} -> {}",
            path.display(),
            output_path.display()
        );

        let output = Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(path)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(&output_path)
            .output()
            .await
            .map_err(|e| {
                MediaError::OptimizationFailed(format!(
                    "could not run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            // ffmpeg may leave a truncated file behind.
            if fs::remove_file(&output_path).await.is_ok() {
                debug!("removed partial output {}", output_path.display());
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::OptimizationFailed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_path_keeps_stem_and_extension() {
        assert_eq!(
            processed_path(Path::new("/tmp/tubely-upload-abc.mp4")),
            PathBuf::from("/tmp/tubely-upload-abc.processing.mp4")
        );
    }

    #[test]
    fn processed_path_without_extension() {
        assert_eq!(
            processed_path(Path::new("/tmp/clip")),
            PathBuf::from("/tmp/clip.processing")
        );
    }

    #[test]
    fn processed_path_only_uses_the_last_extension() {
        assert_eq!(
            processed_path(Path::new("/var/tmp.d/a.b.mp4")),
            PathBuf::from("/var/tmp.d/a.b.processing.mp4")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_optimization_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"not really a video").unwrap();

        let result = FfmpegOptimizer::new("false").optimize(&input).await;
        assert!(matches!(result, Err(MediaError::OptimizationFailed(_))));
        assert!(!processed_path(&input).exists());
        assert!(input.exists());
    }

    #[tokio::test]
    async fn missing_binary_is_optimization_failure() {
        let result = FfmpegOptimizer::new("/definitely/not/ffmpeg")
            .optimize(Path::new("in.mp4"))
            .await;
        assert!(matches!(result, Err(MediaError::OptimizationFailed(_))));
    }
}
