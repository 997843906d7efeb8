use super::{MediaError, Prober, StreamGeometry};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Probes files with `ffprobe -print_format json -show_streams`.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    display_aspect_ratio: String,
}

impl FfprobeProber {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<StreamGeometry, MediaError> {
        let output = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                MediaError::ProbeFailed(format!(
                    "could not run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::ProbeFailed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        let geometry = parse_probe_output(&output.stdout)?;
        debug!(
            width = geometry.width,
            height = geometry.height,
            ratio = %geometry.display_aspect_ratio,
            "probed {}",
            path.display()
        );
        Ok(geometry)
    }
}

/// Extract the first stream's geometry from ffprobe's JSON output.
pub fn parse_probe_output(stdout: &[u8]) -> Result<StreamGeometry, MediaError> {
    let parsed: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::MalformedMetadata(format!("unparseable probe output: {}", e)))?;

    let first = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::MalformedMetadata("no streams found".into()))?;

    Ok(StreamGeometry {
        width: first.width,
        height: first.height,
        display_aspect_ratio: first.display_aspect_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_the_first_stream() {
        let stdout = br#"{
            "streams": [
                {"index": 0, "codec_type": "video", "width": 1920, "height": 1080,
                 "display_aspect_ratio": "16:9"},
                {"index": 1, "codec_type": "audio"}
            ]
        }"#;
        let geometry = parse_probe_output(stdout).unwrap();
        assert_eq!(
            geometry,
            StreamGeometry {
                width: 1920,
                height: 1080,
                display_aspect_ratio: "16:9".into(),
            }
        );
    }

    #[test]
    fn missing_fields_default() {
        let stdout = br#"{"streams": [{"codec_type": "audio"}]}"#;
        let geometry = parse_probe_output(stdout).unwrap();
        assert_eq!(geometry.width, 0);
        assert_eq!(geometry.display_aspect_ratio, "");
    }

    #[test]
    fn empty_stream_list_is_malformed() {
        assert!(matches!(
            parse_probe_output(br#"{"streams": []}"#),
            Err(MediaError::MalformedMetadata(_))
        ));
        assert!(matches!(
            parse_probe_output(b"{}"),
            Err(MediaError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(MediaError::MalformedMetadata(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_probe_failure() {
        let prober = FfprobeProber::new("false");
        let result = prober.probe(Path::new("/nonexistent.mp4")).await;
        assert!(matches!(result, Err(MediaError::ProbeFailed(_))));
    }

    #[tokio::test]
    async fn missing_binary_is_probe_failure() {
        let prober = FfprobeProber::new("/definitely/not/ffprobe");
        let result = prober.probe(Path::new("clip.mp4")).await;
        assert!(matches!(result, Err(MediaError::ProbeFailed(_))));
    }
}
