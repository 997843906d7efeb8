//! Local scratch files for uploads in flight.
//!
//! Every file the upload pipelines write locally is owned by a [`ScratchFile`]
//! guard, which removes it when dropped. Explicit removal is idempotent, so an
//! early cleanup followed by the drop never touches the disk twice.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
};
use tracing::{debug, warn};

/// Guard that deletes a local file on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    /// Create a uniquely named, empty file in `dir` and open it for writing.
    pub fn create_in(dir: &Path, prefix: &str, suffix: &str) -> io::Result<(Self, File)> {
        let (file, path) = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)?
            .keep()
            .map_err(|err| err.error)?;

        debug!("created scratch file {}", path.display());
        Ok((Self::adopt(path), File::from_std(file)))
    }

    /// Take ownership of a file some other component produced.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the guard still owns a file on disk.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Remove the file now. A file that is already gone counts as removed.
    pub async fn remove(&mut self) -> io::Result<()> {
        if !self.armed {
            return Ok(());
        }
        match fs::remove_file(&self.path).await {
            Ok(_) => debug!("removed scratch file {}", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("scratch file {} already missing", self.path.display());
            }
            Err(err) => return Err(err),
        }
        self.armed = false;
        Ok(())
    }

    /// Move the file to `dest` and stop guarding it.
    pub async fn persist(mut self, dest: &Path) -> io::Result<()> {
        if let Err(err) = fs::rename(&self.path, dest).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(dest).await?;
                fs::rename(&self.path, dest).await?;
            } else {
                return Err(err);
            }
        }
        self.armed = false;
        Ok(())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(_) => debug!("removed scratch file {} on drop", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "failed to remove scratch file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

/// Outcome of a bounded copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staged {
    Complete(u64),
    /// The source had more than `limit` bytes.
    TooLarge,
}

/// Copy `body` into `sink`, refusing anything larger than `limit` bytes.
///
/// Reads at most `limit + 1` bytes, so an oversized body is detected without
/// draining it.
pub async fn stage_bounded<R, W>(body: R, sink: &mut W, limit: u64) -> io::Result<Staged>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut limited = body.take(limit.saturating_add(1));
    let written = tokio::io::copy(&mut limited, sink).await?;
    if written > limit {
        return Ok(Staged::TooLarge);
    }
    sink.flush().await?;
    Ok(Staged::Complete(written))
}

/// Parse a declared Content-Type down to its lowercase `type/subtype`.
///
/// Returns `None` for anything that is not shaped like a media type.
pub fn parse_media_type(declared: &str) -> Option<String> {
    let essence = declared.split(';').next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b))
    };
    if valid(kind) && valid(subtype) {
        Some(essence)
    } else {
        None
    }
}
