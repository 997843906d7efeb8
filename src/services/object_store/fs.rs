//! Filesystem-backed object store.
//!
//! Objects live at `root/{bucket}/{key}`. Writes go to a temporary file next
//! to the destination, are fsynced, then renamed into place, so a reader never
//! sees a partial object.

use super::{ObjectStore, StoreError, StoreResult, StoredObject};
use async_trait::async_trait;
use futures::StreamExt;
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;

#[derive(Clone, Debug)]
pub struct FsObjectStore {
    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl FsObjectStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects empty or oversized keys, keys that begin with `/`, contain
    /// `..`, backslashes or control characters.
    fn ensure_key_safe(key: &str) -> StoreResult<()> {
        let reject = |reason: &str| {
            Err(StoreError::Rejected(format!(
                "invalid key `{}`: {}",
                key, reason
            )))
        };
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return reject("length out of range");
        }
        if key.starts_with('/') || key.contains("..") {
            return reject("path traversal");
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return reject("forbidden character");
        }
        Ok(())
    }

    /// Validate bucket name format.
    ///
    /// Enforces S3-like naming rules:
    /// - 3–63 characters
    /// - lowercase letters, digits, dots, hyphens only
    /// - cannot start/end with dot or hyphen
    /// - cannot contain consecutive dots
    /// - cannot look like an IPv4 address
    fn ensure_bucket_name_safe(name: &str) -> StoreResult<()> {
        let reject = |reason: &str| {
            Err(StoreError::Rejected(format!(
                "bucket `{}` invalid: {}",
                name, reason
            )))
        };

        let len = name.len();
        if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
            return reject("must be between 3 and 63 characters");
        }
        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
        {
            return reject("allowed characters are lowercase letters, digits, dots, and hyphens");
        }
        if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
            return reject("must start and end with a lowercase letter or digit");
        }
        if name.contains("..") {
            return reject("cannot contain consecutive dots");
        }
        if is_ipv4_like(name) {
            return reject("must not be formatted like an IP address");
        }
        Ok(())
    }

    /// Construct a fully-qualified object payload path.
    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(bucket);
        path.push(key);
        path
    }

    /// Open a stored object for streaming out, with its size.
    pub async fn open_object(&self, bucket: &str, key: &str) -> StoreResult<Option<(File, u64)>> {
        Self::ensure_bucket_name_safe(bucket)?;
        Self::ensure_key_safe(key)?;

        let path = self.object_path(bucket, key);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(unavailable(err)),
        };
        let len = file.metadata().await.map_err(unavailable)?.len();
        Ok(Some((file, len)))
    }

    async fn write_object(&self, file_path: &Path, body: File) -> io::Result<(u64, String)> {
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("object path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        match Self::copy_to(&tmp_path, body).await {
            Ok(written) => {
                if let Err(err) = fs::rename(&tmp_path, file_path).await {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(err);
                }
                Ok(written)
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                Err(err)
            }
        }
    }

    /// Stream `body` into `tmp_path`, computing size and MD5 on the way.
    async fn copy_to(tmp_path: &Path, body: File) -> io::Result<(u64, String)> {
        let mut file = File::create(tmp_path).await?;
        let mut size_bytes: u64 = 0;
        let mut digest = Context::new();

        let mut stream = ReaderStream::new(body);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size_bytes += chunk.len() as u64;
            digest.consume(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;

        Ok((size_bytes, format!("{:x}", digest.compute())))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: File,
        content_length: u64,
    ) -> StoreResult<StoredObject> {
        Self::ensure_bucket_name_safe(bucket)?;
        Self::ensure_key_safe(key)?;

        let file_path = self.object_path(bucket, key);
        let (size_bytes, etag) = self
            .write_object(&file_path, body)
            .await
            .map_err(unavailable)?;

        if size_bytes != content_length {
            debug!(
                "object {}/{} length changed while streaming: expected {}, wrote {}",
                bucket, key, content_length, size_bytes
            );
        }
        debug!(
            "stored {}/{} ({} bytes, {}) at {}",
            bucket,
            key,
            size_bytes,
            content_type,
            file_path.display()
        );

        Ok(StoredObject {
            key: key.to_string(),
            size_bytes,
            etag: Some(etag),
        })
    }
}

fn unavailable(err: io::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Check if a string matches IPv4-like dotted decimal form.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4 && parts.iter().all(|segment| segment.parse::<u8>().is_ok())
}
