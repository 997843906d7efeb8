//! Storage key generation.
//!
//! Key format: `{bucket}/{token}.mp4`, where `token` is 32 bytes from a CSPRNG
//! encoded as unpadded URL-safe base64.

use crate::services::aspect::AspectBucket;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use std::fmt;

/// Number of random bytes behind each key token.
pub const TOKEN_BYTES: usize = 32;

/// Extension of every processed video.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// An object key for a processed video. Generated once per upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    bucket: AspectBucket,
    key: String,
}

impl StorageKey {
    /// Draw a fresh key inside `bucket`'s namespace.
    pub fn generate(bucket: AspectBucket) -> Self {
        let mut raw = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);

        Self {
            bucket,
            key: format!("{}/{}.{}", bucket.as_str(), token, OUTPUT_EXTENSION),
        }
    }

    pub fn bucket(&self) -> AspectBucket {
        self.bucket
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
