//! Aspect-ratio buckets used to namespace stored videos.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectBucket {
    Landscape,
    Portrait,
    Other,
}

impl AspectBucket {
    /// Bucket a display aspect ratio as reported by the prober.
    ///
    /// Only the exact strings `16:9` and `9:16` get a named bucket; every
    /// other value, malformed or not, lands in `Other`.
    pub fn classify(display_aspect_ratio: &str) -> Self {
        match display_aspect_ratio {
            "16:9" => AspectBucket::Landscape,
            "9:16" => AspectBucket::Portrait,
            _ => AspectBucket::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectBucket::Landscape => "landscape",
            AspectBucket::Portrait => "portrait",
            AspectBucket::Other => "other",
        }
    }
}

impl fmt::Display for AspectBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
