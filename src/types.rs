use crate::error::Result;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::time::Duration;

/// Default expiry applied to presigned URLs when the caller gives none
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Descriptor for a stored object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageObject {
    /// Object name, unique within its bucket
    pub name: String,
    /// Content size in bytes
    pub size: u64,
    /// Last-modified timestamp as reported by the backend
    pub last_modified: Option<DateTime<Utc>>,
}

/// Lazy, finite, single-pass sequence of object descriptors.
///
/// Advancing the stream may block on the next backend page; the stream is
/// not restartable.
pub type ObjectStream = Pin<Box<dyn Stream<Item = Result<StorageObject>> + Send + 'static>>;

/// HTTP method bound into a presigned URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Head,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        };
        f.write_str(s)
    }
}

/// Options for presigned URL generation.
///
/// Every field is optional; absence falls back to the backend default
/// (one-day expiry, no content-type constraint, no hostname or scheme
/// override).
#[derive(Debug, Clone, Default)]
pub struct PresignOptions {
    /// Validity window; defaults to [`DEFAULT_PRESIGN_EXPIRY`]
    pub expires: Option<Duration>,
    /// Content-type constraint signed into the URL
    pub content_type: Option<String>,
    /// Replace the backend hostname in the generated URL (S3 adapter:
    /// only applied when given; GCS adapter: ignored, substitution is
    /// driven by configuration)
    pub use_hostname: Option<String>,
    /// Force the URL scheme: `true` for https, `false` for http (S3
    /// adapter only)
    pub secure: Option<bool>,
}

impl PresignOptions {
    /// Effective expiry after defaulting
    pub fn expiry(&self) -> Duration {
        self.expires.unwrap_or(DEFAULT_PRESIGN_EXPIRY)
    }
}
