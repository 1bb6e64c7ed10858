//! Per-adapter configuration.
//!
//! Each adapter owns one configuration value, consumed once at
//! construction and read-only thereafter. `from_env` constructors read the
//! deployment's conventional environment keys; explicit struct literals
//! work just as well for tests.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the S3-compatible adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// Endpoint as `host:port`, e.g. `localhost:9000` for a MinIO
    /// emulator. `None` targets the real AWS endpoint for the region.
    pub endpoint: Option<String>,
    /// Region name; optional for emulators
    pub region: Option<String>,
    /// Access key id
    pub access_key: Option<String>,
    /// Secret access key
    pub secret_key: Option<String>,
    /// Whether the endpoint speaks https
    pub secure: bool,
    /// Hostname advertised to callers outside the emulator's network
    pub external_hostname: Option<String>,
}

impl S3Config {
    /// Read configuration from `S3_ENDPOINT`, `S3_REGION`, `S3_ACCESS_KEY`,
    /// `S3_SECRET_KEY`, `S3_SECURE` and `STORAGE_EXTERNAL_HOSTNAME`.
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("S3_ENDPOINT").ok(),
            region: env::var("S3_REGION").ok(),
            access_key: env::var("S3_ACCESS_KEY").ok(),
            secret_key: env::var("S3_SECRET_KEY").ok(),
            secure: env::var("S3_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            external_hostname: env::var("STORAGE_EXTERNAL_HOSTNAME").ok(),
        }
    }

    /// Full endpoint URL, with the scheme derived from `secure`
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|host| {
            let scheme = if self.secure { "https" } else { "http" };
            format!("{}://{}", scheme, host)
        })
    }
}

/// Configuration for the GCS-compatible adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GcsConfig {
    /// Google Cloud project id; required
    pub project_id: Option<String>,
    /// Emulator endpoint as `host:port` or full URL. When set, presigned
    /// URLs are not signed and public URLs are substituted instead.
    pub emulator_host: Option<String>,
    /// Hostname advertised to callers outside the emulator's network;
    /// falls back to the emulator hostname when absent
    pub external_hostname: Option<String>,
}

impl GcsConfig {
    /// Read configuration from `GOOGLE_CLOUD_PROJECT`,
    /// `STORAGE_EMULATOR_HOST` and `STORAGE_EXTERNAL_HOSTNAME`.
    pub fn from_env() -> Self {
        Self {
            project_id: env::var("GOOGLE_CLOUD_PROJECT").ok(),
            emulator_host: env::var("STORAGE_EMULATOR_HOST").ok(),
            external_hostname: env::var("STORAGE_EXTERNAL_HOSTNAME").ok(),
        }
    }

    /// Hostname substituted into public URLs; same as the emulator
    /// hostname unless overridden
    pub fn effective_external_hostname(&self) -> Option<&str> {
        self.external_hostname
            .as_deref()
            .or(self.emulator_host.as_deref())
    }
}

/// Prefix `host` with a scheme when it has none
pub(crate) fn ensure_scheme(host: &str, default_scheme: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("{}://{}", default_scheme, host)
    }
}
