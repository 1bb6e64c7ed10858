//! # multicloud-storage
//!
//! One bucket/object API over heterogeneous object-storage backends,
//! currently S3-compatible stores (AWS S3, MinIO) and GCS-compatible
//! stores (Google Cloud Storage, fake-gcs-server).
//!
//! ## Features
//!
//! - **Uniform contract**: a single [`StorageClient`] operation set with
//!   identical existence-check, overwrite and error semantics on every
//!   backend, so calling code never branches on backend identity
//! - **Async/await**: built on Tokio; every operation is one awaited
//!   round trip to the backend (a small bounded number for multi-part
//!   operations such as concatenation)
//! - **Presigned URLs**: cryptographically signed against real
//!   endpoints, unsigned public URLs with hostname substitution against
//!   emulators
//! - **Lazy listing**: `list_objects` yields descriptors page by page
//!   without buffering the whole bucket
//!
//! ## Quick Start
//!
//! ```no_run
//! use bytes::Bytes;
//! use multicloud_storage::{S3Config, Storage, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = StorageBackend::s3(S3Config {
//!         endpoint: Some("localhost:9000".to_string()),
//!         access_key: Some("minioadmin".to_string()),
//!         secret_key: Some("minioadmin".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//!     let storage = Storage::new(backend);
//!
//!     storage.make_bucket("t1").await?;
//!     let data = Bytes::from_static(b"{\"k\":1}");
//!     let size = data.len() as u64;
//!     storage.put_object("t1", "o1", data, size).await?;
//!
//!     let content = storage.get_object("t1", "o1").await?;
//!     println!("read {} bytes", content.len());
//!     Ok(())
//! }
//! ```
//!
//! ## GCS backend
//!
//! ```no_run
//! use multicloud_storage::{GcsConfig, Storage, StorageBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Configuration can also come from GOOGLE_CLOUD_PROJECT,
//! // STORAGE_EMULATOR_HOST and STORAGE_EXTERNAL_HOSTNAME.
//! let backend = StorageBackend::gcs(GcsConfig::from_env()).await?;
//! let storage = Storage::new(backend);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gcs_client;
pub mod s3_client;
pub mod storage;
pub mod types;

// Re-export main types for convenience
pub use client::{StorageBackend, StorageClient};
pub use config::{GcsConfig, S3Config};
pub use error::{Error, Result};
pub use storage::Storage;
pub use types::{HttpMethod, ObjectStream, PresignOptions, StorageObject, DEFAULT_PRESIGN_EXPIRY};

// Re-export individual clients
pub use gcs_client::GcsClient;
pub use s3_client::S3Client;
