use crate::config::{GcsConfig, S3Config};
use crate::error::Result;
use crate::gcs_client::GcsClient;
use crate::s3_client::S3Client;
use crate::types::{HttpMethod, ObjectStream, PresignOptions};
use async_trait::async_trait;
use bytes::Bytes;

/// Uniform adapter contract over one object-storage backend.
///
/// Adapters hold no mutable per-call state, only configuration fixed at
/// construction, so every method takes `&self` and is safe to call
/// concurrently. Existence pre-checks are performed by the adapter itself
/// so error kinds and messages are identical across backends.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Check whether a bucket exists
    async fn bucket_exists(&self, name: &str) -> Result<bool>;

    /// Create a bucket; fails with `AlreadyExists` if present
    async fn make_bucket(&self, name: &str) -> Result<()>;

    /// Delete a bucket; fails with `NotFound` if absent. Non-empty
    /// buckets are rejected by both supported backends and surface as
    /// `Backend` errors; nothing cascades.
    async fn remove_bucket(&self, name: &str) -> Result<()>;

    /// Check whether an object exists; fails if the bucket does not
    async fn object_exists(&self, bucket: &str, name: &str) -> Result<bool>;

    /// Write an object, overwriting any existing content under `name`.
    /// `size` is the declared content length in bytes.
    async fn put_object(&self, bucket: &str, name: &str, data: Bytes, size: u64) -> Result<()>;

    /// Read an object's full content; fails if the object does not exist
    async fn get_object(&self, bucket: &str, name: &str) -> Result<Bytes>;

    /// Delete an object; fails if the bucket does not exist
    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()>;

    /// Copy an object, creating or overwriting the destination; fails if
    /// the source object does not exist
    async fn copy_object(
        &self,
        source_bucket: &str,
        source_name: &str,
        destination_bucket: &str,
        destination_name: &str,
    ) -> Result<()>;

    /// Rename an object within a bucket: copy then delete the original
    async fn rename_object(&self, bucket: &str, name: &str, new_name: &str) -> Result<()>;

    /// Concatenate `sources` (in list order) into `destination_name`.
    /// Fails if any source is missing. Source count is capped by
    /// [`max_concat_sources`](StorageClient::max_concat_sources); the S3
    /// backend additionally requires every non-final source to be at
    /// least 5 MiB.
    async fn concat_objects(
        &self,
        bucket: &str,
        destination_name: &str,
        sources: &[String],
    ) -> Result<()>;

    /// MD5 digest of the object's content as lowercase hex
    async fn md5_checksum(&self, bucket: &str, name: &str) -> Result<String>;

    /// Lazily list objects, optionally filtered by name prefix. Each
    /// advance of the returned stream may fetch another backend page.
    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<ObjectStream>;

    /// Generate a time-bounded URL granting access to an object. Fails if
    /// the bucket (and, for GET, the object) does not exist.
    async fn get_presigned_url(
        &self,
        bucket: &str,
        name: &str,
        method: HttpMethod,
        options: PresignOptions,
    ) -> Result<String>;

    /// Backend-declared limit on `concat_objects` source count
    fn max_concat_sources(&self) -> usize;
}

/// The configured backend variants.
///
/// Construction runs the adapter's configuration step; a value of this
/// type is always ready for use.
pub enum StorageBackend {
    S3(S3Client),
    Gcs(GcsClient),
}

impl StorageBackend {
    /// Configure an S3-compatible backend
    pub async fn s3(config: S3Config) -> Result<Self> {
        Ok(StorageBackend::S3(S3Client::connect(config).await?))
    }

    /// Configure a GCS-compatible backend
    pub async fn gcs(config: GcsConfig) -> Result<Self> {
        Ok(StorageBackend::Gcs(GcsClient::connect(config).await?))
    }
}

#[async_trait]
impl StorageClient for StorageBackend {
    async fn bucket_exists(&self, name: &str) -> Result<bool> {
        match self {
            StorageBackend::S3(client) => client.bucket_exists(name).await,
            StorageBackend::Gcs(client) => client.bucket_exists(name).await,
        }
    }

    async fn make_bucket(&self, name: &str) -> Result<()> {
        match self {
            StorageBackend::S3(client) => client.make_bucket(name).await,
            StorageBackend::Gcs(client) => client.make_bucket(name).await,
        }
    }

    async fn remove_bucket(&self, name: &str) -> Result<()> {
        match self {
            StorageBackend::S3(client) => client.remove_bucket(name).await,
            StorageBackend::Gcs(client) => client.remove_bucket(name).await,
        }
    }

    async fn object_exists(&self, bucket: &str, name: &str) -> Result<bool> {
        match self {
            StorageBackend::S3(client) => client.object_exists(bucket, name).await,
            StorageBackend::Gcs(client) => client.object_exists(bucket, name).await,
        }
    }

    async fn put_object(&self, bucket: &str, name: &str, data: Bytes, size: u64) -> Result<()> {
        match self {
            StorageBackend::S3(client) => client.put_object(bucket, name, data, size).await,
            StorageBackend::Gcs(client) => client.put_object(bucket, name, data, size).await,
        }
    }

    async fn get_object(&self, bucket: &str, name: &str) -> Result<Bytes> {
        match self {
            StorageBackend::S3(client) => client.get_object(bucket, name).await,
            StorageBackend::Gcs(client) => client.get_object(bucket, name).await,
        }
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        match self {
            StorageBackend::S3(client) => client.delete_object(bucket, name).await,
            StorageBackend::Gcs(client) => client.delete_object(bucket, name).await,
        }
    }

    async fn copy_object(
        &self,
        source_bucket: &str,
        source_name: &str,
        destination_bucket: &str,
        destination_name: &str,
    ) -> Result<()> {
        match self {
            StorageBackend::S3(client) => {
                client
                    .copy_object(source_bucket, source_name, destination_bucket, destination_name)
                    .await
            }
            StorageBackend::Gcs(client) => {
                client
                    .copy_object(source_bucket, source_name, destination_bucket, destination_name)
                    .await
            }
        }
    }

    async fn rename_object(&self, bucket: &str, name: &str, new_name: &str) -> Result<()> {
        match self {
            StorageBackend::S3(client) => client.rename_object(bucket, name, new_name).await,
            StorageBackend::Gcs(client) => client.rename_object(bucket, name, new_name).await,
        }
    }

    async fn concat_objects(
        &self,
        bucket: &str,
        destination_name: &str,
        sources: &[String],
    ) -> Result<()> {
        match self {
            StorageBackend::S3(client) => {
                client.concat_objects(bucket, destination_name, sources).await
            }
            StorageBackend::Gcs(client) => {
                client.concat_objects(bucket, destination_name, sources).await
            }
        }
    }

    async fn md5_checksum(&self, bucket: &str, name: &str) -> Result<String> {
        match self {
            StorageBackend::S3(client) => client.md5_checksum(bucket, name).await,
            StorageBackend::Gcs(client) => client.md5_checksum(bucket, name).await,
        }
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<ObjectStream> {
        match self {
            StorageBackend::S3(client) => client.list_objects(bucket, prefix).await,
            StorageBackend::Gcs(client) => client.list_objects(bucket, prefix).await,
        }
    }

    async fn get_presigned_url(
        &self,
        bucket: &str,
        name: &str,
        method: HttpMethod,
        options: PresignOptions,
    ) -> Result<String> {
        match self {
            StorageBackend::S3(client) => {
                client.get_presigned_url(bucket, name, method, options).await
            }
            StorageBackend::Gcs(client) => {
                client.get_presigned_url(bucket, name, method, options).await
            }
        }
    }

    fn max_concat_sources(&self) -> usize {
        match self {
            StorageBackend::S3(client) => client.max_concat_sources(),
            StorageBackend::Gcs(client) => client.max_concat_sources(),
        }
    }
}
