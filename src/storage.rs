use crate::client::{StorageBackend, StorageClient};
use crate::error::Result;
use crate::types::{HttpMethod, ObjectStream, PresignOptions};
use bytes::Bytes;
use tracing::debug;

/// Backend-agnostic entry point.
///
/// Holds exactly one configured backend, chosen at construction and never
/// swapped. Every method emits one debug trace of the call and its
/// arguments (bulk payloads omitted), forwards to the backend unchanged,
/// and propagates the backend's result or error verbatim.
pub struct Storage {
    client: StorageBackend,
}

impl Storage {
    /// Wrap a configured backend. Backend construction is the
    /// configuration step, so a `Storage` is always ready for use.
    pub fn new(client: StorageBackend) -> Self {
        Self { client }
    }

    pub async fn bucket_exists(&self, name: &str) -> Result<bool> {
        debug!("bucket_exists(name='{}')", name);
        self.client.bucket_exists(name).await
    }

    pub async fn make_bucket(&self, name: &str) -> Result<()> {
        debug!("make_bucket(name='{}')", name);
        self.client.make_bucket(name).await
    }

    pub async fn remove_bucket(&self, name: &str) -> Result<()> {
        debug!("remove_bucket(name='{}')", name);
        self.client.remove_bucket(name).await
    }

    pub async fn object_exists(&self, bucket_name: &str, name: &str) -> Result<bool> {
        debug!("object_exists(bucket_name='{}', name='{}')", bucket_name, name);
        self.client.object_exists(bucket_name, name).await
    }

    pub async fn put_object(
        &self,
        bucket_name: &str,
        name: &str,
        data: Bytes,
        size: u64,
    ) -> Result<()> {
        debug!(
            "put_object(bucket_name='{}', name='{}', data=[omitted], size={})",
            bucket_name, name, size
        );
        self.client.put_object(bucket_name, name, data, size).await
    }

    pub async fn get_object(&self, bucket_name: &str, name: &str) -> Result<Bytes> {
        debug!("get_object(bucket_name='{}', name='{}')", bucket_name, name);
        self.client.get_object(bucket_name, name).await
    }

    pub async fn delete_object(&self, bucket_name: &str, name: &str) -> Result<()> {
        debug!("delete_object(bucket_name='{}', name='{}')", bucket_name, name);
        self.client.delete_object(bucket_name, name).await
    }

    pub async fn copy_object(
        &self,
        source_bucket_name: &str,
        source_name: &str,
        destination_bucket_name: &str,
        destination_name: &str,
    ) -> Result<()> {
        debug!(
            "copy_object(source_bucket_name='{}', source_name='{}', \
             destination_bucket_name='{}', destination_name='{}')",
            source_bucket_name, source_name, destination_bucket_name, destination_name
        );
        self.client
            .copy_object(
                source_bucket_name,
                source_name,
                destination_bucket_name,
                destination_name,
            )
            .await
    }

    pub async fn rename_object(
        &self,
        bucket_name: &str,
        name: &str,
        new_name: &str,
    ) -> Result<()> {
        debug!(
            "rename_object(bucket_name='{}', name='{}', new_name='{}')",
            bucket_name, name, new_name
        );
        self.client.rename_object(bucket_name, name, new_name).await
    }

    pub async fn concat_objects(
        &self,
        bucket_name: &str,
        destination_object: &str,
        source_objects: &[String],
    ) -> Result<()> {
        debug!(
            "concat_objects(bucket_name='{}', destination_object='{}', source_objects={:?})",
            bucket_name, destination_object, source_objects
        );
        self.client
            .concat_objects(bucket_name, destination_object, source_objects)
            .await
    }

    pub async fn md5_checksum(&self, bucket_name: &str, name: &str) -> Result<String> {
        debug!("md5_checksum(bucket_name='{}', name='{}')", bucket_name, name);
        self.client.md5_checksum(bucket_name, name).await
    }

    pub async fn list_objects(
        &self,
        bucket_name: &str,
        prefix: Option<&str>,
    ) -> Result<ObjectStream> {
        debug!(
            "list_objects(bucket_name='{}', prefix='{}')",
            bucket_name,
            prefix.unwrap_or("")
        );
        self.client.list_objects(bucket_name, prefix).await
    }

    pub async fn get_presigned_url(
        &self,
        bucket_name: &str,
        name: &str,
        method: HttpMethod,
        options: PresignOptions,
    ) -> Result<String> {
        debug!(
            "get_presigned_url(bucket_name='{}', name='{}', method='{}', expires={:?}, \
             content_type={:?}, use_hostname={:?}, secure={:?})",
            bucket_name,
            name,
            method,
            options.expires,
            options.content_type,
            options.use_hostname,
            options.secure
        );
        self.client
            .get_presigned_url(bucket_name, name, method, options)
            .await
    }

    /// Backend-declared limit on `concat_objects` source count
    pub fn max_concat_sources(&self) -> usize {
        self.client.max_concat_sources()
    }
}
