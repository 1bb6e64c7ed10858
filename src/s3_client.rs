use crate::config::S3Config;
use crate::error::{Error, Result};
use crate::types::{HttpMethod, ObjectStream, PresignOptions, StorageObject};
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, TryStreamExt};
use md5::{Digest, Md5};
use url::Url;

/// S3 caps multipart uploads at 10,000 parts, which bounds the number of
/// sources one concatenation can take
const S3_MAX_CONCAT_SOURCES: usize = 10_000;

/// Client for S3-compatible backends (AWS S3, MinIO, ...)
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    config: S3Config,
}

impl S3Client {
    /// Configure the adapter: validate required settings and build the
    /// vendor SDK client. Fails with `Configuration` when credentials are
    /// incomplete.
    pub async fn connect(config: S3Config) -> Result<Self> {
        match (&config.access_key, &config.secret_key) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::Configuration(
                    "s3 client requires S3_ACCESS_KEY and S3_SECRET_KEY together".to_string(),
                ))
            }
            (None, None) if config.endpoint.is_some() => {
                return Err(Error::Configuration(
                    "s3 client requires S3_ACCESS_KEY and S3_SECRET_KEY when S3_ENDPOINT is set"
                        .to_string(),
                ))
            }
            _ => {}
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = config.region.clone() {
            loader = loader.region(Region::new(region));
        }
        if let (Some(access), Some(secret)) =
            (config.access_key.clone(), config.secret_key.clone())
        {
            loader = loader.credentials_provider(Credentials::new(
                access,
                secret,
                None,
                None,
                "multicloud-storage",
            ));
        }
        let shared = loader.load().await;

        // Path-style addressing: virtual-host style does not work against
        // emulators reachable only as host:port.
        let mut builder = S3ConfigBuilder::from(&shared).force_path_style(true);
        if let Some(endpoint) = config.endpoint_url() {
            builder = builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(builder.build());

        Ok(Self { client, config })
    }

    pub async fn bucket_exists(&self, name: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(name).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(false)
                } else {
                    Err(Error::backend(err))
                }
            }
        }
    }

    pub async fn make_bucket(&self, name: &str) -> Result<()> {
        if self.bucket_exists(name).await? {
            return Err(Error::bucket_already_exists(name));
        }
        let mut request = self.client.create_bucket().bucket(name);
        if let Some(region) = self.config.region.as_deref() {
            if region != "us-east-1" {
                request = request.create_bucket_configuration(
                    CreateBucketConfiguration::builder()
                        .location_constraint(BucketLocationConstraint::from(region))
                        .build(),
                );
            }
        }
        request.send().await.map_err(Error::backend)?;
        Ok(())
    }

    /// Delete a bucket. S3 rejects deletion of non-empty buckets with
    /// `BucketNotEmpty`; that surfaces as a `Backend` error.
    pub async fn remove_bucket(&self, name: &str) -> Result<()> {
        if !self.bucket_exists(name).await? {
            return Err(Error::bucket_not_found(name));
        }
        self.client
            .delete_bucket()
            .bucket(name)
            .send()
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    pub async fn object_exists(&self, bucket: &str, name: &str) -> Result<bool> {
        if !self.bucket_exists(bucket).await? {
            return Err(Error::bucket_not_found(bucket));
        }
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(false)
                } else {
                    Err(Error::backend(err))
                }
            }
        }
    }

    pub async fn put_object(&self, bucket: &str, name: &str, data: Bytes, size: u64) -> Result<()> {
        if !self.bucket_exists(bucket).await? {
            return Err(Error::bucket_not_found(bucket));
        }
        self.client
            .put_object()
            .bucket(bucket)
            .key(name)
            .content_length(size as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    pub async fn get_object(&self, bucket: &str, name: &str) -> Result<Bytes> {
        if !self.object_exists(bucket, name).await? {
            return Err(Error::object_not_found(bucket, name));
        }
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(name)
            .send()
            .await
            .map_err(Error::backend)?;
        let body = response.body.collect().await.map_err(Error::backend)?;
        Ok(body.into_bytes())
    }

    pub async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        if !self.bucket_exists(bucket).await? {
            return Err(Error::bucket_not_found(bucket));
        }
        self.client
            .delete_object()
            .bucket(bucket)
            .key(name)
            .send()
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    pub async fn copy_object(
        &self,
        source_bucket: &str,
        source_name: &str,
        destination_bucket: &str,
        destination_name: &str,
    ) -> Result<()> {
        if !self.object_exists(source_bucket, source_name).await? {
            return Err(Error::object_not_found(source_bucket, source_name));
        }
        self.client
            .copy_object()
            .copy_source(copy_source(source_bucket, source_name))
            .bucket(destination_bucket)
            .key(destination_name)
            .send()
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    pub async fn rename_object(&self, bucket: &str, name: &str, new_name: &str) -> Result<()> {
        self.copy_object(bucket, name, bucket, new_name).await?;
        self.delete_object(bucket, name).await
    }

    /// Concatenate sources server-side via a multipart upload where every
    /// part is an `UploadPartCopy` of one source. S3 requires non-final
    /// parts to be at least 5 MiB; smaller sources are rejected by the
    /// service and surface as `Backend` errors.
    pub async fn concat_objects(
        &self,
        bucket: &str,
        destination_name: &str,
        sources: &[String],
    ) -> Result<()> {
        if sources.len() > self.max_concat_sources() {
            return Err(Error::Configuration(format!(
                "concat_objects supports at most {} sources on the s3 backend",
                self.max_concat_sources()
            )));
        }
        for source in sources {
            if !self.object_exists(bucket, source).await? {
                return Err(Error::object_not_found(bucket, source));
            }
        }

        let multipart = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(destination_name)
            .send()
            .await
            .map_err(Error::backend)?;
        let upload_id = multipart
            .upload_id()
            .ok_or_else(|| Error::backend(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "multipart upload created without an upload id",
            )))?
            .to_string();

        match self
            .copy_parts(bucket, destination_name, &upload_id, sources)
            .await
        {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(destination_name)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder().set_parts(Some(parts)).build(),
                    )
                    .send()
                    .await
                    .map_err(Error::backend)?;
                Ok(())
            }
            Err(err) => {
                // Best-effort cleanup before surfacing the part-copy error.
                let _ = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(destination_name)
                    .upload_id(&upload_id)
                    .send()
                    .await;
                Err(err)
            }
        }
    }

    async fn copy_parts(
        &self,
        bucket: &str,
        destination_name: &str,
        upload_id: &str,
        sources: &[String],
    ) -> Result<Vec<CompletedPart>> {
        let mut parts = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let part_number = (index + 1) as i32;
            let copied = self
                .client
                .upload_part_copy()
                .bucket(bucket)
                .key(destination_name)
                .upload_id(upload_id)
                .part_number(part_number)
                .copy_source(copy_source(bucket, source))
                .send()
                .await
                .map_err(Error::backend)?;
            let etag = copied
                .copy_part_result()
                .and_then(|r| r.e_tag())
                .unwrap_or_default()
                .to_string();
            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(etag)
                    .build(),
            );
        }
        Ok(parts)
    }

    /// Content MD5 as lowercase hex. Computed from the downloaded bytes:
    /// S3 ETags of multipart uploads are not content digests.
    pub async fn md5_checksum(&self, bucket: &str, name: &str) -> Result<String> {
        let data = self.get_object(bucket, name).await?;
        let mut hasher = Md5::new();
        hasher.update(&data);
        Ok(hex::encode(hasher.finalize()))
    }

    pub async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<ObjectStream> {
        if !self.bucket_exists(bucket).await? {
            return Err(Error::bucket_not_found(bucket));
        }

        struct PageState {
            token: Option<String>,
            done: bool,
        }

        let client = self.client.clone();
        let bucket = bucket.to_string();
        let prefix = prefix.map(str::to_string);
        let pages = stream::try_unfold(
            PageState {
                token: None,
                done: false,
            },
            move |mut state| {
                let client = client.clone();
                let bucket = bucket.clone();
                let prefix = prefix.clone();
                async move {
                    if state.done {
                        return Ok(None);
                    }
                    let mut request = client.list_objects_v2().bucket(&bucket);
                    if let Some(prefix) = &prefix {
                        request = request.prefix(prefix);
                    }
                    if let Some(token) = &state.token {
                        request = request.continuation_token(token);
                    }
                    let response = request.send().await.map_err(Error::backend)?;
                    state.token = response.next_continuation_token().map(str::to_string);
                    state.done = state.token.is_none();
                    let page: Vec<Result<StorageObject>> = response
                        .contents()
                        .iter()
                        .map(|object| {
                            Ok(StorageObject {
                                name: object.key().unwrap_or_default().to_string(),
                                size: object.size().unwrap_or(0).max(0) as u64,
                                last_modified: object.last_modified().and_then(to_chrono),
                            })
                        })
                        .collect();
                    Ok(Some((stream::iter(page), state)))
                }
            },
        )
        .try_flatten();

        Ok(Box::pin(pages))
    }

    /// Generate a signed URL. The URL is always cryptographically signed;
    /// `use_hostname` and `secure` rewrite the host and scheme afterwards
    /// so callers outside the emulator network can reach the advertised
    /// host.
    pub async fn get_presigned_url(
        &self,
        bucket: &str,
        name: &str,
        method: HttpMethod,
        options: PresignOptions,
    ) -> Result<String> {
        if !self.bucket_exists(bucket).await? {
            return Err(Error::bucket_not_found(bucket));
        }
        if method == HttpMethod::Get && !self.object_exists(bucket, name).await? {
            return Err(Error::object_not_found(bucket, name));
        }

        let presign = PresigningConfig::expires_in(options.expiry()).map_err(Error::backend)?;
        let url = match method {
            HttpMethod::Get => self
                .client
                .get_object()
                .bucket(bucket)
                .key(name)
                .presigned(presign)
                .await
                .map_err(Error::backend)?
                .uri()
                .to_string(),
            HttpMethod::Put => {
                let mut request = self.client.put_object().bucket(bucket).key(name);
                if let Some(content_type) = &options.content_type {
                    request = request.content_type(content_type);
                }
                request
                    .presigned(presign)
                    .await
                    .map_err(Error::backend)?
                    .uri()
                    .to_string()
            }
            HttpMethod::Delete => self
                .client
                .delete_object()
                .bucket(bucket)
                .key(name)
                .presigned(presign)
                .await
                .map_err(Error::backend)?
                .uri()
                .to_string(),
            HttpMethod::Head => self
                .client
                .head_object()
                .bucket(bucket)
                .key(name)
                .presigned(presign)
                .await
                .map_err(Error::backend)?
                .uri()
                .to_string(),
            HttpMethod::Post => {
                return Err(Error::Configuration(
                    "POST presigning is not supported by the s3 backend".to_string(),
                ))
            }
        };

        // Host replacement is opt-in here, unlike the GCS adapter where it
        // runs whenever emulator and external hostnames differ. Giving
        // `use_hostname` substitutes that host; giving only `secure`
        // substitutes the configured external hostname alongside the
        // scheme change.
        let hostname = options.use_hostname.as_deref().or_else(|| {
            options
                .secure
                .and(self.config.external_hostname.as_deref())
        });
        apply_url_overrides(&url, hostname, options.secure)
    }

    pub fn max_concat_sources(&self) -> usize {
        S3_MAX_CONCAT_SOURCES
    }
}

fn copy_source(bucket: &str, name: &str) -> String {
    format!("{}/{}", bucket, urlencoding::encode(name))
}

fn to_chrono(timestamp: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

/// Rewrite host and scheme of a generated URL. `hostname` may carry a
/// port (`host:port`).
fn apply_url_overrides(
    url: &str,
    hostname: Option<&str>,
    secure: Option<bool>,
) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(Error::backend)?;
    if let Some(secure) = secure {
        let scheme = if secure { "https" } else { "http" };
        parsed.set_scheme(scheme).map_err(|_| {
            Error::backend(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot set url scheme to {}", scheme),
            ))
        })?;
    }
    if let Some(hostname) = hostname {
        let (host, port) = match hostname.rsplit_once(':') {
            Some((host, port)) if port.parse::<u16>().is_ok() => {
                (host, Some(port.parse::<u16>().unwrap_or_default()))
            }
            _ => (hostname, None),
        };
        parsed.set_host(Some(host)).map_err(Error::backend)?;
        parsed.set_port(port).map_err(|_| {
            Error::backend(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "cannot set url port",
            ))
        })?;
    }
    Ok(parsed.to_string())
}
