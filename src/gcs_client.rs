use crate::config::{ensure_scheme, GcsConfig};
use crate::error::{Error, Result};
use crate::types::{HttpMethod, ObjectStream, PresignOptions, StorageObject};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, TryStreamExt};
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::buckets::delete::DeleteBucketRequest;
use google_cloud_storage::http::buckets::get::GetBucketRequest;
use google_cloud_storage::http::buckets::insert::{
    BucketCreationConfig, InsertBucketParam, InsertBucketRequest,
};
use google_cloud_storage::http::objects::compose::{ComposeObjectRequest, ComposingTargets};
use google_cloud_storage::http::objects::SourceObjects;
use google_cloud_storage::http::objects::copy::CopyObjectRequest;
use google_cloud_storage::http::objects::delete::DeleteObjectRequest;
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::list::ListObjectsRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::http::Error as GcsHttpError;
use google_cloud_storage::sign::{SignedURLMethod, SignedURLOptions};
use md5::{Digest, Md5};

/// GCS compose accepts at most 32 source objects per call
const GCS_MAX_CONCAT_SOURCES: usize = 32;

/// Client for GCS-compatible backends (Google Cloud Storage,
/// fake-gcs-server, ...)
#[derive(Clone)]
pub struct GcsClient {
    client: Client,
    config: GcsConfig,
    project_id: String,
    /// Emulators cannot validate signatures, so public unsigned URLs are
    /// substituted for signed ones
    use_public_urls: bool,
}

impl GcsClient {
    /// Configure the adapter: validate required settings and build the
    /// vendor SDK client. Against an emulator, authentication is skipped
    /// and URL signing is disabled.
    pub async fn connect(config: GcsConfig) -> Result<Self> {
        let project_id = config.project_id.clone().ok_or_else(|| {
            Error::Configuration(
                "gcs client requires that the GOOGLE_CLOUD_PROJECT env variable is present"
                    .to_string(),
            )
        })?;

        let use_public_urls = config.emulator_host.is_some();
        let client_config = if let Some(emulator) = &config.emulator_host {
            tracing::debug!("will not sign urls due to presence of STORAGE_EMULATOR_HOST");
            let mut anonymous = ClientConfig::default().anonymous();
            anonymous.storage_endpoint = ensure_scheme(emulator, "http");
            anonymous
        } else {
            ClientConfig::default()
                .with_auth()
                .await
                .map_err(|e| Error::Configuration(e.to_string()))?
        };

        Ok(Self {
            client: Client::new(client_config),
            config,
            project_id,
            use_public_urls,
        })
    }

    pub async fn bucket_exists(&self, name: &str) -> Result<bool> {
        match self
            .client
            .get_bucket(&GetBucketRequest {
                bucket: name.to_string(),
                ..Default::default()
            })
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(Error::backend(err)),
        }
    }

    pub async fn make_bucket(&self, name: &str) -> Result<()> {
        if self.bucket_exists(name).await? {
            return Err(Error::bucket_already_exists(name));
        }
        self.client
            .insert_bucket(&InsertBucketRequest {
                name: name.to_string(),
                param: InsertBucketParam {
                    project: self.project_id.clone(),
                    ..Default::default()
                },
                bucket: BucketCreationConfig::default(),
            })
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    /// Delete a bucket. GCS rejects deletion of non-empty buckets with
    /// HTTP 409; that surfaces as a `Backend` error.
    pub async fn remove_bucket(&self, name: &str) -> Result<()> {
        if !self.bucket_exists(name).await? {
            return Err(Error::bucket_not_found(name));
        }
        self.client
            .delete_bucket(&DeleteBucketRequest {
                bucket: name.to_string(),
                ..Default::default()
            })
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
            .get_object(&GetObjectRequest {
                bucket: bucket.to_string(),
                object: name.to_string(),
                ..Default::default()
            })
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(Error::backend(err)),
        }
    }

    /// Write an object. The declared size is ignored; the GCS upload
    /// derives the length from the payload itself.
    pub async fn put_object(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        _size: u64,
    ) -> Result<()> {
        if !self.bucket_exists(bucket).await? {
            return Err(Error::bucket_not_found(bucket));
        }
        let upload_type = UploadType::Simple(Media::new(name.to_string()));
        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: bucket.to_string(),
                    ..Default::default()
                },
                data,
                &upload_type,
            )
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    pub async fn get_object(&self, bucket: &str, name: &str) -> Result<Bytes> {
        if !self.object_exists(bucket, name).await? {
            return Err(Error::object_not_found(bucket, name));
        }
        let data = self
            .client
            .download_object(
                &GetObjectRequest {
                    bucket: bucket.to_string(),
                    object: name.to_string(),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
            .map_err(Error::backend)?;
        Ok(Bytes::from(data))
    }

    pub async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        if !self.bucket_exists(bucket).await? {
            return Err(Error::bucket_not_found(bucket));
        }
        self.client
            .delete_object(&DeleteObjectRequest {
                bucket: bucket.to_string(),
                object: name.to_string(),
                ..Default::default()
            })
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
            .copy_object(&CopyObjectRequest {
                source_bucket: source_bucket.to_string(),
                source_object: source_name.to_string(),
                destination_bucket: destination_bucket.to_string(),
                destination_object: destination_name.to_string(),
                ..Default::default()
            })
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    pub async fn rename_object(&self, bucket: &str, name: &str, new_name: &str) -> Result<()> {
        self.copy_object(bucket, name, bucket, new_name).await?;
        self.delete_object(bucket, name).await
    }

    /// Concatenate sources server-side via the native compose operation.
    /// GCS limits one compose call to 32 sources.
    pub async fn concat_objects(
        &self,
        bucket: &str,
        destination_name: &str,
        sources: &[String],
    ) -> Result<()> {
        if sources.len() > self.max_concat_sources() {
            return Err(Error::Configuration(format!(
                "concat_objects supports at most {} sources on the gcs backend",
                self.max_concat_sources()
            )));
        }
        for source in sources {
            if !self.object_exists(bucket, source).await? {
                return Err(Error::object_not_found(bucket, source));
            }
        }
        self.client
            .compose_object(&ComposeObjectRequest {
                bucket: bucket.to_string(),
                destination_object: destination_name.to_string(),
                composing_targets: ComposingTargets {
                    source_objects: sources
                        .iter()
                        .map(|name| SourceObjects {
                            name: name.clone(),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    /// Content MD5 as lowercase hex. GCS stores the digest alongside the
    /// object; downloading is only the fallback when the metadata lacks
    /// it.
    pub async fn md5_checksum(&self, bucket: &str, name: &str) -> Result<String> {
        if !self.object_exists(bucket, name).await? {
            return Err(Error::object_not_found(bucket, name));
        }
        let metadata = self
            .client
            .get_object(&GetObjectRequest {
                bucket: bucket.to_string(),
                object: name.to_string(),
                ..Default::default()
            })
            .await
            .map_err(Error::backend)?;
        if let Some(encoded) = metadata.md5_hash.as_deref() {
            if let Ok(raw) = BASE64.decode(encoded) {
                return Ok(hex::encode(raw));
            }
        }
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
                    let response = client
                        .list_objects(&ListObjectsRequest {
                            bucket: bucket.clone(),
                            prefix: prefix.clone(),
                            page_token: state.token.take(),
                            ..Default::default()
                        })
                        .await
                        .map_err(Error::backend)?;
                    state.token = response.next_page_token.clone();
                    state.done = state.token.is_none();
                    let page: Vec<Result<StorageObject>> = response
                        .items
                        .unwrap_or_default()
                        .into_iter()
                        .map(|object| {
                            Ok(StorageObject {
                                size: object.size.max(0) as u64,
                                last_modified: object.updated.and_then(|t| {
                                    DateTime::<Utc>::from_timestamp(
                                        t.unix_timestamp(),
                                        t.nanosecond(),
                                    )
                                }),
                                name: object.name,
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

    /// Generate a presigned URL. Against a real endpoint the URL is V4
    /// signed with the given method, expiry and content type. Against an
    /// emulator, signing is skipped and a public URL is returned with the
    /// emulator hostname replaced by the external hostname whenever the
    /// two differ.
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

        if self.use_public_urls {
            return Ok(self.public_url(bucket, name));
        }

        let signed = SignedURLOptions {
            method: signed_url_method(method),
            expires: options.expiry(),
            content_type: options.content_type.clone(),
            ..Default::default()
        };
        self.client
            .signed_url(bucket, name, None, None, signed)
            .await
            .map_err(Error::backend)
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        // The emulator host always exists here: public URLs are only used
        // when one is configured.
        let emulator = self.config.emulator_host.as_deref().unwrap_or_default();
        // Percent-encode the object name but keep path separators, the
        // way public GCS URLs render nested names.
        let encoded = urlencoding::encode(name).replace("%2F", "/");
        let url = format!("{}/{}/{}", ensure_scheme(emulator, "http"), bucket, encoded);
        match self.config.effective_external_hostname() {
            Some(external) => substitute_hostname(&url, emulator, external),
            None => url,
        }
    }

    pub fn max_concat_sources(&self) -> usize {
        GCS_MAX_CONCAT_SOURCES
    }
}

fn is_not_found(err: &GcsHttpError) -> bool {
    matches!(err, GcsHttpError::Response(response) if response.code == 404)
}

fn signed_url_method(method: HttpMethod) -> SignedURLMethod {
    match method {
        HttpMethod::Get => SignedURLMethod::GET,
        HttpMethod::Put => SignedURLMethod::PUT,
        HttpMethod::Post => SignedURLMethod::POST,
        HttpMethod::Delete => SignedURLMethod::DELETE,
        HttpMethod::Head => SignedURLMethod::HEAD,
    }
}

/// Textual hostname substitution, scheme left untouched
fn substitute_hostname(url: &str, emulator: &str, external: &str) -> String {
    let emulator = strip_scheme(emulator);
    let external = strip_scheme(external);
    if emulator == external {
        url.to_string()
    } else {
        url.replace(emulator, external)
    }
}

fn strip_scheme(host: &str) -> &str {
    host.trim_start_matches("http://").trim_start_matches("https://")
}
