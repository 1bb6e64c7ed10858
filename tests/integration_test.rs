//! Integration tests against live emulators.
//!
//! Run with MinIO (S3) and fake-gcs-server (GCS) available:
//!
//! ```text
//! docker run -p 9000:9000 minio/minio server /data
//! docker run -p 4443:4443 fsouza/fake-gcs-server -scheme http
//! cargo test --test integration_test -- --ignored
//! ```

use bytes::Bytes;
use futures::TryStreamExt;
use md5::{Digest, Md5};
use multicloud_storage::{
    Error, GcsConfig, HttpMethod, PresignOptions, S3Config, Storage, StorageBackend,
};
use std::env;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn random_name() -> String {
    format!("t-{}", uuid::Uuid::new_v4().simple())
}

fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

async fn s3_storage() -> Storage {
    init_tracing();
    let config = S3Config {
        endpoint: Some(env::var("S3_ENDPOINT").unwrap_or_else(|_| "localhost:9000".to_string())),
        region: Some("us-east-1".to_string()),
        access_key: Some(env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string())),
        secret_key: Some(env::var("S3_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string())),
        ..Default::default()
    };
    Storage::new(StorageBackend::s3(config).await.unwrap())
}

async fn gcs_storage() -> Storage {
    init_tracing();
    let config = GcsConfig {
        project_id: Some(
            env::var("GOOGLE_CLOUD_PROJECT").unwrap_or_else(|_| "test-project".to_string()),
        ),
        emulator_host: Some(
            env::var("STORAGE_EMULATOR_HOST").unwrap_or_else(|_| "localhost:4443".to_string()),
        ),
        external_hostname: env::var("STORAGE_EXTERNAL_HOSTNAME").ok(),
    };
    Storage::new(StorageBackend::gcs(config).await.unwrap())
}

async fn for_each_backend() -> Vec<(&'static str, Storage)> {
    vec![("s3", s3_storage().await), ("gcs", gcs_storage().await)]
}

// Create a bucket, write a small JSON document, read it back byte-for-byte.
#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_put_get_round_trip() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();

        let data = Bytes::from_static(b"{\"k\":1}");
        let size = data.len() as u64;
        storage.put_object(&bucket, "o1", data.clone(), size).await.unwrap();

        let retrieved = storage.get_object(&bucket, "o1").await.unwrap();
        assert_eq!(retrieved, data, "byte-for-byte round trip on {}", backend);

        storage.delete_object(&bucket, "o1").await.unwrap();
        storage.remove_bucket(&bucket).await.unwrap();
    }
}

// Double bucket creation fails and leaves existence unaffected.
#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_make_bucket_twice_fails() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();
        assert!(storage.bucket_exists(&bucket).await.unwrap());

        let err = storage.make_bucket(&bucket).await.unwrap_err();
        assert!(
            matches!(err, Error::AlreadyExists(_)),
            "expected AlreadyExists on {}, got {:?}",
            backend,
            err
        );
        // A failed make_bucket leaves existence unchanged
        assert!(storage.bucket_exists(&bucket).await.unwrap());

        storage.remove_bucket(&bucket).await.unwrap();
        assert!(!storage.bucket_exists(&bucket).await.unwrap());
    }
}

#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_remove_missing_bucket_fails() {
    for (backend, storage) in for_each_backend().await {
        let err = storage.remove_bucket(&random_name()).await.unwrap_err();
        assert!(
            matches!(err, Error::NotFound(_)),
            "expected NotFound on {}, got {:?}",
            backend,
            err
        );
    }
}

#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_object_lifecycle() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();

        let data = Bytes::from_static(b"lifecycle");
        storage
            .put_object(&bucket, "o1", data.clone(), data.len() as u64)
            .await
            .unwrap();
        assert!(storage.object_exists(&bucket, "o1").await.unwrap());

        storage.delete_object(&bucket, "o1").await.unwrap();
        assert!(
            !storage.object_exists(&bucket, "o1").await.unwrap(),
            "object visible after delete on {}",
            backend
        );

        storage.remove_bucket(&bucket).await.unwrap();
    }
}

// md5_checksum equals the digest of the bytes last written.
#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_md5_checksum_matches_content() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();

        let first = Bytes::from_static(b"first content");
        storage
            .put_object(&bucket, "o1", first.clone(), first.len() as u64)
            .await
            .unwrap();
        assert_eq!(
            storage.md5_checksum(&bucket, "o1").await.unwrap(),
            md5_hex(&first)
        );

        // Overwrite and verify the checksum follows the latest write
        let second = Bytes::from_static(b"second content");
        storage
            .put_object(&bucket, "o1", second.clone(), second.len() as u64)
            .await
            .unwrap();
        assert_eq!(
            storage.md5_checksum(&bucket, "o1").await.unwrap(),
            md5_hex(&second),
            "checksum did not follow overwrite on {}",
            backend
        );

        storage.delete_object(&bucket, "o1").await.unwrap();
        storage.remove_bucket(&bucket).await.unwrap();
    }
}

// A copy is independent of its source.
#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_copy_independence() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();

        let data = Bytes::from_static(b"copy me");
        storage
            .put_object(&bucket, "n1", data.clone(), data.len() as u64)
            .await
            .unwrap();
        storage.copy_object(&bucket, "n1", &bucket, "n2").await.unwrap();

        storage.delete_object(&bucket, "n1").await.unwrap();
        let copy = storage.get_object(&bucket, "n2").await.unwrap();
        assert_eq!(copy, data, "copy mutated by source deletion on {}", backend);

        storage.delete_object(&bucket, "n2").await.unwrap();
        storage.remove_bucket(&bucket).await.unwrap();
    }
}

// Rename flips existence and preserves content.
#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_rename_observable_state() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();

        let data = Bytes::from_static(b"rename me");
        storage
            .put_object(&bucket, "n1", data.clone(), data.len() as u64)
            .await
            .unwrap();
        storage.rename_object(&bucket, "n1", "n2").await.unwrap();

        assert!(!storage.object_exists(&bucket, "n1").await.unwrap());
        assert!(storage.object_exists(&bucket, "n2").await.unwrap());
        assert_eq!(
            storage.get_object(&bucket, "n2").await.unwrap(),
            data,
            "rename changed content on {}",
            backend
        );

        storage.delete_object(&bucket, "n2").await.unwrap();
        storage.remove_bucket(&bucket).await.unwrap();
    }
}

// Concatenation preserves list order. Only exercised on GCS, whose
// compose operation has no minimum source size; S3 requires 5 MiB
// non-final parts.
#[tokio::test]
#[ignore = "Requires running fake-gcs-server instance"]
async fn test_concat_order_gcs() {
    let storage = gcs_storage().await;
    let bucket = random_name();
    storage.make_bucket(&bucket).await.unwrap();

    let first = Bytes::from_static(b"hello ");
    let second = Bytes::from_static(b"world");
    storage
        .put_object(&bucket, "n1", first.clone(), first.len() as u64)
        .await
        .unwrap();
    storage
        .put_object(&bucket, "n2", second.clone(), second.len() as u64)
        .await
        .unwrap();

    storage
        .concat_objects(&bucket, "dest", &["n1".to_string(), "n2".to_string()])
        .await
        .unwrap();
    let combined = storage.get_object(&bucket, "dest").await.unwrap();
    assert_eq!(combined, Bytes::from_static(b"hello world"));

    for name in ["n1", "n2", "dest"] {
        storage.delete_object(&bucket, name).await.unwrap();
    }
    storage.remove_bucket(&bucket).await.unwrap();
}

// The missing-source pre-check runs before any upload starts, so it is
// exercised on both backends.
#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_concat_missing_source_fails() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();

        let err = storage
            .concat_objects(&bucket, "dest", &["missing".to_string()])
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::NotFound(_)),
            "expected NotFound on {}, got {:?}",
            backend,
            err
        );
        assert!(
            !storage.object_exists(&bucket, "dest").await.unwrap(),
            "destination created despite missing source on {}",
            backend
        );

        storage.remove_bucket(&bucket).await.unwrap();
    }
}

// Concatenation preserves list order on S3. Non-final multipart parts
// must be at least 5 MiB, so the sources are sized accordingly.
#[tokio::test]
#[ignore = "Requires running MinIO instance"]
async fn test_concat_order_s3() {
    const PART_SIZE: usize = 5 * 1024 * 1024;

    let storage = s3_storage().await;
    let bucket = random_name();
    storage.make_bucket(&bucket).await.unwrap();

    let first = Bytes::from(vec![b'a'; PART_SIZE]);
    let second = Bytes::from(vec![b'b'; 16]);
    storage
        .put_object(&bucket, "n1", first.clone(), first.len() as u64)
        .await
        .unwrap();
    storage
        .put_object(&bucket, "n2", second.clone(), second.len() as u64)
        .await
        .unwrap();

    storage
        .concat_objects(&bucket, "dest", &["n1".to_string(), "n2".to_string()])
        .await
        .unwrap();
    let combined = storage.get_object(&bucket, "dest").await.unwrap();
    assert_eq!(combined.len(), PART_SIZE + 16);
    assert!(combined[..PART_SIZE].iter().all(|b| *b == b'a'));
    assert!(combined[PART_SIZE..].iter().all(|b| *b == b'b'));

    for name in ["n1", "n2", "dest"] {
        storage.delete_object(&bucket, name).await.unwrap();
    }
    storage.remove_bucket(&bucket).await.unwrap();
}

// One written object yields exactly one descriptor.
#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_list_objects_descriptor() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();

        let data = Bytes::from_static(b"list me");
        storage
            .put_object(&bucket, "o1", data.clone(), data.len() as u64)
            .await
            .unwrap();

        let objects: Vec<_> = storage
            .list_objects(&bucket, None)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(objects.len(), 1, "unexpected listing on {}", backend);
        assert_eq!(objects[0].name, "o1");
        assert_eq!(objects[0].size, data.len() as u64);

        // Prefix filtering
        let objects: Vec<_> = storage
            .list_objects(&bucket, Some("nope"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(objects.is_empty());

        storage.delete_object(&bucket, "o1").await.unwrap();
        storage.remove_bucket(&bucket).await.unwrap();
    }
}

#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_list_objects_missing_bucket_fails() {
    for (backend, storage) in for_each_backend().await {
        let err = storage
            .list_objects(&random_name(), None)
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(
            matches!(err, Error::NotFound(_)),
            "expected NotFound on {}, got {:?}",
            backend,
            err
        );
    }
}

// A presigned GET on a missing object reports NotFound.
#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_presigned_get_missing_object_fails() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        storage.make_bucket(&bucket).await.unwrap();

        let err = storage
            .get_presigned_url(&bucket, "missing", HttpMethod::Get, PresignOptions::default())
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::NotFound(_)),
            "expected NotFound on {}, got {:?}",
            backend,
            err
        );

        storage.remove_bucket(&bucket).await.unwrap();
    }
}

#[tokio::test]
#[ignore = "Requires running MinIO instance"]
async fn test_s3_presigned_url_binds_method_and_expiry() {
    let storage = s3_storage().await;
    let bucket = random_name();
    storage.make_bucket(&bucket).await.unwrap();

    let data = Bytes::from_static(b"signed");
    storage
        .put_object(&bucket, "o1", data.clone(), data.len() as u64)
        .await
        .unwrap();

    let url = storage
        .get_presigned_url(
            &bucket,
            "o1",
            HttpMethod::Get,
            PresignOptions {
                expires: Some(Duration::from_secs(300)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(url.contains(&bucket));
    assert!(url.contains("X-Amz-Expires=300"));
    assert!(url.contains("X-Amz-Signature="));

    // PUT URLs can be generated for objects that do not exist yet
    let upload_url = storage
        .get_presigned_url(&bucket, "new-object", HttpMethod::Put, PresignOptions::default())
        .await
        .unwrap();
    assert!(upload_url.contains("new-object"));

    storage.delete_object(&bucket, "o1").await.unwrap();
    storage.remove_bucket(&bucket).await.unwrap();
}

// With emulator and external hostnames configured to differ,
// the generated URL carries the external hostname.
#[tokio::test]
#[ignore = "Requires running fake-gcs-server instance"]
async fn test_gcs_presigned_url_uses_external_hostname() {
    let emulator =
        env::var("STORAGE_EMULATOR_HOST").unwrap_or_else(|_| "localhost:4443".to_string());
    let config = GcsConfig {
        project_id: Some("test-project".to_string()),
        emulator_host: Some(emulator.clone()),
        external_hostname: Some("storage.example.com".to_string()),
    };
    let storage = Storage::new(StorageBackend::gcs(config).await.unwrap());

    let bucket = random_name();
    storage.make_bucket(&bucket).await.unwrap();
    let data = Bytes::from_static(b"public");
    storage
        .put_object(&bucket, "o1", data.clone(), data.len() as u64)
        .await
        .unwrap();

    let url = storage
        .get_presigned_url(&bucket, "o1", HttpMethod::Get, PresignOptions::default())
        .await
        .unwrap();
    assert!(
        url.contains("storage.example.com"),
        "external hostname missing from {}",
        url
    );
    assert!(!url.contains(&emulator), "emulator hostname leaked into {}", url);

    storage.delete_object(&bucket, "o1").await.unwrap();
    storage.remove_bucket(&bucket).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires running MinIO and fake-gcs-server instances"]
async fn test_object_operations_require_bucket() {
    for (backend, storage) in for_each_backend().await {
        let bucket = random_name();
        let data = Bytes::from_static(b"x");

        let err = storage
            .put_object(&bucket, "o1", data, 1)
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::NotFound(_)),
            "put_object on missing bucket not rejected on {}",
            backend
        );

        let err = storage.object_exists(&bucket, "o1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = storage.delete_object(&bucket, "o1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
