use thiserror::Error;

/// Result type alias for the multicloud-storage crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the multicloud-storage crate
#[derive(Error, Debug)]
pub enum Error {
    /// Required configuration missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Referenced bucket or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bucket creation targeted a name that already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The vendor SDK reported a failure not covered above; the original
    /// cause is preserved as the error source
    #[error("Backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wrap a vendor SDK failure, preserving it as the source
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Backend(Box::new(err))
    }

    pub(crate) fn bucket_not_found(name: &str) -> Self {
        Error::NotFound(format!("bucket {} does not exist", name))
    }

    pub(crate) fn object_not_found(bucket: &str, name: &str) -> Self {
        Error::NotFound(format!(
            "object {} does not exist in bucket {}",
            name, bucket
        ))
    }

    pub(crate) fn bucket_already_exists(name: &str) -> Self {
        Error::AlreadyExists(format!("bucket {} already exists", name))
    }
}
