//! Read-only access to the remote bucket holding the HSD segment files.
//!
//! The NOAA open data bucket is public, so requests are sent unsigned. Any
//! other `ObjectStore` (a MinIO mirror, or an in-memory store in tests) can be
//! plugged in with [`RemoteStore::from_store`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ClientOptions, ObjectStore, RetryConfig};
use tracing::{debug, instrument};

use himawari_common::RemoteConfig;

use crate::error::{StorageError, StorageResult};

/// Anything objects can be fetched from by path.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Fetch a whole object; a missing object must be reported as
    /// [`StorageError::NotFound`].
    async fn fetch(&self, path: &str) -> StorageResult<Bytes>;
}

/// Remote object store client.
#[derive(Clone)]
pub struct RemoteStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl RemoteStore {
    /// Create an anonymous S3 client for the configured bucket.
    pub fn new(config: &RemoteConfig) -> StorageResult<Self> {
        let client_options = ClientOptions::new()
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
            .with_connect_timeout(Duration::from_secs(30));

        // Retries are driven by the fetcher so absent keys fail fast
        let retry = RetryConfig {
            max_retries: 0,
            retry_timeout: Duration::from_secs(config.request_timeout_secs),
            ..RetryConfig::default()
        };

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_skip_signature(true)
            .with_client_options(client_options)
            .with_retry(retry);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self::from_store(Arc::new(store), config.bucket.clone()))
    }

    /// Wrap an existing store.
    pub fn from_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fetch a whole object.
    ///
    /// A missing object is reported as [`StorageError::NotFound`]; every other
    /// failure is [`StorageError::Transport`].
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn fetch(&self, path: &str) -> StorageResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| classify(path, e))?;

        let bytes = result.bytes().await.map_err(|e| classify(path, e))?;

        debug!(size = bytes.len(), "Fetched object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(classify(path, e)),
        }
    }
}

#[async_trait]
impl ObjectSource for RemoteStore {
    async fn fetch(&self, path: &str) -> StorageResult<Bytes> {
        RemoteStore::fetch(self, path).await
    }
}

fn classify(path: &str, err: object_store::Error) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
        other => StorageError::Transport {
            path: path.to_string(),
            message: other.to_string(),
        },
    }
}
