//! Bucket-bound object store client

use crate::backend::ObjectBackend;
use crate::cos::CosBackend;
use bytes::Bytes;
use cloudstore_core::{Error, Result, StoreConfig, MAX_KEY_LENGTH};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// List, read and write objects in the configured bucket.
///
/// Every failure is logged and returned; an empty listing is `Ok(vec![])`,
/// never an error.
#[derive(Clone)]
pub struct ObjectStore {
    config: StoreConfig,
    backend: Arc<dyn ObjectBackend>,
}

impl ObjectStore {
    /// Connect to Cloud Object Storage. No request is made until the first operation.
    pub fn connect(config: StoreConfig) -> Result<Self> {
        let backend = CosBackend::new(&config)?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    pub fn with_backend(config: StoreConfig, backend: Arc<dyn ObjectBackend>) -> Self {
        Self { config, backend }
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket_name
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Every key in the bucket, in the order the service returns them
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        debug!("Retrieving bucket contents from {}", self.bucket());

        self.backend
            .list_keys(self.bucket())
            .await
            .inspect_err(|e| {
                warn!(bucket = %self.bucket(), error = %e, "Unable to retrieve bucket contents");
            })
    }

    pub async fn get_item(&self, key: &str) -> Result<Bytes> {
        check_key(key)?;
        debug!("Retrieving item from bucket {}, key {}", self.bucket(), key);

        self.backend
            .get_object(self.bucket(), key)
            .await
            .inspect_err(|e| {
                warn!(bucket = %self.bucket(), key = %key, error = %e, "Unable to retrieve item");
            })
    }

    /// Write `content` at `key`, replacing whatever was there
    pub async fn create_item(&self, key: &str, content: impl Into<Bytes>) -> Result<()> {
        check_key(key)?;
        let content = content.into();
        info!("Creating new item: {} ({} bytes)", key, content.len());

        self.backend
            .put_object(self.bucket(), key, content)
            .await
            .inspect_err(|e| {
                warn!(bucket = %self.bucket(), key = %key, error = %e, "Unable to create item");
            })
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::MalformedRequest("object key is empty".into()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(Error::MalformedRequest(format!(
            "object key is {} bytes, limit is {}",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
