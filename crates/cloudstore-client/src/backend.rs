//! Object backend implementations

use async_trait::async_trait;
use bytes::Bytes;
use cloudstore_core::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// The list/get/put primitives an [`ObjectStore`](crate::ObjectStore) delegates to
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// List every key in the bucket, in backend order
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>>;

    /// Retrieve object data
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Store object data, replacing any existing value
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()>;
}

/// In-memory backend
///
/// Keys are listed in lexicographic order, matching S3 listing order.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, Bytes>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        self.create_bucket(bucket);
        self
    }

    /// Create an empty bucket; existing buckets are left untouched
    pub fn create_bucket(&self, bucket: impl Into<String>) {
        self.buckets.write().entry(bucket.into()).or_default();
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map_or(0, |objects| objects.len())
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>> {
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| Error::NoSuchBucket(bucket.to_string()))?;

        Ok(objects.keys().cloned().collect())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| Error::NoSuchBucket(bucket.to_string()))?;

        objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NoSuchKey(key.to_string()))
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::NoSuchBucket(bucket.to_string()))?;

        debug!("Stored object {}/{} ({} bytes)", bucket, key, data.len());
        objects.insert(key.to_string(), data);
        Ok(())
    }
}
