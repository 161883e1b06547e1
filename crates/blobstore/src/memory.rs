//! In-memory store (for testing and demos)

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{ObjectMeta, ObjectStore, Result, StoreError, StoredObject};

type Bucket = BTreeMap<String, StoredObject>;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given buckets already created.
    pub fn with_buckets(names: &[&str]) -> Self {
        let buckets = names
            .iter()
            .map(|n| (n.to_string(), Bucket::new()))
            .collect();
        Self {
            buckets: Arc::new(RwLock::new(buckets)),
        }
    }

    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        self.get(bucket, key).await.map(|o| o.meta)
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        let meta = ObjectMeta {
            key: key.to_string(),
            size: body.len() as u64,
            last_modified: Some(Utc::now()),
            content_type: Some(content_type.to_string()),
            is_dir: false,
        };
        objects.insert(key.to_string(), StoredObject { meta, body });
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn list(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Vec<ObjectMeta>> {
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;

        let mut out: Vec<ObjectMeta> = Vec::new();
        for (key, obj) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else { break };

            if !recursive {
                if let Some(idx) = rest.find('/') {
                    let dir = format!("{prefix}{}", &rest[..=idx]);
                    if out.last().map(|m| m.key.as_str()) != Some(dir.as_str()) {
                        out.push(ObjectMeta::dir(dir));
                    }
                    continue;
                }
            }
            out.push(obj.meta.clone());
        }
        Ok(out)
    }
}
