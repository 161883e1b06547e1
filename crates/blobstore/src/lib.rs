//! Object storage seam for the bridge.
//!
//! Everything above this crate talks to an [`ObjectStore`]: a flat blob store
//! addressed by `(bucket, key)` with prefix listing. `S3Store` speaks to MinIO
//! (or any S3 endpoint), `InMemoryStore` backs tests and local demos.

mod error;
mod memory;
mod s3;
mod types;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use s3::{S3Settings, S3Store};
pub use types::{ObjectMeta, StoredObject};

use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Creates the bucket when it is missing.
    async fn ensure_bucket(&self, bucket: &str) -> Result<()>;

    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMeta>;

    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject>;

    /// Overwrites whatever is stored under `key`.
    async fn put(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()>;

    /// Fails with [`StoreError::NotFound`] when the key is absent.
    async fn remove(&self, bucket: &str, key: &str) -> Result<()>;

    /// Lists keys under `prefix`. Non-recursive listings stop at the next `/`
    /// and report each sub-prefix once as a directory entry (`is_dir`, key
    /// ending in `/`).
    async fn list(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Vec<ObjectMeta>>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.stat(bucket, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
