//! Per-product firmware manifest stored as one JSON blob.
//!
//! The blob at [`manifest_key`] holds the whole entry list. Every mutation
//! re-reads it, edits the list and overwrites the blob; mutations for the same
//! product are serialized through [`ProductLocks`] so two uploads in this
//! process cannot drop each other's entry. The blob store offers no
//! conditional writes, so several bridge instances can still race.

use std::sync::Arc;

use blobstore::ObjectStore;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info, warn};

use crate::error::{FirmwareError, Result};
use crate::locks::ProductLocks;
use crate::schema::{image_key, image_url, manifest_key, FirmwareEntry, NewFirmware, Version};

const MANIFEST_CONTENT_TYPE: &str = "application/json";
const UPLOAD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn encode_manifest(entries: &[FirmwareEntry]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(entries).map_err(|e| FirmwareError::Encode(e.to_string()))
}

/// Empty bodies and a JSON `null` both decode to an empty list.
pub fn decode_manifest(key: &str, bytes: &[u8]) -> Result<Vec<FirmwareEntry>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(vec![]);
    }
    serde_json::from_slice::<Option<Vec<FirmwareEntry>>>(bytes)
        .map(Option::unwrap_or_default)
        .map_err(|e| FirmwareError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// First entry for the product; the manifest blob was created.
    Created(FirmwareEntry),
    Appended(FirmwareEntry),
    /// `(product_name, version)` was already listed; holds the existing entry.
    Duplicate(FirmwareEntry),
}

impl AppendOutcome {
    pub fn entry(&self) -> &FirmwareEntry {
        match self {
            AppendOutcome::Created(e) | AppendOutcome::Appended(e) | AppendOutcome::Duplicate(e) => e,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    NoManifest,
    NoMatch,
    Removed {
        entry: FirmwareEntry,
        manifest_removed: bool,
        image_removed: bool,
    },
}

pub struct ManifestManager {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    offset: FixedOffset,
    locks: ProductLocks,
}

impl ManifestManager {
    /// `offset` is the fixed zone `upload_time` is rendered in.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, offset: FixedOffset) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            offset,
            locks: ProductLocks::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn append(&self, new: NewFirmware) -> Result<AppendOutcome> {
        self.append_at(new, Utc::now()).await
    }

    /// Same as [`append`](Self::append) with an explicit clock reading.
    pub async fn append_at(&self, new: NewFirmware, now: DateTime<Utc>) -> Result<AppendOutcome> {
        validate_product(&new.product_name)?;
        new.version
            .parse::<Version>()
            .map_err(FirmwareError::InvalidInput)?;

        let _guard = self.locks.lock(&new.product_name).await;
        self.require_bucket().await?;

        let key = manifest_key(&new.product_name);
        let existing = self.load(&key).await?;
        let created = existing.is_none();
        let mut entries = existing.unwrap_or_default();

        if let Some(dup) = entries
            .iter()
            .find(|e| e.product_name == new.product_name && e.version == new.version)
        {
            info!(product = %new.product_name, version = %new.version, "firmware already listed, manifest unchanged");
            return Ok(AppendOutcome::Duplicate(dup.clone()));
        }

        // Ids are epoch seconds; bump past any id already taken in this manifest.
        let mut id = now.timestamp();
        while entries.iter().any(|e| e.id == id.to_string()) {
            id += 1;
        }

        let entry = FirmwareEntry {
            id: id.to_string(),
            url: image_url(&self.bucket, &new.product_name, &new.version),
            upload_time: now.with_timezone(&self.offset).format(UPLOAD_TIME_FORMAT).to_string(),
            product_name: new.product_name,
            version: new.version,
            upload_user: new.upload_user,
        };
        entries.push(entry.clone());
        self.save(&key, &entries).await?;

        info!(product = %entry.product_name, version = %entry.version, id = %entry.id, entries = entries.len(), "firmware manifest updated");
        Ok(if created {
            AppendOutcome::Created(entry)
        } else {
            AppendOutcome::Appended(entry)
        })
    }

    pub async fn delete(&self, id: &str, product_name: &str) -> Result<DeleteOutcome> {
        validate_product(product_name)?;

        let _guard = self.locks.lock(product_name).await;
        self.require_bucket().await?;

        let key = manifest_key(product_name);
        let Some(entries) = self.load(&key).await? else {
            debug!(product = product_name, "no manifest, nothing to delete");
            return Ok(DeleteOutcome::NoManifest);
        };

        let (removed, kept): (Vec<FirmwareEntry>, Vec<FirmwareEntry>) = entries
            .into_iter()
            .partition(|e| e.id == id && e.product_name == product_name);

        let Some(entry) = removed.into_iter().next() else {
            info!(product = product_name, id, "firmware entry not found, manifest unchanged");
            return Ok(DeleteOutcome::NoMatch);
        };

        let manifest_removed = kept.is_empty();
        if manifest_removed {
            match self.store.remove(&self.bucket, &key).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            info!(product = product_name, "last firmware entry removed, manifest deleted");
        } else {
            self.save(&key, &kept).await?;
            info!(product = product_name, id, entries = kept.len(), "firmware entry removed");
        }

        let image = image_key(&entry.product_name, &entry.version);
        let image_removed = match self.store.remove(&self.bucket, &image).await {
            Ok(()) => {
                info!(key = %image, "firmware image deleted");
                true
            }
            Err(e) if e.is_not_found() => {
                warn!(key = %image, "firmware image already absent, manifest entry removed anyway");
                false
            }
            Err(e) => return Err(e.into()),
        };

        Ok(DeleteOutcome::Removed {
            entry,
            manifest_removed,
            image_removed,
        })
    }

    /// Missing manifest reads as an empty list.
    pub async fn list(&self, product_name: &str) -> Result<Vec<FirmwareEntry>> {
        validate_product(product_name)?;
        let key = manifest_key(product_name);
        Ok(self.load(&key).await?.unwrap_or_default())
    }

    async fn require_bucket(&self) -> Result<()> {
        if self.store.bucket_exists(&self.bucket).await? {
            Ok(())
        } else {
            Err(FirmwareError::StorageUnavailable(self.bucket.clone()))
        }
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<FirmwareEntry>>> {
        match self.store.get(&self.bucket, key).await {
            Ok(obj) => decode_manifest(key, &obj.body).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, entries: &[FirmwareEntry]) -> Result<()> {
        let body = encode_manifest(entries)?;
        self.store
            .put(&self.bucket, key, Bytes::from(body), MANIFEST_CONTENT_TYPE)
            .await
            .map_err(|e| FirmwareError::Upload {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Product names become a key segment: non-blank, no `/`.
pub fn validate_product(product_name: &str) -> Result<()> {
    if product_name.trim().is_empty() {
        return Err(FirmwareError::InvalidInput("product_name is required".into()));
    }
    if product_name.contains('/') {
        return Err(FirmwareError::InvalidInput(format!(
            "product_name {product_name:?} must not contain '/'"
        )));
    }
    Ok(())
}
