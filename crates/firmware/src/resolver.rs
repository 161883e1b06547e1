//! Latest-image lookup.
//!
//! Image blobs are named `<product>_<tag>_V<major>.<minor>.<patch>_<YYYYMMDD>.img`.
//! The newest image of a product is the one with the highest version triple,
//! ties broken by the later build date. No manifest is consulted.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use blobstore::ObjectStore;
use regex::Regex;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{FirmwareError, Result};
use crate::schema::{image_prefix, is_firmware_image, LatestFirmware, Version, IMAGE_EXT};

/// A parsed image file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageName {
    pub tag: String,
    pub version: Version,
    /// `YYYYMMDD`; string order is chronological.
    pub date: String,
    pub file_name: String,
}

impl ImageName {
    fn rank(&self) -> (Version, &str) {
        (self.version, &self.date)
    }

    /// `<tag>_V<version>_<date>`
    pub fn newest_version(&self) -> String {
        format!("{}_V{}_{}", self.tag, self.version, self.date)
    }
}

/// Matcher for one product's image names.
pub struct ImagePattern {
    re: Regex,
}

impl ImagePattern {
    pub fn for_product(product_name: &str) -> Result<Self> {
        // ASCII digits only; the extension matches in any case, like uploads do
        let pattern = format!(
            r"^{}_([^_]+)_V([0-9]+)\.([0-9]+)\.([0-9]+)_([0-9]{{8}})(?i:{})$",
            regex::escape(product_name),
            regex::escape(IMAGE_EXT),
        );
        // Only an absurdly long product name can push this past the size limit.
        let re = Regex::new(&pattern).map_err(|e| FirmwareError::InvalidInput(e.to_string()))?;
        Ok(Self { re })
    }

    /// `Ok(None)` when the name does not follow the convention.
    pub fn parse(&self, file_name: &str) -> Result<Option<ImageName>> {
        let Some(caps) = self.re.captures(file_name) else {
            return Ok(None);
        };
        let num = |i: usize| {
            caps[i]
                .parse::<u64>()
                .map_err(|_| FirmwareError::BadVersion(file_name.to_string()))
        };
        Ok(Some(ImageName {
            tag: caps[1].to_string(),
            version: Version {
                major: num(2)?,
                minor: num(3)?,
                patch: num(4)?,
            },
            date: caps[5].to_string(),
            file_name: file_name.to_string(),
        }))
    }
}

/// Picks the highest ranked image; the first one wins a full tie.
pub fn pick_latest(images: &[ImageName]) -> Option<&ImageName> {
    images.iter().reduce(|best, img| if img.rank() > best.rank() { img } else { best })
}

/// Outcome of a multi-product lookup. Failed products land in `errors`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LatestBatch {
    pub latest_firmwares: Vec<LatestFirmware>,
    pub errors: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct FirmwareResolver {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl FirmwareResolver {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub async fn resolve_one(&self, product_name: &str) -> Result<LatestFirmware> {
        let prefix = image_prefix(product_name);
        let pattern = ImagePattern::for_product(product_name)?;

        let listed = self.store.list(&self.bucket, &prefix, false).await?;

        let mut images = Vec::new();
        for meta in listed {
            if meta.is_dir || !is_firmware_image(&meta.key) {
                continue;
            }
            let file_name = meta.key.strip_prefix(&prefix).unwrap_or(&meta.key);
            match pattern.parse(file_name)? {
                Some(img) => images.push(img),
                None => debug!(product = product_name, file = file_name, "skipping image with unexpected name"),
            }
        }

        let latest = pick_latest(&images).ok_or_else(|| FirmwareError::NotFound(product_name.to_string()))?;
        Ok(LatestFirmware {
            product_name: product_name.to_string(),
            newest_version: latest.newest_version(),
        })
    }

    /// Resolves every product concurrently. One product failing never
    /// affects another; result order follows completion order. Dropping the
    /// returned future aborts the lookups still running.
    pub async fn resolve_many(&self, product_names: &[String]) -> LatestBatch {
        let mut tasks = JoinSet::new();
        let mut pending: HashSet<String> = HashSet::new();

        for name in product_names {
            if !pending.insert(name.clone()) {
                continue;
            }
            let resolver = self.clone();
            let name = name.clone();
            tasks.spawn(async move {
                let res = resolver.resolve_one(&name).await;
                (name, res)
            });
        }

        let mut batch = LatestBatch::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(latest))) => {
                    pending.remove(&name);
                    batch.latest_firmwares.push(latest);
                }
                Ok((name, Err(e))) => {
                    pending.remove(&name);
                    warn!(product = %name, error = %e, "latest firmware lookup failed");
                    batch.errors.insert(name, e.to_string());
                }
                Err(e) => warn!(error = %e, "latest firmware task did not complete"),
            }
        }

        // Only tasks that panicked are still pending here.
        for name in pending {
            batch.errors.insert(name, "firmware lookup aborted".to_string());
        }
        batch
    }
}
