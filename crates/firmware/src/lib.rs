//! Firmware bookkeeping on top of an object store.
//!
//! Two pieces live here: the per-product JSON manifest (`ManifestManager`)
//! and the latest-image lookup that ranks image blobs by the version and
//! build date encoded in their names (`FirmwareResolver`).

pub mod error;
pub mod locks;
pub mod manifest;
pub mod resolver;
pub mod schema;

pub use error::{FirmwareError, Result};
pub use locks::{ProductGuard, ProductLocks};
pub use manifest::{decode_manifest, encode_manifest, validate_product, AppendOutcome, DeleteOutcome, ManifestManager};
pub use resolver::{FirmwareResolver, ImageName, LatestBatch};
pub use schema::*;
