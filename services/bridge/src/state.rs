use std::sync::Arc;

use blobstore::ObjectStore;
use firmware::{FirmwareResolver, ManifestManager};

use crate::config::AppConfig;

pub type SharedState = Arc<AppState>;

/// Everything a handler needs, built once at startup.
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub cfg: AppConfig,
    pub manifests: ManifestManager,
    pub resolver: FirmwareResolver,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, cfg: AppConfig) -> Self {
        let manifests = ManifestManager::new(store.clone(), cfg.firmware_bucket.clone(), cfg.firmware_tz);
        let resolver = FirmwareResolver::new(store.clone(), cfg.firmware_bucket.clone());
        Self {
            store,
            cfg,
            manifests,
            resolver,
        }
    }

    pub fn files_bucket(&self) -> &str {
        &self.cfg.files_bucket
    }

    pub fn firmware_bucket(&self) -> &str {
        &self.cfg.firmware_bucket
    }
}
