use blobstore::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("bucket {0} does not exist")]
    StorageUnavailable(String),

    #[error("manifest {key} is not a valid firmware list: {reason}")]
    Decode { key: String, reason: String },

    #[error("failed to encode manifest: {0}")]
    Encode(String),

    #[error("failed to write {key}: {reason}")]
    Upload { key: String, reason: String },

    #[error("no firmware images for product {0}")]
    NotFound(String),

    #[error("firmware image {0} carries a version that does not fit an integer triple")]
    BadVersion(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, FirmwareError>;
