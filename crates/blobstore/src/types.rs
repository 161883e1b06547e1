use bytes::Bytes;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    /// Set for the synthetic entries of a non-recursive listing.
    pub is_dir: bool,
}

impl ObjectMeta {
    pub fn dir(key: String) -> Self {
        Self {
            key,
            size: 0,
            last_modified: None,
            content_type: None,
            is_dir: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoredObject {
    pub meta: ObjectMeta,
    pub body: Bytes,
}
