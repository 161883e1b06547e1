//! S3 / MinIO backend.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, DateTime as SmithyDateTime};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::{ObjectMeta, ObjectStore, Result, StoreError, StoredObject};

#[derive(Clone, Debug)]
pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub force_path_style: bool,
}

#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "minio-bridge",
        );
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(settings.endpoint.clone())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(settings.force_path_style)
            .build();

        Self {
            client: Client::from_conf(conf),
        }
    }
}

fn backend(err: impl std::error::Error) -> StoreError {
    StoreError::Backend(DisplayErrorContext(&err).to_string())
}

fn to_chrono(dt: Option<&SmithyDateTime>) -> Option<DateTime<Utc>> {
    dt.and_then(|d| DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
}

fn size_of(len: Option<i64>) -> u64 {
    len.and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self))]
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = DisplayErrorContext(&e).to_string();
                if e.into_service_error().is_not_found() {
                    Ok(false)
                } else {
                    Err(StoreError::Backend(msg))
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        if self.bucket_exists(bucket).await? {
            debug!(bucket, "bucket already present");
            return Ok(());
        }
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(backend)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMeta> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(out) => Ok(ObjectMeta {
                key: key.to_string(),
                size: size_of(out.content_length()),
                last_modified: to_chrono(out.last_modified()),
                content_type: out.content_type().map(str::to_string),
                is_dir: false,
            }),
            Err(e) => {
                let msg = DisplayErrorContext(&e).to_string();
                if e.into_service_error().is_not_found() {
                    Err(StoreError::not_found(bucket, key))
                } else {
                    Err(StoreError::Backend(msg))
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let out = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(out) => out,
            Err(e) => {
                let msg = DisplayErrorContext(&e).to_string();
                return if e.into_service_error().is_no_such_key() {
                    Err(StoreError::not_found(bucket, key))
                } else {
                    Err(StoreError::Backend(msg))
                };
            }
        };

        let meta = ObjectMeta {
            key: key.to_string(),
            size: size_of(out.content_length()),
            last_modified: to_chrono(out.last_modified()),
            content_type: out.content_type().map(str::to_string),
            is_dir: false,
        };
        let body = out.body.collect().await.map_err(backend)?.into_bytes();
        Ok(StoredObject { meta, body })
    }

    #[instrument(skip(self, body), fields(len = body.len()))]
    async fn put(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let len = i64::try_from(body.len()).map_err(backend)?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(len)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(backend)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, bucket: &str, key: &str) -> Result<()> {
        // DeleteObject succeeds for absent keys, so probe first.
        self.stat(bucket, key).await?;
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(backend)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Vec<ObjectMeta>> {
        let mut out = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
            if !recursive {
                req = req.delimiter("/");
            }
            if let Some(token) = continuation.take() {
                req = req.continuation_token(token);
            }
            let resp = req.send().await.map_err(backend)?;

            for cp in resp.common_prefixes() {
                if let Some(p) = cp.prefix() {
                    out.push(ObjectMeta::dir(p.to_string()));
                }
            }
            for obj in resp.contents() {
                let Some(key) = obj.key() else { continue };
                out.push(ObjectMeta {
                    key: key.to_string(),
                    size: size_of(obj.size()),
                    last_modified: to_chrono(obj.last_modified()),
                    content_type: None,
                    is_dir: key.ends_with('/'),
                });
            }

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }
}
