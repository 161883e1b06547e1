use anyhow::{bail, Context, Result};
use chrono::FixedOffset;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,

    /// Audio resources and folders.
    pub files_bucket: String,
    /// Firmware images and their manifests.
    pub firmware_bucket: String,

    pub bind_addr: String,
    pub firmware_tz: FixedOffset,
    pub max_upload_bytes: usize,
    pub static_dir: Option<String>,
    pub health_check: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| get(key).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string());

        let mut s3_endpoint = or("MINIO_ENDPOINT", "minio:9100");
        if !s3_endpoint.starts_with("http://") && !s3_endpoint.starts_with("https://") {
            s3_endpoint = format!("http://{s3_endpoint}");
        }

        let port = or("MINIO_BRIDGE_PORT", "9102");
        port.parse::<u16>()
            .with_context(|| format!("MINIO_BRIDGE_PORT must be a port number, got {port:?}"))?;

        let tz = or("FIRMWARE_TZ_OFFSET", "+08:00");
        let firmware_tz = tz
            .parse::<FixedOffset>()
            .with_context(|| format!("FIRMWARE_TZ_OFFSET must look like +08:00, got {tz:?}"))?;

        let max_mb = or("MAX_UPLOAD_MB", "100");
        let max_mb: usize = max_mb
            .parse()
            .with_context(|| format!("MAX_UPLOAD_MB must be a whole number, got {max_mb:?}"))?;
        if max_mb == 0 {
            bail!("MAX_UPLOAD_MB must be greater than zero");
        }
        let Some(max_upload_bytes) = max_mb.checked_mul(1024 * 1024) else {
            bail!("MAX_UPLOAD_MB is too large, got {max_mb}");
        };

        let health_check = !matches!(
            or("MINIO_HEALTH_CHECK", "true").as_str(),
            "0" | "false" | "FALSE" | "no" | "NO"
        );

        Ok(Self {
            s3_endpoint,
            s3_region: or("MINIO_REGION", "us-east-1"),
            s3_access_key: or("MINIO_ACCESS_KEY", "admin"),
            s3_secret_key: or("MINIO_SECRET_KEY", "12345678"),
            files_bucket: or("MINIO_BUCKET_NAME", "nxt-tenant"),
            firmware_bucket: or("FIRMWARE_BUCKET_NAME", "nxt-device"),
            bind_addr: format!("0.0.0.0:{port}"),
            firmware_tz,
            max_upload_bytes,
            static_dir: get("STATIC_DIR").filter(|v| !v.is_empty()),
            health_check,
        })
    }

    pub fn s3_settings(&self) -> blobstore::S3Settings {
        blobstore::S3Settings {
            endpoint: self.s3_endpoint.clone(),
            region: self.s3_region.clone(),
            access_key: self.s3_access_key.clone(),
            secret_key: self.s3_secret_key.clone(),
            force_path_style: true,
        }
    }
}
