use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const FIRMWARE_ROOT: &str = "firmware";
pub const MANIFEST_FILE: &str = "firmwareInfo.json";
pub const IMAGE_EXT: &str = ".img";

/// One manifest row. Missing fields decode as empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareEntry {
    pub id: String,
    pub product_name: String,
    pub version: String,
    pub upload_user: String,
    pub upload_time: String,
    pub url: String,
}

/// Caller-supplied part of an entry; the rest is stamped on append.
#[derive(Clone, Debug)]
pub struct NewFirmware {
    pub product_name: String,
    pub version: String,
    pub upload_user: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestFirmware {
    pub product_name: String,
    pub newest_version: String,
}

/// `major.minor.patch`, ordered field by field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(format!("version {s:?} is not major.minor.patch"));
        };
        let num = |p: &str| {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("version {s:?} has a non-numeric component {p:?}"));
            }
            p.parse::<u64>()
                .map_err(|e| format!("version {s:?} component {p:?}: {e}"))
        };
        Ok(Version {
            major: num(*major)?,
            minor: num(*minor)?,
            patch: num(*patch)?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// `firmware/<product>/`
pub fn image_prefix(product_name: &str) -> String {
    format!("{FIRMWARE_ROOT}/{product_name}/")
}

/// `firmware/<product>/firmwareInfo.json`
pub fn manifest_key(product_name: &str) -> String {
    format!("{}{MANIFEST_FILE}", image_prefix(product_name))
}

/// Image key derived from a manifest entry: `firmware/<p>/<p>_<version>.img`
pub fn image_key(product_name: &str, version: &str) -> String {
    format!("{}{product_name}_{version}{IMAGE_EXT}", image_prefix(product_name))
}

/// Key an uploaded image lands under, keeping the client's file name.
pub fn upload_key(product_name: &str, file_name: &str) -> String {
    format!("{}{file_name}", image_prefix(product_name))
}

pub fn image_url(bucket: &str, product_name: &str, version: &str) -> String {
    format!("oss://{bucket}/{}", image_key(product_name, version))
}

pub fn is_firmware_image(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(IMAGE_EXT)
}
