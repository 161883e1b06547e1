use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct DownloadReq {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFilesReq {
    #[serde(rename = "keyList", default)]
    pub key_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceListReq {
    #[serde(default)]
    pub path: String,
    #[serde(rename = "comID", default)]
    pub com_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderReq {
    #[serde(rename = "currentPath", default)]
    pub current_path: String,
    #[serde(rename = "folderName", default)]
    pub folder_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateFolderResp {
    pub success: bool,
    pub message: String,
}

/// One row of a resource listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem {
    pub file_name: String,
    pub key: String,
    pub is_dir: bool,
    /// Megabytes, two decimals.
    pub size: f64,
    pub last_modified: String,
}
