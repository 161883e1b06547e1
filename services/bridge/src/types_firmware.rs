use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DeleteFirmwareReq {
    pub id: String,
    pub product_name: String,
}

#[derive(Debug, Deserialize)]
pub struct FirmwareListReq {
    pub product_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LatestFirmwaresReq {
    #[serde(default)]
    pub product_name_list: Vec<String>,
}
